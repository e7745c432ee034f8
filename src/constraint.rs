//! Constraints and their classification.
//!
//! A [`Constraint`] relates two expressions. Before solving, each constraint is
//! reduced to a *slack* signomial `S` that must be non-negative (or zero, for
//! equalities). Splitting `S` by sign gives two posynomials, `S = greater - lesser`,
//! and the constraint reads `lesser <= greater`. What `greater` looks like once
//! fixed values are folded in decides the class:
//!
//! | relation | `greater` | class |
//! |---|---|---|
//! | inequality | one term | [`ConstraintKind::PosynomialInequality`] |
//! | inequality | several terms | [`ConstraintKind::Signomial`] |
//! | equality | both sides one term | [`ConstraintKind::MonomialEquality`] |
//! | equality | otherwise | [`ConstraintKind::SignomialEquality`] |
//!
//! Signomial classes are relaxed about an operating point by
//! [`Normalized::convexify`].

mod classify;
mod convexify;

use std::{collections::BTreeMap, fmt};

use crate::{
    expr::{Expr, ExprError, Signomial},
    quantity::{Quantity, QuantityId, Values},
    support::units::Dimension,
};

pub use classify::{ConstraintKind, Normalized};
pub use convexify::GpConstraint;

/// How the two sides of a constraint relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
        })
    }
}

/// Whether an inequality is expected to be active at the optimum.
///
/// After a converged solve, a `Tight` constraint with slack or a `Loose`
/// constraint that is active is reported on the solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tightness {
    #[default]
    Unspecified,
    Tight,
    Loose,
}

/// A relation between two expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    lhs: Expr,
    relation: Relation,
    rhs: Expr,
    label: Option<String>,
    tightness: Tightness,
}

impl Constraint {
    pub fn new(lhs: Expr, relation: Relation, rhs: Expr) -> Self {
        Self {
            lhs,
            relation,
            rhs,
            label: None,
            tightness: Tightness::Unspecified,
        }
    }

    /// Attaches a label used in error messages and reports.
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Marks the constraint as expected to be active.
    #[must_use]
    pub fn tight(mut self) -> Self {
        self.tightness = Tightness::Tight;
        self
    }

    /// Marks the constraint as expected to be inactive.
    #[must_use]
    pub fn loose(mut self) -> Self {
        self.tightness = Tightness::Loose;
        self
    }

    #[must_use]
    pub fn lhs(&self) -> &Expr {
        &self.lhs
    }

    #[must_use]
    pub fn rhs(&self) -> &Expr {
        &self.rhs
    }

    #[must_use]
    pub fn relation(&self) -> Relation {
        self.relation
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn tightness(&self) -> Tightness {
        self.tightness
    }

    /// Returns the label if there is one, otherwise the constraint itself.
    #[must_use]
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.to_string(),
        }
    }

    /// Returns every quantity the constraint references.
    #[must_use]
    pub fn quantities(&self) -> BTreeMap<QuantityId, Quantity> {
        let mut found = BTreeMap::new();
        self.lhs.collect_quantities(&mut found);
        self.rhs.collect_quantities(&mut found);
        found
    }

    /// Checks dimensional consistency and returns the common dimension.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::UnitMismatch`] if a sum or the two sides disagree.
    pub fn check_units(&self) -> Result<Dimension, ExprError> {
        let left = self.lhs.dimension()?;
        let right = self.rhs.dimension()?;
        if left != right {
            return Err(ExprError::UnitMismatch {
                expr: self.describe(),
                left,
                right,
            });
        }
        Ok(left)
    }

    /// Returns the signomial that must be non-negative, or zero for equalities.
    ///
    /// # Errors
    ///
    /// Returns an error if the units are inconsistent or an expression does
    /// not expand into a signomial.
    pub fn slack(&self) -> Result<Signomial, ExprError> {
        self.check_units()?;
        let lhs = self.lhs.expand()?;
        let rhs = self.rhs.expand()?;
        Ok(match self.relation {
            Relation::Le => rhs + -lhs,
            Relation::Ge | Relation::Eq => lhs + -rhs,
        })
    }

    /// Normalizes the constraint with some quantities fixed.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Constraint::slack`].
    pub fn normalize(&self, fixed: &Values) -> Result<Normalized, ExprError> {
        Ok(Normalized::from_slack(&self.slack()?, self.relation, fixed))
    }

    /// Classifies the constraint as written, with no quantities fixed.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Constraint::slack`].
    pub fn classify(&self) -> Result<ConstraintKind, ExprError> {
        Ok(self.normalize(&Values::new())?.kind())
    }

    /// Returns the convex form of the constraint about `point`.
    ///
    /// Returns `None` if the constraint references no quantities.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Constraint::slack`], or
    /// [`ExprError::MissingValue`] if `point` lacks a quantity of a signomial
    /// constraint.
    pub fn convexify(&self, point: &Values) -> Result<Option<GpConstraint>, ExprError> {
        self.normalize(&Values::new())?.convexify(point)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.relation, self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::quantity::{Declaration, Registry};

    #[test]
    fn sides_must_share_a_dimension() {
        let mut registry = Registry::new();
        let root = registry.root();
        let w = registry.declare(root, Declaration::new("W", "lbf")).unwrap();
        let m = registry.declare(root, Declaration::new("m", "kg")).unwrap();

        let err = w.ge(&m).labeled("weight").check_units().unwrap_err();
        assert!(matches!(err, ExprError::UnitMismatch { expr, .. } if expr == "weight"));

        let g = Expr::with_unit(9.81, "m/s^2").unwrap();
        assert!(w.ge(&m * g).check_units().is_ok());
    }

    #[test]
    fn labels_and_tags() {
        let mut registry = Registry::new();
        let root = registry.root();
        let x = registry.declare(root, Declaration::new("x", "-")).unwrap();

        let c = x.ge(1.0).labeled("floor").tight();
        assert_eq!(c.label(), Some("floor"));
        assert_eq!(c.tightness(), Tightness::Tight);
        assert_eq!(c.describe(), "floor");
        assert_eq!(x.le(2.0).loose().describe(), "x <= 2");
    }
}
