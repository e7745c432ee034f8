use std::collections::BTreeSet;

use crate::{
    expr::{ExprError, Monomial, Posynomial},
    quantity::{QuantityId, Values},
};

use super::Normalized;

/// A constraint in geometric-program standard form.
#[derive(Debug, Clone, PartialEq)]
pub enum GpConstraint {
    /// `posynomial <= 1`.
    Inequality(Posynomial),
    /// `monomial == 1`.
    Equality(Monomial),
}

impl GpConstraint {
    /// Returns every quantity the constraint references.
    #[must_use]
    pub fn quantities(&self) -> BTreeSet<QuantityId> {
        match self {
            Self::Inequality(p) => p.quantities(),
            Self::Equality(m) => m.exponents().keys().copied().collect(),
        }
    }

    /// Evaluates the left side, which is one when the constraint is active.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if `values` lacks a quantity.
    pub fn eval(&self, values: &Values) -> Result<f64, ExprError> {
        match self {
            Self::Inequality(p) => p.eval(values),
            Self::Equality(m) => m.eval(values),
        }
    }
}

impl Normalized {
    /// Returns the geometric-program form, relaxed about `point` if needed.
    ///
    /// Native posynomial inequalities and monomial equalities pass through.
    /// For `lesser <= greater`, the greater side is replaced by its monomial
    /// approximation at `point`, giving `lesser / greater_hat <= 1`. Since the
    /// approximation never exceeds `greater`, every point satisfying the relaxed
    /// form satisfies the original, and the two agree exactly at `point`. A
    /// signomial equality replaces both sides by their approximations.
    ///
    /// Returns `None` for constraints without free quantities.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if `point` lacks a quantity.
    pub fn convexify(&self, point: &Values) -> Result<Option<GpConstraint>, ExprError> {
        Ok(match self {
            Self::Posynomial(p) => Some(GpConstraint::Inequality(p.clone())),
            Self::MonomialEquality(m) => Some(GpConstraint::Equality(m.clone())),
            Self::Signomial { lesser, greater } => {
                let approx = greater.monomial_approximation(point)?;
                Some(GpConstraint::Inequality(lesser.div_monomial(&approx)))
            }
            Self::SignomialEquality { lesser, greater } => {
                let l = lesser.monomial_approximation(point)?;
                let g = greater.monomial_approximation(point)?;
                Some(GpConstraint::Equality(&l / &g))
            }
            Self::Satisfied | Self::Unsatisfiable => None,
        })
    }

    /// Returns true if convexifying depends on the operating point.
    #[must_use]
    pub fn is_signomial(&self) -> bool {
        self.kind().is_signomial()
    }

    /// Returns the quantities the operating point must cover.
    #[must_use]
    pub fn quantities(&self) -> BTreeSet<QuantityId> {
        match self {
            Self::Posynomial(p) => p.quantities(),
            Self::MonomialEquality(m) => m.exponents().keys().copied().collect(),
            Self::Signomial { lesser, greater } | Self::SignomialEquality { lesser, greater } => {
                let mut ids = lesser.quantities();
                ids.extend(greater.quantities());
                ids
            }
            Self::Satisfied | Self::Unsatisfiable => BTreeSet::new(),
        }
    }
}
