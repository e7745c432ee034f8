use crate::{
    expr::{ExprError, Monomial, Posynomial, Signomial},
    quantity::Values,
};

use super::Relation;

/// Relative tolerance for deciding constraints between constants.
const CONSTANT_TOL: f64 = 1e-9;

/// The class of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// `monomial == monomial`; log-linear.
    MonomialEquality,
    /// `posynomial <= monomial`; convex after the log transform.
    PosynomialInequality,
    /// `posynomial <= posynomial` with several terms on the greater side.
    Signomial,
    /// An equality with more than one term on some side.
    SignomialEquality,
    /// No free quantities remain.
    Constant,
}

impl ConstraintKind {
    /// Returns true if the class needs an operating point to be convexified.
    #[must_use]
    pub fn is_signomial(self) -> bool {
        matches!(self, Self::Signomial | Self::SignomialEquality)
    }
}

/// A constraint reduced to a canonical form.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// `posynomial <= 1`.
    Posynomial(Posynomial),
    /// `monomial == 1`.
    MonomialEquality(Monomial),
    /// `lesser <= greater`.
    Signomial {
        lesser: Posynomial,
        greater: Posynomial,
    },
    /// `lesser == greater`.
    SignomialEquality {
        lesser: Posynomial,
        greater: Posynomial,
    },
    /// Holds for every positive value of the remaining quantities.
    Satisfied,
    /// Holds for no positive value of the remaining quantities.
    Unsatisfiable,
}

impl Normalized {
    /// Classifies a slack signomial after folding in fixed values.
    ///
    /// For inequalities `slack >= 0`; for equalities `slack == 0`.
    #[must_use]
    pub fn from_slack(slack: &Signomial, relation: Relation, fixed: &Values) -> Self {
        let slack = slack.substitute(fixed);
        let (greater, lesser) = slack.split();

        if slack.quantities().is_empty() {
            return Self::constant(&greater, &lesser, relation);
        }

        match relation {
            Relation::Le | Relation::Ge => {
                if lesser.is_empty() {
                    Self::Satisfied
                } else if greater.is_empty() {
                    Self::Unsatisfiable
                } else if let Some(denominator) = greater.as_monomial() {
                    Self::Posynomial(lesser.div_monomial(denominator))
                } else {
                    Self::Signomial { lesser, greater }
                }
            }
            Relation::Eq => {
                if lesser.is_empty() || greater.is_empty() {
                    return Self::Unsatisfiable;
                }
                match (lesser.as_monomial(), greater.as_monomial()) {
                    (Some(l), Some(g)) => Self::MonomialEquality(l / g),
                    _ => Self::SignomialEquality { lesser, greater },
                }
            }
        }
    }

    fn constant(greater: &Posynomial, lesser: &Posynomial, relation: Relation) -> Self {
        let total = |p: &Posynomial| p.terms().iter().map(Monomial::coeff).sum::<f64>();
        let (g, l) = (total(greater), total(lesser));
        let tol = CONSTANT_TOL * g.max(l);
        let holds = match relation {
            Relation::Le | Relation::Ge => l <= g + tol,
            Relation::Eq => (g - l).abs() <= tol,
        };
        if holds {
            Self::Satisfied
        } else {
            Self::Unsatisfiable
        }
    }

    /// Returns the class of this form.
    #[must_use]
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Posynomial(_) => ConstraintKind::PosynomialInequality,
            Self::MonomialEquality(_) => ConstraintKind::MonomialEquality,
            Self::Signomial { .. } => ConstraintKind::Signomial,
            Self::SignomialEquality { .. } => ConstraintKind::SignomialEquality,
            Self::Satisfied | Self::Unsatisfiable => ConstraintKind::Constant,
        }
    }

    /// Returns `lesser / greater` for inequalities, which is at most one when
    /// the constraint holds and exactly one when it is active.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::MissingValue`] if `values` lacks a quantity.
    pub fn activity(&self, values: &Values) -> Result<Option<f64>, ExprError> {
        match self {
            Self::Posynomial(p) => Ok(Some(p.eval(values)?)),
            Self::Signomial { lesser, greater } => {
                Ok(Some(lesser.eval(values)? / greater.eval(values)?))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::{
        expr::Expr,
        quantity::{Declaration, Quantity, Registry},
    };

    fn abc() -> (Quantity, Quantity, Quantity) {
        let mut registry = Registry::new();
        let root = registry.root();
        let a = registry.declare(root, Declaration::new("a", "m")).unwrap();
        let b = registry.declare(root, Declaration::new("b", "m")).unwrap();
        let c = registry.declare(root, Declaration::new("c", "m")).unwrap();
        (a, b, c)
    }

    #[test]
    fn classification_table() {
        let (a, b, c) = abc();
        assert_eq!(
            a.equals(&b * 2.0).classify().unwrap(),
            ConstraintKind::MonomialEquality
        );
        assert_eq!(
            a.ge(&b + &c).classify().unwrap(),
            ConstraintKind::PosynomialInequality
        );
        assert_eq!(
            (&b + &c).le(&a).classify().unwrap(),
            ConstraintKind::PosynomialInequality
        );
        assert_eq!(a.ge(&b - &c).classify().unwrap(), ConstraintKind::Signomial);
        assert_eq!(
            a.equals(&b + &c).classify().unwrap(),
            ConstraintKind::SignomialEquality
        );
    }

    #[test]
    fn subtraction_moved_across_is_still_posynomial() {
        let (a, b, c) = abc();
        // a - c >= b is a >= b + c: one term on the greater side.
        let normalized = (&a - &c).ge(&b).normalize(&Values::new()).unwrap();
        let Normalized::Posynomial(p) = normalized else {
            panic!("expected a posynomial inequality");
        };
        assert_eq!(p.terms().len(), 2);
    }

    #[test]
    fn fixing_values_can_change_the_class() {
        let (a, b, c) = abc();
        let constraint = a.ge(&b - &c);

        // b <= a + 4 still has two terms on the greater side.
        let fixed = Values::new().with(&c, 4.0);
        let normalized = constraint.normalize(&fixed).unwrap();
        assert_eq!(normalized.kind(), ConstraintKind::Signomial);

        // With a and c fixed, b <= a + c is a plain bound.
        let fixed = Values::new().with(&a, 1.0).with(&c, 4.0);
        let Normalized::Posynomial(p) = constraint.normalize(&fixed).unwrap() else {
            panic!("expected a posynomial inequality");
        };
        let at = Values::new().with(&b, 5.0);
        assert_relative_eq!(p.eval(&at).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn constant_constraints() {
        let (a, b, _) = abc();
        let fixed = Values::new().with(&a, 2.0).with(&b, 3.0);
        assert_eq!(
            a.le(&b).normalize(&fixed).unwrap(),
            Normalized::Satisfied
        );
        assert_eq!(
            a.ge(&b).normalize(&fixed).unwrap(),
            Normalized::Unsatisfiable
        );
        assert_eq!(
            a.equals(&b).normalize(&fixed).unwrap(),
            Normalized::Unsatisfiable
        );
        assert_eq!(a.le(&b).normalize(&fixed).unwrap().kind(), ConstraintKind::Constant);
    }

    #[test]
    fn sign_only_constraints() {
        let (a, b, _) = abc();
        // a + b >= 0 always holds for positive quantities.
        let zero = Expr::with_unit(0.0, "m").unwrap();
        assert_eq!(
            (&a + &b).ge(zero.clone()).normalize(&Values::new()).unwrap(),
            Normalized::Satisfied
        );
        assert_eq!(
            (&a + &b).le(zero).normalize(&Values::new()).unwrap(),
            Normalized::Unsatisfiable
        );
    }
}
