use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::{constraint::Constraint, quantity::Quantity};

use super::Expr;

impl From<Quantity> for Expr {
    fn from(quantity: Quantity) -> Self {
        Self::Quantity(quantity)
    }
}

impl From<&Quantity> for Expr {
    fn from(quantity: &Quantity) -> Self {
        Self::Quantity(quantity.clone())
    }
}

impl From<&Expr> for Expr {
    fn from(expr: &Expr) -> Self {
        expr.clone()
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::literal(value)
    }
}

impl Expr {
    fn plus(self, rhs: Expr) -> Expr {
        let mut terms = match self {
            Self::Sum(terms) => terms,
            other => vec![other],
        };
        match rhs {
            Self::Sum(more) => terms.extend(more),
            other => terms.push(other),
        }
        Self::Sum(terms)
    }

    fn times(self, rhs: Expr) -> Expr {
        let mut factors = match self {
            Self::Product(factors) => factors,
            other => vec![other],
        };
        match rhs {
            Self::Product(more) => factors.extend(more),
            other => factors.push(other),
        }
        Self::Product(factors)
    }

    fn negate(self) -> Expr {
        match self {
            Self::Literal { value, unit } => Self::Literal {
                value: -value,
                unit,
            },
            other => Self::Product(vec![Self::literal(-1.0), other]),
        }
    }
}

impl Quantity {
    /// Builds `self <= rhs`.
    pub fn le(&self, rhs: impl Into<Expr>) -> Constraint {
        Expr::from(self).le(rhs)
    }

    /// Builds `self >= rhs`.
    pub fn ge(&self, rhs: impl Into<Expr>) -> Constraint {
        Expr::from(self).ge(rhs)
    }

    /// Builds `self == rhs`.
    pub fn equals(&self, rhs: impl Into<Expr>) -> Constraint {
        Expr::from(self).equals(rhs)
    }

    /// Raises the quantity to a real power.
    #[must_use]
    pub fn pow(&self, power: f64) -> Expr {
        Expr::from(self).pow(power)
    }
}

macro_rules! expr_ops {
    ($($lhs:ty),* $(,)?) => {$(
        impl<R: Into<Expr>> Add<R> for $lhs {
            type Output = Expr;

            fn add(self, rhs: R) -> Expr {
                Expr::from(self).plus(rhs.into())
            }
        }

        impl<R: Into<Expr>> Sub<R> for $lhs {
            type Output = Expr;

            fn sub(self, rhs: R) -> Expr {
                Expr::from(self).plus(rhs.into().negate())
            }
        }

        impl<R: Into<Expr>> Mul<R> for $lhs {
            type Output = Expr;

            fn mul(self, rhs: R) -> Expr {
                Expr::from(self).times(rhs.into())
            }
        }

        impl<R: Into<Expr>> Div<R> for $lhs {
            type Output = Expr;

            fn div(self, rhs: R) -> Expr {
                Expr::from(self).times(rhs.into().pow(-1.0))
            }
        }

        impl Neg for $lhs {
            type Output = Expr;

            fn neg(self) -> Expr {
                Expr::from(self).negate()
            }
        }
    )*};
}

expr_ops!(Expr, &Expr, Quantity, &Quantity);

macro_rules! scalar_lhs_ops {
    ($($rhs:ty),* $(,)?) => {$(
        impl Add<$rhs> for f64 {
            type Output = Expr;

            fn add(self, rhs: $rhs) -> Expr {
                Expr::literal(self).plus(rhs.into())
            }
        }

        impl Sub<$rhs> for f64 {
            type Output = Expr;

            fn sub(self, rhs: $rhs) -> Expr {
                Expr::literal(self).plus(Expr::from(rhs).negate())
            }
        }

        impl Mul<$rhs> for f64 {
            type Output = Expr;

            fn mul(self, rhs: $rhs) -> Expr {
                Expr::literal(self).times(rhs.into())
            }
        }

        impl Div<$rhs> for f64 {
            type Output = Expr;

            fn div(self, rhs: $rhs) -> Expr {
                Expr::literal(self).times(Expr::from(rhs).pow(-1.0))
            }
        }
    )*};
}

scalar_lhs_ops!(Expr, &Expr, Quantity, &Quantity);
