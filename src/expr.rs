//! Constraint expressions.
//!
//! An [`Expr`] is a small closed tree of quantity references, literals, sums,
//! products, and real powers. Expressions are built with ordinary operators:
//!
//! ```
//! use twine_gp::quantity::{Declaration, Registry};
//!
//! let mut registry = Registry::new();
//! let root = registry.root();
//! let w = registry.declare(root, Declaration::new("W", "lbf")).unwrap();
//! let s = registry.declare(root, Declaration::new("S", "ft^2")).unwrap();
//!
//! let loading = &w / &s;
//! let constraint = loading.le(&w / &s * 1.2);
//! assert_eq!(constraint.to_string(), "W / S <= W / S * 1.2");
//! ```
//!
//! Before classification an expression is expanded into a [`Signomial`]
//! whose variables are quantity values in their declared units. Unit scales
//! are folded into the coefficients, so every expansion is in SI.

mod ops;
mod signomial;

use std::{collections::BTreeMap, fmt};

use thiserror::Error;
use uom::si::{Dimension as SiDimension, Quantity as UomQuantity, SI};

use crate::{
    constraint::{Constraint, Relation},
    quantity::{Quantity, QuantityId},
    support::units::{Dimension, Unit, UnitError},
};

pub use signomial::{Monomial, Posynomial, Signomial};

/// Errors from checking or expanding an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Terms of a sum, or the sides of a constraint, have different dimensions.
    #[error("unit mismatch in `{expr}`: {left} vs {right}")]
    UnitMismatch {
        expr: String,
        left: Dimension,
        right: Dimension,
    },

    /// A sum raised to a fractional or negative power.
    #[error("`{expr}` cannot be expanded into a signomial")]
    NotSignomial { expr: String },

    /// Evaluation reached a quantity without a value.
    #[error("no value for quantity {id}")]
    MissingValue { id: QuantityId },
}

/// A constraint expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Quantity(Quantity),
    Literal { value: f64, unit: Unit },
    Sum(Vec<Expr>),
    Product(Vec<Expr>),
    Power(Box<Expr>, f64),
}

impl Expr {
    /// A dimensionless literal.
    #[must_use]
    pub fn literal(value: f64) -> Self {
        Self::Literal {
            value,
            unit: Unit::DIMENSIONLESS,
        }
    }

    /// A literal with a unit string, e.g. `Expr::with_unit(9.81, "m/s^2")`.
    ///
    /// # Errors
    ///
    /// Returns a [`UnitError`] if the unit string is invalid.
    pub fn with_unit(value: f64, unit: &str) -> Result<Self, UnitError> {
        Ok(Self::Literal {
            value,
            unit: Unit::parse(unit)?,
        })
    }

    /// A literal taken from a [`uom`] quantity.
    #[must_use]
    pub fn from_uom<D>(quantity: UomQuantity<D, SI<f64>, f64>) -> Self
    where
        D: SiDimension + ?Sized,
    {
        Self::Literal {
            value: quantity.value,
            unit: Unit::si(Dimension::of::<D>()),
        }
    }

    /// Sums any number of terms.
    pub fn sum<I>(terms: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        Self::Sum(terms.into_iter().map(Into::into).collect())
    }

    /// Multiplies any number of factors.
    pub fn product<I>(factors: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Expr>,
    {
        Self::Product(factors.into_iter().map(Into::into).collect())
    }

    /// Raises the expression to a real power.
    #[must_use]
    pub fn pow(self, power: f64) -> Self {
        if power == 1.0 {
            return self;
        }
        Self::Power(Box::new(self), power)
    }

    /// Builds `self <= rhs`.
    pub fn le(self, rhs: impl Into<Expr>) -> Constraint {
        Constraint::new(self, Relation::Le, rhs.into())
    }

    /// Builds `self >= rhs`.
    pub fn ge(self, rhs: impl Into<Expr>) -> Constraint {
        Constraint::new(self, Relation::Ge, rhs.into())
    }

    /// Builds `self == rhs`.
    pub fn equals(self, rhs: impl Into<Expr>) -> Constraint {
        Constraint::new(self, Relation::Eq, rhs.into())
    }

    /// Returns the physical dimension, checking that every sum is consistent.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::UnitMismatch`] if two terms of a sum differ.
    pub fn dimension(&self) -> Result<Dimension, ExprError> {
        match self {
            Self::Quantity(quantity) => Ok(quantity.unit().dimension()),
            Self::Literal { unit, .. } => Ok(unit.dimension()),
            Self::Sum(terms) => {
                let mut dimension = None;
                for term in terms {
                    let d = term.dimension()?;
                    match dimension {
                        None => dimension = Some(d),
                        Some(first) if first != d => {
                            return Err(ExprError::UnitMismatch {
                                expr: self.to_string(),
                                left: first,
                                right: d,
                            });
                        }
                        Some(_) => {}
                    }
                }
                Ok(dimension.unwrap_or(Dimension::NONE))
            }
            Self::Product(factors) => factors
                .iter()
                .try_fold(Dimension::NONE, |acc, f| Ok::<_, ExprError>(acc * f.dimension()?)),
            Self::Power(base, power) => Ok(base.dimension()?.powf(*power)),
        }
    }

    /// Returns every quantity referenced, keyed by identity.
    #[must_use]
    pub fn quantities(&self) -> BTreeMap<QuantityId, Quantity> {
        let mut found = BTreeMap::new();
        self.collect_quantities(&mut found);
        found
    }

    pub(crate) fn collect_quantities(&self, found: &mut BTreeMap<QuantityId, Quantity>) {
        match self {
            Self::Quantity(quantity) => {
                found.entry(quantity.id()).or_insert_with(|| quantity.clone());
            }
            Self::Literal { .. } => {}
            Self::Sum(items) | Self::Product(items) => {
                for item in items {
                    item.collect_quantities(found);
                }
            }
            Self::Power(base, _) => base.collect_quantities(found),
        }
    }

    /// Expands into a signomial over quantity values in their declared units.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::NotSignomial`] if a multi-term sum is raised to a
    /// power that is not a non-negative integer, or a negative term to a
    /// fractional power.
    pub fn expand(&self) -> Result<Signomial, ExprError> {
        match self {
            Self::Quantity(quantity) => {
                Ok(Monomial::variable(quantity.id(), quantity.unit().scale()).into())
            }
            Self::Literal { value, unit } => Ok(Signomial::constant(value * unit.scale())),
            Self::Sum(terms) => terms
                .iter()
                .try_fold(Signomial::zero(), |acc, t| Ok::<_, ExprError>(acc + t.expand()?)),
            Self::Product(factors) => factors
                .iter()
                .try_fold(Signomial::one(), |acc, f| Ok::<_, ExprError>(&acc * &f.expand()?)),
            Self::Power(base, power) => base
                .expand()?
                .powf(*power)
                .ok_or_else(|| ExprError::NotSignomial {
                    expr: self.to_string(),
                }),
        }
    }

    /// Returns a truncated Taylor series of `exp(x) - 1` with `terms` terms.
    ///
    /// Every term is positive, so the result can sit on the lesser side of a
    /// posynomial constraint. `x` must be dimensionless.
    pub fn exp_minus_one(x: impl Into<Expr>, terms: usize) -> Self {
        let x = x.into();
        let mut factorial = 1.0;
        Self::Sum(
            (1..=terms.max(1))
                .map(|k| {
                    factorial *= k as f64;
                    Self::Product(vec![x.clone().pow(k as f64), Self::literal(1.0 / factorial)])
                })
                .collect(),
        )
    }

    fn precedence(&self) -> u8 {
        match self {
            Self::Sum(_) => 0,
            Self::Product(_) => 1,
            Self::Literal { value, .. } if *value < 0.0 => 1,
            Self::Power(..) => 2,
            Self::Quantity(_) | Self::Literal { .. } => 3,
        }
    }

    fn write_within(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    /// Splits `-1 * e` into `e`, for display.
    fn negated(&self) -> Option<&Expr> {
        match self {
            Self::Product(factors) if factors.len() == 2 => match &factors[0] {
                Self::Literal { value, unit } if *value == -1.0 && *unit == Unit::DIMENSIONLESS => {
                    Some(&factors[1])
                }
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quantity(quantity) => write!(f, "{quantity}"),
            Self::Literal { value, unit } => {
                if *unit == Unit::DIMENSIONLESS {
                    write!(f, "{value}")
                } else {
                    write!(f, "{} {}", value * unit.scale(), unit.dimension())
                }
            }
            Self::Sum(terms) => {
                if terms.is_empty() {
                    return write!(f, "0");
                }
                for (i, term) in terms.iter().enumerate() {
                    match (i, term.negated()) {
                        (0, _) => term.write_within(f, 1)?,
                        (_, Some(inner)) => {
                            write!(f, " - ")?;
                            inner.write_within(f, 1)?;
                        }
                        (_, None) => {
                            write!(f, " + ")?;
                            term.write_within(f, 1)?;
                        }
                    }
                }
                Ok(())
            }
            Self::Product(factors) => {
                if let Some(inner) = self.negated() {
                    write!(f, "-")?;
                    return inner.write_within(f, 2);
                }
                for (i, factor) in factors.iter().enumerate() {
                    match factor {
                        Self::Power(base, power) if i > 0 && *power == -1.0 => {
                            write!(f, " / ")?;
                            base.write_within(f, 2)?;
                        }
                        _ => {
                            if i > 0 {
                                write!(f, " * ")?;
                            }
                            factor.write_within(f, 2)?;
                        }
                    }
                }
                Ok(())
            }
            Self::Power(base, power) => {
                base.write_within(f, 3)?;
                write!(f, "^{power}")
            }
        }
    }
}
