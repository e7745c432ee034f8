//! Runtime units built on [`uom`].
//!
//! Model quantities are declared with unit strings (`"ft^2"`, `"N*s/m**2"`,
//! `"lb/hr/hp"`), so units must be values rather than types. A [`Unit`] is a
//! [`Dimension`] plus a scale to SI base units. Every named symbol is derived
//! from a [`uom`] quantity, so conversion factors come from [`uom`] and are not
//! re-tabulated here:
//!
//! ```
//! use uom::si::{f64::Length, length::foot};
//! use twine_gp::support::units::Unit;
//!
//! let ft = Unit::from_si(Length::new::<foot>(1.0));
//! assert_eq!(ft, "ft".parse().unwrap());
//!
//! let inch: Unit = "in".parse().unwrap();
//! assert!((inch.conversion_factor(&ft).unwrap() - 1.0 / 12.0).abs() < 1e-12);
//! ```
//!
//! ## Unit strings
//!
//! A unit string is a product of symbols joined by `*` or `/`, evaluated left to
//! right. Each symbol may carry an exponent written as `^p` or `**p`, and metric
//! symbols may carry an SI prefix (`km`, `kPa`, `mg`). An empty string or `-`
//! is dimensionless.

mod dimension;
mod symbols;

use std::{
    fmt,
    ops::{Div, Mul},
    str::FromStr,
};

use thiserror::Error;
use uom::si::{Dimension as SiDimension, Quantity, SI};

pub use dimension::Dimension;

use super::positive::Positive;

/// Errors from parsing or converting units.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    /// A symbol in a unit string is not known.
    #[error("unknown unit symbol `{symbol}` in `{unit}`")]
    UnknownSymbol { symbol: String, unit: String },

    /// A unit string could not be parsed.
    #[error("malformed unit `{unit}`: {reason}")]
    Malformed { unit: String, reason: String },

    /// Two units do not share a dimension.
    #[error("incompatible units: {from} cannot be converted to {to}")]
    Incompatible { from: Dimension, to: Dimension },
}

/// A physical unit: a dimension and a scale to SI base units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    dimension: Dimension,
    scale: f64,
}

impl Unit {
    /// The unit of a pure number.
    pub const DIMENSIONLESS: Self = Self {
        dimension: Dimension::NONE,
        scale: 1.0,
    };

    /// Creates a unit from a dimension and a positive scale to SI.
    pub fn new(dimension: Dimension, scale: Positive<f64>) -> Self {
        Self {
            dimension,
            scale: scale.into_inner(),
        }
    }

    /// Returns the coherent SI unit of a dimension.
    #[must_use]
    pub const fn si(dimension: Dimension) -> Self {
        Self {
            dimension,
            scale: 1.0,
        }
    }

    /// Creates the unit represented by one of a [`uom`] quantity.
    ///
    /// The dimension is read from the quantity's type and the scale is its
    /// value in SI base units, so `Length::new::<foot>(1.0)` yields feet.
    pub fn from_si<D>(quantity: Quantity<D, SI<f64>, f64>) -> Self
    where
        D: SiDimension + ?Sized,
    {
        Self {
            dimension: Dimension::of::<D>(),
            scale: quantity.value,
        }
    }

    /// Parses a unit string.
    ///
    /// # Errors
    ///
    /// Returns a [`UnitError`] if a symbol is unknown or the string is malformed.
    pub fn parse(unit: &str) -> Result<Self, UnitError> {
        let trimmed = unit.trim();
        if trimmed.is_empty() || trimmed == "-" {
            return Ok(Self::DIMENSIONLESS);
        }

        let normalized = trimmed.replace("**", "^");
        let malformed = |reason: &str| UnitError::Malformed {
            unit: unit.to_string(),
            reason: reason.to_string(),
        };

        let mut result = Self::DIMENSIONLESS;
        let mut divide = false;
        let mut factor = String::new();

        for ch in normalized.chars().chain(std::iter::once('*')) {
            match ch {
                '*' | '/' | '·' => {
                    let token = factor.trim();
                    if token.is_empty() {
                        return Err(malformed("empty factor"));
                    }
                    let unit_factor = Self::parse_factor(token, unit)?;
                    result = if divide {
                        result / unit_factor
                    } else {
                        result * unit_factor
                    };
                    divide = ch == '/';
                    factor.clear();
                }
                _ => factor.push(ch),
            }
        }

        Ok(result)
    }

    fn parse_factor(token: &str, unit: &str) -> Result<Self, UnitError> {
        let (symbol, power) = match token.split_once('^') {
            Some((symbol, power)) => {
                let power = power
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| UnitError::Malformed {
                        unit: unit.to_string(),
                        reason: format!("bad exponent in `{token}`"),
                    })?;
                (symbol.trim(), power)
            }
            None => (token, 1.0),
        };

        let base = symbols::lookup(symbol).ok_or_else(|| UnitError::UnknownSymbol {
            symbol: symbol.to_string(),
            unit: unit.to_string(),
        })?;

        Ok(base.powf(power))
    }

    /// Returns the dimension of this unit.
    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Returns the size of this unit in SI base units.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns true if both units share a dimension.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.dimension == other.dimension
    }

    /// Raises the unit to a real power.
    #[must_use]
    pub fn powf(self, power: f64) -> Self {
        Self {
            dimension: self.dimension.powf(power),
            scale: self.scale.powf(power),
        }
    }

    /// Multiplies the scale by a constant factor.
    #[must_use]
    pub(crate) fn scaled(self, factor: f64) -> Self {
        Self {
            dimension: self.dimension,
            scale: self.scale * factor,
        }
    }

    /// Returns the factor that converts a value in `self` into a value in `to`.
    ///
    /// # Errors
    ///
    /// Returns [`UnitError::Incompatible`] if the dimensions differ.
    pub fn conversion_factor(&self, to: &Self) -> Result<f64, UnitError> {
        if !self.is_compatible(to) {
            return Err(UnitError::Incompatible {
                from: self.dimension,
                to: to.dimension,
            });
        }
        Ok(self.scale / to.scale)
    }
}

impl Default for Unit {
    fn default() -> Self {
        Self::DIMENSIONLESS
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Mul for Unit {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self {
            dimension: self.dimension * rhs.dimension,
            scale: self.scale * rhs.scale,
        }
    }
}

impl Div for Unit {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Self {
            dimension: self.dimension / rhs.dimension,
            scale: self.scale / rhs.scale,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if (self.scale - 1.0).abs() < 1e-12 {
            write!(f, "{}", self.dimension)
        } else {
            write!(f, "{} {}", self.scale, self.dimension)
        }
    }
}
