use std::{
    fmt,
    ops::{Div, Mul},
};

use uom::{si::Dimension as SiDimension, typenum::Integer};

const SYMBOLS: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];
const EPSILON: f64 = 1e-9;

/// Exponents of the seven SI base dimensions.
///
/// Exponents are stored in the order length, mass, time, electric current,
/// thermodynamic temperature, amount of substance, luminous intensity.
/// They are real-valued because geometric programs routinely raise
/// dimensioned quantities to fractional powers (e.g. `(S/A)^0.5`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Dimension([f64; 7]);

impl Dimension {
    /// The dimension of a pure number.
    pub const NONE: Self = Self([0.0; 7]);

    /// Creates a dimension from base exponents.
    #[must_use]
    pub const fn from_exponents(exponents: [f64; 7]) -> Self {
        Self(exponents)
    }

    /// Reads the dimension of a [`uom`] quantity from its type.
    #[must_use]
    pub fn of<D: SiDimension + ?Sized>() -> Self {
        Self([
            f64::from(D::L::to_i32()),
            f64::from(D::M::to_i32()),
            f64::from(D::T::to_i32()),
            f64::from(D::I::to_i32()),
            f64::from(D::Th::to_i32()),
            f64::from(D::N::to_i32()),
            f64::from(D::J::to_i32()),
        ])
    }

    /// Returns the base exponents.
    #[must_use]
    pub fn exponents(&self) -> [f64; 7] {
        self.0
    }

    /// Returns true if every base exponent is zero.
    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self.0.iter().all(|e| e.abs() < EPSILON)
    }

    /// Raises the dimension to a real power.
    #[must_use]
    pub fn powf(self, power: f64) -> Self {
        Self(self.0.map(|e| e * power))
    }
}

/// Dimensions compare with a small tolerance on each exponent.
impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() < EPSILON)
    }
}

impl Mul for Dimension {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut exponents = self.0;
        for (e, r) in exponents.iter_mut().zip(rhs.0) {
            *e += r;
        }
        Self(exponents)
    }
}

impl Div for Dimension {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self * rhs.powf(-1.0)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }
        let mut first = true;
        for (symbol, exponent) in SYMBOLS.iter().zip(self.0) {
            if exponent.abs() < EPSILON {
                continue;
            }
            if !first {
                write!(f, "*")?;
            }
            first = false;
            if (exponent - 1.0).abs() < EPSILON {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}^{exponent}")?;
            }
        }
        Ok(())
    }
}
