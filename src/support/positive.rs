//! Strictly positive numeric values.
//!
//! Geometric programs work in log space, so every fixed value, unit scale, and
//! monomial coefficient that reaches a solver must be greater than zero.
//! [`Positive`] carries that guarantee from the point of construction.

use std::{cmp::Ordering, ops::Deref};

use num_traits::Zero;
use thiserror::Error;

/// An error returned when a value is not strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositiveError {
    #[error("value must not be negative")]
    Negative,
    #[error("value must not be zero")]
    Zero,
    #[error("value is not a number")]
    NotANumber,
}

/// A value that is guaranteed to be greater than zero.
///
/// # Example
///
/// ```
/// use twine_gp::support::positive::Positive;
///
/// let x = Positive::new(2.5).unwrap();
/// assert_eq!(x.into_inner(), 2.5);
///
/// assert!(Positive::new(0.0).is_err());
/// assert!(Positive::new(-1.0).is_err());
/// assert!(Positive::new(f64::NAN).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Positive<T>(T);

impl<T: PartialOrd + Zero> Positive<T> {
    /// Constructs a positive value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is zero, negative, or not a number.
    pub fn new(value: T) -> Result<Self, PositiveError> {
        match value.partial_cmp(&T::zero()) {
            Some(Ordering::Greater) => Ok(Self(value)),
            Some(Ordering::Equal) => Err(PositiveError::Zero),
            Some(Ordering::Less) => Err(PositiveError::Negative),
            None => Err(PositiveError::NotANumber),
        }
    }
}

impl<T> Positive<T> {
    /// Consumes the wrapper and returns the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Positive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_values() {
        assert_eq!(Positive::new(3).unwrap().into_inner(), 3);
        assert_eq!(*Positive::new(1e-300).unwrap(), 1e-300);
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(Positive::new(0.0), Err(PositiveError::Zero));
        assert_eq!(Positive::new(-4.0), Err(PositiveError::Negative));
        assert_eq!(Positive::new(f64::NAN), Err(PositiveError::NotANumber));
        assert_eq!(Positive::new(-1), Err(PositiveError::Negative));
    }
}
