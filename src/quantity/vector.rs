use std::{ops::Index, slice, sync::Arc};

use thiserror::Error;

use crate::{constraint::Constraint, expr::Expr, support::units::Unit};

use super::Quantity;

/// Errors for vector operations that need a minimum or matching length.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityError {
    /// Fewer instances than the operation requires.
    #[error("{context} requires at least {required} instance(s), got {found}")]
    TooFew {
        context: &'static str,
        required: usize,
        found: usize,
    },

    /// Two vectors combined element-wise have different lengths.
    #[error("length mismatch: `{left}` has {left_len} elements but `{right}` has {right_len}")]
    Mismatch {
        left: String,
        left_len: usize,
        right: String,
        right_len: usize,
    },
}

impl ArityError {
    pub(crate) fn check(context: &'static str, required: usize, found: usize) -> Result<(), Self> {
        if found < required {
            return Err(Self::TooFew {
                context,
                required,
                found,
            });
        }
        Ok(())
    }
}

/// An ordered, fixed-length sequence of quantities sharing a name and unit.
///
/// Each element is a distinct quantity with its own identity. Element-wise
/// helpers broadcast a scalar-looking constraint over every index; neighbor
/// helpers relate index `i` to index `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorQuantity {
    name: String,
    elements: Arc<[Quantity]>,
}

impl VectorQuantity {
    /// Groups existing quantities into a vector.
    ///
    /// # Errors
    ///
    /// Returns [`ArityError::TooFew`] if `elements` is empty.
    pub fn new(name: impl Into<String>, elements: Vec<Quantity>) -> Result<Self, ArityError> {
        ArityError::check("vector quantity", 1, elements.len())?;
        Ok(Self {
            name: name.into(),
            elements: elements.into(),
        })
    }

    /// Returns the shared local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of elements, fixed at creation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false: vectors have at least one element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the unit of the first element.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.elements[0].unit()
    }

    /// Returns an element by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Quantity> {
        self.elements.get(index)
    }

    /// Returns all elements.
    #[must_use]
    pub fn as_slice(&self) -> &[Quantity] {
        &self.elements
    }

    /// Iterates over the elements.
    pub fn iter(&self) -> slice::Iter<'_, Quantity> {
        self.elements.iter()
    }

    /// All elements but the last (`seq[:-1]`).
    #[must_use]
    pub fn head(&self) -> &[Quantity] {
        &self.elements[..self.elements.len() - 1]
    }

    /// All elements but the first (`seq[1:]`).
    #[must_use]
    pub fn tail(&self) -> &[Quantity] {
        &self.elements[1..]
    }

    /// Returns the sum of all elements.
    #[must_use]
    pub fn sum(&self) -> Expr {
        Expr::sum(self.elements.iter())
    }

    /// Broadcasts a constraint over every element.
    pub fn map<F>(&self, f: F) -> Vec<Constraint>
    where
        F: FnMut(&Quantity) -> Constraint,
    {
        self.elements.iter().map(f).collect()
    }

    /// Builds one constraint per index from two equal-length vectors.
    ///
    /// # Errors
    ///
    /// Returns [`ArityError::Mismatch`] if the lengths differ.
    pub fn zip_with<F>(&self, other: &Self, mut f: F) -> Result<Vec<Constraint>, ArityError>
    where
        F: FnMut(&Quantity, &Quantity) -> Constraint,
    {
        if self.len() != other.len() {
            return Err(ArityError::Mismatch {
                left: self.name.clone(),
                left_len: self.len(),
                right: other.name.clone(),
                right_len: other.len(),
            });
        }
        Ok(self
            .elements
            .iter()
            .zip(other.elements.iter())
            .map(|(a, b)| f(a, b))
            .collect())
    }

    /// Builds one constraint per adjacent pair `(seq[i], seq[i + 1])`.
    ///
    /// # Errors
    ///
    /// Returns [`ArityError::TooFew`] if the vector has fewer than two elements.
    pub fn neighbors<F>(&self, mut f: F) -> Result<Vec<Constraint>, ArityError>
    where
        F: FnMut(&Quantity, &Quantity) -> Constraint,
    {
        ArityError::check("neighbor constraint", 2, self.len())?;
        Ok(self
            .head()
            .iter()
            .zip(self.tail())
            .map(|(a, b)| f(a, b))
            .collect())
    }
}

impl Index<usize> for VectorQuantity {
    type Output = Quantity;

    fn index(&self, index: usize) -> &Quantity {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a VectorQuantity {
    type Item = &'a Quantity;
    type IntoIter = slice::Iter<'a, Quantity>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::quantity::{Declaration, Registry};

    fn fuel_weights(n: usize) -> (Registry, VectorQuantity) {
        let mut registry = Registry::new();
        let root = registry.root();
        let w = registry
            .declare_vector(root, n, Declaration::new("W_fuel", "lbf"))
            .unwrap();
        (registry, w)
    }

    #[test]
    fn head_and_tail_offset_by_one() {
        let (_registry, w) = fuel_weights(4);
        assert_eq!(w.head().len(), 3);
        assert_eq!(w.tail().len(), 3);
        assert_eq!(w.head()[1], w[1]);
        assert_eq!(w.tail()[1], w[2]);
    }

    #[test]
    fn neighbors_pair_adjacent_elements() {
        let (_registry, w) = fuel_weights(3);
        let constraints = w.neighbors(|a, b| a.ge(b)).unwrap();
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[1].to_string(), "W_fuel[1] >= W_fuel[2]");
    }

    #[test]
    fn neighbors_require_two_elements() {
        let (_registry, w) = fuel_weights(1);
        let err = w.neighbors(|a, b| a.ge(b)).unwrap_err();
        assert_eq!(
            err,
            ArityError::TooFew {
                context: "neighbor constraint",
                required: 2,
                found: 1
            }
        );
    }

    #[test]
    fn zip_requires_equal_lengths() {
        let mut registry = Registry::new();
        let root = registry.root();
        let a = registry
            .declare_vector(root, 2, Declaration::new("a", "-"))
            .unwrap();
        let b = registry
            .declare_vector(root, 3, Declaration::new("b", "-"))
            .unwrap();
        assert!(matches!(
            a.zip_with(&b, |x, y| x.le(y)),
            Err(ArityError::Mismatch { .. })
        ));
        assert_eq!(a.map(|x| x.le(2.0)).len(), 2);
    }
}
