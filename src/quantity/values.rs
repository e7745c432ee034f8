use std::collections::{HashMap, hash_map};

use super::{Quantity, QuantityId};

/// Numeric values keyed by quantity identity, each in the quantity's declared unit.
///
/// Used for fixed substitution values, operating points, and solutions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values(HashMap<QuantityId, f64>);

impl Values {
    /// Creates an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, consuming and returning `self`.
    #[must_use]
    pub fn with(mut self, quantity: &Quantity, value: f64) -> Self {
        self.insert(quantity.id(), value);
        self
    }

    /// Sets a value, returning the previous one.
    pub fn insert(&mut self, id: QuantityId, value: f64) -> Option<f64> {
        self.0.insert(id, value)
    }

    /// Returns the value of a quantity.
    #[must_use]
    pub fn get(&self, quantity: &Quantity) -> Option<f64> {
        self.0.get(&quantity.id()).copied()
    }

    /// Returns the value for an identity.
    #[must_use]
    pub fn get_id(&self, id: QuantityId) -> Option<f64> {
        self.0.get(&id).copied()
    }

    /// Returns true if a value is present.
    #[must_use]
    pub fn contains(&self, id: QuantityId) -> bool {
        self.0.contains_key(&id)
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over identity and value pairs in arbitrary order.
    pub fn iter(&self) -> hash_map::Iter<'_, QuantityId, f64> {
        self.0.iter()
    }

    /// Copies every value from `other`, overwriting existing entries.
    pub fn extend(&mut self, other: &Values) {
        self.0.extend(other.0.iter().map(|(id, v)| (*id, *v)));
    }
}

impl FromIterator<(QuantityId, f64)> for Values {
    fn from_iter<I: IntoIterator<Item = (QuantityId, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = (&'a QuantityId, &'a f64);
    type IntoIter = hash_map::Iter<'a, QuantityId, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
