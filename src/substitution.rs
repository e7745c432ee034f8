//! Overrides that fix quantities to values.
//!
//! A [`Substitutions`] set maps quantity identity to an [`Override`]: a fixed
//! value, a sweep over several values, or a value derived from the other fixed
//! values of the same point. Values are stored in each quantity's declared
//! unit; overrides given in another unit are converted on insertion.
//!
//! Sweeps expand into the cartesian product of all swept quantities, ordered
//! by quantity identity with the first swept quantity varying slowest.

mod apply;
mod points;

use std::{collections::BTreeMap, fmt, sync::Arc};

use thiserror::Error;
use uom::si::{Dimension as SiDimension, Quantity as UomQuantity, SI};

use crate::{
    expr::ExprError,
    quantity::{Quantity, QuantityId, Values, VectorQuantity},
    support::{
        positive::{Positive, PositiveError},
        units::{Dimension, Unit, UnitError},
    },
};

pub use apply::{Substituted, apply_substitutions};
pub use points::SubstitutionPoint;

/// Errors raised while building or expanding substitutions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubstitutionError {
    /// The override's unit cannot be converted to the quantity's unit.
    #[error("override of `{name}` has an incompatible unit")]
    OverrideType {
        name: String,
        #[source]
        source: UnitError,
    },

    /// Fixed values must be strictly positive.
    #[error("override of `{name}` must be positive, got {value}")]
    NonPositive {
        name: String,
        value: f64,
        #[source]
        source: PositiveError,
    },

    /// A vector override with the wrong number of values.
    #[error("`{name}` has {expected} elements but {found} values were given")]
    VectorLength {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A sweep with no values.
    #[error("sweep of `{name}` has no values")]
    EmptySweep { name: String },

    /// A derived value that is not strictly positive.
    #[error("derived value of `{name}` must be positive, got {value}")]
    Derived { name: String, value: f64 },

    /// A sweep where a single point was expected.
    #[error("`{name}` is swept; solve the sweep instead")]
    UnexpectedSweep { name: String },

    #[error(transparent)]
    Expression(#[from] ExprError),
}

type DeriveFn = dyn Fn(&Values) -> f64 + Send + Sync;

/// The value an override assigns.
#[derive(Clone)]
pub enum Override {
    Fixed(f64),
    Sweep(Vec<f64>),
    Derived(Arc<DeriveFn>),
}

impl fmt::Debug for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Self::Sweep(values) => f.debug_tuple("Sweep").field(values).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    quantity: Quantity,
    value: Override,
}

/// A set of overrides keyed by quantity identity.
///
/// ```
/// use twine_gp::{
///     quantity::{Declaration, Registry},
///     substitution::{Override, Substitutions},
/// };
///
/// let mut registry = Registry::new();
/// let root = registry.root();
/// let range = registry.declare(root, Declaration::new("R", "nmi")).unwrap();
/// let mach = registry.declare(root, Declaration::new("M", "-")).unwrap();
/// let beta = registry.declare(root, Declaration::new("beta", "-")).unwrap();
///
/// let mut subs = Substitutions::new();
/// subs.fix_in(&range, 1852.0, "m").unwrap();
/// subs.sweep(&mach, vec![0.3, 0.5, 0.7]).unwrap();
/// let m = mach.id();
/// subs.derive(&beta, move |fixed| (1.0 - fixed.get_id(m).unwrap_or(0.0).powi(2)).sqrt());
///
/// assert!(matches!(subs.get(range.id()), Some(Override::Fixed(v)) if (v - 1.0).abs() < 1e-12));
/// assert_eq!(subs.points().len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    entries: BTreeMap<QuantityId, Entry>,
}

impl Substitutions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes a quantity to a value in its declared unit.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::NonPositive`] unless `value > 0`.
    pub fn fix(&mut self, quantity: &Quantity, value: f64) -> Result<(), SubstitutionError> {
        let value = positive(quantity, value)?;
        self.insert(quantity, Override::Fixed(value));
        Ok(())
    }

    /// Fixes a quantity to a value given in another unit.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::OverrideType`] if the unit is invalid or
    /// incompatible, or [`SubstitutionError::NonPositive`] unless `value > 0`.
    pub fn fix_in(
        &mut self,
        quantity: &Quantity,
        value: f64,
        unit: &str,
    ) -> Result<(), SubstitutionError> {
        let factor = conversion(quantity, unit)?;
        self.fix(quantity, value * factor)
    }

    /// Fixes a quantity to a [`uom`] value.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::OverrideType`] if the dimensions differ,
    /// or [`SubstitutionError::NonPositive`] unless the value is positive.
    pub fn fix_uom<D>(
        &mut self,
        quantity: &Quantity,
        value: UomQuantity<D, SI<f64>, f64>,
    ) -> Result<(), SubstitutionError>
    where
        D: SiDimension + ?Sized,
    {
        let factor = Unit::si(Dimension::of::<D>())
            .conversion_factor(&quantity.unit())
            .map_err(|source| SubstitutionError::OverrideType {
                name: quantity.qualified_name(),
                source,
            })?;
        self.fix(quantity, value.value * factor)
    }

    /// Fixes every element of a vector quantity.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::VectorLength`] if the lengths differ, or
    /// [`SubstitutionError::NonPositive`] unless every value is positive.
    pub fn fix_vector(
        &mut self,
        vector: &VectorQuantity,
        values: &[f64],
    ) -> Result<(), SubstitutionError> {
        if vector.len() != values.len() {
            return Err(SubstitutionError::VectorLength {
                name: vector.name().to_string(),
                expected: vector.len(),
                found: values.len(),
            });
        }
        for (quantity, value) in vector.iter().zip(values) {
            positive(quantity, *value)?;
        }
        for (quantity, value) in vector.iter().zip(values) {
            self.insert(quantity, Override::Fixed(*value));
        }
        Ok(())
    }

    /// Sweeps a quantity over values in its declared unit.
    ///
    /// # Errors
    ///
    /// Returns [`SubstitutionError::EmptySweep`] if `values` is empty, or
    /// [`SubstitutionError::NonPositive`] unless every value is positive.
    pub fn sweep(
        &mut self,
        quantity: &Quantity,
        values: Vec<f64>,
    ) -> Result<(), SubstitutionError> {
        if values.is_empty() {
            return Err(SubstitutionError::EmptySweep {
                name: quantity.qualified_name(),
            });
        }
        for value in &values {
            positive(quantity, *value)?;
        }
        self.insert(quantity, Override::Sweep(values));
        Ok(())
    }

    /// Sweeps a quantity over values given in another unit.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Substitutions::fix_in`] and
    /// [`Substitutions::sweep`].
    pub fn sweep_in(
        &mut self,
        quantity: &Quantity,
        values: Vec<f64>,
        unit: &str,
    ) -> Result<(), SubstitutionError> {
        let factor = conversion(quantity, unit)?;
        self.sweep(quantity, values.into_iter().map(|v| v * factor).collect())
    }

    /// Computes a quantity from the other fixed values of each point.
    ///
    /// Derived values are computed in identity order, so a derived quantity
    /// may read derived quantities declared before it.
    pub fn derive<F>(&mut self, quantity: &Quantity, f: F)
    where
        F: Fn(&Values) -> f64 + Send + Sync + 'static,
    {
        self.insert(quantity, Override::Derived(Arc::new(f)));
    }

    /// Copies every override from `other`, which takes precedence.
    pub fn extend(&mut self, other: &Substitutions) {
        self.entries
            .extend(other.entries.iter().map(|(id, e)| (*id, e.clone())));
    }

    /// Removes an override.
    pub fn remove(&mut self, id: QuantityId) -> Option<Override> {
        self.entries.remove(&id).map(|e| e.value)
    }

    #[must_use]
    pub fn get(&self, id: QuantityId) -> Option<&Override> {
        self.entries.get(&id).map(|e| &e.value)
    }

    #[must_use]
    pub fn contains(&self, id: QuantityId) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over overrides in identity order.
    pub fn iter(&self) -> impl Iterator<Item = (&Quantity, &Override)> {
        self.entries.values().map(|e| (&e.quantity, &e.value))
    }

    /// Returns true if any quantity is swept.
    #[must_use]
    pub fn has_sweeps(&self) -> bool {
        self.entries
            .values()
            .any(|e| matches!(e.value, Override::Sweep(_)))
    }

    pub(crate) fn insert(&mut self, quantity: &Quantity, value: Override) {
        self.entries.insert(
            quantity.id(),
            Entry {
                quantity: quantity.clone(),
                value,
            },
        );
    }
}

fn positive(quantity: &Quantity, value: f64) -> Result<f64, SubstitutionError> {
    Positive::new(value)
        .map(Positive::into_inner)
        .map_err(|source| SubstitutionError::NonPositive {
            name: quantity.qualified_name(),
            value,
            source,
        })
}

fn conversion(quantity: &Quantity, unit: &str) -> Result<f64, SubstitutionError> {
    Unit::parse(unit)
        .and_then(|from| from.conversion_factor(&quantity.unit()))
        .map_err(|source| SubstitutionError::OverrideType {
            name: quantity.qualified_name(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use uom::si::{f64::Length, length::kilometer};

    use crate::quantity::{Declaration, Registry};

    #[test]
    fn conversions_on_insert() {
        let mut registry = Registry::new();
        let root = registry.root();
        let span = registry.declare(root, Declaration::new("b", "ft")).unwrap();

        let mut subs = Substitutions::new();
        subs.fix_in(&span, 3.048, "m").unwrap();
        assert!(matches!(subs.get(span.id()), Some(Override::Fixed(v)) if (v - 10.0).abs() < 1e-9));

        subs.fix_uom(&span, Length::new::<kilometer>(0.3048)).unwrap();
        let Some(Override::Fixed(v)) = subs.get(span.id()) else {
            panic!("expected a fixed value");
        };
        assert_relative_eq!(*v, 1000.0, epsilon = 1e-9);

        let err = subs.fix_in(&span, 1.0, "s").unwrap_err();
        assert!(matches!(err, SubstitutionError::OverrideType { .. }));
    }

    #[test]
    fn invalid_overrides() {
        let mut registry = Registry::new();
        let root = registry.root();
        let x = registry.declare(root, Declaration::new("x", "-")).unwrap();
        let v = registry
            .declare_vector(root, 3, Declaration::new("v", "-"))
            .unwrap();

        let mut subs = Substitutions::new();
        assert!(matches!(
            subs.fix(&x, -1.0),
            Err(SubstitutionError::NonPositive { .. })
        ));
        assert!(matches!(
            subs.sweep(&x, vec![]),
            Err(SubstitutionError::EmptySweep { .. })
        ));
        assert!(matches!(
            subs.fix_vector(&v, &[1.0, 2.0]),
            Err(SubstitutionError::VectorLength { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            subs.fix_vector(&v, &[1.0, 0.0, 2.0]),
            Err(SubstitutionError::NonPositive { .. })
        ));
        assert!(subs.is_empty());
    }

    #[test]
    fn later_overrides_win() {
        let mut registry = Registry::new();
        let root = registry.root();
        let x = registry.declare(root, Declaration::new("x", "-")).unwrap();

        let mut inner = Substitutions::new();
        inner.fix(&x, 1.0).unwrap();
        let mut outer = Substitutions::new();
        outer.sweep(&x, vec![2.0, 3.0]).unwrap();

        inner.extend(&outer);
        assert!(inner.has_sweeps());
        assert_eq!(inner.len(), 1);
    }
}
