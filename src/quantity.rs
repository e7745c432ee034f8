//! Named physical quantities.
//!
//! A [`Quantity`] is a cheap, shareable handle issued by a [`Registry`].
//! Handles compare and hash by identity, so a quantity referenced from several
//! sub-models is the same quantity everywhere, never a copy.

mod registry;
mod values;
mod vector;

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::support::units::Unit;

pub use registry::{Registry, RegistryError, ScopeId};
pub use values::Values;
pub use vector::{ArityError, VectorQuantity};

/// Globally unique identity of a quantity within its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantityId(usize);

impl QuantityId {
    /// Returns the position of this quantity in declaration order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for QuantityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// What a model author writes to introduce a quantity.
///
/// ```
/// use twine_gp::quantity::Declaration;
///
/// let wing_weight = Declaration::new("W", "lbf").describe("wing weight");
/// let margin = Declaration::new("m_fac", "-").value(1.2).describe("weight margin");
/// # let _ = (wing_weight, margin);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub(crate) name: String,
    pub(crate) unit: String,
    pub(crate) default: Option<f64>,
    pub(crate) description: Option<String>,
}

impl Declaration {
    /// Declares a free quantity with a name and unit string.
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            default: None,
            description: None,
        }
    }

    /// Gives the quantity a default value, in its declared unit.
    ///
    /// A quantity with a default is treated as fixed unless overridden.
    #[must_use]
    pub fn value(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    /// Attaches a human-readable description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug)]
struct QuantityInfo {
    name: String,
    scope_path: String,
    unit: Unit,
    unit_label: String,
    default: Option<f64>,
    description: Option<String>,
    index: Option<usize>,
}

/// A handle to a declared quantity.
#[derive(Clone)]
pub struct Quantity {
    id: QuantityId,
    info: Arc<QuantityInfo>,
}

impl Quantity {
    /// Returns the identity of this quantity.
    #[must_use]
    pub fn id(&self) -> QuantityId {
        self.id
    }

    /// Returns the local name the quantity was declared with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Returns the path of the scope the quantity was declared in.
    #[must_use]
    pub fn scope_path(&self) -> &str {
        &self.info.scope_path
    }

    /// Returns the declared unit.
    #[must_use]
    pub fn unit(&self) -> Unit {
        self.info.unit
    }

    /// Returns the unit string the quantity was declared with.
    #[must_use]
    pub fn unit_label(&self) -> &str {
        &self.info.unit_label
    }

    /// Returns the declared default value, in the declared unit.
    #[must_use]
    pub fn default_value(&self) -> Option<f64> {
        self.info.default
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.info.description.as_deref()
    }

    /// Returns the element index if this quantity belongs to a vector.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.info.index
    }

    /// Returns the fully qualified name, e.g. `Aircraft/Wing.W` or `Mission.V[2]`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        let mut name = if self.info.scope_path.is_empty() {
            self.info.name.clone()
        } else {
            format!("{}.{}", self.info.scope_path, self.info.name)
        };
        if let Some(i) = self.info.index {
            name.push_str(&format!("[{i}]"));
        }
        name
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Quantity {}

impl Hash for Quantity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] ({})", self.qualified_name(), self.info.unit_label, self.id)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}
