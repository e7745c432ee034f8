//! Composition of sub-models into one tree.
//!
//! Every sub-model is a [`ModelNode`]: local constraints, child nodes, the
//! quantities it declares (its interface), and optional node-level
//! substitutions. Nodes are built with a [`ModelBuilder`], which threads the
//! [`Registry`] through construction so scopes mirror the tree:
//!
//! ```
//! use twine_gp::{
//!     expr::Expr,
//!     model::{ModelBuilder, ModelError},
//!     quantity::{Declaration, Registry},
//! };
//!
//! # fn main() -> Result<(), ModelError> {
//! let mut registry = Registry::new();
//! let mut aircraft = ModelBuilder::new(&mut registry, "Aircraft");
//! let w = aircraft.declare(Declaration::new("W", "lbf"))?;
//!
//! let wing_weight = aircraft.submodel("Wing", |wing| {
//!     let w_wing = wing.declare(Declaration::new("W", "lbf"))?;
//!     let span = wing.declare(Declaration::new("b", "ft").value(30.0))?;
//!     wing.constrain(w_wing.ge(&span * Expr::with_unit(2.0, "lbf/ft")?))?;
//!     Ok(w_wing)
//! })?;
//! aircraft.constrain(w.ge(&wing_weight))?;
//!
//! let model = aircraft.finish();
//! assert_eq!(model.var("b")?.qualified_name(), "Aircraft/Wing.b");
//! assert_eq!(model.flatten().constraints.len(), 2);
//! # Ok(())
//! # }
//! ```

mod builder;
mod flatten;
mod vectorize;

use thiserror::Error;

use crate::{
    constraint::Constraint,
    expr::ExprError,
    quantity::{ArityError, Quantity, RegistryError, VectorQuantity},
    substitution::{SubstitutionError, Substitutions},
    support::units::UnitError,
};

pub use builder::ModelBuilder;
pub use flatten::FlatModel;
pub use vectorize::Vectorized;

/// Structural errors raised while building a model tree.
///
/// These are model-authoring defects and are fatal for the whole model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Vectorization or a neighbor constraint with too few instances.
    #[error(transparent)]
    InvalidArity(#[from] ArityError),

    /// A constraint whose sides or terms have different dimensions.
    #[error("constraint `{constraint}` is not unit-consistent")]
    UnitMismatch {
        constraint: String,
        #[source]
        source: ExprError,
    },

    /// A constraint that does not expand into a signomial.
    #[error("constraint `{constraint}` is not a signomial")]
    Expression {
        constraint: String,
        #[source]
        source: ExprError,
    },

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    /// A name lookup on a built tree matched several quantities.
    #[error("`{name}` matches {count} quantities under `{node}`")]
    AmbiguousName {
        name: String,
        node: String,
        count: usize,
    },

    /// A name lookup on a built tree matched nothing.
    #[error("no quantity named `{name}` under `{node}`")]
    NotFound { name: String, node: String },

    /// A literal with an invalid unit string.
    #[error(transparent)]
    Unit(#[from] UnitError),
}

/// A quantity a node declares and exposes to others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declared {
    Scalar(Quantity),
    Vector(VectorQuantity),
}

impl Declared {
    /// Returns the local name of the declaration.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(q) => q.name(),
            Self::Vector(v) => v.name(),
        }
    }
}

/// A sub-model in the composition tree.
#[derive(Debug, Clone, Default)]
pub struct ModelNode {
    name: String,
    path: String,
    constraints: Vec<Constraint>,
    children: Vec<ModelNode>,
    interface: Vec<Declared>,
    substitutions: Substitutions,
}

impl ModelNode {
    /// Assembles a node from parts built elsewhere.
    ///
    /// Nodes built this way have no interface or substitutions of their own;
    /// quantities are still shared by identity with every other node.
    pub fn new(
        name: impl Into<String>,
        constraints: Vec<Constraint>,
        children: Vec<ModelNode>,
    ) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            constraints,
            children,
            ..Self::default()
        }
    }

    pub(crate) fn scoped(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the scope path, e.g. `Aircraft/Wing`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the constraints local to this node.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    #[must_use]
    pub fn children(&self) -> &[ModelNode] {
        &self.children
    }

    /// Returns the quantities this node declared.
    #[must_use]
    pub fn interface(&self) -> &[Declared] {
        &self.interface
    }

    /// Returns the node-level substitutions.
    #[must_use]
    pub fn substitutions(&self) -> &Substitutions {
        &self.substitutions
    }

    /// Finds a direct child by name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&ModelNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Finds a scalar this node declared itself.
    #[must_use]
    pub fn top_var(&self, name: &str) -> Option<&Quantity> {
        self.interface.iter().find_map(|d| match d {
            Declared::Scalar(q) if q.name() == name => Some(q),
            _ => None,
        })
    }

    /// Finds a scalar declared anywhere in this subtree.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if nothing matches, or
    /// [`ModelError::AmbiguousName`] if several quantities do.
    pub fn var(&self, name: &str) -> Result<Quantity, ModelError> {
        let mut found = Vec::new();
        self.visit(&mut |node| {
            found.extend(node.interface.iter().filter_map(|d| match d {
                Declared::Scalar(q) if q.name() == name => Some(q.clone()),
                _ => None,
            }));
        });
        self.single(name, found)
    }

    /// Finds a vector declared anywhere in this subtree.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFound`] if nothing matches, or
    /// [`ModelError::AmbiguousName`] if several vectors do.
    pub fn vector(&self, name: &str) -> Result<VectorQuantity, ModelError> {
        let mut found = Vec::new();
        self.visit(&mut |node| {
            found.extend(node.interface.iter().filter_map(|d| match d {
                Declared::Vector(v) if v.name() == name => Some(v.clone()),
                _ => None,
            }));
        });
        self.single(name, found)
    }

    fn single<T>(&self, name: &str, mut found: Vec<T>) -> Result<T, ModelError> {
        match found.len() {
            0 => Err(ModelError::NotFound {
                name: name.to_string(),
                node: self.path.clone(),
            }),
            1 => Ok(found.remove(0)),
            count => Err(ModelError::AmbiguousName {
                name: name.to_string(),
                node: self.path.clone(),
                count,
            }),
        }
    }

    /// Visits this node and its descendants depth-first, parents first.
    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a ModelNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}
