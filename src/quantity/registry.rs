use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::support::{
    positive::{Positive, PositiveError},
    units::{Unit, UnitError},
};

use super::{ArityError, Declaration, Quantity, QuantityId, QuantityInfo, VectorQuantity};

/// Errors raised while declaring or resolving quantities.
///
/// These are model-authoring defects and are fatal for the whole model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Two declarations in the same scope share a name.
    #[error("`{name}` is already declared in scope `{scope}`")]
    NameCollision { name: String, scope: String },

    /// No declaration is visible under this name.
    #[error("no quantity named `{name}` is visible from scope `{scope}`")]
    UnknownQuantity { name: String, scope: String },

    /// A scalar was requested but the name refers to a vector.
    #[error("`{name}` in scope `{scope}` is a vector quantity")]
    NotScalar { name: String, scope: String },

    /// A vector was requested but the name refers to a scalar.
    #[error("`{name}` in scope `{scope}` is a scalar quantity")]
    NotVector { name: String, scope: String },

    /// The declared unit string is invalid.
    #[error("invalid unit for `{name}`")]
    Unit {
        name: String,
        #[source]
        source: UnitError,
    },

    /// The declared default value is not strictly positive.
    #[error("default value of `{name}` must be positive")]
    NonPositiveDefault {
        name: String,
        #[source]
        source: PositiveError,
    },

    /// A vector declaration with too few elements.
    #[error(transparent)]
    Arity(#[from] ArityError),
}

/// Handle to a scope in a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone)]
enum Symbol {
    Scalar(Quantity),
    Vector(VectorQuantity),
}

#[derive(Debug)]
struct Scope {
    path: String,
    parent: Option<ScopeId>,
    index: Option<usize>,
    symbols: HashMap<String, Symbol>,
    child_names: HashMap<String, usize>,
}

/// Issues quantity identities and resolves names through a tree of scopes.
///
/// Scopes mirror the model tree. Resolution starts in the given scope and walks
/// up through its ancestors, so a sub-model can reference a quantity its parent
/// declared without re-declaring it.
///
/// ```
/// use twine_gp::quantity::{Declaration, Registry};
///
/// let mut registry = Registry::new();
/// let aircraft = registry.scope(registry.root(), "Aircraft");
/// let wing = registry.scope(aircraft, "Wing");
///
/// let w_aircraft = registry.declare(aircraft, Declaration::new("W", "lbf")).unwrap();
/// let w_wing = registry.declare(wing, Declaration::new("W", "lbf")).unwrap();
/// assert_ne!(w_aircraft, w_wing);
///
/// let v = registry.declare(aircraft, Declaration::new("V", "m/s")).unwrap();
/// assert_eq!(registry.resolve(wing, "V").unwrap(), v);
/// assert_eq!(registry.resolve(wing, "W").unwrap(), w_wing);
/// ```
#[derive(Debug)]
pub struct Registry {
    scopes: Vec<Scope>,
    quantities: Vec<Quantity>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry containing only the root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                path: String::new(),
                parent: None,
                index: None,
                symbols: HashMap::new(),
                child_names: HashMap::new(),
            }],
            quantities: Vec::new(),
        }
    }

    /// Returns the root scope.
    #[must_use]
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Opens a new child scope.
    ///
    /// Sibling scopes with the same name get distinct paths (`Wing`, `Wing#1`, ...),
    /// so instantiating a sub-model twice never collides.
    pub fn scope(&mut self, parent: ScopeId, name: &str) -> ScopeId {
        let count = self.scopes[parent.0]
            .child_names
            .entry(name.to_string())
            .or_insert(0);
        let local = if *count == 0 {
            name.to_string()
        } else {
            format!("{name}#{count}")
        };
        *count += 1;

        let parent_path = &self.scopes[parent.0].path;
        let path = if parent_path.is_empty() {
            local
        } else {
            format!("{parent_path}/{local}")
        };

        self.scopes.push(Scope {
            path,
            parent: Some(parent),
            index: None,
            symbols: HashMap::new(),
            child_names: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Opens the scope of one vectorized instance.
    ///
    /// The scope shares its parent's path, and every scalar declared in it is
    /// tagged with `index`, so the i-th instance of `W` in `Mission/Segment`
    /// reads as `Mission/Segment.W[i]`. Names declared in different instances
    /// never collide.
    pub fn indexed_scope(&mut self, parent: ScopeId, index: usize) -> ScopeId {
        let path = self.scopes[parent.0].path.clone();
        self.scopes.push(Scope {
            path,
            parent: Some(parent),
            index: Some(index),
            symbols: HashMap::new(),
            child_names: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Returns the path of a scope, e.g. `Aircraft/Wing`.
    #[must_use]
    pub fn path(&self, scope: ScopeId) -> &str {
        &self.scopes[scope.0].path
    }

    /// Returns the parent of a scope, or `None` for the root.
    #[must_use]
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Declares a scalar quantity in a scope.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NameCollision`] if the scope already declares the
    /// name, or an error if the unit or default value is invalid.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        declaration: Declaration,
    ) -> Result<Quantity, RegistryError> {
        self.check_available(scope, &declaration.name)?;
        let quantity = self.issue(scope, &declaration, None)?;
        self.scopes[scope.0].symbols.insert(
            declaration.name.clone(),
            Symbol::Scalar(quantity.clone()),
        );
        Ok(quantity)
    }

    /// Declares `n` quantities sharing a name and unit as one vector.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Arity`] if `n` is zero, plus the errors of
    /// [`Registry::declare`].
    pub fn declare_vector(
        &mut self,
        scope: ScopeId,
        n: usize,
        declaration: Declaration,
    ) -> Result<VectorQuantity, RegistryError> {
        ArityError::check("vector declaration", 1, n)?;
        self.check_available(scope, &declaration.name)?;

        let elements = (0..n)
            .map(|i| self.issue(scope, &declaration, Some(i)))
            .collect::<Result<Vec<_>, _>>()?;
        let vector = VectorQuantity::new(declaration.name.clone(), elements)?;

        self.scopes[scope.0]
            .symbols
            .insert(declaration.name, Symbol::Vector(vector.clone()));
        Ok(vector)
    }

    /// Resolves a scalar quantity by name, walking up through parent scopes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownQuantity`] if no visible scope declares
    /// the name, or [`RegistryError::NotScalar`] if it names a vector.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Result<Quantity, RegistryError> {
        match self.lookup(scope, name)? {
            Symbol::Scalar(quantity) => Ok(quantity.clone()),
            Symbol::Vector(_) => Err(RegistryError::NotScalar {
                name: name.to_string(),
                scope: self.path(scope).to_string(),
            }),
        }
    }

    /// Resolves a vector quantity by name, walking up through parent scopes.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownQuantity`] if no visible scope declares
    /// the name, or [`RegistryError::NotVector`] if it names a scalar.
    pub fn resolve_vector(
        &self,
        scope: ScopeId,
        name: &str,
    ) -> Result<VectorQuantity, RegistryError> {
        match self.lookup(scope, name)? {
            Symbol::Vector(vector) => Ok(vector.clone()),
            Symbol::Scalar(_) => Err(RegistryError::NotVector {
                name: name.to_string(),
                scope: self.path(scope).to_string(),
            }),
        }
    }

    /// Returns a quantity by identity.
    #[must_use]
    pub fn quantity(&self, id: QuantityId) -> Option<&Quantity> {
        self.quantities.get(id.0)
    }

    /// Iterates over every declared quantity in declaration order.
    pub fn quantities(&self) -> impl Iterator<Item = &Quantity> {
        self.quantities.iter()
    }

    fn lookup(&self, scope: ScopeId, name: &str) -> Result<&Symbol, RegistryError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(symbol) = scope.symbols.get(name) {
                return Ok(symbol);
            }
            current = scope.parent;
        }
        Err(RegistryError::UnknownQuantity {
            name: name.to_string(),
            scope: self.path(scope).to_string(),
        })
    }

    fn check_available(&self, scope: ScopeId, name: &str) -> Result<(), RegistryError> {
        if self.scopes[scope.0].symbols.contains_key(name) {
            return Err(RegistryError::NameCollision {
                name: name.to_string(),
                scope: self.path(scope).to_string(),
            });
        }
        Ok(())
    }

    fn issue(
        &mut self,
        scope: ScopeId,
        declaration: &Declaration,
        index: Option<usize>,
    ) -> Result<Quantity, RegistryError> {
        let unit = Unit::parse(&declaration.unit).map_err(|source| RegistryError::Unit {
            name: declaration.name.clone(),
            source,
        })?;

        let default = declaration
            .default
            .map(|value| {
                Positive::new(value).map_err(|source| RegistryError::NonPositiveDefault {
                    name: declaration.name.clone(),
                    source,
                })
            })
            .transpose()?
            .map(Positive::into_inner);

        let quantity = Quantity {
            id: QuantityId(self.quantities.len()),
            info: Arc::new(QuantityInfo {
                name: declaration.name.clone(),
                scope_path: self.path(scope).to_string(),
                unit,
                unit_label: declaration.unit.clone(),
                default,
                description: declaration.description.clone(),
                index: index.or(self.scopes[scope.0].index),
            }),
        };
        self.quantities.push(quantity.clone());
        Ok(quantity)
    }
}
