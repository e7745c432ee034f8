use crate::{
    constraint::Constraint,
    expr::ExprError,
    quantity::{Declaration, Quantity, Registry, ScopeId, VectorQuantity},
    substitution::Substitutions,
};

use super::{Declared, ModelError, ModelNode};

/// Builds one [`ModelNode`] inside its own registry scope.
///
/// Names declared through the builder live in the node's scope; names
/// resolved through it are looked up in that scope and then in every
/// enclosing one.
#[derive(Debug)]
pub struct ModelBuilder<'r> {
    pub(super) registry: &'r mut Registry,
    pub(super) scope: ScopeId,
    pub(super) node: ModelNode,
}

impl<'r> ModelBuilder<'r> {
    /// Starts a top-level model in a new scope under the registry root.
    pub fn new(registry: &'r mut Registry, name: &str) -> Self {
        let root = registry.root();
        let scope = registry.scope(root, name);
        let node = ModelNode::scoped(name, registry.path(scope));
        Self {
            registry,
            scope,
            node,
        }
    }

    /// Returns the scope quantities are declared in.
    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &*self.registry
    }

    /// Declares a quantity and adds it to the node's interface.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Registry`] if the name is taken in this scope or
    /// the declaration is invalid.
    pub fn declare(&mut self, declaration: Declaration) -> Result<Quantity, ModelError> {
        let quantity = self.registry.declare(self.scope, declaration)?;
        self.node.interface.push(Declared::Scalar(quantity.clone()));
        Ok(quantity)
    }

    /// Declares `n` quantities sharing a name as one vector.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Registry`] if `n` is zero, the name is taken, or
    /// the declaration is invalid.
    pub fn declare_vector(
        &mut self,
        n: usize,
        declaration: Declaration,
    ) -> Result<VectorQuantity, ModelError> {
        let vector = self.registry.declare_vector(self.scope, n, declaration)?;
        self.node.interface.push(Declared::Vector(vector.clone()));
        Ok(vector)
    }

    /// Resolves a scalar visible from this scope.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Registry`] if no visible scope declares it.
    pub fn resolve(&self, name: &str) -> Result<Quantity, ModelError> {
        Ok(self.registry.resolve(self.scope, name)?)
    }

    /// Resolves a vector visible from this scope.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Registry`] if no visible scope declares it.
    pub fn resolve_vector(&self, name: &str) -> Result<VectorQuantity, ModelError> {
        Ok(self.registry.resolve_vector(self.scope, name)?)
    }

    /// Adds a constraint after checking its units and structure.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnitMismatch`] if the constraint is not
    /// dimensionally consistent, or [`ModelError::Expression`] if it does not
    /// expand into a signomial.
    pub fn constrain(&mut self, constraint: Constraint) -> Result<(), ModelError> {
        match constraint.slack() {
            Ok(_) => {
                self.node.constraints.push(constraint);
                Ok(())
            }
            Err(source @ ExprError::UnitMismatch { .. }) => Err(ModelError::UnitMismatch {
                constraint: constraint.describe(),
                source,
            }),
            Err(source) => Err(ModelError::Expression {
                constraint: constraint.describe(),
                source,
            }),
        }
    }

    /// Adds several constraints.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`ModelBuilder::constrain`].
    pub fn constrain_all(
        &mut self,
        constraints: impl IntoIterator<Item = Constraint>,
    ) -> Result<(), ModelError> {
        constraints.into_iter().try_for_each(|c| self.constrain(c))
    }

    /// Returns this node's substitutions.
    ///
    /// On flattening, a node's substitutions override those of its
    /// descendants.
    pub fn substitutions(&mut self) -> &mut Substitutions {
        &mut self.node.substitutions
    }

    /// Fixes a quantity at this node.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Substitution`] unless `value > 0`.
    pub fn fix(&mut self, quantity: &Quantity, value: f64) -> Result<(), ModelError> {
        Ok(self.node.substitutions.fix(quantity, value)?)
    }

    /// Builds a child model in a new scope.
    ///
    /// Quantities declared by this node and its ancestors are visible to the
    /// child by name and shared by identity.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `build`.
    pub fn submodel<R, F>(&mut self, name: &str, build: F) -> Result<R, ModelError>
    where
        F: FnOnce(&mut ModelBuilder<'_>) -> Result<R, ModelError>,
    {
        let scope = self.registry.scope(self.scope, name);
        let mut child = ModelBuilder {
            node: ModelNode::scoped(name, self.registry.path(scope)),
            registry: &mut *self.registry,
            scope,
        };
        let output = build(&mut child)?;
        self.node.children.push(child.node);
        Ok(output)
    }

    /// Adds a node built elsewhere as a child.
    pub fn attach(&mut self, node: ModelNode) {
        self.node.children.push(node);
    }

    /// Returns the finished node.
    #[must_use]
    pub fn finish(self) -> ModelNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{expr::Expr, quantity::RegistryError};

    #[test]
    fn child_sees_parent_quantities() {
        let mut registry = Registry::new();
        let mut aircraft = ModelBuilder::new(&mut registry, "Aircraft");
        let v = aircraft.declare(Declaration::new("V", "m/s")).unwrap();

        let seen = aircraft
            .submodel("Wing", |wing| {
                let v = wing.resolve("V")?;
                let v_stall = wing.declare(Declaration::new("V_stall", "m/s"))?;
                wing.constrain(v.ge(&v_stall * 1.3))?;
                Ok(v)
            })
            .unwrap();
        assert_eq!(seen, v);

        let node = aircraft.finish();
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.child("Wing").unwrap().path(), "Aircraft/Wing");
        assert!(node.top_var("V").is_some());
        assert!(node.top_var("V_stall").is_none());
        assert_eq!(node.var("V_stall").unwrap().qualified_name(), "Aircraft/Wing.V_stall");
    }

    #[test]
    fn parent_cannot_see_child_quantities() {
        let mut registry = Registry::new();
        let mut aircraft = ModelBuilder::new(&mut registry, "Aircraft");
        aircraft
            .submodel("Wing", |wing| {
                wing.declare(Declaration::new("S", "m^2"))?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(
            aircraft.resolve("S"),
            Err(ModelError::Registry(RegistryError::UnknownQuantity { .. }))
        ));
    }

    #[test]
    fn unit_mismatch_is_fatal() {
        let mut registry = Registry::new();
        let mut model = ModelBuilder::new(&mut registry, "M");
        let w = model.declare(Declaration::new("W", "lbf")).unwrap();
        let s = model.declare(Declaration::new("S", "ft^2")).unwrap();
        let t = model.declare(Declaration::new("T", "lbf")).unwrap();

        let err = model.constrain(w.ge(&s).labeled("bad")).unwrap_err();
        assert!(matches!(err, ModelError::UnitMismatch { constraint, .. } if constraint == "bad"));

        let err = model.constrain((&w + &t).pow(0.5).ge(w.pow(0.5))).unwrap_err();
        assert!(matches!(err, ModelError::Expression { .. }));

        let x = model.declare(Declaration::new("x", "-")).unwrap();
        let err = model.constrain(x.ge(Expr::literal(-4.0).pow(0.5))).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Expression { source: ExprError::NotSignomial { .. }, .. }
        ));
        assert!(model.finish().constraints().is_empty());
    }

    #[test]
    fn sibling_submodels_get_distinct_scopes() {
        let mut registry = Registry::new();
        let mut aircraft = ModelBuilder::new(&mut registry, "Aircraft");
        let a = aircraft
            .submodel("Engine", |e| e.declare(Declaration::new("W", "lbf")))
            .unwrap();
        let b = aircraft
            .submodel("Engine", |e| e.declare(Declaration::new("W", "lbf")))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(b.qualified_name(), "Aircraft/Engine#1.W");

        let node = aircraft.finish();
        assert!(matches!(
            node.var("W"),
            Err(ModelError::AmbiguousName { count: 2, .. })
        ));
    }
}
