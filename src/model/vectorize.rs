use crate::quantity::{ArityError, VectorQuantity};

use super::{Declared, ModelBuilder, ModelError, ModelNode};

/// The result of [`ModelBuilder::vectorize`].
///
/// Every scalar declared by all instances becomes a [`VectorQuantity`] with
/// one element per instance, in instance order.
#[derive(Debug, Clone)]
pub struct Vectorized<R> {
    name: String,
    vectors: Vec<VectorQuantity>,
    outputs: Vec<R>,
}

impl<R> Vectorized<R> {
    /// Returns the name of the vectorized sub-model.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Always false: vectorization needs at least one instance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Returns the vector gathered from a name declared in every instance.
    #[must_use]
    pub fn vector(&self, name: &str) -> Option<&VectorQuantity> {
        self.vectors.iter().find(|v| v.name() == name)
    }

    #[must_use]
    pub fn vectors(&self) -> &[VectorQuantity] {
        &self.vectors
    }

    /// Returns what each call of the build function returned.
    #[must_use]
    pub fn outputs(&self) -> &[R] {
        &self.outputs
    }

    #[must_use]
    pub fn into_outputs(self) -> Vec<R> {
        self.outputs
    }
}

impl ModelBuilder<'_> {
    /// Instantiates a sub-model `n` times.
    ///
    /// `build` runs once per index in an isolated scope, so every instance
    /// declares its own quantities; the i-th instance of `W` under
    /// `Mission/Segment` is named `Mission/Segment.W[i]`. Constraints written
    /// inside `build` apply to that instance only. Constraints relating
    /// neighboring instances belong outside, written against the returned
    /// vectors:
    ///
    /// ```
    /// use twine_gp::{model::ModelBuilder, quantity::{Declaration, Registry}};
    ///
    /// let mut registry = Registry::new();
    /// let mut mission = ModelBuilder::new(&mut registry, "Mission");
    /// let segments = mission
    ///     .vectorize(4, "Segment", |segment, _i| {
    ///         let w_start = segment.declare(Declaration::new("W_start", "lbf"))?;
    ///         let w_end = segment.declare(Declaration::new("W_end", "lbf"))?;
    ///         segment.constrain(w_start.ge(&w_end))
    ///     })
    ///     .unwrap();
    ///
    /// let w_start = segments.vector("W_start").unwrap();
    /// let w_end = segments.vector("W_end").unwrap();
    /// assert_eq!(w_start[2].qualified_name(), "Mission/Segment.W_start[2]");
    ///
    /// // Fuel left at the end of a segment starts the next one.
    /// let handoff = w_end.head().iter().zip(w_start.tail()).map(|(e, s)| e.ge(s));
    /// mission.constrain_all(handoff).unwrap();
    /// assert_eq!(mission.finish().flatten().constraints.len(), 7);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidArity`] if `n` is zero, or any error
    /// raised by `build`.
    pub fn vectorize<R, F>(
        &mut self,
        n: usize,
        name: &str,
        mut build: F,
    ) -> Result<Vectorized<R>, ModelError>
    where
        F: FnMut(&mut ModelBuilder<'_>, usize) -> Result<R, ModelError>,
    {
        ArityError::check("vectorize", 1, n)?;

        let container_scope = self.registry.scope(self.scope, name);
        let path = self.registry.path(container_scope).to_string();
        let mut container = ModelNode::scoped(name, &path);

        let mut outputs = Vec::with_capacity(n);
        for i in 0..n {
            let scope = self.registry.indexed_scope(container_scope, i);
            let mut instance = ModelBuilder {
                registry: &mut *self.registry,
                scope,
                node: ModelNode::scoped(&format!("{name}[{i}]"), &path),
            };
            outputs.push(build(&mut instance, i)?);
            container.children.push(instance.node);
        }

        let vectors = gather(&container.children)?;
        container
            .interface
            .extend(vectors.iter().cloned().map(Declared::Vector));
        self.node.children.push(container);

        Ok(Vectorized {
            name: name.to_string(),
            vectors,
            outputs,
        })
    }
}

/// Groups the scalars every instance declared under the same name.
fn gather(instances: &[ModelNode]) -> Result<Vec<VectorQuantity>, ArityError> {
    let Some(first) = instances.first() else {
        return Ok(Vec::new());
    };
    first
        .interface
        .iter()
        .filter_map(|declared| match declared {
            Declared::Scalar(q) => Some(q.name()),
            Declared::Vector(_) => None,
        })
        .filter_map(|name| {
            instances
                .iter()
                .map(|node| node.top_var(name).cloned())
                .collect::<Option<Vec<_>>>()
                .map(|elements| VectorQuantity::new(name, elements))
        })
        .collect()
}
