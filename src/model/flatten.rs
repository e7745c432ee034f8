use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    constraint::Constraint,
    quantity::{Quantity, QuantityId},
    substitution::{Override, Substitutions},
};

use super::{Declared, ModelNode};

/// A model tree reduced to one constraint list.
#[derive(Debug, Clone, Default)]
pub struct FlatModel {
    /// Every constraint in the tree, depth-first with parents before children.
    pub constraints: Vec<Constraint>,
    /// Every quantity referenced or declared in the tree, once each.
    pub quantities: BTreeMap<QuantityId, Quantity>,
    /// Declared defaults, overlaid by node substitutions with ancestors
    /// taking precedence over descendants.
    pub substitutions: Substitutions,
}

impl ModelNode {
    /// Collects every constraint in the tree.
    ///
    /// Quantities keep their identity: a quantity shared by several nodes
    /// appears once in [`FlatModel::quantities`], however many constraints
    /// reference it.
    #[must_use]
    pub fn flatten(&self) -> FlatModel {
        let mut flat = FlatModel::default();
        self.collect(&mut flat);

        for quantity in flat.quantities.values() {
            if let Some(value) = quantity.default_value() {
                flat.substitutions.insert(quantity, Override::Fixed(value));
            }
        }
        flat.substitutions.extend(&self.merged_substitutions());
        debug!(
            model = %self.path,
            constraints = flat.constraints.len(),
            quantities = flat.quantities.len(),
            "flattened model"
        );
        flat
    }

    fn collect(&self, flat: &mut FlatModel) {
        for constraint in &self.constraints {
            flat.quantities.extend(constraint.quantities());
            flat.constraints.push(constraint.clone());
        }
        for declared in &self.interface {
            let declared: &[Quantity] = match declared {
                Declared::Scalar(q) => std::slice::from_ref(q),
                Declared::Vector(v) => v.as_slice(),
            };
            for q in declared {
                flat.quantities.entry(q.id()).or_insert_with(|| q.clone());
            }
        }
        for child in &self.children {
            child.collect(flat);
        }
    }

    fn merged_substitutions(&self) -> Substitutions {
        let mut merged = Substitutions::new();
        for child in &self.children {
            merged.extend(&child.merged_substitutions());
        }
        merged.extend(&self.substitutions);
        merged
    }
}
