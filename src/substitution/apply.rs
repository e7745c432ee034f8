use std::collections::BTreeMap;

use crate::{
    constraint::{Constraint, Normalized},
    quantity::{Quantity, Values},
};

use super::SubstitutionError;

/// Constraints with the fixed values of one point folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct Substituted {
    /// One normalized form per input constraint, in input order.
    pub constraints: Vec<Normalized>,
    /// Referenced quantities without a fixed value, in identity order.
    pub free: Vec<Quantity>,
}

/// Replaces every reference to a fixed quantity by its value.
///
/// Each constraint is normalized and classified after substitution, so a
/// signomial constraint whose subtracted terms are all fixed becomes a plain
/// posynomial inequality.
///
/// # Errors
///
/// Returns [`SubstitutionError::Expression`] if a constraint does not expand.
pub fn apply_substitutions(
    constraints: &[Constraint],
    fixed: &Values,
) -> Result<Substituted, SubstitutionError> {
    let mut referenced = BTreeMap::new();
    let normalized = constraints
        .iter()
        .map(|constraint| {
            referenced.extend(constraint.quantities());
            constraint.normalize(fixed)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Substituted {
        constraints: normalized,
        free: referenced
            .into_values()
            .filter(|q: &Quantity| !fixed.contains(q.id()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        constraint::ConstraintKind,
        quantity::{Declaration, Registry},
    };

    #[test]
    fn shared_quantity_is_replaced_everywhere() {
        let mut registry = Registry::new();
        let aircraft = registry.scope(registry.root(), "Aircraft");
        let wing = registry.scope(aircraft, "Wing");
        let v = registry.declare(aircraft, Declaration::new("V", "m/s")).unwrap();
        let v_min = registry.declare(aircraft, Declaration::new("V_min", "m/s")).unwrap();
        let v_stall = registry.declare(wing, Declaration::new("V_stall", "m/s")).unwrap();

        let constraints = [v.ge(&v_min), v.ge(&v_stall * 1.3)];
        let fixed = Values::new().with(&v, 50.0);
        let substituted = apply_substitutions(&constraints, &fixed).unwrap();

        assert_eq!(substituted.free, vec![v_min, v_stall]);
        for normalized in &substituted.constraints {
            assert_eq!(normalized.kind(), ConstraintKind::PosynomialInequality);
            assert!(!normalized.quantities().contains(&v.id()));
        }
    }
}
