use crate::{
    constraint::Tightness,
    quantity::{Quantity, Values},
};

/// The sensitivity of the optimal cost to one constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Sensitivity {
    /// Position of the constraint in the flattened model.
    pub constraint: usize,

    /// The constraint's label, or its rendering if unlabeled.
    pub label: String,

    /// Change in log cost per unit relaxation of the log constraint.
    pub value: f64,

    /// True for signomial constraints, whose sensitivity is that of the
    /// convexified constraint solved last.
    pub approximate: bool,
}

/// A tagged constraint whose activity at the optimum disagrees with its tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TightnessWarning {
    pub constraint: String,
    pub expected: Tightness,

    /// `lesser / greater` at the optimum; one when active.
    pub activity: f64,
}

/// The converged optimum of one substitution point.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub(super) values: Values,
    pub(super) cost: f64,
    pub(super) sensitivities: Vec<Sensitivity>,
    pub(super) iterations: usize,
    pub(super) warnings: Vec<TightnessWarning>,
}

impl Solution {
    /// Returns the value of a quantity, fixed or free, in its declared unit.
    #[must_use]
    pub fn get(&self, quantity: &Quantity) -> Option<f64> {
        self.values.get(quantity)
    }

    /// Returns every value, fixed and free.
    #[must_use]
    pub fn values(&self) -> &Values {
        &self.values
    }

    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Returns one sensitivity per constraint that reached the backend.
    ///
    /// Constraints reduced to constants by substitution have none.
    #[must_use]
    pub fn sensitivities(&self) -> &[Sensitivity] {
        &self.sensitivities
    }

    /// Finds the sensitivity of a constraint by its flattened position.
    #[must_use]
    pub fn sensitivity(&self, constraint: usize) -> Option<&Sensitivity> {
        self.sensitivities.iter().find(|s| s.constraint == constraint)
    }

    /// Returns the number of convex solves; one without signomials.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub fn warnings(&self) -> &[TightnessWarning] {
        &self.warnings
    }
}
