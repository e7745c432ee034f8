use crate::quantity::{QuantityId, Values};

/// Configuration for the successive approximation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSolveConfig {
    /// Maximum number of convex solves per point.
    pub max_iters: usize,

    /// Convergence threshold on the largest relative change, between two
    /// iterates, of any quantity referenced by a signomial constraint.
    pub rel_tol: f64,

    /// Margin for reporting tagged constraints whose activity disagrees with
    /// their tag.
    ///
    /// A tight constraint is reported when `lesser / greater < 1 - tol`, and a
    /// loose constraint when `lesser / greater >= 1 - tol`.
    pub tightness_tol: f64,

    /// Starting operating point.
    ///
    /// Free quantities without a positive guess start at one in their
    /// declared unit.
    pub initial_guess: Option<Values>,
}

impl Default for LocalSolveConfig {
    fn default() -> Self {
        Self {
            max_iters: 50,
            rel_tol: 1e-3,
            tightness_tol: 1e-3,
            initial_guess: None,
        }
    }
}

impl LocalSolveConfig {
    /// Returns the starting value of a free quantity.
    pub(super) fn initial_value(&self, quantity: QuantityId) -> f64 {
        self.initial_guess
            .as_ref()
            .and_then(|guess| guess.get_id(quantity))
            .filter(|value| *value > 0.0)
            .unwrap_or(1.0)
    }
}
