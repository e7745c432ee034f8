use thiserror::Error;

use crate::{expr::ExprError, quantity::Values, substitution::SubstitutionError};

use super::SolverError;

/// Structural errors in a program, fatal for every point of a sweep.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    /// The cost expands into a signomial with negative terms, or into zero.
    #[error("cost `{cost}` is not a posynomial")]
    NonPosynomialCost { cost: String },

    /// The cost is not unit-consistent or does not expand.
    #[error("cost `{cost}` is invalid")]
    Cost {
        cost: String,
        #[source]
        source: ExprError,
    },

    /// A constraint is not unit-consistent or does not expand.
    #[error("constraint `{constraint}` is invalid")]
    Constraint {
        constraint: String,
        #[source]
        source: ExprError,
    },
}

/// Failures of a single solve point.
///
/// Within a sweep these are recorded per point and never abort the sweep.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    /// The point's substitutions could not be resolved.
    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    /// A constraint fails for every positive value of its free quantities.
    #[error("constraint `{constraint}` cannot be satisfied")]
    Unsatisfiable { constraint: String },

    /// The backend found a convex subproblem infeasible.
    #[error("infeasible at iteration {iteration}")]
    Infeasible { iteration: usize },

    /// The signomial loop ran out of iterations.
    #[error("no convergence after {iterations} iterations: relative change {change:e}")]
    ConvergenceFailure {
        iterations: usize,

        /// Largest relative change in the final iteration.
        change: f64,

        /// The last iterate, including fixed values.
        last: Values,
    },

    /// The backend failed for a reason other than infeasibility.
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Expression(#[from] ExprError),
}
