use thiserror::Error;

use crate::{
    constraint::GpConstraint,
    expr::Posynomial,
    quantity::{QuantityId, Values},
};

/// A geometric program in standard form.
///
/// Minimize `cost` subject to every constraint, over strictly positive values
/// of `variables`. Every quantity referenced by the cost or a constraint is
/// listed in `variables`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometricProgram {
    pub cost: Posynomial,
    pub constraints: Vec<GpConstraint>,
    pub variables: Vec<QuantityId>,
}

/// The optimum of a [`GeometricProgram`].
#[derive(Debug, Clone, PartialEq)]
pub struct GpSolution {
    /// Optimal value of every variable.
    pub values: Values,

    /// Optimal cost.
    pub cost: f64,

    /// Sensitivity of the log cost to each constraint, in constraint order.
    ///
    /// For `p <= 1` this is the optimal dual of `log p <= 0`; for `m == 1`
    /// the dual of `log m == 0`.
    pub duals: Vec<f64>,
}

/// Failures reported by a [`ConvexSolver`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// No positive point satisfies every constraint.
    #[error("program is infeasible")]
    Infeasible,

    /// The cost decreases without bound.
    #[error("program is unbounded")]
    Unbounded,

    /// The backend failed for numerical reasons.
    #[error("solver failed: {message}")]
    Numerical { message: String },
}

/// An external convex backend for geometric programs.
///
/// Implementations are interchangeable: the solve loop only relies on this
/// accept/return contract.
pub trait ConvexSolver {
    /// Solves the program to global optimality.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::Infeasible`] if no point satisfies the
    /// constraints, or another [`SolverError`] if the solve fails.
    fn solve(&self, program: &GeometricProgram) -> Result<GpSolution, SolverError>;
}

impl<S: ConvexSolver + ?Sized> ConvexSolver for &S {
    fn solve(&self, program: &GeometricProgram) -> Result<GpSolution, SolverError> {
        (**self).solve(program)
    }
}
