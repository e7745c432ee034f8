//! Successive approximation of signomial programs.
//!
//! A [`Program`] pairs a flattened model with a posynomial cost. Each
//! substitution point is solved by a [`SolveSession`], an explicit state
//! machine:
//!
//! ```text
//! Initializing -> Converging -> Converged | Diverged | Infeasible
//! ```
//!
//! While converging, every signomial constraint is convexified about the
//! current operating point and the resulting geometric program is handed to a
//! [`ConvexSolver`]. The new optimum becomes the next operating point until no
//! quantity in a signomial constraint moves by more than
//! [`LocalSolveConfig::rel_tol`]. Programs without signomial constraints take
//! exactly one convex solve.
//!
//! Sweeps solve every point independently. A point that is infeasible or
//! fails to converge is reported in its [`SweepPoint`] and never aborts the
//! rest of the sweep.

mod backend;
mod config;
mod error;
mod program;
mod session;
mod solution;
mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{ConvexSolver, GeometricProgram, GpSolution, SolverError};
pub use config::LocalSolveConfig;
pub use error::{ProgramError, SolveError};
pub use program::{PointSolver, Program};
pub use session::{SessionState, SolveSession};
pub use solution::{Sensitivity, Solution, TightnessWarning};
pub use sweep::{SweepPoint, SweepResults};
