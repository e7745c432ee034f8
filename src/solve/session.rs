use std::collections::BTreeSet;

use tracing::{debug, info, instrument, warn};

use crate::{
    constraint::{Normalized, Tightness},
    expr::Posynomial,
    quantity::{QuantityId, Values},
    substitution::apply_substitutions,
};

use super::{
    ConvexSolver, GeometricProgram, GpSolution, LocalSolveConfig, Program, Sensitivity, Solution,
    SolveError, SolverError, TightnessWarning,
};

/// Where a [`SolveSession`] is in the successive approximation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No operating point chosen yet.
    Initializing,
    /// Convexifying and solving about the current operating point.
    Converging,
    /// The operating point is a fixed point of the loop.
    Converged,
    /// The iteration budget ran out first.
    Diverged,
    /// A convex subproblem had no feasible point.
    Infeasible,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Diverged | Self::Infeasible)
    }
}

/// The solve of one fully resolved substitution point.
///
/// Each call to [`SolveSession::step`] performs one transition. Without
/// signomial constraints the session converges after a single convex solve.
#[derive(Debug)]
pub struct SolveSession<'a, S> {
    program: &'a Program,
    solver: &'a S,
    config: &'a LocalSolveConfig,
    fixed: Values,
    constraints: Vec<Normalized>,
    cost: Posynomial,
    variables: Vec<QuantityId>,
    signomial: BTreeSet<QuantityId>,
    state: SessionState,
    point: Values,
    iterations: usize,
    change: f64,
    latest: Option<Iterate>,
}

/// The result of the latest convex solve.
#[derive(Debug)]
struct Iterate {
    solution: GpSolution,
    /// Flattened constraint position of each backend constraint.
    origin: Vec<usize>,
}

impl<'a, S: ConvexSolver> SolveSession<'a, S> {
    /// Folds `fixed` into the program's constraints and classifies them.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Unsatisfiable`] if substitution leaves a
    /// constraint that no positive values can satisfy.
    pub fn new(
        program: &'a Program,
        fixed: Values,
        solver: &'a S,
        config: &'a LocalSolveConfig,
    ) -> Result<Self, SolveError> {
        let substituted = apply_substitutions(program.constraints(), &fixed)?;
        if let Some(i) = substituted
            .constraints
            .iter()
            .position(|c| *c == Normalized::Unsatisfiable)
        {
            return Err(SolveError::Unsatisfiable {
                constraint: program.constraints()[i].describe(),
            });
        }

        let cost = program.cost().substitute(&fixed);
        let mut variables: BTreeSet<_> = substituted.free.iter().map(|q| q.id()).collect();
        variables.extend(cost.quantities());

        let signomial = substituted
            .constraints
            .iter()
            .filter(|c| c.is_signomial())
            .flat_map(Normalized::quantities)
            .collect();

        Ok(Self {
            program,
            solver,
            config,
            fixed,
            constraints: substituted.constraints,
            cost,
            variables: variables.into_iter().collect(),
            signomial,
            state: SessionState::Initializing,
            point: Values::new(),
            iterations: 0,
            change: f64::INFINITY,
            latest: None,
        })
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the operating point over the free quantities.
    #[must_use]
    pub fn point(&self) -> &Values {
        &self.point
    }

    /// Returns the number of convex solves so far.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Returns true if some constraint is still signomial after substitution.
    #[must_use]
    pub fn is_signomial(&self) -> bool {
        self.constraints.iter().any(Normalized::is_signomial)
    }

    /// Performs one transition and returns the new state.
    ///
    /// Terminal states do not change.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Solver`] if the backend fails for a reason other
    /// than infeasibility.
    pub fn step(&mut self) -> Result<SessionState, SolveError> {
        match self.state {
            SessionState::Initializing => {
                self.point = self
                    .variables
                    .iter()
                    .map(|&id| (id, self.config.initial_value(id)))
                    .collect();
                self.state = SessionState::Converging;
            }
            SessionState::Converging => self.iterate()?,
            SessionState::Converged | SessionState::Diverged | SessionState::Infeasible => {}
        }
        Ok(self.state)
    }

    /// Steps until a terminal state and publishes the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Infeasible`] or [`SolveError::ConvergenceFailure`]
    /// for those terminal states, and any error raised by a step.
    #[instrument(skip_all, name = "local_solve", fields(variables = self.variables.len()))]
    pub fn run(mut self) -> Result<Solution, SolveError> {
        let mut state = self.state;
        while !state.is_terminal() {
            state = self.step()?;
        }

        match state {
            SessionState::Converged => self.publish(),
            SessionState::Infeasible => Err(SolveError::Infeasible {
                iteration: self.iterations,
            }),
            _ => {
                let mut last = self.fixed;
                last.extend(&self.point);
                Err(SolveError::ConvergenceFailure {
                    iterations: self.iterations,
                    change: self.change,
                    last,
                })
            }
        }
    }

    fn iterate(&mut self) -> Result<(), SolveError> {
        self.iterations += 1;

        let mut constraints = Vec::with_capacity(self.constraints.len());
        let mut origin = Vec::with_capacity(self.constraints.len());
        for (i, normalized) in self.constraints.iter().enumerate() {
            if let Some(gp) = normalized.convexify(&self.point)? {
                constraints.push(gp);
                origin.push(i);
            }
        }
        let program = GeometricProgram {
            cost: self.cost.clone(),
            constraints,
            variables: self.variables.clone(),
        };

        let solution = match self.solver.solve(&program) {
            Ok(solution) => solution,
            Err(SolverError::Infeasible) => {
                warn!(iteration = self.iterations, "convex subproblem is infeasible");
                self.state = SessionState::Infeasible;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.change = self.max_change(&solution.values);
        debug!(
            iteration = self.iterations,
            cost = solution.cost,
            change = self.change,
            "convex solve"
        );
        self.point = solution.values.clone();
        self.latest = Some(Iterate { solution, origin });

        if self.signomial.is_empty() || self.change < self.config.rel_tol {
            info!(iterations = self.iterations, "converged");
            self.state = SessionState::Converged;
        } else if self.iterations >= self.config.max_iters {
            warn!(
                iterations = self.iterations,
                change = self.change,
                "signomial loop did not converge"
            );
            self.state = SessionState::Diverged;
        }
        Ok(())
    }

    /// Largest relative change of a signomial quantity against the point.
    fn max_change(&self, next: &Values) -> f64 {
        self.signomial
            .iter()
            .filter_map(|&id| Some((self.point.get_id(id)?, next.get_id(id)?)))
            .map(|(old, new)| ((new - old) / old).abs())
            .fold(0.0, f64::max)
    }

    fn publish(self) -> Result<Solution, SolveError> {
        let Some(Iterate { solution, origin }) = self.latest else {
            return Err(SolveError::Infeasible { iteration: 0 });
        };

        let constraints = self.program.constraints();
        let sensitivities = origin
            .iter()
            .zip(&solution.duals)
            .map(|(&i, &value)| Sensitivity {
                constraint: i,
                label: constraints[i].describe(),
                value,
                approximate: self.constraints[i].is_signomial(),
            })
            .collect();

        let mut values = self.fixed;
        values.extend(&solution.values);

        let mut warnings = Vec::new();
        for (constraint, normalized) in constraints.iter().zip(&self.constraints) {
            let expected = constraint.tightness();
            if expected == Tightness::Unspecified {
                continue;
            }
            let Some(activity) = normalized.activity(&values)? else {
                continue;
            };
            let active = activity >= 1.0 - self.config.tightness_tol;
            let disagrees = match expected {
                Tightness::Tight => !active,
                Tightness::Loose => active,
                Tightness::Unspecified => false,
            };
            if disagrees {
                warn!(
                    constraint = %constraint.describe(),
                    ?expected,
                    activity,
                    "constraint activity disagrees with its tag"
                );
                warnings.push(TightnessWarning {
                    constraint: constraint.describe(),
                    expected,
                    activity,
                });
            }
        }

        Ok(Solution {
            values,
            cost: solution.cost,
            sensitivities,
            iterations: self.iterations,
            warnings,
        })
    }
}
