use tracing::{debug, instrument};
use twine_core::Model;

use crate::{
    constraint::Constraint,
    expr::{Expr, Posynomial},
    model::{FlatModel, ModelNode},
    quantity::Values,
    substitution::Substitutions,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{
    ConvexSolver, LocalSolveConfig, ProgramError, Solution, SolveError, SolveSession, SweepPoint,
    SweepResults,
};

/// A flattened model paired with a posynomial cost to minimize.
///
/// A program is read-only once built, so the points of a sweep can share it.
#[derive(Debug, Clone)]
pub struct Program {
    flat: FlatModel,
    cost: Posynomial,
}

impl Program {
    /// Flattens a model tree and attaches a cost.
    ///
    /// # Errors
    ///
    /// Returns [`ProgramError`] if a constraint or the cost does not expand,
    /// or if the cost has a negative term.
    pub fn new(model: &ModelNode, cost: impl Into<Expr>) -> Result<Self, ProgramError> {
        Self::from_flat(model.flatten(), cost)
    }

    /// Attaches a cost to an already flattened model.
    ///
    /// # Errors
    ///
    /// See [`Program::new`].
    pub fn from_flat(flat: FlatModel, cost: impl Into<Expr>) -> Result<Self, ProgramError> {
        for constraint in &flat.constraints {
            constraint
                .slack()
                .map_err(|source| ProgramError::Constraint {
                    constraint: constraint.describe(),
                    source,
                })?;
        }

        let cost = cost.into();
        let expanded = cost
            .dimension()
            .and_then(|_| cost.expand())
            .map_err(|source| ProgramError::Cost {
                cost: cost.to_string(),
                source,
            })?;
        let cost = Posynomial::from_signomial(&expanded)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ProgramError::NonPosynomialCost {
                cost: cost.to_string(),
            })?;

        Ok(Self { flat, cost })
    }

    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.flat.constraints
    }

    #[must_use]
    pub fn flat(&self) -> &FlatModel {
        &self.flat
    }

    #[must_use]
    pub fn cost(&self) -> &Posynomial {
        &self.cost
    }

    /// Returns the model's own substitutions overlaid with `subs`.
    #[must_use]
    pub fn substitutions(&self, subs: &Substitutions) -> Substitutions {
        let mut merged = self.flat.substitutions.clone();
        merged.extend(subs);
        merged
    }

    /// Solves every point of a sweep.
    ///
    /// `subs` overrides the model's declared defaults and node substitutions.
    /// A failed point is recorded in the results and does not stop the others.
    /// With the `parallel` feature, points are solved on the rayon pool.
    #[instrument(skip_all, name = "sweep")]
    pub fn solve<S>(
        &self,
        subs: &Substitutions,
        solver: &S,
        config: &LocalSolveConfig,
    ) -> SweepResults
    where
        S: ConvexSolver + Sync,
    {
        let merged = self.substitutions(subs);
        let points = merged.points();
        debug!(points = points.len(), "solving sweep");

        let point_solver = self.point_solver(solver, config);

        #[cfg(not(feature = "parallel"))]
        let iterator = points.iter();

        #[cfg(feature = "parallel")]
        let iterator = points.par_iter();

        let points = iterator
            .map(|point| SweepPoint {
                swept: point.swept().clone(),
                outcome: merged
                    .resolve(point)
                    .map_err(SolveError::from)
                    .and_then(|fixed| point_solver.call(&fixed)),
            })
            .collect();

        SweepResults::new(points)
    }

    /// Solves a program without sweeps.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::Substitution`] if a quantity is swept, or any
    /// failure of the point.
    pub fn solve_once<S: ConvexSolver>(
        &self,
        subs: &Substitutions,
        solver: &S,
        config: &LocalSolveConfig,
    ) -> Result<Solution, SolveError> {
        let merged = self.substitutions(subs);
        let point = merged.single_point()?;
        let fixed = merged.resolve(&point)?;
        self.point_solver(solver, config).call(&fixed)
    }

    /// Returns a [`Model`] that solves this program at given fixed values.
    #[must_use]
    pub fn point_solver<'a, S>(
        &'a self,
        solver: &'a S,
        config: &'a LocalSolveConfig,
    ) -> PointSolver<'a, S> {
        PointSolver {
            program: self,
            solver,
            config,
        }
    }
}

/// Model adapter solving one fully resolved point.
///
/// The input holds the value of every fixed quantity; all other quantities
/// referenced by the program are free.
#[derive(Debug, Clone, Copy)]
pub struct PointSolver<'a, S> {
    program: &'a Program,
    solver: &'a S,
    config: &'a LocalSolveConfig,
}

impl<S: ConvexSolver> Model for PointSolver<'_, S> {
    type Input = Values;
    type Output = Solution;
    type Error = SolveError;

    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
        SolveSession::new(self.program, input.clone(), self.solver, self.config)?.run()
    }
}
