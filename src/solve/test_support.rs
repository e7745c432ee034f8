//! A dense log-barrier backend for tests.
//!
//! The program is solved in log space, where every posynomial constraint
//! becomes a convex log-sum-exp function and every monomial equality a linear
//! equation. Equalities are eliminated through a null-space basis; a phase I
//! problem finds a strictly feasible start.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector, SymmetricEigen};

use crate::{
    constraint::GpConstraint,
    expr::{Monomial, Posynomial},
    quantity::QuantityId,
};

use super::{ConvexSolver, GeometricProgram, GpSolution, SolverError};

const GAP_TOL: f64 = 1e-10;
const NEWTON_TOL: f64 = 1e-12;
const MAX_NEWTON: usize = 200;
const BARRIER_GROWTH: f64 = 20.0;
const ARMIJO: f64 = 0.25;
const BACKTRACK: f64 = 0.5;
const RANK_TOL: f64 = 1e-10;
const UNBOUNDED_LOG_COST: f64 = -300.0;
const PHASE_ONE_RADIUS: f64 = 60.0;

/// Log-barrier interior point method on the log-transformed program.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BarrierSolver;

impl ConvexSolver for BarrierSolver {
    fn solve(&self, program: &GeometricProgram) -> Result<GpSolution, SolverError> {
        let index: HashMap<QuantityId, usize> = program
            .variables
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        let n = index.len();

        let cost = LogSumExp::from_posynomial(&program.cost, &index)?;

        let mut inequalities = Vec::new();
        let mut eq_rows = Vec::new();
        let mut eq_rhs = Vec::new();
        for constraint in &program.constraints {
            match constraint {
                GpConstraint::Inequality(p) => {
                    inequalities.push(LogSumExp::from_posynomial(p, &index)?);
                }
                GpConstraint::Equality(m) => {
                    let (row, offset) = log_linear(m, &index)?;
                    eq_rows.push(row);
                    eq_rhs.push(-offset);
                }
            }
        }

        if n == 0 {
            let cost = cost.offsets.iter().map(|b| b.exp()).sum();
            return Ok(GpSolution {
                values: Default::default(),
                cost,
                duals: vec![0.0; program.constraints.len()],
            });
        }

        let (y_p, basis) = eliminate(&eq_rows, &eq_rhs, n)?;

        let reduced_cost = cost.restrict(&y_p, &basis);
        let reduced: Vec<_> = inequalities
            .iter()
            .map(|f| f.restrict(&y_p, &basis))
            .collect();

        let (y, lambdas) = if basis.ncols() == 0 {
            if reduced.iter().any(|f| f.constant() > 1e-9) {
                return Err(SolverError::Infeasible);
            }
            (y_p.clone(), vec![0.0; reduced.len()])
        } else {
            let start = phase_one(&reduced, basis.ncols())?;
            let (z, t) = barrier(&reduced_cost, &reduced, start, |_| false)?;
            if reduced_cost.eval(&z) < UNBOUNDED_LOG_COST {
                return Err(SolverError::Unbounded);
            }
            let lambdas = reduced
                .iter()
                .map(|f| 1.0 / (t * -f.eval(&z)))
                .collect::<Vec<_>>();
            (&y_p + &basis * z, lambdas)
        };

        let nus = equality_duals(&cost, &inequalities, &lambdas, &eq_rows, &y)?;

        let mut lambdas = lambdas.into_iter();
        let mut nus = nus.into_iter();
        let duals = program
            .constraints
            .iter()
            .map(|c| match c {
                GpConstraint::Inequality(_) => lambdas.next().unwrap_or(0.0),
                GpConstraint::Equality(_) => nus.next().unwrap_or(0.0),
            })
            .collect();

        Ok(GpSolution {
            values: program
                .variables
                .iter()
                .enumerate()
                .map(|(i, id)| (*id, y[i].exp()))
                .collect(),
            cost: cost.eval(&y).exp(),
            duals,
        })
    }
}

/// `log sum_k exp(offsets_k + exponents_k . w)`.
#[derive(Debug, Clone)]
struct LogSumExp {
    exponents: DMatrix<f64>,
    offsets: DVector<f64>,
}

impl LogSumExp {
    fn from_posynomial(
        p: &Posynomial,
        index: &HashMap<QuantityId, usize>,
    ) -> Result<Self, SolverError> {
        let n = index.len();
        let mut exponents = DMatrix::zeros(p.terms().len(), n);
        let mut offsets = DVector::zeros(p.terms().len());
        for (k, term) in p.terms().iter().enumerate() {
            let (row, offset) = log_linear(term, index)?;
            exponents.set_row(k, &row.transpose());
            offsets[k] = offset;
        }
        Ok(Self { exponents, offsets })
    }

    /// Re-expresses the function of `y = y_p + basis * z` as one of `z`.
    fn restrict(&self, y_p: &DVector<f64>, basis: &DMatrix<f64>) -> Self {
        Self {
            exponents: &self.exponents * basis,
            offsets: &self.offsets + &self.exponents * y_p,
        }
    }

    /// Appends a variable `s` and subtracts it from the function.
    fn minus_slack(&self) -> Self {
        let (rows, cols) = self.exponents.shape();
        let mut exponents = self.exponents.clone().resize(rows, cols + 1, 0.0);
        exponents.column_mut(cols).fill(-1.0);
        Self {
            exponents,
            offsets: self.offsets.clone(),
        }
    }

    /// Value of a function restricted to a single point.
    fn constant(&self) -> f64 {
        let max = self.offsets.max();
        max + self.offsets.map(|v| (v - max).exp()).sum().ln()
    }

    fn exponents_at(&self, w: &DVector<f64>) -> DVector<f64> {
        &self.exponents * w + &self.offsets
    }

    fn eval(&self, w: &DVector<f64>) -> f64 {
        let e = self.exponents_at(w);
        let max = e.max();
        max + e.map(|v| (v - max).exp()).sum().ln()
    }

    /// Returns the value, gradient, and Hessian at `w`.
    fn derivatives(&self, w: &DVector<f64>) -> (f64, DVector<f64>, DMatrix<f64>) {
        let e = self.exponents_at(w);
        let max = e.max();
        let weights = e.map(|v| (v - max).exp());
        let total = weights.sum();
        let p = weights / total;

        let gradient = self.exponents.transpose() * &p;
        let spread = DMatrix::from_diagonal(&p) - &p * p.transpose();
        let hessian = self.exponents.transpose() * spread * &self.exponents;
        (max + total.ln(), gradient, hessian)
    }

    fn gradient(&self, w: &DVector<f64>) -> DVector<f64> {
        self.derivatives(w).1
    }
}

/// Returns the log-space row and offset of a monomial.
fn log_linear(
    m: &Monomial,
    index: &HashMap<QuantityId, usize>,
) -> Result<(DVector<f64>, f64), SolverError> {
    let mut row = DVector::zeros(index.len());
    for (id, e) in m.exponents() {
        let &i = index.get(id).ok_or_else(|| SolverError::Numerical {
            message: format!("{id} is not a program variable"),
        })?;
        row[i] = *e;
    }
    Ok((row, m.coeff().ln()))
}

/// Returns a particular solution of `A y = b` and a basis of the null space.
fn eliminate(
    rows: &[DVector<f64>],
    rhs: &[f64],
    n: usize,
) -> Result<(DVector<f64>, DMatrix<f64>), SolverError> {
    if rows.is_empty() {
        return Ok((DVector::zeros(n), DMatrix::identity(n, n)));
    }

    let a = DMatrix::from_fn(rows.len(), n, |i, j| rows[i][j]);
    let b = DVector::from_column_slice(rhs);

    let y_p = a
        .clone()
        .svd(true, true)
        .solve(&b, RANK_TOL)
        .map_err(|message| SolverError::Numerical {
            message: message.to_string(),
        })?;
    if (&a * &y_p - &b).norm() > 1e-8 * (1.0 + b.norm()) {
        return Err(SolverError::Infeasible);
    }

    let gram = a.transpose() * &a;
    let eigen = SymmetricEigen::new(gram);
    let scale = eigen.eigenvalues.amax().max(1.0);
    let null: Vec<DVector<f64>> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .filter(|(_, lambda)| lambda.abs() <= RANK_TOL * scale)
        .map(|(k, _)| eigen.eigenvectors.column(k).into_owned())
        .collect();

    let basis = if null.is_empty() {
        DMatrix::zeros(n, 0)
    } else {
        DMatrix::from_columns(&null)
    };
    Ok((y_p, basis))
}

/// Finds `z` with every constraint strictly negative.
fn phase_one(constraints: &[LogSumExp], d: usize) -> Result<DVector<f64>, SolverError> {
    let z0 = DVector::zeros(d);
    let worst = constraints
        .iter()
        .map(|f| f.eval(&z0))
        .fold(f64::NEG_INFINITY, f64::max);
    if worst < 0.0 {
        return Ok(z0);
    }

    // minimize s subject to f_i(z) - s <= 0, |z_j| <= R and s >= -1.
    let mut lifted: Vec<_> = constraints.iter().map(LogSumExp::minus_slack).collect();
    for j in 0..d {
        for sign in [1.0, -1.0] {
            let mut side = DMatrix::zeros(1, d + 1);
            side[(0, j)] = sign;
            lifted.push(LogSumExp {
                exponents: side,
                offsets: DVector::from_element(1, -PHASE_ONE_RADIUS),
            });
        }
    }
    let mut floor = DMatrix::zeros(1, d + 1);
    floor[(0, d)] = -1.0;
    lifted.push(LogSumExp {
        exponents: floor,
        offsets: DVector::from_element(1, -1.0),
    });
    let mut level = DMatrix::zeros(1, d + 1);
    level[(0, d)] = 1.0;
    let objective = LogSumExp {
        exponents: level,
        offsets: DVector::zeros(1),
    };

    let mut start = z0.resize_vertically(d + 1, 0.0);
    start[d] = worst.max(0.0) + 1.0;

    let (w, _) = barrier(&objective, &lifted, start, |w| w[d] < 0.0)?;
    if w[d] < 0.0 {
        Ok(w.rows(0, d).into_owned())
    } else {
        Err(SolverError::Infeasible)
    }
}

/// Minimizes `objective` over the interior of `f_i < 0`, starting from a
/// strictly feasible point. Returns the final point and barrier weight.
fn barrier(
    objective: &LogSumExp,
    constraints: &[LogSumExp],
    mut w: DVector<f64>,
    done: impl Fn(&DVector<f64>) -> bool,
) -> Result<(DVector<f64>, f64), SolverError> {
    let m = constraints.len() as f64;
    let mut t = 1.0;
    loop {
        w = center(objective, constraints, w, t)?;
        if done(&w) || m / t < GAP_TOL {
            return Ok((w, t));
        }
        t *= BARRIER_GROWTH;
    }
}

fn barrier_value(
    objective: &LogSumExp,
    constraints: &[LogSumExp],
    w: &DVector<f64>,
    t: f64,
) -> Option<f64> {
    let mut value = t * objective.eval(w);
    for f in constraints {
        let fw = f.eval(w);
        if fw.is_nan() || fw >= 0.0 {
            return None;
        }
        value -= (-fw).ln();
    }
    value.is_finite().then_some(value)
}

fn center(
    objective: &LogSumExp,
    constraints: &[LogSumExp],
    mut w: DVector<f64>,
    t: f64,
) -> Result<DVector<f64>, SolverError> {
    for _ in 0..MAX_NEWTON {
        let (f0, g0, h0) = objective.derivatives(&w);
        if f0 < UNBOUNDED_LOG_COST {
            return Err(SolverError::Unbounded);
        }
        let mut gradient = g0 * t;
        let mut hessian = h0 * t;
        for f in constraints {
            let (fi, gi, hi) = f.derivatives(&w);
            let slack = -fi;
            gradient += &gi / slack;
            hessian += &gi * gi.transpose() / (slack * slack) + hi / slack;
        }

        let step = newton_step(&hessian, &gradient)?;
        let decrement = -gradient.dot(&step);
        if decrement / 2.0 <= NEWTON_TOL {
            return Ok(w);
        }

        let Some(current) = barrier_value(objective, constraints, &w, t) else {
            return Err(SolverError::Numerical {
                message: "iterate left the interior".to_string(),
            });
        };
        let mut size = 1.0;
        loop {
            let candidate = &w + &step * size;
            if let Some(value) = barrier_value(objective, constraints, &candidate, t) {
                if value <= current - ARMIJO * size * decrement {
                    w = candidate;
                    break;
                }
            }
            size *= BACKTRACK;
            if size < 1e-14 {
                return Ok(w);
            }
        }
    }
    Ok(w)
}

fn newton_step(
    hessian: &DMatrix<f64>,
    gradient: &DVector<f64>,
) -> Result<DVector<f64>, SolverError> {
    let n = hessian.nrows();
    let mut ridge = 0.0;
    for _ in 0..8 {
        let regularized = hessian + DMatrix::identity(n, n) * ridge;
        if let Some(cholesky) = regularized.cholesky() {
            return Ok(-cholesky.solve(gradient));
        }
        ridge = if ridge == 0.0 {
            1e-12 * hessian.amax().max(1.0)
        } else {
            ridge * 100.0
        };
    }
    Err(SolverError::Numerical {
        message: "Newton system is not positive definite".to_string(),
    })
}

/// Recovers equality duals from stationarity in log space.
fn equality_duals(
    cost: &LogSumExp,
    inequalities: &[LogSumExp],
    lambdas: &[f64],
    rows: &[DVector<f64>],
    y: &DVector<f64>,
) -> Result<Vec<f64>, SolverError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let mut residual = cost.gradient(y);
    for (f, lambda) in inequalities.iter().zip(lambdas) {
        residual += f.gradient(y) * *lambda;
    }
    let a_t = DMatrix::from_columns(rows);
    let nu = a_t
        .svd(true, true)
        .solve(&(-residual), RANK_TOL)
        .map_err(|message| SolverError::Numerical {
            message: message.to_string(),
        })?;
    Ok(nu.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::quantity::{Declaration, Registry, Values};

    fn variables(n: usize) -> Vec<QuantityId> {
        let mut registry = Registry::new();
        let root = registry.root();
        (0..n)
            .map(|i| {
                registry
                    .declare(root, Declaration::new(format!("x{i}"), "-"))
                    .unwrap()
                    .id()
            })
            .collect()
    }

    fn posynomial(terms: Vec<Monomial>) -> Posynomial {
        let sum = terms
            .into_iter()
            .fold(crate::expr::Signomial::zero(), |acc, t| acc + t.into());
        Posynomial::from_signomial(&sum).unwrap()
    }

    #[test]
    fn box_constrained_minimum() {
        // minimize 1/x + y subject to x <= 2, 3 / y <= 1.
        let ids = variables(2);
        let (x, y) = (ids[0], ids[1]);
        let program = GeometricProgram {
            cost: posynomial(vec![Monomial::new(1.0, [(x, -1.0)]), Monomial::variable(y, 1.0)]),
            constraints: vec![
                GpConstraint::Inequality(posynomial(vec![Monomial::variable(x, 0.5)])),
                GpConstraint::Inequality(posynomial(vec![Monomial::new(3.0, [(y, -1.0)])])),
            ],
            variables: ids,
        };

        let solution = BarrierSolver.solve(&program).unwrap();
        assert_relative_eq!(solution.values.get_id(x).unwrap(), 2.0, max_relative = 1e-6);
        assert_relative_eq!(solution.values.get_id(y).unwrap(), 3.0, max_relative = 1e-6);
        assert_relative_eq!(solution.cost, 3.5, max_relative = 1e-6);

        // d log(cost) / d log(bound) for each active constraint.
        assert_relative_eq!(solution.duals[0], 0.5 / 3.5, max_relative = 1e-4);
        assert_relative_eq!(solution.duals[1], 3.0 / 3.5, max_relative = 1e-4);
    }

    #[test]
    fn phase_one_stays_bounded_with_one_sided_variables() {
        // x <= 2 leaves x free to shrink; 3 / y <= 1 is violated at y = 1.
        let ids = variables(2);
        let (x, y) = (ids[0], ids[1]);
        let index: HashMap<_, _> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let constraints = [
            posynomial(vec![Monomial::variable(x, 0.5)]),
            posynomial(vec![Monomial::new(3.0, [(y, -1.0)])]),
        ]
        .iter()
        .map(|p| LogSumExp::from_posynomial(p, &index).unwrap())
        .collect::<Vec<_>>();

        let z = phase_one(&constraints, 2).unwrap();
        assert!(z.iter().all(|v| v.abs() < PHASE_ONE_RADIUS));
        assert!(constraints.iter().all(|f| f.eval(&z) < 0.0));
    }

    #[test]
    fn equality_is_eliminated() {
        // minimize x + y subject to x * y == 4.
        let ids = variables(2);
        let (x, y) = (ids[0], ids[1]);
        let program = GeometricProgram {
            cost: posynomial(vec![Monomial::variable(x, 1.0), Monomial::variable(y, 1.0)]),
            constraints: vec![GpConstraint::Equality(Monomial::new(0.25, [(x, 1.0), (y, 1.0)]))],
            variables: ids,
        };

        let solution = BarrierSolver.solve(&program).unwrap();
        assert_relative_eq!(solution.values.get_id(x).unwrap(), 2.0, max_relative = 1e-6);
        assert_relative_eq!(solution.values.get_id(y).unwrap(), 2.0, max_relative = 1e-6);
        // cost = 2 sqrt(x y), so d log(cost) / d log(x y) = 1/2.
        assert_relative_eq!(solution.duals[0].abs(), 0.5, max_relative = 1e-4);
    }

    #[test]
    fn conflicting_bounds_are_infeasible() {
        // x <= 1 and 2 / x <= 1.
        let ids = variables(1);
        let x = ids[0];
        let program = GeometricProgram {
            cost: posynomial(vec![Monomial::variable(x, 1.0)]),
            constraints: vec![
                GpConstraint::Inequality(posynomial(vec![Monomial::variable(x, 1.0)])),
                GpConstraint::Inequality(posynomial(vec![Monomial::new(2.0, [(x, -1.0)])])),
            ],
            variables: ids,
        };
        assert_eq!(BarrierSolver.solve(&program), Err(SolverError::Infeasible));
    }

    #[test]
    fn constant_program() {
        let program = GeometricProgram {
            cost: posynomial(vec![Monomial::constant(5.0)]),
            constraints: Vec::new(),
            variables: Vec::new(),
        };
        let solution = BarrierSolver.solve(&program).unwrap();
        assert_eq!(solution.values, Values::new());
        assert_relative_eq!(solution.cost, 5.0);
    }
}
