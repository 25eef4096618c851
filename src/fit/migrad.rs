//! Variable-metric minimisation
//!
//! This is a quasi-Newton descent in the spirit of Minuit's Migrad, driven by
//! argmin's L-BFGS solver with a More-Thuente line search. The solver works in
//! coordinates rescaled by the estimated one-sigma width along each axis. After
//! each solver run, a numerical Hessian is taken at the best point, and the
//! minimisation is declared converged once the estimated distance to the
//! minimum (EDM) drops below a tolerance that scales with the objective's error
//! definition. Otherwise the solver is restarted with the refreshed metric.

use super::hesse;
use crate::numeric::{Float, TINY};
use argmin::core::{CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector};
use prefix_num_ops::real::*;
use std::{
    cell::{Cell, RefCell},
    fmt,
};
use tracing::trace;

/// Objective value reported to the solver in regions where it is not finite
const INVALID_REGION: Float = 1e100;

/// Outcome of a single minimisation
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MinimizerStatus {
    /// EDM fell below the target
    Converged,

    /// The function call budget was exhausted
    CallLimit,

    /// A solver run ended without improving the objective
    LineSearchFailed,

    /// Every solver restart ended with the EDM above the target
    EdmAboveTarget,

    /// The objective was not finite at the starting point
    NonFinite,
}
//
impl MinimizerStatus {
    /// Whether the minimiser reports success
    pub fn is_success(&self) -> bool {
        *self == Self::Converged
    }
}
//
impl fmt::Display for MinimizerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Converged => "converged",
            Self::CallLimit => "call limit reached",
            Self::LineSearchFailed => "line search failed",
            Self::EdmAboveTarget => "EDM above target",
            Self::NonFinite => "non-finite objective",
        };
        f.write_str(text)
    }
}

/// Best point found by a minimiser
#[derive(Clone, Debug, PartialEq)]
pub struct Minimum {
    /// Coordinates of the best point
    pub point: Vec<Float>,

    /// Objective value at the best point
    pub value: Float,

    /// Estimated distance to the true minimum
    pub edm: Float,

    /// Estimate of the inverse Hessian at the best point
    pub inverse_hessian: DMatrix<Float>,

    /// Number of objective evaluations
    pub calls: usize,

    /// Termination status
    pub status: MinimizerStatus,
}

/// Numerical minimisation algorithm
pub trait Minimizer {
    /// Minimise `f` starting from `start`
    ///
    /// `steps` give the typical scale of each coordinate, and `up` is the
    /// objective's error definition, which sets the convergence tolerance.
    ///
    fn minimize(
        &self,
        f: &dyn Fn(&[Float]) -> Float,
        start: &[Float],
        steps: &[Float],
        up: Float,
    ) -> Minimum;
}

/// Quasi-Newton minimiser: restarted L-BFGS runs with EDM stopping
#[derive(Clone, Debug, PartialEq)]
pub struct VariableMetric {
    /// Convergence tolerance: EDM must fall below `0.002 × tolerance × up`
    pub tolerance: Float,

    /// Call budget, defaults to `500 + 200 n + 10 n²` for n coordinates
    pub max_calls: Option<usize>,
}
//
impl VariableMetric {
    /// Number of corrections kept by L-BFGS
    const MEMORY: usize = 10;

    /// Maximal number of solver runs, each followed by a Hessian update
    const MAX_ROUNDS: usize = 5;

    /// Maximal number of iterations of a single solver run
    const MAX_ITERATIONS: u64 = 1000;

    /// Default call budget for n coordinates
    fn default_max_calls(n: usize) -> usize {
        500 + 200 * n + 10 * n * n
    }
}
//
impl Default for VariableMetric {
    fn default() -> Self {
        Self {
            tolerance: 0.1,
            max_calls: None,
        }
    }
}
//
impl Minimizer for VariableMetric {
    fn minimize(
        &self,
        f: &dyn Fn(&[Float]) -> Float,
        start: &[Float],
        steps: &[Float],
        up: Float,
    ) -> Minimum {
        let n = start.len();
        let budget = self.max_calls.unwrap_or_else(|| Self::default_max_calls(n));
        let edm_target = 0.002 * self.tolerance * up;
        let tracker = CallTracker::new(f, start, budget);
        let finish = |edm, inverse_hessian, status| {
            let (point, value) = tracker.best();
            Minimum {
                point,
                value,
                edm,
                inverse_hessian,
                calls: tracker.calls(),
                status,
            }
        };

        // Evaluate the starting point
        let f0 = tracker.value(start);
        if !f0.is_finite() {
            return finish(Float::INFINITY, DMatrix::zeros(n, n), MinimizerStatus::NonFinite);
        }
        if n == 0 {
            return finish(0., DMatrix::zeros(0, 0), MinimizerStatus::Converged);
        }

        // Seed the coordinate scales from second differences along each axis
        let mut scales = (0..n)
            .map(|i| {
                let h = abs(steps[i]).max(TINY);
                let mut x = start.to_vec();
                x[i] = start[i] + h;
                let fp = tracker.value(&x);
                x[i] = start[i] - h;
                let fm = tracker.value(&x);
                let g2 = (fp + fm - 2. * f0) / (h * h);
                if g2.is_finite() && g2 > TINY {
                    1. / sqrt(g2)
                } else {
                    h / sqrt(up)
                }
            })
            .collect::<Vec<_>>();
        let diagonal = |scales: &[Float]| {
            DMatrix::from_diagonal(&DVector::from_iterator(n, scales.iter().map(|s| s * s)))
        };
        let mut inverse_hessian = diagonal(&scales);
        let mut edm = Float::INFINITY;

        // In rescaled coordinates, EDM ≈ |g|² / 2
        let tol_grad = 0.1 * sqrt(2. * edm_target.max(0.));
        let tol_cost = 0.01 * edm_target.max(0.);
        for round in 0..Self::MAX_ROUNDS {
            let (origin, value_before) = tracker.best();
            let solver = LBFGS::new(MoreThuenteLineSearch::new(), Self::MEMORY)
                .with_tolerance_grad(tol_grad)
                .and_then(|solver| solver.with_tolerance_cost(tol_cost));
            let solver = match solver {
                Ok(solver) => solver,
                Err(error) => {
                    trace!("Invalid L-BFGS configuration: {error}");
                    return finish(edm, inverse_hessian, MinimizerStatus::LineSearchFailed);
                }
            };
            let problem = ScaledProblem {
                tracker: &tracker,
                origin,
                scales: scales.clone(),
            };
            let outcome = Executor::new(problem, solver)
                .configure(|state| state.param(vec![0.; n]).max_iters(Self::MAX_ITERATIONS))
                .run();
            match &outcome {
                Ok(result) => {
                    let termination = result.state().get_termination_status();
                    let solver_converged = matches!(
                        termination,
                        TerminationStatus::Terminated(TerminationReason::SolverConverged)
                            | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
                    );
                    trace!("L-BFGS run {round}: {termination} (converged: {solver_converged})");
                }
                Err(error) => trace!("L-BFGS run {round} aborted: {error}"),
            }
            if tracker.exhausted() {
                return finish(edm, inverse_hessian, MinimizerStatus::CallLimit);
            }

            // Refresh the metric from the Hessian at the best point
            let (point, value) = tracker.best();
            let counted = |x: &[Float]| tracker.value(x);
            let hessian = hesse::hessian(&counted, &point, &scales, up);
            let inverse = if hessian.iter().all(|h| h.is_finite()) {
                hesse::invert(&hessian)
            } else {
                None
            };
            if let Some(inverse) = inverse {
                scales = (0..n).map(|i| sqrt(inverse[(i, i)])).collect();
                inverse_hessian = inverse;
            } else {
                inverse_hessian = diagonal(&scales);
            }

            // Estimated distance to the minimum
            let local = ScaledProblem {
                tracker: &tracker,
                origin: point,
                scales: scales.clone(),
            };
            let Ok(scaled_gradient) = local.gradient_at(&vec![0.; n]) else {
                return finish(edm, inverse_hessian, MinimizerStatus::CallLimit);
            };
            let gradient = DVector::from_iterator(
                n,
                scaled_gradient.iter().zip(&scales).map(|(g, s)| g / s),
            );
            edm = 0.5 * gradient.dot(&(&inverse_hessian * &gradient));
            trace!("L-BFGS run {round}: value {value}, EDM {edm}");

            // Hessian and gradient evaluations may have found a lower point
            if tracker.best().1 < value {
                continue;
            }
            if edm.is_finite() && edm < edm_target {
                return finish(edm, inverse_hessian, MinimizerStatus::Converged);
            }
            if round > 0 && !(value < value_before) {
                return finish(edm, inverse_hessian, MinimizerStatus::LineSearchFailed);
            }
        }
        finish(edm, inverse_hessian, MinimizerStatus::EdmAboveTarget)
    }
}

/// Objective wrapper which counts calls and remembers the best point seen
struct CallTracker<'f> {
    /// Objective
    f: &'f dyn Fn(&[Float]) -> Float,

    /// Number of objective evaluations so far
    calls: Cell<usize>,

    /// Number of evaluations the solver may perform
    budget: usize,

    /// Best point and finite objective value seen so far
    best: RefCell<(Vec<Float>, Float)>,
}
//
impl<'f> CallTracker<'f> {
    fn new(f: &'f dyn Fn(&[Float]) -> Float, start: &[Float], budget: usize) -> Self {
        Self {
            f,
            calls: Cell::new(0),
            budget,
            best: RefCell::new((start.to_vec(), Float::INFINITY)),
        }
    }

    /// Evaluate the objective, whatever the remaining budget
    fn value(&self, x: &[Float]) -> Float {
        self.calls.set(self.calls.get() + 1);
        let fx = (self.f)(x);
        let mut best = self.best.borrow_mut();
        if fx.is_finite() && fx < best.1 {
            *best = (x.to_vec(), fx);
        }
        fx
    }

    fn calls(&self) -> usize {
        self.calls.get()
    }

    fn exhausted(&self) -> bool {
        self.calls.get() >= self.budget
    }

    fn best(&self) -> (Vec<Float>, Float) {
        self.best.borrow().clone()
    }
}

/// Objective as seen by the solver, in coordinates `x = origin + scales ∘ u`
struct ScaledProblem<'t, 'f> {
    tracker: &'t CallTracker<'f>,
    origin: Vec<Float>,
    scales: Vec<Float>,
}
//
impl ScaledProblem<'_, '_> {
    /// Objective value at `u`, or an error once the call budget is spent
    fn checked_value(&self, u: &[Float]) -> Result<Float, Error> {
        if self.tracker.exhausted() {
            return Err(Error::msg("function call budget exhausted"));
        }
        let x = self
            .origin
            .iter()
            .zip(&self.scales)
            .zip(u)
            .map(|((&origin, &scale), &u)| origin + scale * u)
            .collect::<Vec<_>>();
        Ok(self.tracker.value(&x))
    }

    /// Central-difference gradient, one-sided next to invalid regions
    fn gradient_at(&self, u: &[Float]) -> Result<Vec<Float>, Error> {
        let mut center = None;
        let mut gradient = vec![0.; u.len()];
        for (i, derivative) in gradient.iter_mut().enumerate() {
            let h = 1e-4 * abs(u[i]).max(1.);
            let mut shifted = u.to_vec();
            shifted[i] = u[i] + h;
            let fp = self.checked_value(&shifted)?;
            shifted[i] = u[i] - h;
            let fm = self.checked_value(&shifted)?;
            *derivative = match (fp.is_finite(), fm.is_finite()) {
                (true, true) => (fp - fm) / (2. * h),
                (false, false) => 0.,
                (plus_ok, _) => {
                    let f0 = match center {
                        Some(f0) => f0,
                        None => *center.insert(self.checked_value(u)?),
                    };
                    let one_sided = if plus_ok { (fp - f0) / h } else { (f0 - fm) / h };
                    if one_sided.is_finite() {
                        one_sided
                    } else {
                        0.
                    }
                }
            };
        }
        Ok(gradient)
    }
}
//
impl CostFunction for ScaledProblem<'_, '_> {
    type Param = Vec<Float>;
    type Output = Float;

    fn cost(&self, u: &Self::Param) -> Result<Self::Output, Error> {
        let value = self.checked_value(u)?;
        Ok(if value.is_finite() { value } else { INVALID_REGION })
    }
}
//
impl Gradient for ScaledProblem<'_, '_> {
    type Param = Vec<Float>;
    type Gradient = Vec<Float>;

    fn gradient(&self, u: &Self::Param) -> Result<Self::Gradient, Error> {
        self.gradient_at(u)
    }
}
