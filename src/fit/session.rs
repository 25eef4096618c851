//! Fit sessions: the state of one fit, from the starting point to the
//! asymmetric errors

use super::{
    hesse,
    migrad::{Minimizer, VariableMetric},
    minos::{self, Crossing, MinosError},
    retry_bounded, FitError, Objective, ParameterSet, MAX_REASONABLE_OBJECTIVE,
};
use crate::{
    numeric::Float,
    random::{RandomGenerator, DEFAULT_SEED},
};
use nalgebra::DMatrix;
use prefix_num_ops::real::*;
use std::fmt;
use tracing::{debug, info, warn};

/// Progress of a fit session
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FitStage {
    /// Parameters were set up, nothing was minimised yet
    Initialized,

    /// Migrad ran
    Migrad,

    /// Hesse ran after Migrad
    Hesse,

    /// Minos ran after Migrad
    Minos,
}

/// Convergence status of a fit
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FitStatus {
    /// One Migrad attempt converged
    Converged,

    /// Every Migrad attempt failed
    NonConverged,
}

/// Fitted value of one parameter
#[derive(Clone, Debug, PartialEq)]
pub struct FitParameter {
    /// Parameter name
    pub name: String,

    /// Best value
    pub value: Float,

    /// Parabolic error (zero for fixed parameters)
    pub error: Float,

    /// Asymmetric error, if Minos ran on this parameter
    pub minos: Option<MinosError>,

    /// Whether the parameter was fixed
    pub fixed: bool,

    /// Parameter limits
    pub limits: Option<(Float, Float)>,
}

/// Outcome of a fit
#[derive(Clone, Debug, PartialEq)]
pub struct FitResult {
    /// All parameters, fixed ones included, in definition order
    pub params: Vec<FitParameter>,

    /// Objective value at the best point
    pub min_value: Float,

    /// Estimated distance to the minimum
    pub edm: Float,

    /// Convergence status
    pub status: FitStatus,

    /// Number of Migrad attempts which were made
    pub migrad_attempts: usize,

    /// Objective evaluations made by Migrad
    pub calls: usize,

    /// Covariance matrix of the free parameters, in external units
    pub covariance: Option<DMatrix<Float>>,
}
//
impl FitResult {
    /// Whether Migrad converged
    pub fn is_converged(&self) -> bool {
        self.status == FitStatus::Converged
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&FitParameter> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Best values of all parameters
    pub fn values(&self) -> Vec<Float> {
        self.params.iter().map(|param| param.value).collect()
    }

    /// Number of parameters which were free in the fit
    pub fn num_free(&self) -> usize {
        self.params.iter().filter(|param| !param.fixed).count()
    }
}
//
impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            FitStatus::Converged => "converged",
            FitStatus::NonConverged => "NOT converged",
        };
        writeln!(
            f,
            "Fit {status} after {} attempt(s): min = {:.6}, edm = {:.3e}, calls = {}",
            self.migrad_attempts, self.min_value, self.edm, self.calls
        )?;
        for param in &self.params {
            write!(f, "  {:<8} {:+.6e}", param.name, param.value)?;
            if param.fixed {
                write!(f, " (fixed)")?;
            } else {
                write!(f, " +/- {:.6e}", param.error)?;
            }
            if let Some(minos) = &param.minos {
                write!(f, " minos {minos}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// State of one fit: borrowed objective, owned parameters and minimiser
pub struct FitSession<'obj, O: Objective + ?Sized> {
    objective: &'obj O,
    params: ParameterSet,
    minimizer: Box<dyn Minimizer + Send + Sync>,
    rng: RandomGenerator,
    stage: FitStage,
    result: Option<FitResult>,
}
//
impl<'obj, O: Objective + ?Sized> FitSession<'obj, O> {
    // ### CONSTRUCTION ###

    /// Prepare to fit an objective, starting from some parameters
    pub fn new(objective: &'obj O, params: ParameterSet) -> Self {
        Self {
            objective,
            params,
            minimizer: Box::new(VariableMetric::default()),
            rng: RandomGenerator::new(DEFAULT_SEED),
            stage: FitStage::Initialized,
            result: None,
        }
    }

    /// Use another minimisation algorithm
    pub fn with_minimizer(mut self, minimizer: Box<dyn Minimizer + Send + Sync>) -> Self {
        self.minimizer = minimizer;
        self
    }

    /// Seed the jitter applied to the starting point of Migrad retries
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = RandomGenerator::new(seed);
        self
    }

    // ### ACCESSORS ###

    /// Current parameters
    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    /// Current stage
    pub fn stage(&self) -> FitStage {
        self.stage
    }

    /// Latest fit result, if Migrad ran since the parameters last changed
    pub fn result(&self) -> Option<&FitResult> {
        self.result.as_ref()
    }

    // ### PARAMETER CONTROL ###

    /// Fix a parameter at its current value
    pub fn fix(&mut self, name: &str) -> Result<(), FitError> {
        self.params.fix(name)?;
        self.reset();
        Ok(())
    }

    /// Let a parameter float again
    pub fn release(&mut self, name: &str) -> Result<(), FitError> {
        self.params.release(name)?;
        self.reset();
        Ok(())
    }

    /// Change the value of a parameter
    pub fn set_value(&mut self, name: &str, value: Float) -> Result<(), FitError> {
        self.params.set_value(name, value)?;
        self.reset();
        Ok(())
    }

    /// Forget previous results after a parameter change
    fn reset(&mut self) {
        self.stage = FitStage::Initialized;
        self.result = None;
    }

    // ### MIGRAD ###

    /// Minimise the objective, with at most `max_retries` attempts in total
    ///
    /// The first attempt starts from the current parameters. Each retry
    /// restarts from the last point reached, jittered by a Gaussian of the
    /// size of the parameter steps. An attempt fails when the minimiser
    /// reports a failure or the objective is unreasonably large.
    ///
    pub fn migrad(&mut self, max_retries: usize) -> FitResult {
        let up = self.objective.error_def();
        let start = self.params.to_internal();
        let steps = self.params.internal_steps();

        let (objective, params, minimizer, rng) =
            (self.objective, &self.params, &self.minimizer, &mut self.rng);
        let f = |internal: &[Float]| objective.value(&params.to_external(internal));
        let mut calls = 0;
        let mut last_point = start.clone();
        let retried = retry_bounded(
            max_retries,
            |attempt| {
                let origin = if attempt == 0 {
                    start.clone()
                } else {
                    last_point
                        .iter()
                        .zip(&steps)
                        .map(|(&x, &step)| rng.gaussian(x, step))
                        .collect()
                };
                let min = minimizer.minimize(&f, &origin, &steps, up);
                debug!(
                    "Migrad attempt {}: {} with value {} after {} calls",
                    attempt + 1,
                    min.status,
                    min.value,
                    min.calls
                );
                calls += min.calls;
                last_point = min.point.clone();
                min
            },
            |min| min.status.is_success() && abs(min.value) < MAX_REASONABLE_OBJECTIVE,
        );

        let min = retried.value;
        let status = if retried.succeeded {
            info!("Migrad converged after {} attempt(s)", retried.attempts);
            FitStatus::Converged
        } else {
            warn!("Migrad did not converge in {} attempt(s)", retried.attempts);
            FitStatus::NonConverged
        };
        let best = self.params.to_external(&min.point);
        self.params.set_values(&best);
        let internal_covariance = 2. * up * &min.inverse_hessian;
        let result = FitResult {
            params: Vec::new(),
            min_value: min.value,
            edm: min.edm,
            status,
            migrad_attempts: retried.attempts,
            calls,
            covariance: None,
        };
        let result = self.with_errors(result, &min.point, &internal_covariance);
        self.result = Some(result.clone());
        self.stage = FitStage::Migrad;
        result
    }

    /// Fill in parameter values and errors from a covariance matrix in
    /// internal coordinates
    fn with_errors(
        &self,
        mut result: FitResult,
        internal: &[Float],
        internal_covariance: &DMatrix<Float>,
    ) -> FitResult {
        let jacobian = self.params.jacobian(internal);
        let n = jacobian.len();
        let covariance =
            DMatrix::from_fn(n, n, |i, j| jacobian[i] * internal_covariance[(i, j)] * jacobian[j]);
        let free_indices = self.params.free_indices();
        result.params = self
            .params
            .iter()
            .enumerate()
            .map(|(idx, param)| {
                let error = free_indices
                    .iter()
                    .position(|&free_idx| free_idx == idx)
                    .map_or(0., |pos| sqrt(covariance[(pos, pos)].max(0.)));
                FitParameter {
                    name: param.name.clone(),
                    value: param.value,
                    error,
                    minos: None,
                    fixed: param.fixed,
                    limits: param.limits,
                }
            })
            .collect();
        result.covariance = Some(covariance);
        result
    }

    /// Result of the last Migrad, or an error naming the caller
    fn require_migrad(&self, caller: &'static str) -> Result<FitResult, FitError> {
        match (&self.result, self.stage) {
            (Some(result), stage) if stage != FitStage::Initialized => Ok(result.clone()),
            _ => Err(FitError::MigradNotRun(caller)),
        }
    }

    // ### HESSE ###

    /// Recompute parameter errors from the numerical Hessian at the minimum
    ///
    /// Hesse is not retried: it is deterministic at a given point, so a
    /// singular Hessian is reported as an error right away.
    ///
    pub fn hesse(&mut self) -> Result<FitResult, FitError> {
        let previous = self.require_migrad("Hesse")?;
        let up = self.objective.error_def();
        let point = self.params.to_internal();
        let steps = self.params.internal_steps();
        let (objective, params) = (self.objective, &self.params);
        let f = |internal: &[Float]| objective.value(&params.to_external(internal));
        let internal_covariance = hesse::covariance(&f, &point, &steps, up)?;

        let minos_errors = previous
            .params
            .iter()
            .map(|param| param.minos)
            .collect::<Vec<_>>();
        let mut result = self.with_errors(previous, &point, &internal_covariance);
        for (param, minos) in result.params.iter_mut().zip(minos_errors) {
            param.minos = minos;
        }
        self.result = Some(result.clone());
        self.stage = FitStage::Hesse;
        Ok(result)
    }

    // ### MINOS ###

    /// Compute asymmetric errors of the named parameters
    ///
    /// Fixed parameters are skipped. Each parameter gets at most
    /// `max_retries` attempts. An attempt is accepted when each crossing is
    /// either found or lies at a parameter limit, and the minimum is
    /// reasonable. An attempt which finds a lower minimum moves the best
    /// point there, and each retry first restarts the minimiser from a
    /// jittered best point.
    ///
    pub fn minos(&mut self, names: &[&str], max_retries: usize) -> Result<FitResult, FitError> {
        self.require_migrad("Minos")?;
        let indices = names
            .iter()
            .map(|name| self.params.index_of(name))
            .collect::<Result<Vec<_>, _>>()?;

        for idx in indices {
            if self.params.get(idx).fixed {
                continue;
            }
            let retried = retry_bounded(
                max_retries,
                |attempt| {
                    if attempt > 0 {
                        self.jitter_minimum();
                    }
                    self.minos_attempt(idx)
                },
                |outcome| matches!(outcome, MinosAttempt::Accepted(_)),
            );
            let name = &self.params.get(idx).name;
            let minos = match retried.value {
                MinosAttempt::Accepted(minos) => minos,
                MinosAttempt::Rejected(minos) => {
                    warn!(
                        "Minos found no valid crossings for parameter {name} in {} attempt(s)",
                        retried.attempts
                    );
                    minos
                }
                MinosAttempt::NewMinimum => {
                    warn!("Minos kept finding new minima for parameter {name}");
                    self.parabolic_minos(idx)
                }
            };
            if let Some(result) = &mut self.result {
                result.params[idx].minos = Some(minos);
            }
        }

        self.stage = FitStage::Minos;
        self.require_migrad("Minos")
    }

    /// Parabolic error of a parameter from the latest result
    fn parabolic_error(&self, idx: usize) -> Float {
        self.result
            .as_ref()
            .map_or(0., |result| result.params[idx].error)
    }

    /// Symmetric stand-in for an asymmetric error, flagged as invalid
    fn parabolic_minos(&self, idx: usize) -> MinosError {
        let sigma = self.parabolic_error(idx);
        MinosError {
            lower: -sigma,
            upper: sigma,
            lower_valid: false,
            upper_valid: false,
        }
    }

    /// One search for both crossings
    fn minos_attempt(&mut self, idx: usize) -> MinosAttempt {
        let up = self.objective.error_def();
        let f_min = self
            .result
            .as_ref()
            .map_or(Float::INFINITY, |result| result.min_value);
        if !(abs(f_min) < MAX_REASONABLE_OBJECTIVE) {
            return MinosAttempt::Rejected(self.parabolic_minos(idx));
        }
        let param = self.params.get(idx);
        let center = param.value;
        let sigma = self.parabolic_error(idx);
        let (low_limit, high_limit) = match param.limits {
            Some((low, high)) => (Some(low), Some(high)),
            None => (None, None),
        };

        let profile = |value: Float| self.profile(idx, value);
        let lower = minos::find_crossing(&profile, center, f_min, up, sigma, -1., low_limit);
        let upper = match &lower {
            Crossing::NewMinimum { .. } => None,
            _ => Some(minos::find_crossing(
                &profile, center, f_min, up, sigma, 1., high_limit,
            )),
        };

        // Shift, validity and acceptability of each side
        let side = |crossing: &Crossing| match *crossing {
            Crossing::Found(shift) => Some((shift, true, true)),
            Crossing::AtLimit(shift) => Some((shift, false, true)),
            Crossing::Unbracketed(shift) => Some((shift, false, false)),
            Crossing::NewMinimum { .. } => None,
        };
        let sides = (side(&lower), upper.as_ref().and_then(side));
        match sides {
            (Some((lower, lower_valid, lower_ok)), Some((upper, upper_valid, upper_ok))) => {
                let minos = MinosError {
                    lower,
                    upper,
                    lower_valid,
                    upper_valid,
                };
                if lower_ok && upper_ok {
                    MinosAttempt::Accepted(minos)
                } else {
                    debug!("Minos attempt rejected: {minos}");
                    MinosAttempt::Rejected(minos)
                }
            }
            _ => {
                let new_minimum = [Some(lower), upper]
                    .into_iter()
                    .flatten()
                    .find_map(|crossing| match crossing {
                        Crossing::NewMinimum { point, value } => Some((point, value)),
                        _ => None,
                    });
                if let Some((point, value)) = new_minimum {
                    self.relocate(point, value);
                }
                MinosAttempt::NewMinimum
            }
        }
    }

    /// Objective minimised over all free parameters but one, which is fixed
    /// at some value, and the point where that minimum is reached
    fn profile(&self, idx: usize, value: Float) -> (Float, Vec<Float>) {
        let mut params = self.params.clone();
        params.pin(idx, value);
        if params.num_free() == 0 {
            let point = params.values();
            return (self.objective.value(&point), point);
        }
        let objective = self.objective;
        let f = |internal: &[Float]| objective.value(&params.to_external(internal));
        let min = self.minimizer.minimize(
            &f,
            &params.to_internal(),
            &params.internal_steps(),
            objective.error_def(),
        );
        (min.value, params.to_external(&min.point))
    }

    /// Move the best point to a lower minimum found by Minos
    fn relocate(&mut self, point: Vec<Float>, value: Float) {
        info!("Minos found a lower minimum {value}, moving the best point");
        self.params.set_values(&point);
        let up = self.objective.error_def();
        let (objective, params) = (self.objective, &self.params);
        let f = |internal: &[Float]| objective.value(&params.to_external(internal));
        let min = self
            .minimizer
            .minimize(&f, &params.to_internal(), &params.internal_steps(), up);
        if min.value < value {
            let best = params.to_external(&min.point);
            self.move_minimum(best, min.value);
        } else {
            self.move_minimum(point, value);
        }
    }

    /// Restart the minimiser from the best point jittered by the parameter
    /// steps, and move there if the objective is lower
    fn jitter_minimum(&mut self) {
        let up = self.objective.error_def();
        let steps = self.params.internal_steps();
        let rng = &mut self.rng;
        let start = self
            .params
            .to_internal()
            .into_iter()
            .zip(&steps)
            .map(|(x, &step)| rng.gaussian(x, step))
            .collect::<Vec<_>>();
        let (objective, params) = (self.objective, &self.params);
        let f = |internal: &[Float]| objective.value(&params.to_external(internal));
        let min = self.minimizer.minimize(&f, &start, &steps, up);
        let f_min = self
            .result
            .as_ref()
            .map_or(Float::INFINITY, |result| result.min_value);
        if min.value < f_min {
            info!("Minos retry found a lower minimum {}", min.value);
            let best = params.to_external(&min.point);
            self.move_minimum(best, min.value);
        }
    }

    /// Record a new best point and objective value
    fn move_minimum(&mut self, point: Vec<Float>, value: Float) {
        self.params.set_values(&point);
        if let Some(result) = &mut self.result {
            result.min_value = value;
            for (param, value) in result.params.iter_mut().zip(point) {
                param.value = value;
            }
        }
    }
}

/// Outcome of one Minos attempt on one parameter
enum MinosAttempt {
    /// Each crossing was found or lies at a parameter limit
    Accepted(MinosError),

    /// Some crossing could not be bracketed, or the minimum is unreasonable
    Rejected(MinosError),

    /// A lower minimum was found, and the best point moved there
    NewMinimum,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fit::{
            BinnedChi2, Minimum, MinimizerStatus, Parameter, UnbinnedNll, MIGRAD_RETRIES,
            MINOS_RETRIES,
        },
        histogram::{Axis, Hist2D},
        model::{Model2D, Polynomial2D},
    };
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// χ² of two independent measurements, 1 ± 0.5 and -2 ± 2
    struct TwoMeasurements;
    //
    impl Objective for TwoMeasurements {
        fn value(&self, params: &[Float]) -> Float {
            ((params[0] - 1.) / 0.5).powi(2) + ((params[1] + 2.) / 2.).powi(2)
        }
    }

    /// Minimiser which never succeeds
    struct Hopeless;
    //
    impl Minimizer for Hopeless {
        fn minimize(
            &self,
            f: &dyn Fn(&[Float]) -> Float,
            start: &[Float],
            _steps: &[Float],
            _up: Float,
        ) -> Minimum {
            Minimum {
                point: start.to_vec(),
                value: f(start),
                edm: Float::INFINITY,
                inverse_hessian: DMatrix::zeros(start.len(), start.len()),
                calls: 1,
                status: MinimizerStatus::CallLimit,
            }
        }
    }

    fn two_parameters() -> ParameterSet {
        ParameterSet::new(vec![Parameter::new("a", 0., 0.1), Parameter::new("b", 0., 0.1)]).unwrap()
    }

    #[test]
    fn asimov_polynomial_fit() {
        let model = Polynomial2D::new(1, 1);
        let truth = [2., 0.3, -0.2, 0.1];
        let mut hist = Hist2D::new(Axis::new(5, -1., 1.), Axis::new(5, -1., 1.));
        for i in 0..5 {
            for j in 0..5 {
                let (x_range, y_range) = (hist.x_axis().edges(i), hist.y_axis().edges(j));
                let mean = model.integral(&truth, x_range, y_range) / hist.bin_area();
                hist.set(i, j, mean, 0.05);
            }
        }
        let chi2 = BinnedChi2::new(&hist, &model);
        let params = ParameterSet::new(
            model
                .param_names()
                .into_iter()
                .enumerate()
                .map(|(idx, name)| {
                    let start = if idx == 0 { 1. } else { 0. };
                    Parameter::new(name, start, 1e-4).with_limits(-10., 10.)
                })
                .collect(),
        )
        .unwrap();
        let mut session = FitSession::new(&chi2, params);
        let result = session.migrad(10);
        assert!(result.is_converged());
        assert_eq!(result.migrad_attempts, 1);
        for (fitted, expected) in result.values().into_iter().zip(truth) {
            assert_relative_eq!(fitted, expected, epsilon = 1e-3);
        }
        assert!(result.min_value < 1e-3);
        assert_eq!(session.stage(), FitStage::Migrad);
    }

    #[test]
    fn failed_attempts_exhaust_the_budget() {
        let mut session =
            FitSession::new(&TwoMeasurements, two_parameters()).with_minimizer(Box::new(Hopeless));
        let result = session.migrad(4);
        assert_eq!(result.migrad_attempts, 4);
        assert_eq!(result.status, FitStatus::NonConverged);
        assert_eq!(result.calls, 4);
    }

    #[test]
    fn unreasonable_minima_are_rejected() {
        struct BlownUp;
        impl Objective for BlownUp {
            fn value(&self, params: &[Float]) -> Float {
                1e21 + (params[0] - 1.).powi(2)
            }
        }
        let params = ParameterSet::new(vec![Parameter::new("x", 0., 0.1)]).unwrap();
        let mut session = FitSession::new(&BlownUp, params);
        let result = session.migrad(MIGRAD_RETRIES);
        assert_eq!(result.status, FitStatus::NonConverged);
        assert_eq!(result.migrad_attempts, MIGRAD_RETRIES);
        assert!(result.min_value >= MAX_REASONABLE_OBJECTIVE);
    }

    #[test]
    fn limits_bound_the_fitted_value() {
        struct FarMinimum;
        impl Objective for FarMinimum {
            fn value(&self, params: &[Float]) -> Float {
                (params[0] - 12.).powi(2)
            }
        }
        let params =
            ParameterSet::new(vec![Parameter::new("x", 0., 1e-4).with_limits(-10., 10.)]).unwrap();
        let mut session = FitSession::new(&FarMinimum, params);
        let result = session.migrad(10);
        assert!(result.is_converged());
        assert_relative_eq!(result.params[0].value, 10., epsilon = 1e-3);
    }

    #[test]
    fn error_analysis_needs_migrad() {
        let mut session = FitSession::new(&TwoMeasurements, two_parameters());
        assert_eq!(session.hesse(), Err(FitError::MigradNotRun("Hesse")));
        assert_eq!(session.minos(&["a"], 3), Err(FitError::MigradNotRun("Minos")));
        session.migrad(10);
        assert!(session.hesse().is_ok());
        session.set_value("b", 1.).unwrap();
        assert_eq!(session.stage(), FitStage::Initialized);
        assert_eq!(session.hesse(), Err(FitError::MigradNotRun("Hesse")));
    }

    #[test]
    fn quadratic_errors() {
        let mut session = FitSession::new(&TwoMeasurements, two_parameters());
        let migrad = session.migrad(10);
        assert!(migrad.is_converged());
        assert_relative_eq!(migrad.params[0].value, 1., epsilon = 1e-3);
        assert_relative_eq!(migrad.params[1].value, -2., epsilon = 1e-2);

        let hesse = session.hesse().unwrap();
        assert_relative_eq!(hesse.params[0].error, 0.5, max_relative = 1e-4);
        assert_relative_eq!(hesse.params[1].error, 2., max_relative = 1e-4);

        let minos = session.minos(&["a", "b"], 3).unwrap();
        assert_eq!(session.stage(), FitStage::Minos);
        for (param, sigma) in minos.params.iter().zip([0.5, 2.]) {
            let err = param.minos.unwrap();
            assert!(err.is_valid());
            assert_relative_eq!(err.upper, sigma, max_relative = 1e-2);
            assert_relative_eq!(err.lower, -sigma, max_relative = 1e-2);
        }
        assert_eq!(
            session.minos(&["c"], 3),
            Err(FitError::UnknownParameter("c".to_owned()))
        );
    }

    /// χ² of the measurement 1 ± 0.5, answering 0 to the first few calls
    /// after being armed
    struct IntermittentlyFlat {
        flat_calls: Cell<usize>,
    }
    //
    impl Objective for IntermittentlyFlat {
        fn value(&self, params: &[Float]) -> Float {
            let flat_calls = self.flat_calls.get();
            if flat_calls > 0 {
                self.flat_calls.set(flat_calls - 1);
                return 0.;
            }
            ((params[0] - 1.) / 0.5).powi(2)
        }
    }

    #[test]
    fn unbracketed_crossings_are_retried() {
        let objective = IntermittentlyFlat {
            flat_calls: Cell::new(0),
        };
        let params = ParameterSet::new(vec![Parameter::new("a", 0., 0.1)]).unwrap();
        let mut session = FitSession::new(&objective, params);
        assert!(session.migrad(MIGRAD_RETRIES).is_converged());

        // The lower crossing search of the first attempt only sees a flat
        // profile, which never reaches the target
        objective.flat_calls.set(30);
        let minos = session.minos(&["a"], MINOS_RETRIES).unwrap();
        assert_eq!(objective.flat_calls.get(), 0);
        let err = minos.params[0].minos.unwrap();
        assert!(err.is_valid());
        assert_relative_eq!(err.lower, -0.5, max_relative = 1e-2);
        assert_relative_eq!(err.upper, 0.5, max_relative = 1e-2);
    }

    #[test]
    fn flat_directions_leave_minos_invalid() {
        struct Flat;
        impl Objective for Flat {
            fn value(&self, _params: &[Float]) -> Float {
                1.
            }
        }
        let params = ParameterSet::new(vec![Parameter::new("a", 0., 0.1)]).unwrap();
        let mut session = FitSession::new(&Flat, params);
        session.migrad(MIGRAD_RETRIES);
        let minos = session.minos(&["a"], MINOS_RETRIES).unwrap();
        let err = minos.params[0].minos.unwrap();
        assert!(!err.lower_valid);
        assert!(!err.upper_valid);
        assert!(err.lower < 0. && err.upper > 0.);
    }

    #[test]
    fn fixed_parameters_are_left_alone() {
        let mut session = FitSession::new(&TwoMeasurements, two_parameters());
        session.fix("b").unwrap();
        let result = session.migrad(10);
        assert_relative_eq!(result.params[0].value, 1., epsilon = 1e-3);
        assert_eq!(result.params[1].value, 0.);
        assert_eq!(result.params[1].error, 0.);
        assert_eq!(result.num_free(), 1);
        let minos = session.minos(&["b"], 3).unwrap();
        assert_eq!(minos.params[1].minos, None);
    }

    #[test]
    fn unbinned_slope_fit() {
        // f = 1 + a x, with as many points at x = 0.5 as at x = -0.5
        let data = (0..100)
            .map(|idx| (if idx % 2 == 0 { 0.5 } else { -0.5 }, 0.))
            .collect::<Vec<_>>();
        let model = Polynomial2D::new(1, 0);
        let nll = UnbinnedNll::new(&data, &model, (-1., 1.), (-1., 1.));
        let params = ParameterSet::new(vec![
            Parameter::new("c00", 1., 0.1).fixed(),
            Parameter::new("c10", 0.3, 0.1),
        ])
        .unwrap();
        let mut session = FitSession::new(&nll, params);
        let result = session.migrad(10);
        assert!(result.is_converged());
        let slope = result.params[1].value;
        assert_relative_eq!(slope, 0., epsilon = 5e-3);

        let hesse = session.hesse().unwrap();
        assert_relative_eq!(hesse.params[1].error, 0.2, max_relative = 1e-2);

        // NLL rises by 1/2 when 1 - a²/4 = exp(-1/100)
        let crossing = sqrt(4. * (1. - exp(-0.01)));
        let minos = session.minos(&["c10"], 3).unwrap();
        let err = minos.params[1].minos.unwrap();
        assert!(err.is_valid());
        assert_relative_eq!(slope + err.upper, crossing, epsilon = 5e-4);
        assert_relative_eq!(slope + err.lower, -crossing, epsilon = 5e-4);
    }
}
