//! Fitting engine: bounded-retry minimisation of binned and unbinned
//! objectives, error matrix and asymmetric errors
//!
//! A fit is driven through a [`FitSession`], which borrows its objective and
//! owns everything else: parameters, minimiser state, random jitter source.
//! Sessions share nothing, so independent fits may run concurrently.

pub mod chi2;
pub mod hesse;
pub mod migrad;
pub mod minos;
pub mod nll;
pub mod parameter;
pub mod retry;
pub mod session;

pub use self::{
    chi2::{BinDiagnostic, BinnedChi2, Chi2Diagnostics},
    migrad::{Minimizer, Minimum, MinimizerStatus, VariableMetric},
    minos::MinosError,
    nll::UnbinnedNll,
    parameter::{Parameter, ParameterSet},
    retry::{retry_bounded, Retried},
    session::{FitParameter, FitResult, FitSession, FitStage, FitStatus},
};

use crate::numeric::Float;
use thiserror::Error;

/// Objective values at or above this magnitude denote a numerical blow-up
pub const MAX_REASONABLE_OBJECTIVE: Float = 1e20;

/// Default attempt budget of `FitSession::migrad`
pub const MIGRAD_RETRIES: usize = 10;

/// Default attempt budget of `FitSession::minos`
pub const MINOS_RETRIES: usize = 3;

/// Scalar function of the parameters to be minimised
pub trait Objective {
    /// Value of the objective at a point of parameter space
    ///
    /// Invalid regions of parameter space may be signalled by a non-finite
    /// value, which the minimiser will step away from.
    ///
    fn value(&self, params: &[Float]) -> Float;

    /// Objective increase that defines a one-sigma error
    ///
    /// This is 1 for chi-square objectives and 0.5 for negative
    /// log-likelihoods.
    ///
    fn error_def(&self) -> Float {
        1.
    }
}
//
impl<O: Objective + ?Sized> Objective for &O {
    fn value(&self, params: &[Float]) -> Float {
        (**self).value(params)
    }

    fn error_def(&self) -> Float {
        (**self).error_def()
    }
}

/// Errors which can occur while setting up or driving a fit
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FitError {
    /// Hesse and Minos need the best point found by Migrad
    #[error("{0} was called before Migrad")]
    MigradNotRun(&'static str),

    /// A parameter name did not match any fit parameter
    #[error("unknown fit parameter \"{0}\"")]
    UnknownParameter(String),

    /// Two fit parameters share the same name
    #[error("duplicate fit parameter \"{0}\"")]
    DuplicateParameter(String),

    /// Parameter limits are empty or exclude the starting value
    #[error("invalid limits [{low}, {high}] for parameter \"{name}\" starting at {value}")]
    InvalidLimits {
        /// Parameter name
        name: String,
        /// Lower limit
        low: Float,
        /// Upper limit
        high: Float,
        /// Starting value
        value: Float,
    },

    /// Parameter steps must be positive
    #[error("step of parameter \"{0}\" must be positive")]
    InvalidStep(String),

    /// The Hessian matrix could not be inverted
    #[error("the Hessian matrix is not invertible at the minimum")]
    SingularHessian,
}
