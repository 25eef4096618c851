//! Fit parameters and the mapping between their external values and the
//! unbounded internal coordinates seen by the minimiser
//!
//! Parameters with limits [a, b] go through the sine transform
//! `ext = a + (b - a) (sin(int) + 1) / 2`, so that the minimiser can move
//! freely while the objective only ever sees values inside the limits.

use super::FitError;
use crate::numeric::{Float, TINY};
use prefix_num_ops::real::*;

/// Keeps internal coordinates of limited parameters off the exact limits,
/// where the transform has a vanishing derivative
const LIMIT_MARGIN: Float = 1e-8;

/// Largest internal step of a limited parameter (radians)
const MAX_INTERNAL_STEP: Float = 1.;

/// One fit parameter
#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    /// Name used in fit reports and to address the parameter
    pub name: String,

    /// Current value
    pub value: Float,

    /// Initial step size, which sets the scale of the first moves
    pub step: Float,

    /// Optional (lower, upper) limits
    pub limits: Option<(Float, Float)>,

    /// Fixed parameters are not touched by the minimiser
    pub fixed: bool,
}
//
impl Parameter {
    /// Free parameter without limits
    pub fn new(name: impl Into<String>, value: Float, step: Float) -> Self {
        Self {
            name: name.into(),
            value,
            step,
            limits: None,
            fixed: false,
        }
    }

    /// Restrict the parameter to an interval
    pub fn with_limits(mut self, low: Float, high: Float) -> Self {
        self.limits = Some((low, high));
        self
    }

    /// Make the parameter fixed
    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Check that the parameter can be fitted
    fn validate(&self) -> Result<(), FitError> {
        if !(self.step > 0.) {
            return Err(FitError::InvalidStep(self.name.clone()));
        }
        if let Some((low, high)) = self.limits {
            if !(low < high && self.value >= low && self.value <= high) {
                return Err(FitError::InvalidLimits {
                    name: self.name.clone(),
                    low,
                    high,
                    value: self.value,
                });
            }
        }
        Ok(())
    }

    /// Internal coordinate of an external value
    pub fn to_internal(&self, external: Float) -> Float {
        match self.limits {
            None => external,
            Some((low, high)) => {
                let bound = 1. - LIMIT_MARGIN;
                let sin = (2. * (external - low) / (high - low) - 1.).clamp(-bound, bound);
                sin.asin()
            }
        }
    }

    /// External value of an internal coordinate
    pub fn to_external(&self, internal: Float) -> Float {
        match self.limits {
            None => internal,
            Some((low, high)) => low + (high - low) / 2. * (sin(internal) + 1.),
        }
    }

    /// Derivative of the external value with respect to the internal one
    pub fn d_external(&self, internal: Float) -> Float {
        match self.limits {
            None => 1.,
            Some((low, high)) => (high - low) / 2. * cos(internal),
        }
    }

    /// Step size in internal coordinates, at the current value
    pub fn internal_step(&self) -> Float {
        match self.limits {
            None => self.step,
            Some(_) => {
                let d = abs(self.d_external(self.to_internal(self.value)));
                if d > TINY {
                    (self.step / d).min(MAX_INTERNAL_STEP)
                } else {
                    MAX_INTERNAL_STEP
                }
            }
        }
    }

    /// Whether an external value sits on one of the limits
    pub fn at_limit(&self, value: Float) -> bool {
        self.limits.map_or(false, |(low, high)| {
            let margin = (high - low) * LIMIT_MARGIN * 10.;
            value <= low + margin || value >= high - margin
        })
    }
}

/// Ordered set of fit parameters
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSet(Vec<Parameter>);
//
impl ParameterSet {
    /// Validate and collect parameters
    pub fn new(params: Vec<Parameter>) -> Result<Self, FitError> {
        for (idx, param) in params.iter().enumerate() {
            param.validate()?;
            if params[..idx].iter().any(|other| other.name == param.name) {
                return Err(FitError::DuplicateParameter(param.name.clone()));
            }
        }
        Ok(Self(params))
    }

    /// Number of parameters, fixed ones included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Truth that there are no parameters at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over parameters
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter()
    }

    /// Access a parameter by position
    pub fn get(&self, idx: usize) -> &Parameter {
        &self.0[idx]
    }

    /// Position of a named parameter
    pub fn index_of(&self, name: &str) -> Result<usize, FitError> {
        self.0
            .iter()
            .position(|param| param.name == name)
            .ok_or_else(|| FitError::UnknownParameter(name.to_owned()))
    }

    /// Fix a named parameter at its current value
    pub fn fix(&mut self, name: &str) -> Result<(), FitError> {
        let idx = self.index_of(name)?;
        self.0[idx].fixed = true;
        Ok(())
    }

    /// Let a named parameter float again
    pub fn release(&mut self, name: &str) -> Result<(), FitError> {
        let idx = self.index_of(name)?;
        self.0[idx].fixed = false;
        Ok(())
    }

    /// Change the value of a named parameter
    pub fn set_value(&mut self, name: &str, value: Float) -> Result<(), FitError> {
        let idx = self.index_of(name)?;
        let mut param = self.0[idx].clone();
        param.value = value;
        param.validate()?;
        self.0[idx] = param;
        Ok(())
    }

    /// Current external values of all parameters
    pub fn values(&self) -> Vec<Float> {
        self.0.iter().map(|param| param.value).collect()
    }

    /// Overwrite the external values of all parameters
    pub(crate) fn set_values(&mut self, values: &[Float]) {
        assert_eq!(values.len(), self.len(), "One value per parameter expected");
        for (param, &value) in self.0.iter_mut().zip(values) {
            param.value = value;
        }
    }

    /// Fix a parameter at a value, clamped to its limits
    pub(crate) fn pin(&mut self, idx: usize, value: Float) {
        let param = &mut self.0[idx];
        param.value = match param.limits {
            Some((low, high)) => value.clamp(low, high),
            None => value,
        };
        param.fixed = true;
    }

    /// Positions of the free parameters
    pub fn free_indices(&self) -> Vec<usize> {
        (0..self.len()).filter(|&idx| !self.0[idx].fixed).collect()
    }

    /// Number of free parameters
    pub fn num_free(&self) -> usize {
        self.0.iter().filter(|param| !param.fixed).count()
    }

    /// Internal coordinates of the free parameters
    pub fn to_internal(&self) -> Vec<Float> {
        self.free()
            .map(|param| param.to_internal(param.value))
            .collect()
    }

    /// External values of all parameters, free ones being taken from
    /// internal coordinates
    pub fn to_external(&self, internal: &[Float]) -> Vec<Float> {
        let mut internal = internal.iter();
        self.0
            .iter()
            .map(|param| {
                if param.fixed {
                    param.value
                } else {
                    internal
                        .next()
                        .map_or(param.value, |&int| param.to_external(int))
                }
            })
            .collect()
    }

    /// Internal step sizes of the free parameters
    pub fn internal_steps(&self) -> Vec<Float> {
        self.free().map(Parameter::internal_step).collect()
    }

    /// Derivatives of external values w.r.t. internal coordinates, for free
    /// parameters
    pub fn jacobian(&self, internal: &[Float]) -> Vec<Float> {
        self.free()
            .zip(internal)
            .map(|(param, &int)| param.d_external(int))
            .collect()
    }

    /// Iterate over free parameters
    fn free(&self) -> impl Iterator<Item = &Parameter> {
        self.0.iter().filter(|param| !param.fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::floats::consts::FRAC_PI_2;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn validation() {
        let ok = ParameterSet::new(vec![
            Parameter::new("a", 0., 0.1),
            Parameter::new("b", 1., 0.1).with_limits(-10., 10.),
        ]);
        assert!(ok.is_ok());
        assert_eq!(
            ParameterSet::new(vec![Parameter::new("a", 0., 0.1), Parameter::new("a", 1., 0.1)]),
            Err(FitError::DuplicateParameter("a".to_owned()))
        );
        assert!(matches!(
            ParameterSet::new(vec![Parameter::new("a", 11., 0.1).with_limits(-10., 10.)]),
            Err(FitError::InvalidLimits { .. })
        ));
        assert_eq!(
            ParameterSet::new(vec![Parameter::new("a", 0., 0.)]),
            Err(FitError::InvalidStep("a".to_owned()))
        );
    }

    #[test]
    fn fixed_parameters_keep_their_value() {
        let mut set = ParameterSet::new(vec![
            Parameter::new("a", 1., 0.1),
            Parameter::new("b", 2., 0.1),
            Parameter::new("c", 3., 0.1),
        ])
        .unwrap();
        set.fix("b").unwrap();
        assert_eq!(set.free_indices(), vec![0, 2]);
        assert_eq!(set.to_internal(), vec![1., 3.]);
        assert_eq!(set.to_external(&[5., 7.]), vec![5., 2., 7.]);
        set.release("b").unwrap();
        assert_eq!(set.num_free(), 3);
        assert_eq!(
            set.fix("d"),
            Err(FitError::UnknownParameter("d".to_owned()))
        );
    }

    #[test]
    fn limits_reached_at_quarter_turns() {
        let param = Parameter::new("x", 0., 1e-4).with_limits(-10., 10.);
        assert_relative_eq!(param.to_external(FRAC_PI_2), 10.);
        assert_relative_eq!(param.to_external(-FRAC_PI_2), -10.);
        assert_relative_eq!(param.to_internal(0.), 0.);
        assert_relative_eq!(param.internal_step(), 1e-5, epsilon = 1e-15);
        assert!(param.at_limit(10.));
        assert!(!param.at_limit(9.9));
    }

    proptest! {
        #[test]
        fn sine_transform_round_trip(value in -9.99..9.99f64, internal in -100.0..100.0f64) {
            let param = Parameter::new("x", 0., 0.1).with_limits(-10., 10.);
            let ext = param.to_external(internal);
            prop_assert!((-10. ..=10.).contains(&ext));
            prop_assert!((param.to_external(param.to_internal(value)) - value).abs() < 1e-9);
        }
    }
}
