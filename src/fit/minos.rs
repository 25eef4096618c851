//! Asymmetric errors from the crossings of the profiled objective with
//! `f_min + up`

use crate::numeric::Float;
use prefix_num_ops::real::*;
use std::fmt;

/// Maximal number of interval doublings while bracketing a crossing
const MAX_BRACKETING: usize = 30;

/// Maximal number of refinements of a bracketed crossing
const MAX_REFINEMENTS: usize = 30;

/// Crossing precision, relative to the parabolic error
const CROSSING_PRECISION: Float = 1e-3;

/// Objective decrease, relative to `up`, that counts as a new minimum
const NEW_MINIMUM_THRESHOLD: Float = 1e-3;

/// Asymmetric error of one parameter
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinosError {
    /// Negative shift of the parameter to the lower crossing
    pub lower: Float,

    /// Positive shift of the parameter to the upper crossing
    pub upper: Float,

    /// Whether the lower crossing was found
    pub lower_valid: bool,

    /// Whether the upper crossing was found
    pub upper_valid: bool,
}
//
impl MinosError {
    /// Whether both crossings were found
    pub fn is_valid(&self) -> bool {
        self.lower_valid && self.upper_valid
    }
}
//
impl fmt::Display for MinosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |valid| if valid { "" } else { "*" };
        write!(
            f,
            "{:+.4e}{} {:+.4e}{}",
            self.lower,
            flag(self.lower_valid),
            self.upper,
            flag(self.upper_valid)
        )
    }
}

/// Value of the objective minimised over all other free parameters, with
/// the full external point where that minimum was reached
pub type Profile<'a> = dyn Fn(Float) -> (Float, Vec<Float>) + 'a;

/// Outcome of a one-sided crossing search
#[derive(Clone, Debug, PartialEq)]
pub enum Crossing {
    /// Crossing found at this (signed) shift from the minimum
    Found(Float),

    /// A parameter limit was hit first, at this (signed) shift
    AtLimit(Float),

    /// The profile stayed below the target over the whole search, which
    /// ended at this (signed) shift
    Unbracketed(Float),

    /// The profile went below the minimum, which is therefore not one
    NewMinimum {
        /// Full external point of the lower objective value
        point: Vec<Float>,

        /// Lower objective value
        value: Float,
    },
}

/// Search for the crossing of `profile` with `f_min + up` on one side of
/// `center`
///
/// `direction` is +1 for the upper crossing and -1 for the lower one, and
/// `sigma` is the parabolic error which sets the initial search distance.
///
pub fn find_crossing(
    profile: &Profile<'_>,
    center: Float,
    f_min: Float,
    up: Float,
    sigma: Float,
    direction: Float,
    limit: Option<Float>,
) -> Crossing {
    let sigma = if sigma.is_finite() && sigma > 0. {
        sigma
    } else {
        1e-3 * abs(center).max(1.)
    };
    let max_distance = limit.map(|limit| abs(limit - center));
    let target = f_min + up;

    // Objective excess over the target at some distance from the center
    let excess = |distance: Float| -> Result<Float, Crossing> {
        let (value, point) = profile(center + direction * distance);
        if value < f_min - NEW_MINIMUM_THRESHOLD * up {
            return Err(Crossing::NewMinimum { point, value });
        }
        Ok(if value.is_finite() {
            value - target
        } else {
            Float::INFINITY
        })
    };

    // Bracket the crossing by doubling the distance
    let (mut low, mut low_excess) = (0., -up);
    let mut high = sigma;
    let mut high_excess = Float::INFINITY;
    let mut bracketed = false;
    for _ in 0..MAX_BRACKETING {
        let at_limit = max_distance.map_or(false, |max| high >= max);
        if let Some(max) = max_distance {
            high = high.min(max);
        }
        high_excess = match excess(high) {
            Ok(excess) => excess,
            Err(crossing) => return crossing,
        };
        if high_excess >= 0. {
            bracketed = true;
            break;
        }
        if at_limit {
            return Crossing::AtLimit(direction * high);
        }
        low = high;
        low_excess = high_excess;
        high *= 2.;
    }
    if !bracketed {
        return Crossing::Unbracketed(direction * low);
    }

    // Refine, alternating regula falsi and bisection steps
    for iteration in 0..MAX_REFINEMENTS {
        if high - low < CROSSING_PRECISION * sigma {
            break;
        }
        let mid = if iteration % 2 == 0 && high_excess.is_finite() {
            let guess = low - low_excess * (high - low) / (high_excess - low_excess);
            let margin = 0.1 * (high - low);
            guess.clamp(low + margin, high - margin)
        } else {
            0.5 * (low + high)
        };
        let mid_excess = match excess(mid) {
            Ok(excess) => excess,
            Err(crossing) => return crossing,
        };
        if mid_excess >= 0. {
            high = mid;
            high_excess = mid_excess;
        } else {
            low = mid;
            low_excess = mid_excess;
        }
    }
    let crossing = if high_excess.is_finite() && high_excess > low_excess {
        low - low_excess * (high - low) / (high_excess - low_excess)
    } else {
        0.5 * (low + high)
    };
    Crossing::Found(direction * crossing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn parabola(sigma: Float) -> impl Fn(Float) -> (Float, Vec<Float>) {
        move |x| ((x / sigma).powi(2), vec![x])
    }

    #[test]
    fn symmetric_parabola() {
        let profile = parabola(0.3);
        for direction in [1., -1.] {
            let crossing = find_crossing(&profile, 0., 0., 1., 0.1, direction, None);
            match crossing {
                Crossing::Found(shift) => assert_relative_eq!(shift, direction * 0.3, epsilon = 1e-6),
                other => panic!("Unexpected crossing {other:?}"),
            }
        }
    }

    #[test]
    fn asymmetric_profile() {
        // Steeper on the right than on the left
        let profile = |x: Float| {
            let scale = if x > 1. { 0.5 } else { 2. };
            (((x - 1.) / scale).powi(2), vec![x])
        };
        match find_crossing(&profile, 1., 0., 1., 1., 1., None) {
            Crossing::Found(shift) => assert_relative_eq!(shift, 0.5, epsilon = 1e-6),
            other => panic!("Unexpected crossing {other:?}"),
        }
        match find_crossing(&profile, 1., 0., 1., 1., -1., None) {
            Crossing::Found(shift) => assert_relative_eq!(shift, -2., epsilon = 1e-6),
            other => panic!("Unexpected crossing {other:?}"),
        }
    }

    #[test]
    fn limit_stops_the_search() {
        let profile = parabola(5.);
        assert_eq!(
            find_crossing(&profile, 0., 0., 1., 1., 1., Some(2.)),
            Crossing::AtLimit(2.)
        );
    }

    #[test]
    fn flat_profile_is_not_a_limit() {
        let profile = |x: Float| (0.5, vec![x]);
        match find_crossing(&profile, 0., 0., 1., 1., -1., None) {
            Crossing::Unbracketed(shift) => assert!(shift < -1e6),
            other => panic!("Unexpected crossing {other:?}"),
        }
    }

    #[test]
    fn lower_value_is_reported() {
        let profile = |x: Float| (-(x * x), vec![x]);
        assert!(matches!(
            find_crossing(&profile, 0., 0., 1., 1., 1., None),
            Crossing::NewMinimum { .. }
        ));
    }

    #[test]
    fn display_flags_invalid_sides() {
        let err = MinosError {
            lower: -0.5,
            upper: 0.25,
            lower_valid: false,
            upper_valid: true,
        };
        assert!(!err.is_valid());
        assert_eq!(err.to_string(), "-5.0000e-1* +2.5000e-1");
    }
}
