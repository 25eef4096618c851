//! Error matrix from numerical second derivatives at the minimum

use super::FitError;
use crate::numeric::{Float, TINY};
use nalgebra::{linalg::Cholesky, DMatrix};
use prefix_num_ops::real::*;

/// Number of refinements of each finite-difference step
const STEP_REFINEMENTS: usize = 3;

/// Maximal number of damping increases when inverting the Hessian
const MAX_DAMPING_ATTEMPTS: usize = 10;

/// Hessian matrix of `f` at `point`, from central second differences
///
/// The step along each axis starts from `steps` and is refined to a tenth of
/// the one-sigma distance implied by the local curvature and `up`.
///
pub fn hessian(
    f: &dyn Fn(&[Float]) -> Float,
    point: &[Float],
    steps: &[Float],
    up: Float,
) -> DMatrix<Float> {
    let n = point.len();
    let f0 = f(point);
    let shifted = |moves: &[(usize, Float)]| {
        let mut x = point.to_vec();
        for &(idx, delta) in moves {
            x[idx] += delta;
        }
        f(&x)
    };

    // Diagonal terms and step sizes
    let mut h = vec![0.; n];
    let mut hessian = DMatrix::<Float>::zeros(n, n);
    for i in 0..n {
        let floor = 1e-8 * abs(point[i]).max(1.);
        let mut step = abs(steps[i]).max(floor);
        let mut g2 = 0.;
        for _ in 0..STEP_REFINEMENTS {
            g2 = (shifted(&[(i, step)]) + shifted(&[(i, -step)]) - 2. * f0) / (step * step);
            if !(g2.is_finite() && g2 > TINY) {
                break;
            }
            let next_step = (0.1 * sqrt(2. * up / g2)).max(floor);
            if abs(next_step - step) < 0.1 * step {
                break;
            }
            step = next_step;
        }
        h[i] = step;
        hessian[(i, i)] = g2;
    }

    // Off-diagonal terms
    for i in 0..n {
        for j in 0..i {
            let (hi, hj) = (h[i], h[j]);
            let d2 = (shifted(&[(i, hi), (j, hj)]) - shifted(&[(i, hi), (j, -hj)])
                - shifted(&[(i, -hi), (j, hj)])
                + shifted(&[(i, -hi), (j, -hj)]))
                / (4. * hi * hj);
            hessian[(i, j)] = d2;
            hessian[(j, i)] = d2;
        }
    }
    hessian
}

/// Invert a Hessian matrix
///
/// A Cholesky decomposition is tried first, with a diagonal damping that
/// grows geometrically if the matrix is slightly indefinite. A general LU
/// inverse is the last resort. Inverses with non-positive variances are
/// rejected.
///
pub fn invert(hessian: &DMatrix<Float>) -> Option<DMatrix<Float>> {
    let n = hessian.nrows();
    let identity = DMatrix::<Float>::identity(n, n);
    let diag_scale = (0..n)
        .map(|i| abs(hessian[(i, i)]))
        .fold(0., Float::max)
        .max(1.);

    let mut damped = hessian.clone();
    let mut damping = 0.;
    for attempt in 0..MAX_DAMPING_ATTEMPTS {
        if let Some(chol) = Cholesky::new(damped.clone()) {
            return Some(chol.solve(&identity));
        }
        if attempt + 1 == MAX_DAMPING_ATTEMPTS {
            break;
        }
        let next_damping = if damping == 0. {
            diag_scale * 1e-9
        } else {
            damping * 10.
        };
        for i in 0..n {
            damped[(i, i)] += next_damping - damping;
        }
        damping = next_damping;
    }

    let inverse = hessian.clone().try_inverse()?;
    (0..n)
        .all(|i| inverse[(i, i)].is_finite() && inverse[(i, i)] > 0.)
        .then_some(inverse)
}

/// Covariance matrix `2 up H⁻¹` of the coordinates of `f` around `point`
pub fn covariance(
    f: &dyn Fn(&[Float]) -> Float,
    point: &[Float],
    steps: &[Float],
    up: Float,
) -> Result<DMatrix<Float>, FitError> {
    let hessian = hessian(f, point, steps, up);
    if hessian.iter().any(|x| !x.is_finite()) {
        return Err(FitError::SingularHessian);
    }
    invert(&hessian)
        .map(|inverse| 2. * up * inverse)
        .ok_or(FitError::SingularHessian)
}
