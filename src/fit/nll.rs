//! Unbinned negative log-likelihood of a 2D dataset

use super::Objective;
use crate::{model::Model2D, numeric::Float};
use prefix_num_ops::real::*;

/// Negative log-likelihood of points under a model normalised over a domain
///
/// The model is used as an unnormalised density: each point contributes
/// `-ln(f(x, y) / ∫f)`. Parameter values for which the density is not
/// positive everywhere it is probed are rejected with an infinite value.
///
pub struct UnbinnedNll<'a, M: Model2D + ?Sized> {
    data: &'a [(Float, Float)],
    model: &'a M,
    x_range: (Float, Float),
    y_range: (Float, Float),
}
//
impl<'a, M: Model2D + ?Sized> UnbinnedNll<'a, M> {
    /// Set up the likelihood of `data` over the rectangle x_range × y_range
    pub fn new(
        data: &'a [(Float, Float)],
        model: &'a M,
        x_range: (Float, Float),
        y_range: (Float, Float),
    ) -> Self {
        Self {
            data,
            model,
            x_range,
            y_range,
        }
    }

    /// Number of data points
    pub fn num_points(&self) -> usize {
        self.data.len()
    }
}
//
impl<M: Model2D + ?Sized> Objective for UnbinnedNll<'_, M> {
    fn value(&self, params: &[Float]) -> Float {
        let norm = self.model.integral(params, self.x_range, self.y_range);
        if !(norm > 0.) {
            return Float::INFINITY;
        }
        let ln_norm = ln(norm);
        let mut nll = 0.;
        for &(x, y) in self.data {
            let density = self.model.value(params, x, y);
            if !(density > 0.) {
                return Float::INFINITY;
            }
            nll -= ln(density) - ln_norm;
        }
        nll
    }

    fn error_def(&self) -> Float {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Polynomial2D;
    use approx::assert_relative_eq;

    #[test]
    fn uniform_density() {
        let data = [(0.1, 0.2), (-0.5, 0.9), (0.7, -0.3)];
        let model = Polynomial2D::new(0, 0);
        let nll = UnbinnedNll::new(&data, &model, (-1., 1.), (-1., 1.));
        // Density 1/4 everywhere, whatever the normalisation
        for level in [0.5, 2.] {
            assert_relative_eq!(nll.value(&[level]), 3. * ln(4.), epsilon = 1e-12);
        }
        assert_eq!(nll.error_def(), 0.5);
        assert_eq!(nll.num_points(), 3);
    }

    #[test]
    fn non_positive_density_is_rejected() {
        let data = [(-0.9, 0.)];
        let model = Polynomial2D::new(1, 0);
        let nll = UnbinnedNll::new(&data, &model, (-1., 1.), (-1., 1.));
        // 1 + 2x is negative at x = -0.9 but has a positive integral
        assert_eq!(nll.value(&[1., 2.]), Float::INFINITY);
        assert_eq!(nll.value(&[0., 0.]), Float::INFINITY);
        assert!(nll.value(&[1., 0.5]).is_finite());
    }
}
