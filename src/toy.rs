//! Pseudo-data generated from a model: Asimov and fluctuated histograms,
//! and unbinned samples

use crate::{
    histogram::{Axis, Hist2D},
    model::Model2D,
    numeric::Float,
    random::RandomGenerator,
};
use prefix_num_ops::real::*;

/// Uncertainty assigned to toy histogram bins
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToyError {
    /// Same absolute error on every bin
    Absolute(Float),

    /// Error proportional to the bin content
    Relative(Float),

    /// Poisson-like error, square root of the content
    Statistical,
}
//
impl ToyError {
    /// Error of a bin with some expected content
    fn of(&self, content: Float) -> Float {
        match *self {
            Self::Absolute(error) => error,
            Self::Relative(fraction) => fraction * abs(content),
            Self::Statistical => sqrt(abs(content)),
        }
    }
}

/// Histogram whose contents are exactly the model's bin averages
pub fn asimov<M: Model2D + ?Sized>(
    model: &M,
    params: &[Float],
    x_axis: Axis,
    y_axis: Axis,
    error: ToyError,
) -> Hist2D {
    let mut hist = Hist2D::new(x_axis, y_axis);
    let area = hist.bin_area();
    for i in 0..x_axis.bins {
        for j in 0..y_axis.bins {
            let content = model.integral(params, x_axis.edges(i), y_axis.edges(j)) / area;
            hist.set(i, j, content, error.of(content));
        }
    }
    hist
}

/// Asimov histogram with every bin shifted by a Gaussian of its error
pub fn fluctuated<M: Model2D + ?Sized>(
    model: &M,
    params: &[Float],
    x_axis: Axis,
    y_axis: Axis,
    error: ToyError,
    rng: &mut RandomGenerator,
) -> Hist2D {
    let mut hist = asimov(model, params, x_axis, y_axis, error);
    for i in 0..x_axis.bins {
        for j in 0..y_axis.bins {
            let (mean, sigma) = (hist.content(i, j), hist.error(i, j));
            hist.set(i, j, rng.gaussian(mean, sigma), sigma);
        }
    }
    hist
}

/// Draw points from the model, used as a density, by accept-reject
///
/// Returns None if the model is not positive somewhere on the domain.
///
pub fn sample<M: Model2D + ?Sized>(
    model: &M,
    params: &[Float],
    (x_range, y_range): ((Float, Float), (Float, Float)),
    count: usize,
    rng: &mut RandomGenerator,
) -> Option<Vec<(Float, Float)>> {
    if !(model.minimum(params, x_range, y_range) > 0.) {
        return None;
    }
    let ceiling = 1.2 * grid_maximum(model, params, x_range, y_range);
    let mut points = Vec::with_capacity(count);
    while points.len() < count {
        let x = rng.uniform(x_range.0, x_range.1);
        let y = rng.uniform(y_range.0, y_range.1);
        if rng.random() * ceiling < model.value(params, x, y) {
            points.push((x, y));
        }
    }
    Some(points)
}

/// Largest model value on a regular grid, used as accept-reject ceiling
fn grid_maximum<M: Model2D + ?Sized>(
    model: &M,
    params: &[Float],
    (x0, x1): (Float, Float),
    (y0, y1): (Float, Float),
) -> Float {
    const GRID: usize = 40;
    let mut max = Float::MIN;
    for i in 0..=GRID {
        for j in 0..=GRID {
            let x = x0 + (x1 - x0) * i as Float / GRID as Float;
            let y = y0 + (y1 - y0) * j as Float / GRID as Float;
            max = max.max(model.value(params, x, y));
        }
    }
    max
}
