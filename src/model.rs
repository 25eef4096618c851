//! Parametric model functions of (cosθ_L, cosθ_K)

use crate::numeric::Float;

/// Nodes of the 3-point Gauss-Legendre rule on [-1, 1]
const GAUSS_NODES: [Float; 3] = [-0.774_596_669_241_483_4, 0., 0.774_596_669_241_483_4];

/// Weights of the 3-point Gauss-Legendre rule on [-1, 1]
const GAUSS_WEIGHTS: [Float; 3] = [5. / 9., 8. / 9., 5. / 9.];

/// Number of grid intervals per axis used when looking for the minimum
const MINIMUM_GRID: usize = 20;

/// A real function of two variables with a vector of free parameters
pub trait Model2D {
    /// Number of parameters
    fn num_params(&self) -> usize;

    /// Name of each parameter
    fn param_names(&self) -> Vec<String> {
        (0..self.num_params()).map(|idx| format!("x{idx}")).collect()
    }

    /// Value of the function at (x, y)
    fn value(&self, params: &[Float], x: Float, y: Float) -> Float;

    /// Integral over the rectangle [x0, x1] × [y0, y1]
    ///
    /// The default implementation uses a 3×3 Gauss-Legendre rule, which is
    /// exact for polynomials up to degree 5 in each variable.
    ///
    fn integral(&self, params: &[Float], (x0, x1): (Float, Float), (y0, y1): (Float, Float)) -> Float {
        let (x_half, x_mid) = ((x1 - x0) / 2., (x1 + x0) / 2.);
        let (y_half, y_mid) = ((y1 - y0) / 2., (y1 + y0) / 2.);
        let mut sum = 0.;
        for (&u, &wu) in GAUSS_NODES.iter().zip(GAUSS_WEIGHTS.iter()) {
            for (&v, &wv) in GAUSS_NODES.iter().zip(GAUSS_WEIGHTS.iter()) {
                sum += wu * wv * self.value(params, x_mid + x_half * u, y_mid + y_half * v);
            }
        }
        sum * x_half * y_half
    }

    /// Smallest value of the function over a rectangle
    ///
    /// Scans a regular grid, then refines around the best grid point with a
    /// shrinking compass search.
    ///
    fn minimum(&self, params: &[Float], (x0, x1): (Float, Float), (y0, y1): (Float, Float)) -> Float {
        let (dx, dy) = ((x1 - x0) / MINIMUM_GRID as Float, (y1 - y0) / MINIMUM_GRID as Float);
        let mut best = (x0, y0, self.value(params, x0, y0));
        for i in 0..=MINIMUM_GRID {
            for j in 0..=MINIMUM_GRID {
                let (x, y) = (x0 + i as Float * dx, y0 + j as Float * dy);
                let f = self.value(params, x, y);
                if f < best.2 {
                    best = (x, y, f);
                }
            }
        }
        let (mut sx, mut sy) = (dx, dy);
        for _ in 0..40 {
            let (bx, by, _) = best;
            for (mx, my) in [(1., 0.), (-1., 0.), (0., 1.), (0., -1.)] {
                let x = (bx + mx * sx).clamp(x0, x1);
                let y = (by + my * sy).clamp(y0, y1);
                let f = self.value(params, x, y);
                if f < best.2 {
                    best = (x, y, f);
                }
            }
            if best.0 == bx && best.1 == by {
                sx /= 2.;
                sy /= 2.;
            }
        }
        best.2
    }
}

/// Polynomial Σ c_ij x^i y^j with 0 ≤ i ≤ x_order and 0 ≤ j ≤ y_order
///
/// Coefficient c_ij is parameter number `i * (y_order + 1) + j`.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Polynomial2D {
    /// Highest power of x
    pub x_order: usize,

    /// Highest power of y
    pub y_order: usize,
}
//
impl Polynomial2D {
    /// Set up a polynomial model
    pub fn new(x_order: usize, y_order: usize) -> Self {
        Self { x_order, y_order }
    }

    /// Index of coefficient c_ij in the parameter vector
    pub fn param_index(&self, i: usize, j: usize) -> usize {
        i * (self.y_order + 1) + j
    }
}
//
impl Model2D for Polynomial2D {
    fn num_params(&self) -> usize {
        (self.x_order + 1) * (self.y_order + 1)
    }

    fn param_names(&self) -> Vec<String> {
        (0..=self.x_order)
            .flat_map(|i| (0..=self.y_order).map(move |j| format!("c{i}{j}")))
            .collect()
    }

    fn value(&self, params: &[Float], x: Float, y: Float) -> Float {
        // Horner in x of polynomials in y
        (0..=self.x_order).rev().fold(0., |acc, i| {
            let row = &params[self.param_index(i, 0)..=self.param_index(i, self.y_order)];
            let in_y = row.iter().rev().fold(0., |acc_y, &c| acc_y * y + c);
            acc * x + in_y
        })
    }

    fn integral(&self, params: &[Float], (x0, x1): (Float, Float), (y0, y1): (Float, Float)) -> Float {
        let antiderivative = |a: Float, b: Float, power: usize| {
            let n = power as i32 + 1;
            (b.powi(n) - a.powi(n)) / n as Float
        };
        let mut sum = 0.;
        for i in 0..=self.x_order {
            let ix = antiderivative(x0, x1, i);
            for j in 0..=self.y_order {
                sum += params[self.param_index(i, j)] * ix * antiderivative(y0, y1, j);
            }
        }
        sum
    }
}
