//! Uniformly binned 2D histograms

use crate::numeric::Float;
use nalgebra::DMatrix;
use prefix_num_ops::real::*;

/// Uniform binning of one histogram axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Axis {
    /// Number of bins
    pub bins: usize,

    /// Lower edge of the first bin
    pub low: Float,

    /// Upper edge of the last bin
    pub high: Float,
}
//
impl Axis {
    /// Set up an axis
    pub fn new(bins: usize, low: Float, high: Float) -> Self {
        assert!(bins > 0, "An axis needs at least one bin");
        assert!(high > low, "Axis bounds must be increasing");
        Self { bins, low, high }
    }

    /// Width of each bin
    pub fn width(&self) -> Float {
        (self.high - self.low) / self.bins as Float
    }

    /// Bin holding a coordinate, None for underflow and overflow
    ///
    /// Bins include their lower edge and exclude their upper edge, except for
    /// the last bin which also holds the upper edge of the axis, so that
    /// cosines clamped to exactly 1 are kept.
    ///
    pub fn index(&self, x: Float) -> Option<usize> {
        if !(x >= self.low && x <= self.high) {
            return None;
        }
        let idx = ((x - self.low) / self.width()) as usize;
        Some(idx.min(self.bins - 1))
    }

    /// Lower and upper edges of a bin
    pub fn edges(&self, idx: usize) -> (Float, Float) {
        let width = self.width();
        let low = self.low + idx as Float * width;
        (low, low + width)
    }

    /// Center of a bin
    pub fn center(&self, idx: usize) -> Float {
        let (low, high) = self.edges(idx);
        (low + high) / 2.
    }
}

/// 2D histogram with per-bin sum of weights and sum of squared weights
#[derive(Clone, Debug, PartialEq)]
pub struct Hist2D {
    /// Horizontal axis
    x_axis: Axis,

    /// Vertical axis
    y_axis: Axis,

    /// Sum of weights, indexed by (x bin, y bin)
    sum_w: DMatrix<Float>,

    /// Sum of squared weights
    sum_w2: DMatrix<Float>,

    /// Number of fills that landed outside of the axes
    out_of_range: usize,
}
//
impl Hist2D {
    /// Create an empty histogram
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            x_axis,
            y_axis,
            sum_w: DMatrix::zeros(x_axis.bins, y_axis.bins),
            sum_w2: DMatrix::zeros(x_axis.bins, y_axis.bins),
            out_of_range: 0,
        }
    }

    /// Horizontal axis
    pub fn x_axis(&self) -> &Axis {
        &self.x_axis
    }

    /// Vertical axis
    pub fn y_axis(&self) -> &Axis {
        &self.y_axis
    }

    /// Total number of bins
    pub fn num_bins(&self) -> usize {
        self.x_axis.bins * self.y_axis.bins
    }

    /// Area of one bin
    pub fn bin_area(&self) -> Float {
        self.x_axis.width() * self.y_axis.width()
    }

    /// Record a weighted entry, returns false if it fell outside of the axes
    pub fn fill(&mut self, x: Float, y: Float, weight: Float) -> bool {
        match (self.x_axis.index(x), self.y_axis.index(y)) {
            (Some(i), Some(j)) => {
                self.sum_w[(i, j)] += weight;
                self.sum_w2[(i, j)] += weight * weight;
                true
            }
            _ => {
                self.out_of_range += 1;
                false
            }
        }
    }

    /// Content of a bin
    pub fn content(&self, i: usize, j: usize) -> Float {
        self.sum_w[(i, j)]
    }

    /// Statistical uncertainty on the content of a bin
    pub fn error(&self, i: usize, j: usize) -> Float {
        sqrt(self.sum_w2[(i, j)])
    }

    /// Overwrite the content and uncertainty of a bin
    pub fn set(&mut self, i: usize, j: usize, content: Float, error: Float) {
        self.sum_w[(i, j)] = content;
        self.sum_w2[(i, j)] = error * error;
    }

    /// Sum of the contents of all bins
    pub fn integral(&self) -> Float {
        self.sum_w.sum()
    }

    /// Number of fills that landed outside of the axes
    pub fn out_of_range(&self) -> usize {
        self.out_of_range
    }

    /// Iterate over bins as (i, j, content, error)
    pub fn bins(&self) -> impl Iterator<Item = (usize, usize, Float, Float)> + '_ {
        (0..self.x_axis.bins).flat_map(move |i| {
            (0..self.y_axis.bins).map(move |j| (i, j, self.content(i, j), self.error(i, j)))
        })
    }

    /// Add the contents of another histogram with the same binning
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(self.x_axis, other.x_axis, "Merged histograms must share axes");
        assert_eq!(self.y_axis, other.y_axis, "Merged histograms must share axes");
        self.sum_w += &other.sum_w;
        self.sum_w2 += &other.sum_w2;
        self.out_of_range += other.out_of_range;
    }
}
