//! Binned chi-square between a 2D histogram and a model function

use super::Objective;
use crate::{histogram::Hist2D, model::Model2D, numeric::Float};

/// Penalty per histogram bin, added when the model goes negative
const NEGATIVITY_PENALTY_PER_BIN: Float = 100.;

/// Chi-square of a histogram with respect to a model
///
/// The model prediction for a bin is its average over the bin, i.e. its
/// integral divided by the bin area. Bins with a null error carry no
/// information and are skipped.
///
pub struct BinnedChi2<'a, M: Model2D + ?Sized> {
    hist: &'a Hist2D,
    model: &'a M,
}
//
impl<'a, M: Model2D + ?Sized> BinnedChi2<'a, M> {
    /// Compare a histogram with a model
    pub fn new(hist: &'a Hist2D, model: &'a M) -> Self {
        Self { hist, model }
    }

    /// Average model value over bin (i, j)
    fn prediction(&self, params: &[Float], i: usize, j: usize) -> Float {
        let x_range = self.hist.x_axis().edges(i);
        let y_range = self.hist.y_axis().edges(j);
        self.model.integral(params, x_range, y_range) / self.hist.bin_area()
    }

    /// Bare chi-square, without the negativity penalty
    pub fn chi2(&self, params: &[Float]) -> Float {
        self.hist
            .bins()
            .filter(|&(_, _, _, error)| error > 0.)
            .map(|(i, j, content, error)| {
                let pull = (self.prediction(params, i, j) - content) / error;
                pull * pull
            })
            .sum()
    }

    /// Penalty added when the model is negative somewhere on the histogram
    pub fn penalty(&self, params: &[Float]) -> Float {
        let (x_axis, y_axis) = (self.hist.x_axis(), self.hist.y_axis());
        let min = self
            .model
            .minimum(params, (x_axis.low, x_axis.high), (y_axis.low, y_axis.high));
        if min < 0. {
            NEGATIVITY_PENALTY_PER_BIN * self.hist.num_bins() as Float
        } else {
            0.
        }
    }

    /// Goodness-of-fit diagnostics at some parameter values
    pub fn diagnostics(&self, params: &[Float], free_params: usize) -> Chi2Diagnostics {
        let mut chi2 = 0.;
        let mut used_bins = 0;
        let bins = self
            .hist
            .bins()
            .filter(|&(_, _, _, error)| error > 0.)
            .map(|(i, j, content, error)| {
                let bias = self.prediction(params, i, j) - content;
                let pull = bias / error;
                chi2 += pull * pull;
                used_bins += 1;
                BinDiagnostic {
                    i,
                    j,
                    pull,
                    ratio: (content != 0.).then(|| 1. + bias / content),
                }
            })
            .collect();
        Chi2Diagnostics {
            chi2,
            dof: used_bins as i64 - free_params as i64,
            bins,
        }
    }
}
//
impl<M: Model2D + ?Sized> Objective for BinnedChi2<'_, M> {
    fn value(&self, params: &[Float]) -> Float {
        self.chi2(params) + self.penalty(params)
    }
}

/// Pull and fit/measurement ratio of one bin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinDiagnostic {
    /// Bin index along x
    pub i: usize,

    /// Bin index along y
    pub j: usize,

    /// (prediction - content) / error
    pub pull: Float,

    /// prediction / content, if the content is not zero
    pub ratio: Option<Float>,
}

/// Goodness-of-fit summary of a binned fit
#[derive(Clone, Debug, PartialEq)]
pub struct Chi2Diagnostics {
    /// Chi-square without penalty
    pub chi2: Float,

    /// Number of bins used, minus the number of free parameters
    pub dof: i64,

    /// Per-bin pulls and ratios
    pub bins: Vec<BinDiagnostic>,
}
//
impl Chi2Diagnostics {
    /// Reduced chi-square, if there is at least one degree of freedom
    pub fn chi2_per_dof(&self) -> Option<Float> {
        (self.dof > 0).then(|| self.chi2 / self.dof as Float)
    }
}
