//! This module allows integrating selection results across processed events

use crate::{
    histogram::{Axis, Hist2D},
    q2bins::Q2Bin,
    record::EventRecord,
    resfin::{FinalResults, SelectionStats},
};

/// This struct accumulates the output rows and the angular histogram of a
/// batch of events, and ultimately produces the final results
#[derive(Clone, Debug, PartialEq)]
pub struct ResultsAccumulator {
    /// Output rows, in event order
    records: Vec<EventRecord>,

    /// (cosθ_L, cosθ_K) histogram of the selected candidates in the q² bin
    histogram: Hist2D,

    /// Event counters
    stats: SelectionStats,
}
//
impl ResultsAccumulator {
    /// Prepare for results integration
    pub fn new(x_axis: Axis, y_axis: Axis) -> Self {
        Self {
            records: Vec::new(),
            histogram: Hist2D::new(x_axis, y_axis),
            stats: SelectionStats::default(),
        }
    }

    /// Account for an event which produced no output row
    pub fn skip_event(&mut self) {
        self.stats.events += 1;
    }

    /// Integrate the output row of one event
    ///
    /// The angular observables of the selected candidate are histogrammed if
    /// its dimuon mass falls in the q² bin and the angles are defined.
    ///
    pub fn integrate(&mut self, record: EventRecord, q2_bin: &Q2Bin) {
        self.stats.events += 1;
        match &record.reco {
            Some(reco) => {
                self.stats.selected += 1;
                if record.gen.as_ref().map_or(false, |gen| gen.truth_match.b) {
                    self.stats.truth_matched += 1;
                }
                let observables = &reco.observables;
                if !observables.is_defined() {
                    self.stats.undefined_angles += 1;
                } else if q2_bin.contains_mass(reco.dimuon_mass.0) {
                    self.stats.in_q2_bin += 1;
                    self.histogram
                        .fill(observables.cos_theta_l, observables.cos_theta_k, 1.);
                }
            }
            None => self.stats.truth_only += 1,
        }
        self.records.push(record);
    }

    /// Integrate results from another ResultsAccumulator, whose events come
    /// after ours
    #[allow(clippy::needless_pass_by_value)]
    pub fn merge(&mut self, other: Self) {
        self.records.extend(other.records);
        self.histogram.merge(&other.histogram);
        self.stats.merge(&other.stats);
    }

    /// Turn accumulated data into finalized results
    pub fn finalize(self) -> FinalResults {
        FinalResults {
            records: self.records,
            histogram: self.histogram,
            stats: self.stats,
        }
    }
}
