//! This module contains everything that is needed to store and summarize the
//! final results of the event selection

use crate::{histogram::Hist2D, numeric::Float, record::EventRecord};
use std::fmt;

/// Event counters of the selection
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SelectionStats {
    /// Number of processed events
    pub events: usize,

    /// Events with a selected candidate
    pub selected: usize,

    /// Events written with generator-level information only
    pub truth_only: usize,

    /// Selected candidates fully matched to the generated decay
    pub truth_matched: usize,

    /// Selected candidates whose angles could not be computed
    pub undefined_angles: usize,

    /// Selected candidates which entered the angular histogram
    pub in_q2_bin: usize,
}
//
impl SelectionStats {
    /// Add the counters of another batch
    pub fn merge(&mut self, other: &Self) {
        self.events += other.events;
        self.selected += other.selected;
        self.truth_only += other.truth_only;
        self.truth_matched += other.truth_matched;
        self.undefined_angles += other.undefined_angles;
        self.in_q2_bin += other.in_q2_bin;
    }

    /// Fraction of events with a selected candidate
    pub fn selection_efficiency(&self) -> Option<Float> {
        (self.events > 0).then(|| self.selected as Float / self.events as Float)
    }
}
//
impl fmt::Display for SelectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events, {} selected, {} truth-only, {} truth-matched, {} with undefined angles, \
             {} in the q² bin",
            self.events,
            self.selected,
            self.truth_only,
            self.truth_matched,
            self.undefined_angles,
            self.in_q2_bin
        )
    }
}

/// Final results of the event selection
#[derive(Clone, Debug, PartialEq)]
pub struct FinalResults {
    /// Output rows, in event order
    pub records: Vec<EventRecord>,

    /// (cosθ_L, cosθ_K) histogram of the selected candidates in the q² bin
    pub histogram: Hist2D,

    /// Event counters
    pub stats: SelectionStats,
}
//
impl FinalResults {
    /// Display a short summary on the standard output
    pub fn print_summary(&self) {
        println!("Selection      : {}", self.stats);
        if let Some(efficiency) = self.stats.selection_efficiency() {
            println!("Efficiency     : {efficiency:.4}");
        }
        println!(
            "Histogram      : {} entries, {} out of range",
            self.histogram.integral(),
            self.histogram.out_of_range()
        );
    }
}
