//! This module defines the properties and storage of recorded events

use crate::{candidate::Candidate, truth::GeneratorDecay};
use std::fmt::{self, Display};

/// Identifier of an event within a dataset
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct EventId {
    /// Run number
    pub run: u64,

    /// Event number within the run
    pub event: u64,
}
//
impl Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.run, self.event)
    }
}

/// Storage for one event: its B candidates and, for simulation, the
/// generated decay
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    /// Event identifier
    pub id: EventId,

    /// Reconstructed candidates, in ntuple order
    pub candidates: Vec<Candidate>,

    /// Generated decay, only available in simulation
    pub truth: Option<GeneratorDecay>,
}
//
impl Event {
    /// Build an event with no candidate and no truth information
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}
