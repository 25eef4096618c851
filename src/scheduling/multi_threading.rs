//! Multi-threaded back-end of the event processing

use crate::{event::Event, resacc::ResultsAccumulator, scheduling::EVENT_BATCH_SIZE};
use rayon::prelude::*;

/// Process events in multi-threaded mode
///
/// Batches are processed in parallel, but their results are merged in batch
/// order, so that the output does not depend on thread scheduling.
///
pub fn run_selection_impl(
    events: &[Event],
    process_events: impl Send + Sync + Fn(&[Event]) -> ResultsAccumulator,
) -> ResultsAccumulator {
    // Initialize the accumulator with the first batch of events, which also
    // covers the case where there is no event at all
    let first_batch_size = events.len().min(EVENT_BATCH_SIZE);
    let (first_batch, other_events) = events.split_at(first_batch_size);
    let first_result = process_events(first_batch);

    // Process the other batches in parallel, keeping their order
    let batch_results = other_events
        .par_chunks(EVENT_BATCH_SIZE)
        .map(&process_events)
        .collect::<Vec<_>>();

    // Merge the results in a reproducible fashion
    batch_results
        .into_iter()
        .fold(first_result, |mut acc, result| {
            acc.merge(result);
            acc
        })
}
