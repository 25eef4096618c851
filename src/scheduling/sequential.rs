//! Sequential back-end of the event processing

use crate::{event::Event, resacc::ResultsAccumulator, scheduling::EVENT_BATCH_SIZE};

/// Process events in sequential mode
///
/// We use batched logic even in sequential mode, in order to achieve
/// reproducibility with respect to multi-threaded runs.
///
pub fn run_selection_impl(
    events: &[Event],
    process_events: impl Send + Sync + Fn(&[Event]) -> ResultsAccumulator,
) -> ResultsAccumulator {
    // Initialize the accumulator with the first batch of events
    let first_batch_size = events.len().min(EVENT_BATCH_SIZE);
    let (first_batch, other_events) = events.split_at(first_batch_size);
    let mut accumulator = process_events(first_batch);

    // Process and integrate the other batches (if any)
    for batch in other_events.chunks(EVENT_BATCH_SIZE) {
        accumulator.merge(process_events(batch));
    }

    // Return the final accumulated results
    accumulator
}
