//! This module takes care of scheduling the event processing work,
//! encapsulating use of multiple threads

#[cfg(feature = "multi-threading")]
mod multi_threading;
#[cfg(not(feature = "multi-threading"))]
mod sequential;

use crate::{event::Event, resacc::ResultsAccumulator, resfin::FinalResults};

/// Size of the processed event batches
///
/// Events are grouped in batches of a certain size, whose results are merged
/// in batch order. This makes sequential and parallel runs produce the same
/// output.
///
const EVENT_BATCH_SIZE: usize = 10_000;

/// Process events in the manner that was configured at build time
///
/// Takes as parameters the events to be processed, and a kernel that turns a
/// batch of events into accumulated results.
///
/// Returns the finalized results
///
pub fn run_selection(
    events: &[Event],
    process_events: impl Send + Sync + Fn(&[Event]) -> ResultsAccumulator,
) -> FinalResults {
    // Integrate results...
    let accumulator = {
        // ...in sequential mode
        #[cfg(not(feature = "multi-threading"))]
        {
            sequential::run_selection_impl(events, process_events)
        }

        // ...in multi-threaded mode
        #[cfg(feature = "multi-threading")]
        {
            multi_threading::run_selection_impl(events, process_events)
        }
    };

    // Finalize the results
    accumulator.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::EventId,
        histogram::Axis,
        q2bins,
        record::EventRecord,
        selection::Selection,
    };

    #[test]
    fn batches_are_merged_in_order() {
        let events = (0..2 * EVENT_BATCH_SIZE as u64 + 17)
            .map(|event| Event::new(EventId { run: 1, event }))
            .collect::<Vec<_>>();
        let Some(bin) = q2bins::find("full") else {
            panic!("The full q² range should be defined");
        };
        let results = run_selection(&events, |batch| {
            let mut acc = ResultsAccumulator::new(Axis::new(2, -1., 1.), Axis::new(2, -1., 1.));
            for event in batch {
                let record = EventRecord {
                    id: event.id,
                    n_candidates: 0,
                    selection: Selection::default(),
                    reco: None,
                    gen: None,
                };
                acc.integrate(record, bin);
            }
            acc
        });
        assert_eq!(results.stats.events, events.len());
        assert_eq!(results.records.len(), events.len());
        assert!(results
            .records
            .iter()
            .zip(&events)
            .all(|(record, event)| record.id == event.id));
    }

    #[test]
    fn no_event_gives_empty_results() {
        let results = run_selection(&[], |batch| {
            assert!(batch.is_empty());
            ResultsAccumulator::new(Axis::new(1, -1., 1.), Axis::new(1, -1., 1.))
        });
        assert_eq!(results.stats.events, 0);
        assert!(results.records.is_empty());
    }
}
