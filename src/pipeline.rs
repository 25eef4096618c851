//! Per-event processing kernel and the fit of the resulting angular histogram

use crate::{
    event::Event,
    fit::{
        BinnedChi2, Chi2Diagnostics, FitError, FitResult, FitSession, Objective, Parameter,
        ParameterSet,
    },
    histogram::{Axis, Hist2D},
    model::{Model2D, Polynomial2D},
    numeric::Float,
    q2bins::Q2Bin,
    record::{EventRecord, GenRecord, RecoRecord},
    resacc::ResultsAccumulator,
    selection::{CutProfile, ProfileRegistry, SelectionError},
    truth::TruthMatch,
};
use prefix_num_ops::real::*;
use tracing::{debug, info, warn};

/// Turns events into output rows and histogram entries
#[derive(Clone, Debug)]
pub struct EventProcessor {
    /// Candidate selection
    profile: CutProfile,

    /// Whether events carry generator-level information
    is_mc: bool,

    /// q² bin gating the histogram
    q2_bin: Q2Bin,

    /// Binning of cosθ_L
    x_axis: Axis,

    /// Binning of cosθ_K
    y_axis: Axis,
}
//
impl EventProcessor {
    /// Set up event processing with a named cut profile
    pub fn new(
        registry: &ProfileRegistry,
        profile_name: &str,
        is_mc: bool,
        q2_bin: Q2Bin,
        x_axis: Axis,
        y_axis: Axis,
    ) -> Result<Self, SelectionError> {
        Ok(Self {
            profile: registry.get(profile_name)?.clone(),
            is_mc,
            q2_bin,
            x_axis,
            y_axis,
        })
    }

    /// Process a batch of events
    pub fn process_batch(&self, events: &[Event]) -> ResultsAccumulator {
        let mut accumulator = ResultsAccumulator::new(self.x_axis, self.y_axis);
        for event in events {
            match self.process(event) {
                Some(record) => accumulator.integrate(record, &self.q2_bin),
                None => accumulator.skip_event(),
            }
        }
        accumulator
    }

    /// Output row of one event, if it should be written
    ///
    /// Events with a selected candidate are always written. In simulation,
    /// the generator-only profile writes the generated decay of every event.
    ///
    pub fn process(&self, event: &Event) -> Option<EventRecord> {
        let selection = self.profile.select(&event.candidates);
        let n_candidates = event.candidates.len();
        match selection.index {
            Some(idx) => {
                let cand = &event.candidates[idx];
                let gen = if self.is_mc {
                    event
                        .truth
                        .as_ref()
                        .map(|decay| GenRecord::new(decay, decay.match_candidate(cand)))
                } else {
                    None
                };
                Some(EventRecord {
                    id: event.id,
                    n_candidates,
                    selection,
                    reco: Some(RecoRecord::new(cand, n_candidates, selection)),
                    gen,
                })
            }
            None if self.is_mc && matches!(self.profile, CutProfile::GeneratorOnly) => {
                let Some(decay) = &event.truth else {
                    debug!("Event {} has no generated decay", event.id);
                    return None;
                };
                Some(EventRecord {
                    id: event.id,
                    n_candidates,
                    selection,
                    reco: None,
                    gen: Some(GenRecord::new(decay, TruthMatch::default())),
                })
            }
            None => None,
        }
    }
}

/// Settings of the histogram fit
#[derive(Clone, Debug, PartialEq)]
pub struct FitOptions {
    /// Migrad attempt budget
    pub migrad_retries: usize,

    /// Minos attempt budget, per parameter
    pub minos_retries: usize,

    /// Whether to recompute errors with Hesse
    pub run_hesse: bool,

    /// Whether to compute asymmetric errors of every free parameter
    pub run_minos: bool,

    /// Seed of the Migrad retry jitter
    pub seed: u64,
}

/// Outcome of the histogram fit
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramFit {
    /// Fitted parameters
    pub result: FitResult,

    /// Goodness-of-fit at the best point
    pub diagnostics: Chi2Diagnostics,
}

/// Fit a polynomial in (cosθ_L, cosθ_K) to a histogram
///
/// The model describes bin contents directly. Coefficients start from a flat
/// model at the mean bin content, with steps and limits scaled accordingly.
///
pub fn fit_histogram(
    hist: &Hist2D,
    model: &Polynomial2D,
    options: &FitOptions,
) -> Result<HistogramFit, FitError> {
    let mean = hist.integral() / hist.num_bins() as Float;
    let scale = abs(mean).max(1.);
    let params = ParameterSet::new(
        model
            .param_names()
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                let start = if idx == model.param_index(0, 0) { mean } else { 0. };
                Parameter::new(name, start, 1e-2 * scale).with_limits(-10. * scale, 10. * scale)
            })
            .collect(),
    )?;

    let objective = BinnedChi2::new(hist, model);
    info!(
        "Fitting {} parameters to {} bins, starting at chi2 = {}",
        params.num_free(),
        hist.num_bins(),
        objective.value(&params.values())
    );
    let mut session = FitSession::new(&objective, params).with_seed(options.seed);
    let mut result = session.migrad(options.migrad_retries);
    if options.run_hesse {
        match session.hesse() {
            Ok(hesse) => result = hesse,
            Err(e) => warn!("Hesse failed: {e}"),
        }
    }
    if options.run_minos {
        let names = model.param_names();
        let names = names.iter().map(String::as_str).collect::<Vec<_>>();
        result = session.minos(&names, options.minos_retries)?;
    }

    let diagnostics = objective.diagnostics(&result.values(), result.num_free());
    match diagnostics.chi2_per_dof() {
        Some(reduced) => info!("chi2/DoF = {} / {} = {reduced}", diagnostics.chi2, diagnostics.dof),
        None => warn!("The fit has no degree of freedom"),
    }
    Ok(HistogramFit {
        result,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        angles::is_undefined,
        candidate::tests::passing_candidate,
        event::EventId,
        q2bins,
        selection::{GENERATOR_ONLY_PROFILE, NO_CUT_PROFILE, STRICT_PROFILE},
        toy::{self, ToyError},
        truth::tests::matching_decay,
    };
    use approx::assert_relative_eq;

    fn processor(profile: &str, is_mc: bool, q2_key: &str) -> EventProcessor {
        let Some(&q2_bin) = q2bins::find(q2_key) else {
            panic!("Unknown q² bin {q2_key}");
        };
        EventProcessor::new(
            &ProfileRegistry::with_builtin(),
            profile,
            is_mc,
            q2_bin,
            Axis::new(5, -1., 1.),
            Axis::new(5, -1., 1.),
        )
        .unwrap()
    }

    fn event(number: u64, vertex_cls: &[Float], with_truth: bool) -> Event {
        Event {
            id: EventId { run: 1, event: number },
            candidates: vertex_cls.iter().map(|&cl| passing_candidate(cl)).collect(),
            truth: with_truth.then(matching_decay),
        }
    }

    #[test]
    fn unknown_profile_is_rejected() {
        let err = EventProcessor::new(
            &ProfileRegistry::with_builtin(),
            "tight",
            false,
            q2bins::Q2_BINS[0],
            Axis::new(1, -1., 1.),
            Axis::new(1, -1., 1.),
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::UnknownProfile("tight".to_owned()));
    }

    #[test]
    fn best_candidate_is_recorded() {
        let record = processor(STRICT_PROFILE, false, "full")
            .process(&event(1, &[0.3, 0.8, 0.05], true))
            .unwrap();
        assert_eq!(record.selection.index, Some(1));
        assert_eq!(record.selection.passing, 2);
        assert_eq!(record.n_candidates, 3);
        assert!(record.reco.is_some());
        // Data processing ignores generator information
        assert!(record.gen.is_none());
    }

    #[test]
    fn simulation_rows_carry_truth_matching() {
        let record = processor(STRICT_PROFILE, true, "full")
            .process(&event(1, &[0.5], true))
            .unwrap();
        let gen = record.gen.unwrap();
        assert!(gen.truth_match.b);
    }

    #[test]
    fn events_without_selection_are_skipped() {
        let processor = processor(STRICT_PROFILE, true, "full");
        assert_eq!(processor.process(&event(1, &[0.01], true)), None);
        assert_eq!(processor.process(&event(2, &[], true)), None);
    }

    #[test]
    fn generator_only_rows() {
        let processor = processor(GENERATOR_ONLY_PROFILE, true, "full");
        let record = processor.process(&event(1, &[0.5], true)).unwrap();
        assert_eq!(record.selection.index, None);
        assert!(record.reco.is_none());
        let values = record.values(true);
        assert_eq!(values[11], -1.);
        assert!(is_undefined(values[2]));
        assert!(record.gen.is_some());
        assert_eq!(processor.process(&event(2, &[0.5], false)), None);
        // Generator-only data has nothing to write
        let data = self::processor(GENERATOR_ONLY_PROFILE, false, "full");
        assert_eq!(data.process(&event(3, &[0.5], true)), None);
    }

    #[test]
    fn histogram_is_gated_by_the_q2_bin() {
        let events = (0..10)
            .map(|number| event(number, &[0.5], true))
            .collect::<Vec<_>>();
        // The test candidate has a dimuon mass of 2.5 GeV, i.e. q² = 6.25 GeV²
        let inside = processor(NO_CUT_PROFILE, true, "belowJpsi")
            .process_batch(&events)
            .finalize();
        assert_eq!(inside.stats.events, 10);
        assert_eq!(inside.stats.selected, 10);
        assert_eq!(inside.stats.truth_matched, 10);
        assert_eq!(inside.stats.in_q2_bin, 10);
        assert_relative_eq!(inside.histogram.integral(), 10.);
        let outside = processor(NO_CUT_PROFILE, true, "abovePsi2s")
            .process_batch(&events)
            .finalize();
        assert_eq!(outside.records.len(), 10);
        assert_eq!(outside.stats.in_q2_bin, 0);
        assert_eq!(outside.histogram.integral(), 0.);
    }

    #[test]
    fn polynomial_fit_of_a_toy_histogram() {
        let model = Polynomial2D::new(2, 1);
        let truth = [50., 5., -4., 2., 8., 1.];
        let hist = toy::asimov(
            &model,
            &truth,
            Axis::new(8, -1., 1.),
            Axis::new(8, -1., 1.),
            ToyError::Statistical,
        );
        let options = FitOptions {
            migrad_retries: 10,
            minos_retries: 3,
            run_hesse: true,
            run_minos: false,
            seed: 1,
        };
        let fit = fit_histogram(&hist, &model, &options).unwrap();
        assert!(fit.result.is_converged());
        for (fitted, expected) in fit.result.values().into_iter().zip(truth) {
            assert_relative_eq!(fitted, expected, epsilon = 0.1);
        }
        assert_eq!(fit.diagnostics.dof, 64 - 6);
        assert!(fit.diagnostics.chi2 < 1e-2);
        assert!(fit.result.params.iter().all(|param| param.error > 0.));
    }
}
