//! Mechanism to pick at most one reconstructed candidate per event

use crate::{candidate::Candidate, numeric::Float};
use std::collections::HashMap;
use thiserror::Error;

/// Name of the strict profile used by the angular analysis
pub const STRICT_PROFILE: &str = "ANv18";

/// Alias of the strict profile
pub const DEFAULT_PROFILE: &str = "default";

/// Profile which accepts every candidate
pub const NO_CUT_PROFILE: &str = "nocut";

/// Profile which never selects anything, for truth-level studies
pub const GENERATOR_ONLY_PROFILE: &str = "genonly";

/// Errors which can occur when selecting candidates
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SelectionError {
    /// The requested cut profile was never registered
    #[error("unknown selection profile \"{0}\"")]
    UnknownProfile(String),
}

/// Thresholds of a strict cut profile
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds {
    /// Cut on minimum transverse momentum of the K* charged track (GeV)
    pub min_track_pt: Float,

    /// Cut on minimum track impact parameter significance w.r.t. beam spot
    pub min_track_dca_significance: Float,

    /// Cut on minimum K⁰_S transverse momentum (GeV)
    pub min_kshort_pt: Float,

    /// Cut on minimum B vertex fit confidence level
    pub min_vertex_cl: Float,

    /// Cut on minimum flight length significance
    pub min_flight_significance: Float,

    /// Cut on minimum cosine of the transverse pointing angle
    pub min_cos_alpha_bs_2d: Float,

    /// Window on the K* mass (GeV), bounds excluded
    pub kstar_mass_window: (Float, Float),

    /// Window on the B mass (GeV), bounds excluded
    pub b_mass_window: (Float, Float),
}
//
impl Thresholds {
    /// Cuts of the 2012 angular analysis note
    pub fn anv18() -> Self {
        Self {
            min_track_pt: 0.4,
            min_track_dca_significance: 0.4,
            min_kshort_pt: 1.0,
            min_vertex_cl: 0.1,
            min_flight_significance: 12.,
            min_cos_alpha_bs_2d: 0.9994,
            kstar_mass_window: (0.742, 1.042),
            b_mass_window: (4.5, 6.0),
        }
    }

    /// Decide whether a candidate passes all the cuts
    pub fn keep(&self, cand: &Candidate) -> bool {
        let inside = |x: Float, (low, high): (Float, Float)| x > low && x < high;
        cand.has_good_dimuon()
            && cand.track_pt() > self.min_track_pt
            && cand.track_dca_significance() > self.min_track_dca_significance
            && cand.kshort_pt() > self.min_kshort_pt
            && cand.vertex_cl > self.min_vertex_cl
            && cand.flight_significance() > self.min_flight_significance
            && cand.cos_alpha_bs_2d > self.min_cos_alpha_bs_2d
            && inside(cand.kstar_mass, self.kstar_mass_window)
            && inside(cand.b_mass, self.b_mass_window)
    }
}
//
impl Default for Thresholds {
    fn default() -> Self {
        Self::anv18()
    }
}

/// Cut profile, deciding which candidates are eligible for selection
#[derive(Clone, Debug, PartialEq)]
pub enum CutProfile {
    /// Conjunction of numeric thresholds
    Strict(Thresholds),

    /// Every candidate is eligible, though only a positive vertex CL can
    /// be selected
    NoCut,

    /// No candidate is ever eligible
    GeneratorOnly,
}
//
impl CutProfile {
    /// Decide whether a candidate is eligible under this profile
    pub fn keep(&self, cand: &Candidate) -> bool {
        match self {
            Self::Strict(thresholds) => thresholds.keep(cand),
            Self::NoCut => true,
            Self::GeneratorOnly => false,
        }
    }

    /// Select the best eligible candidate of an event
    ///
    /// The best candidate is the one with the highest vertex fit confidence
    /// level, which must be positive. Equal scores resolve to the lowest
    /// index. Eligible candidates with a vertex CL of 0 still count as
    /// passing, so `nocut` may count candidates without selecting any.
    ///
    pub fn select(&self, candidates: &[Candidate]) -> Selection {
        let mut best: Option<(usize, Float)> = None;
        let mut passing = 0;
        for (idx, cand) in candidates.iter().enumerate() {
            if !self.keep(cand) {
                continue;
            }
            passing += 1;
            if cand.vertex_cl > best.map_or(0., |(_, best_cl)| best_cl) {
                best = Some((idx, cand.vertex_cl));
            }
        }
        Selection {
            index: best.map(|(idx, _)| idx),
            passing,
        }
    }
}

/// Outcome of the candidate selection for one event
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Selection {
    /// Index of the selected candidate, if any
    pub index: Option<usize>,

    /// Number of candidates which passed the cuts
    pub passing: usize,
}
//
impl Selection {
    /// Selected index in the ntuple convention, where -1 means "none"
    pub fn index_or_sentinel(&self) -> i64 {
        self.index.map_or(-1, |idx| idx as i64)
    }
}

/// Set of named cut profiles
#[derive(Clone, Debug)]
pub struct ProfileRegistry(HashMap<String, CutProfile>);
//
impl ProfileRegistry {
    /// Registry with no profile at all
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Registry with the built-in profiles
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(STRICT_PROFILE, CutProfile::Strict(Thresholds::anv18()));
        registry.register(DEFAULT_PROFILE, CutProfile::Strict(Thresholds::anv18()));
        registry.register(NO_CUT_PROFILE, CutProfile::NoCut);
        registry.register(GENERATOR_ONLY_PROFILE, CutProfile::GeneratorOnly);
        registry
    }

    /// Add or replace a named profile
    pub fn register(&mut self, name: impl Into<String>, profile: CutProfile) {
        self.0.insert(name.into(), profile);
    }

    /// Look up a profile by name
    pub fn get(&self, name: &str) -> Result<&CutProfile, SelectionError> {
        self.0
            .get(name)
            .ok_or_else(|| SelectionError::UnknownProfile(name.to_owned()))
    }

    /// Select the best candidate of an event using a named profile
    pub fn select(
        &self,
        candidates: &[Candidate],
        profile_name: &str,
    ) -> Result<Selection, SelectionError> {
        Ok(self.get(profile_name)?.select(candidates))
    }
}
//
impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::tests::passing_candidate;
    use proptest::prelude::*;

    #[test]
    fn strict_profile_applies_every_cut() {
        let strict = Thresholds::anv18();
        assert!(strict.keep(&passing_candidate(0.5)));

        let low_cl = passing_candidate(0.05);
        assert!(!strict.keep(&low_cl));

        let mut heavy_kstar = passing_candidate(0.5);
        heavy_kstar.kstar_mass = 1.042;
        assert!(!strict.keep(&heavy_kstar));

        let mut short_flight = passing_candidate(0.5);
        short_flight.flight_length = 0.1;
        assert!(!strict.keep(&short_flight));

        let mut bad_muon = passing_candidate(0.5);
        bad_muon.mu_minus_quality.pixel_layers = 0;
        assert!(!strict.keep(&bad_muon));
    }

    #[test]
    fn highest_vertex_cl_wins() {
        let registry = ProfileRegistry::with_builtin();
        let cands = [
            passing_candidate(0.3),
            passing_candidate(0.8),
            passing_candidate(0.05),
            passing_candidate(0.6),
        ];
        let sel = registry.select(&cands, STRICT_PROFILE).unwrap();
        assert_eq!(sel.index, Some(1));
        assert_eq!(sel.passing, 3);
        assert_eq!(registry.select(&cands, DEFAULT_PROFILE).unwrap(), sel);
    }

    #[test]
    fn ties_resolve_to_lowest_index() {
        let registry = ProfileRegistry::with_builtin();
        let cands = [
            passing_candidate(0.2),
            passing_candidate(0.7),
            passing_candidate(0.7),
        ];
        for _ in 0..3 {
            let sel = registry.select(&cands, STRICT_PROFILE).unwrap();
            assert_eq!(sel.index, Some(1));
        }
    }

    #[test]
    fn nocut_needs_a_positive_vertex_cl() {
        let registry = ProfileRegistry::with_builtin();
        let sel = registry
            .select(&[passing_candidate(0.), passing_candidate(0.)], NO_CUT_PROFILE)
            .unwrap();
        assert_eq!(sel.index, None);
        assert_eq!(sel.passing, 2);
        let sel = registry
            .select(&[passing_candidate(0.), passing_candidate(1e-6)], NO_CUT_PROFILE)
            .unwrap();
        assert_eq!(sel.index, Some(1));
    }

    #[test]
    fn empty_event_selects_nothing() {
        let sel = ProfileRegistry::with_builtin()
            .select(&[], NO_CUT_PROFILE)
            .unwrap();
        assert_eq!(sel, Selection::default());
        assert_eq!(sel.index_or_sentinel(), -1);
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let registry = ProfileRegistry::with_builtin();
        assert_eq!(
            registry.select(&[passing_candidate(0.5)], "loose"),
            Err(SelectionError::UnknownProfile("loose".to_owned()))
        );
    }

    #[test]
    fn custom_profiles_can_be_registered() {
        let mut registry = ProfileRegistry::with_builtin();
        let loose = Thresholds {
            min_vertex_cl: 0.01,
            ..Thresholds::anv18()
        };
        registry.register("loose", CutProfile::Strict(loose));
        let sel = registry
            .select(&[passing_candidate(0.05)], "loose")
            .unwrap();
        assert_eq!(sel.index, Some(0));
    }

    proptest! {
        #[test]
        fn nocut_counts_everything(cls in prop::collection::vec(1e-9..1.0f64, 1..20)) {
            let cands = cls.iter().map(|&cl| passing_candidate(cl)).collect::<Vec<_>>();
            let registry = ProfileRegistry::with_builtin();
            let sel = registry.select(&cands, NO_CUT_PROFILE).unwrap();
            prop_assert_eq!(sel.passing, cands.len());
            let idx = sel.index.unwrap();
            prop_assert!(cls.iter().all(|&cl| cl <= cls[idx]));
            prop_assert!(cls[..idx].iter().all(|&cl| cl < cls[idx]));
        }

        #[test]
        fn genonly_never_selects(cls in prop::collection::vec(0.0..1.0f64, 0..20)) {
            let cands = cls.iter().map(|&cl| passing_candidate(cl)).collect::<Vec<_>>();
            let registry = ProfileRegistry::with_builtin();
            let sel = registry.select(&cands, GENERATOR_ONLY_PROFILE).unwrap();
            prop_assert_eq!(sel.index_or_sentinel(), -1);
            prop_assert_eq!(sel.passing, 0);
        }
    }
}
