//! Output rows of the selection, one per selected candidate
//!
//! Reconstructed columns are always written. Generator-level columns carry a
//! `gen` prefix and are only written for simulated datasets, together with
//! the truth matching flags of the selected candidate.

use crate::{
    angles::{AngularObservables, UNDEFINED},
    candidate::Candidate,
    event::EventId,
    momentum::FourMomentum,
    numeric::Float,
    selection::Selection,
    truth::{GeneratorDecay, TruthMatch},
};
use nalgebra::Vector3;

/// Number of reconstruction-level columns
pub const RECO_WIDTH: usize = 33;

/// Names of the reconstruction-level columns, in output order
pub const RECO_COLUMNS: [&str; RECO_WIDTH] = [
    "Q2",
    "Bmass",
    "CosThetaL",
    "CosThetaK",
    "Phi",
    "Mumumass",
    "Mumumasserr",
    "Kstarmass",
    "Kshortmass",
    "nB",
    "nPassing",
    "BIndex",
    "Bchg",
    "Bpt",
    "Beta",
    "Bphi",
    "Bvtxcl",
    "Blxysig",
    "Bcosalphabs",
    "Bcosalphabs2d",
    "Bctau",
    "Kshortpt",
    "Pimpt",
    "Pimeta",
    "Pimphi",
    "Pippt",
    "Pipeta",
    "Pipphi",
    "Trkpt",
    "Trkdcasigbs",
    "Dimupt",
    "Dimueta",
    "Dimuphi",
];

/// Number of generator-level columns
pub const GEN_WIDTH: usize = 41;

/// Names of the generator-level columns, in output order
pub const GEN_COLUMNS: [&str; GEN_WIDTH] = [
    "genBChg",
    "genBPt",
    "genBEta",
    "genBPhi",
    "genMupPt",
    "genMupEta",
    "genMupPhi",
    "genMumPt",
    "genMumEta",
    "genMumPhi",
    "genDimuPt",
    "genDimuEta",
    "genDimuPhi",
    "genKstPt",
    "genKstEta",
    "genKstPhi",
    "genTkChg",
    "genTkPt",
    "genTkEta",
    "genTkPhi",
    "genKPt",
    "genKEta",
    "genKPhi",
    "genKVtxX",
    "genKVtxY",
    "genKVtxZ",
    "genPipPt",
    "genPipEta",
    "genPipPhi",
    "genPimPt",
    "genPimEta",
    "genPimPhi",
    "genQ2",
    "genCosThetaL",
    "genCosThetaK",
    "genPhi",
    "genIsTrueB",
    "genIsTrueMup",
    "genIsTrueMum",
    "genIsTrueK",
    "genIsTrueKst",
];

/// Transverse momentum, pseudorapidity and azimuth of a particle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Direction {
    /// Transverse momentum (GeV)
    pub pt: Float,

    /// Pseudorapidity
    pub eta: Float,

    /// Azimuthal angle
    pub phi: Float,
}
//
impl From<FourMomentum> for Direction {
    fn from(p: FourMomentum) -> Self {
        Self {
            pt: p.pt(),
            eta: p.eta(),
            phi: p.phi(),
        }
    }
}

/// Reconstruction-level part of an output row
#[derive(Clone, Debug, PartialEq)]
pub struct RecoRecord {
    /// Number of candidates in the event
    pub n_candidates: usize,

    /// Outcome of the candidate selection
    pub selection: Selection,

    /// Charge of the selected B
    pub charge: i32,

    /// Angular observables of the selected candidate
    pub observables: AngularObservables,

    /// Fitted B mass (GeV)
    pub b_mass: Float,

    /// Fitted dimuon mass and its uncertainty (GeV)
    pub dimuon_mass: (Float, Float),

    /// Fitted K* mass (GeV)
    pub kstar_mass: Float,

    /// K⁰_S mass under the nominal mass hypothesis (GeV)
    pub kshort_mass: Float,

    /// B direction
    pub b: Direction,

    /// B vertex fit confidence level
    pub vertex_cl: Float,

    /// Flight length significance
    pub lxy_significance: Float,

    /// Pointing angle cosines w.r.t. the beam spot, 3D and transverse
    pub cos_alpha_bs: (Float, Float),

    /// Proper decay length (cm)
    pub ctau: Float,

    /// K⁰_S transverse momentum (GeV)
    pub kshort_pt: Float,

    /// Negative pion from the K⁰_S
    pub pi_minus: Direction,

    /// Positive pion from the K⁰_S
    pub pi_plus: Direction,

    /// K* track transverse momentum (GeV)
    pub track_pt: Float,

    /// K* track impact parameter significance
    pub track_dca_significance: Float,

    /// Dimuon system
    pub dimuon: Direction,
}
//
impl RecoRecord {
    /// Describe the selected candidate of an event
    pub fn new(cand: &Candidate, n_candidates: usize, selection: Selection) -> Self {
        Self {
            n_candidates,
            selection,
            charge: cand.charge,
            observables: cand.observables(),
            b_mass: cand.b_mass,
            dimuon_mass: (cand.dimuon_mass, cand.dimuon_mass_err),
            kstar_mass: cand.kstar_mass,
            kshort_mass: cand.kshort().mass(),
            b: cand.b().into(),
            vertex_cl: cand.vertex_cl,
            lxy_significance: cand.flight_significance(),
            cos_alpha_bs: (cand.cos_alpha_bs, cand.cos_alpha_bs_2d),
            ctau: cand.ctau,
            kshort_pt: cand.kshort_pt(),
            pi_minus: cand.pi_minus().into(),
            pi_plus: cand.pi_plus().into(),
            track_pt: cand.track_pt(),
            track_dca_significance: cand.track_dca_significance(),
            dimuon: (cand.mu_plus() + cand.mu_minus()).into(),
        }
    }

    /// Column values, in the order of `RECO_COLUMNS`
    pub fn values(&self) -> [Float; RECO_WIDTH] {
        let obs = &self.observables;
        [
            obs.q2,
            self.b_mass,
            obs.cos_theta_l,
            obs.cos_theta_k,
            obs.phi,
            self.dimuon_mass.0,
            self.dimuon_mass.1,
            self.kstar_mass,
            self.kshort_mass,
            self.n_candidates as Float,
            self.selection.passing as Float,
            self.selection.index_or_sentinel() as Float,
            self.charge as Float,
            self.b.pt,
            self.b.eta,
            self.b.phi,
            self.vertex_cl,
            self.lxy_significance,
            self.cos_alpha_bs.0,
            self.cos_alpha_bs.1,
            self.ctau,
            self.kshort_pt,
            self.pi_minus.pt,
            self.pi_minus.eta,
            self.pi_minus.phi,
            self.pi_plus.pt,
            self.pi_plus.eta,
            self.pi_plus.phi,
            self.track_pt,
            self.track_dca_significance,
            self.dimuon.pt,
            self.dimuon.eta,
            self.dimuon.phi,
        ]
    }

    /// Column values of a row without a selected candidate
    pub fn absent_values(n_candidates: usize, selection: Selection) -> [Float; RECO_WIDTH] {
        let mut values = [0.; RECO_WIDTH];
        let obs = AngularObservables::undefined();
        values[..5].copy_from_slice(&[obs.q2, 0., obs.cos_theta_l, obs.cos_theta_k, obs.phi]);
        values[9] = n_candidates as Float;
        values[10] = selection.passing as Float;
        values[11] = selection.index_or_sentinel() as Float;
        values
    }
}

/// Generator-level part of an output row
#[derive(Clone, Debug, PartialEq)]
pub struct GenRecord {
    /// Charges of the B and of the K* track
    pub charges: (i32, i32),

    /// Generated B
    pub b: Direction,

    /// Generated positive muon
    pub mu_plus: Direction,

    /// Generated negative muon
    pub mu_minus: Direction,

    /// Generated dimuon system
    pub dimuon: Direction,

    /// Generated K*
    pub kstar: Direction,

    /// Generated K* charged track
    pub track: Direction,

    /// Generated K⁰_S
    pub kshort: Direction,

    /// Generated positive pion from the K⁰_S
    pub pi_plus: Direction,

    /// Generated negative pion from the K⁰_S
    pub pi_minus: Direction,

    /// K⁰_S decay vertex (cm)
    pub kshort_vertex: Vector3<Float>,

    /// Generator-level angular observables
    pub observables: AngularObservables,

    /// Truth matching of the selected candidate, if any
    pub truth_match: TruthMatch,
}
//
impl GenRecord {
    /// Describe the generated decay of an event
    pub fn new(decay: &GeneratorDecay, truth_match: TruthMatch) -> Self {
        Self {
            charges: (decay.b_charge, decay.track_charge),
            b: decay.b().into(),
            mu_plus: decay.mu_plus().into(),
            mu_minus: decay.mu_minus().into(),
            dimuon: (decay.mu_plus() + decay.mu_minus()).into(),
            kstar: decay.kstar().into(),
            track: decay.track().into(),
            kshort: decay.kshort().into(),
            pi_plus: decay.pi_plus().into(),
            pi_minus: decay.pi_minus().into(),
            kshort_vertex: decay.kshort_vertex,
            observables: decay.observables(),
            truth_match,
        }
    }

    /// Column values, in the order of `GEN_COLUMNS`
    pub fn values(&self) -> [Float; GEN_WIDTH] {
        let obs = &self.observables;
        let flag = |b: bool| if b { 1. } else { 0. };
        let tm = &self.truth_match;
        let vtx = &self.kshort_vertex;
        [
            self.charges.0 as Float,
            self.b.pt,
            self.b.eta,
            self.b.phi,
            self.mu_plus.pt,
            self.mu_plus.eta,
            self.mu_plus.phi,
            self.mu_minus.pt,
            self.mu_minus.eta,
            self.mu_minus.phi,
            self.dimuon.pt,
            self.dimuon.eta,
            self.dimuon.phi,
            self.kstar.pt,
            self.kstar.eta,
            self.kstar.phi,
            self.charges.1 as Float,
            self.track.pt,
            self.track.eta,
            self.track.phi,
            self.kshort.pt,
            self.kshort.eta,
            self.kshort.phi,
            vtx.x,
            vtx.y,
            vtx.z,
            self.pi_plus.pt,
            self.pi_plus.eta,
            self.pi_plus.phi,
            self.pi_minus.pt,
            self.pi_minus.eta,
            self.pi_minus.phi,
            obs.q2,
            obs.cos_theta_l,
            obs.cos_theta_k,
            obs.phi,
            flag(tm.b),
            flag(tm.mu_plus),
            flag(tm.mu_minus),
            flag(tm.kshort),
            flag(tm.kstar),
        ]
    }

    /// Column values of a simulated event which lacks generator information
    pub fn absent_values() -> [Float; GEN_WIDTH] {
        let mut values = [0.; GEN_WIDTH];
        values[0] = UNDEFINED;
        values[16] = UNDEFINED;
        values[33..36].fill(UNDEFINED);
        values
    }
}

/// One row of the output table
#[derive(Clone, Debug, PartialEq)]
pub struct EventRecord {
    /// Event identifier
    pub id: EventId,

    /// Number of candidates in the event
    pub n_candidates: usize,

    /// Outcome of the candidate selection
    pub selection: Selection,

    /// Selected candidate, if any
    pub reco: Option<RecoRecord>,

    /// Generated decay, for simulation
    pub gen: Option<GenRecord>,
}
//
impl EventRecord {
    /// Column names of the output table
    pub fn header(with_truth: bool) -> Vec<&'static str> {
        let mut header = vec!["Run", "Event"];
        header.extend_from_slice(&RECO_COLUMNS);
        if with_truth {
            header.extend_from_slice(&GEN_COLUMNS);
        }
        header
    }

    /// Column values, excluding the event identifier
    pub fn values(&self, with_truth: bool) -> Vec<Float> {
        let mut values = Vec::with_capacity(RECO_WIDTH + GEN_WIDTH);
        match &self.reco {
            Some(reco) => values.extend_from_slice(&reco.values()),
            None => values.extend_from_slice(&RecoRecord::absent_values(
                self.n_candidates,
                self.selection,
            )),
        }
        if with_truth {
            match &self.gen {
                Some(gen) => values.extend_from_slice(&gen.values()),
                None => values.extend_from_slice(&GenRecord::absent_values()),
            }
        }
        values
    }

    /// Angular observables that should enter histograms, if any
    pub fn observables(&self) -> Option<&AngularObservables> {
        self.reco.as_ref().map(|reco| &reco.observables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        angles::is_undefined, candidate::tests::passing_candidate, truth::tests::matching_decay,
    };
    use approx::assert_relative_eq;

    fn column(name: &str, with_truth: bool) -> usize {
        EventRecord::header(with_truth)
            .iter()
            .position(|&col| col == name)
            .unwrap()
            - 2
    }

    #[test]
    fn generator_columns_are_prefixed() {
        assert!(GEN_COLUMNS.iter().all(|name| name.starts_with("gen")));
        assert!(RECO_COLUMNS.iter().all(|name| !name.starts_with("gen")));
        assert_eq!(EventRecord::header(false).len(), 2 + RECO_WIDTH);
        assert_eq!(EventRecord::header(true).len(), 2 + RECO_WIDTH + GEN_WIDTH);
    }

    #[test]
    fn selected_candidate_row() {
        let cand = passing_candidate(0.5);
        let selection = Selection {
            index: Some(1),
            passing: 2,
        };
        let decay = matching_decay();
        let record = EventRecord {
            id: EventId { run: 1, event: 42 },
            n_candidates: 3,
            selection,
            reco: Some(RecoRecord::new(&cand, 3, selection)),
            gen: Some(GenRecord::new(&decay, decay.match_candidate(&cand))),
        };
        let values = record.values(true);
        assert_eq!(values.len(), RECO_WIDTH + GEN_WIDTH);
        assert_relative_eq!(values[column("Q2", true)], 6.25, epsilon = 1e-12);
        assert_eq!(values[column("BIndex", true)], 1.);
        assert_eq!(values[column("nB", true)], 3.);
        assert_eq!(values[column("nPassing", true)], 2.);
        assert_relative_eq!(values[column("Blxysig", true)], 30., epsilon = 1e-12);
        assert_eq!(values[column("genIsTrueB", true)], 1.);
        assert_eq!(values[column("genKVtxZ", true)], 1.5);
        assert_eq!(record.values(false).len(), RECO_WIDTH);
    }

    #[test]
    fn truth_only_row() {
        let record = EventRecord {
            id: EventId::default(),
            n_candidates: 2,
            selection: Selection::default(),
            reco: None,
            gen: Some(GenRecord::new(&matching_decay(), TruthMatch::default())),
        };
        let values = record.values(true);
        assert_eq!(values[column("BIndex", true)], -1.);
        assert_eq!(values[column("nB", true)], 2.);
        assert!(is_undefined(values[column("CosThetaL", true)]));
        assert!(is_undefined(values[column("Phi", true)]));
        assert_eq!(values[column("genIsTrueB", true)], 0.);
        assert!(!is_undefined(values[column("genCosThetaK", true)]));
        assert!(record.observables().is_none());
    }

    #[test]
    fn missing_truth_uses_sentinels() {
        let values = GenRecord::absent_values();
        assert!(is_undefined(values[column("genBChg", true) - RECO_WIDTH]));
        assert!(is_undefined(values[column("genTkChg", true) - RECO_WIDTH]));
        assert!(is_undefined(values[column("genPhi", true) - RECO_WIDTH]));
        assert_eq!(values[column("genQ2", true) - RECO_WIDTH], 0.);
    }
}
