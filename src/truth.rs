//! Generator-level ("truth") information of simulated events

use crate::{
    angles::{AngularObservables, DecayKinematics},
    candidate::{with_mass, Candidate, B_MASS, KSHORT_MASS, KSTAR_MASS, MUON_MASS, PION_MASS},
    momentum::FourMomentum,
    numeric::Float,
};
use nalgebra::Vector3;

/// Maximal (η, φ) distance between a reconstructed and a generated particle
/// for them to be considered the same particle
pub const MAX_DELTA_R: Float = 0.15;

/// Generated B± → K*±(→ K⁰_S π±) μ⁺μ⁻ decay
///
/// Only momenta are known at generator level, so nominal masses are attached
/// to every particle.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratorDecay {
    /// Charge of the generated B
    pub b_charge: i32,

    /// Charge of the K* charged track
    pub track_charge: i32,

    /// B momentum (GeV)
    pub b_momentum: Vector3<Float>,

    /// K* momentum (GeV)
    pub kstar_momentum: Vector3<Float>,

    /// Charged pion momentum (GeV)
    pub track_momentum: Vector3<Float>,

    /// K⁰_S momentum (GeV)
    pub kshort_momentum: Vector3<Float>,

    /// K⁰_S decay vertex (cm)
    pub kshort_vertex: Vector3<Float>,

    /// Positive pion from the K⁰_S (GeV)
    pub pi_plus_momentum: Vector3<Float>,

    /// Negative pion from the K⁰_S (GeV)
    pub pi_minus_momentum: Vector3<Float>,

    /// Positive muon momentum (GeV)
    pub mu_plus_momentum: Vector3<Float>,

    /// Negative muon momentum (GeV)
    pub mu_minus_momentum: Vector3<Float>,
}
//
impl GeneratorDecay {
    // ### 4-MOMENTA ###

    /// B 4-momentum
    pub fn b(&self) -> FourMomentum {
        with_mass(&self.b_momentum, B_MASS)
    }

    /// K* 4-momentum
    pub fn kstar(&self) -> FourMomentum {
        with_mass(&self.kstar_momentum, KSTAR_MASS)
    }

    /// K* charged track 4-momentum
    pub fn track(&self) -> FourMomentum {
        with_mass(&self.track_momentum, PION_MASS)
    }

    /// K⁰_S 4-momentum
    pub fn kshort(&self) -> FourMomentum {
        with_mass(&self.kshort_momentum, KSHORT_MASS)
    }

    /// Positive pion from the K⁰_S
    pub fn pi_plus(&self) -> FourMomentum {
        with_mass(&self.pi_plus_momentum, PION_MASS)
    }

    /// Negative pion from the K⁰_S
    pub fn pi_minus(&self) -> FourMomentum {
        with_mass(&self.pi_minus_momentum, PION_MASS)
    }

    /// Positive muon
    pub fn mu_plus(&self) -> FourMomentum {
        with_mass(&self.mu_plus_momentum, MUON_MASS)
    }

    /// Negative muon
    pub fn mu_minus(&self) -> FourMomentum {
        with_mass(&self.mu_minus_momentum, MUON_MASS)
    }

    // ### ANGULAR ANALYSIS ###

    /// 4-momenta of the decay chain
    pub fn kinematics(&self) -> DecayKinematics {
        DecayKinematics {
            b_charge: self.b_charge,
            b: self.b(),
            kstar: self.kstar(),
            track: self.track(),
            mu_plus: self.mu_plus(),
            mu_minus: self.mu_minus(),
        }
    }

    /// Generator-level angular observables, q² being the dimuon mass squared
    pub fn observables(&self) -> AngularObservables {
        let kinematics = self.kinematics();
        AngularObservables::compute(&kinematics, kinematics.dimuon().mass2())
    }

    /// Match the particles of a reconstructed candidate to this decay
    pub fn match_candidate(&self, cand: &Candidate) -> TruthMatch {
        let close = |reco: FourMomentum, gen: FourMomentum| reco.delta_r(&gen) < MAX_DELTA_R;
        let mu_plus = close(cand.mu_plus(), self.mu_plus());
        let mu_minus = close(cand.mu_minus(), self.mu_minus());
        let kshort = close(cand.kshort(), self.kshort());
        let kstar = kshort && close(cand.kstar(), self.kstar());
        TruthMatch {
            mu_plus,
            mu_minus,
            kshort,
            kstar,
            b: kstar && mu_plus && mu_minus,
        }
    }
}

/// Outcome of the ΔR matching of a candidate to the generated decay
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TruthMatch {
    /// Positive muon is matched
    pub mu_plus: bool,

    /// Negative muon is matched
    pub mu_minus: bool,

    /// K⁰_S is matched
    pub kshort: bool,

    /// K* is matched (requires a matched K⁰_S)
    pub kstar: bool,

    /// Whole B decay is matched
    pub b: bool,
}
