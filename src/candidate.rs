//! This module defines the reconstructed B⁺ → K*⁺(K⁰_S π⁺) μ⁺μ⁻ candidates
//! and the particle masses used to build their 4-momenta

use crate::{
    angles::{AngularObservables, DecayKinematics},
    momentum::FourMomentum,
    numeric::Float,
};
use nalgebra::Vector3;
use prefix_num_ops::real::*;

/// Nominal B⁺ mass (GeV)
pub const B_MASS: Float = 5.279;

/// Nominal K*⁺(892) mass (GeV)
pub const KSTAR_MASS: Float = 0.89166;

/// Muon mass (GeV)
pub const MUON_MASS: Float = 0.10565837;

/// Charged pion mass (GeV)
pub const PION_MASS: Float = 0.13957018;

/// K⁰_S mass (GeV)
pub const KSHORT_MASS: Float = 0.497614;

/// Track-level muon identification quantities
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MuonQuality {
    /// Whether the muon passed the global "good muon" flag
    pub is_good: bool,

    /// Number of tracker layers with measurements
    pub tracker_layers: u32,

    /// Number of pixel layers with measurements
    pub pixel_layers: u32,

    /// Normalized chi² of the inner track fit
    pub norm_chi2: Float,

    /// Transverse impact parameter w.r.t. the primary vertex (cm)
    pub dxy: Float,

    /// Longitudinal impact parameter w.r.t. the primary vertex (cm)
    pub dz: Float,
}
//
impl MuonQuality {
    /// Soft muon identification, close to the 2012 recommendation
    pub fn is_soft_muon(&self) -> bool {
        self.is_good
            && self.tracker_layers > 5
            && self.pixel_layers > 0
            && self.norm_chi2 < 1.8
            && abs(self.dxy) < 0.3
            && abs(self.dz) < 20.
    }
}

/// One reconstructed B candidate, as stored by the upstream ntuplizer
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Candidate {
    /// Electric charge of the B candidate (+1 or -1)
    pub charge: i32,

    /// B momentum (GeV)
    pub b_momentum: Vector3<Float>,

    /// Fitted B mass (GeV)
    pub b_mass: Float,

    /// Confidence level of the B vertex fit
    pub vertex_cl: Float,

    /// Flight length w.r.t. the beam spot (cm)
    pub flight_length: Float,

    /// Uncertainty on the flight length (cm)
    pub flight_length_err: Float,

    /// Cosine of the pointing angle w.r.t. the beam spot
    pub cos_alpha_bs: Float,

    /// Cosine of the pointing angle w.r.t. the beam spot, transverse plane
    pub cos_alpha_bs_2d: Float,

    /// Proper decay length (cm)
    pub ctau: Float,

    /// Momentum of the charged track from the K* (GeV)
    pub track_momentum: Vector3<Float>,

    /// Distance of closest approach of the track to the beam spot (cm)
    pub track_dca_bs: Float,

    /// Uncertainty on the track distance of closest approach (cm)
    pub track_dca_bs_err: Float,

    /// Momentum of the K⁰_S (GeV)
    pub kshort_momentum: Vector3<Float>,

    /// Momentum of the positive pion from the K⁰_S (GeV)
    pub pi_plus_momentum: Vector3<Float>,

    /// Momentum of the negative pion from the K⁰_S (GeV)
    pub pi_minus_momentum: Vector3<Float>,

    /// Momentum of the positive muon (GeV)
    pub mu_plus_momentum: Vector3<Float>,

    /// Momentum of the negative muon (GeV)
    pub mu_minus_momentum: Vector3<Float>,

    /// Identification quantities of the positive muon
    pub mu_plus_quality: MuonQuality,

    /// Identification quantities of the negative muon
    pub mu_minus_quality: MuonQuality,

    /// Fitted K* mass (GeV)
    pub kstar_mass: Float,

    /// Fitted dimuon mass (GeV)
    pub dimuon_mass: Float,

    /// Uncertainty on the dimuon mass (GeV)
    pub dimuon_mass_err: Float,
}
//
impl Candidate {
    // ### SELECTION QUANTITIES ###

    /// Whether both muons pass the soft muon identification
    pub fn has_good_dimuon(&self) -> bool {
        self.mu_minus_quality.is_soft_muon() && self.mu_plus_quality.is_soft_muon()
    }

    /// Transverse momentum of the K* track
    pub fn track_pt(&self) -> Float {
        self.track_momentum.xy().norm()
    }

    /// Impact parameter significance of the K* track w.r.t. the beam spot
    pub fn track_dca_significance(&self) -> Float {
        abs(self.track_dca_bs / self.track_dca_bs_err)
    }

    /// Transverse momentum of the K⁰_S
    pub fn kshort_pt(&self) -> Float {
        self.kshort_momentum.xy().norm()
    }

    /// Flight length significance
    pub fn flight_significance(&self) -> Float {
        self.flight_length / self.flight_length_err
    }

    // ### 4-MOMENTA ###

    /// B 4-momentum, using the fitted B mass
    pub fn b(&self) -> FourMomentum {
        let p = &self.b_momentum;
        FourMomentum::from_xyzm(p.x, p.y, p.z, self.b_mass)
    }

    /// K* 4-momentum (K⁰_S + track), using the fitted K* mass
    pub fn kstar(&self) -> FourMomentum {
        let p = self.kshort_momentum + self.track_momentum;
        FourMomentum::from_xyzm(p.x, p.y, p.z, self.kstar_mass)
    }

    /// K* charged track 4-momentum, under the pion hypothesis
    pub fn track(&self) -> FourMomentum {
        with_mass(&self.track_momentum, PION_MASS)
    }

    /// K⁰_S 4-momentum, using the nominal K⁰_S mass
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
            b_charge: self.charge,
            b: self.b(),
            kstar: self.kstar(),
            track: self.track(),
            mu_plus: self.mu_plus(),
            mu_minus: self.mu_minus(),
        }
    }

    /// Angular observables, with q² taken from the fitted dimuon mass
    pub fn observables(&self) -> AngularObservables {
        let q2 = self.dimuon_mass * self.dimuon_mass;
        AngularObservables::compute(&self.kinematics(), q2)
    }
}

/// Attach a mass hypothesis to a 3-momentum
pub fn with_mass(p: &Vector3<Float>, mass: Float) -> FourMomentum {
    FourMomentum::from_xyzm(p.x, p.y, p.z, mass)
}
