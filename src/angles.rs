//! Angular observables of the B⁺ → K*⁺ μ⁺μ⁻ decay
//!
//! The angles are defined by successive Lorentz boosts into the rest frames of
//! the decay products:
//!
//! * θ_L is the angle between the B and a reference muon, in the dimuon frame
//! * θ_K is the angle between the B and the K* charged track, in the K* frame
//! * φ is the angle between the track and muon planes, in the B frame
//!
//! Degenerate geometries (frame with no energy, null vector...) do not abort
//! processing: the affected observable is set to the [`UNDEFINED`] sentinel,
//! which callers must check for before using the value.

use crate::{
    momentum::FourMomentum,
    numeric::{Float, TINY},
};
use nalgebra::Vector3;

/// Sentinel value of observables that could not be computed
pub const UNDEFINED: Float = 999.;

/// Check whether an observable holds the sentinel value
pub fn is_undefined(x: Float) -> bool {
    x == UNDEFINED
}

/// Electric charge of one of the two leptons
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LeptonCharge {
    Positive,
    Negative,
}

/// Lepton that θ_L is measured against
///
/// The μ⁻ is used for B⁺ and the μ⁺ for B⁻, which cancels the sign flip of
/// the θ_L definition between the particle and antiparticle decays.
///
pub fn theta_l_reference(b_charge: i32) -> LeptonCharge {
    if b_charge > 0 {
        LeptonCharge::Negative
    } else {
        LeptonCharge::Positive
    }
}

/// Lepton whose plane φ is measured against (μ⁺ for B⁺, μ⁻ for B⁻)
pub fn phi_reference(b_charge: i32) -> LeptonCharge {
    if b_charge > 0 {
        LeptonCharge::Positive
    } else {
        LeptonCharge::Negative
    }
}

/// Cosine of θ_L: angle between B and reference lepton in the dilepton frame
pub fn cos_theta_l(
    b: &FourMomentum,
    dilepton: &FourMomentum,
    reference_lepton: &FourMomentum,
) -> Float {
    helicity_cosine(b, dilepton, reference_lepton)
}

/// Cosine of θ_K: angle between B and reference daughter in the K* frame
pub fn cos_theta_k(
    b: &FourMomentum,
    resonance: &FourMomentum,
    reference_daughter: &FourMomentum,
) -> Float {
    helicity_cosine(b, resonance, reference_daughter)
}

/// Angle between two tracks, projected on the plane orthogonal to the flight
/// direction of `frame`, after boosting them to the rest frame of `frame`
///
/// The result is unsigned, in [0, π].
///
pub fn planar_angle(
    track_a: &FourMomentum,
    track_b: &FourMomentum,
    frame: &FourMomentum,
) -> Float {
    let axis = frame.momentum();
    let axis2 = axis.norm_squared();
    if axis2 < TINY * TINY {
        return UNDEFINED;
    }
    let (Some(a), Some(b)) = (
        track_a.in_rest_frame_of(frame),
        track_b.in_rest_frame_of(frame),
    ) else {
        return UNDEFINED;
    };
    let project = |v: Vector3<Float>| v - v.dot(&axis) / axis2 * axis;
    let cos = cosine(&project(a.momentum()), &project(b.momentum()));
    if is_undefined(cos) {
        UNDEFINED
    } else {
        cos.acos()
    }
}

/// Cosine of the angle between `parent` and `daughter` in the `frame` rest frame
fn helicity_cosine(parent: &FourMomentum, frame: &FourMomentum, daughter: &FourMomentum) -> Float {
    let (Some(parent), Some(daughter)) = (
        parent.in_rest_frame_of(frame),
        daughter.in_rest_frame_of(frame),
    ) else {
        return UNDEFINED;
    };
    cosine(&parent.momentum(), &daughter.momentum())
}

/// Cosine of the angle between two 3-vectors, clamped to [-1, 1]
fn cosine(a: &Vector3<Float>, b: &Vector3<Float>) -> Float {
    let (norm_a, norm_b) = (a.norm(), b.norm());
    if norm_a < TINY || norm_b < TINY {
        return UNDEFINED;
    }
    (a.dot(b) / (norm_a * norm_b)).clamp(-1., 1.)
}

/// 4-momenta of the decay B± → K*±(→ K⁰_S π±) μ⁺μ⁻
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayKinematics {
    /// Charge of the B
    pub b_charge: i32,

    /// B 4-momentum
    pub b: FourMomentum,

    /// K* 4-momentum
    pub kstar: FourMomentum,

    /// Charged track from the K* decay
    pub track: FourMomentum,

    /// Positive muon
    pub mu_plus: FourMomentum,

    /// Negative muon
    pub mu_minus: FourMomentum,
}
//
impl DecayKinematics {
    /// Dimuon system
    pub fn dimuon(&self) -> FourMomentum {
        self.mu_plus + self.mu_minus
    }

    /// Pick a muon by charge
    pub fn muon(&self, charge: LeptonCharge) -> FourMomentum {
        match charge {
            LeptonCharge::Positive => self.mu_plus,
            LeptonCharge::Negative => self.mu_minus,
        }
    }
}

/// Observables of the angular analysis, for one decay
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngularObservables {
    /// Dimuon invariant mass squared (GeV²)
    pub q2: Float,

    /// Cosine of θ_L
    pub cos_theta_l: Float,

    /// Cosine of θ_K
    pub cos_theta_k: Float,

    /// Angle between the decay planes, in [0, π]
    pub phi: Float,
}
//
impl AngularObservables {
    /// Compute the angular observables of a decay
    ///
    /// q² is passed in explicitly because reconstructed candidates take it
    /// from the constrained dimuon mass, not from the muon 4-momenta.
    ///
    pub fn compute(decay: &DecayKinematics, q2: Float) -> Self {
        let theta_l_lepton = decay.muon(theta_l_reference(decay.b_charge));
        let phi_lepton = decay.muon(phi_reference(decay.b_charge));
        Self {
            q2,
            cos_theta_l: cos_theta_l(&decay.b, &decay.dimuon(), &theta_l_lepton),
            cos_theta_k: cos_theta_k(&decay.b, &decay.kstar, &decay.track),
            phi: planar_angle(&decay.track, &phi_lepton, &decay.b),
        }
    }

    /// Observables of an event where nothing could be computed
    pub fn undefined() -> Self {
        Self {
            q2: 0.,
            cos_theta_l: UNDEFINED,
            cos_theta_k: UNDEFINED,
            phi: UNDEFINED,
        }
    }

    /// Whether all the angles are usable
    pub fn is_defined(&self) -> bool {
        ![self.cos_theta_l, self.cos_theta_k, self.phi]
            .into_iter()
            .any(is_undefined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        candidate::{B_MASS, KSHORT_MASS, MUON_MASS, PION_MASS},
        numeric::floats::consts::{FRAC_PI_2, PI},
    };
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// Boost a momentum defined in some frame to the lab, given frame velocity
    fn to_lab(p: FourMomentum, beta: Vector3<Float>) -> FourMomentum {
        p.boost(&beta).unwrap()
    }

    /// B at rest, dimuon flying along +z, muons back-to-back along z in the
    /// dimuon frame (μ⁻ backwards)
    fn collinear_decay(b_charge: i32) -> DecayKinematics {
        let beta = Vector3::new(0., 0., 0.6);
        let mu_plus = to_lab(FourMomentum::from_xyzm(0., 0., 2.5, MUON_MASS), beta);
        let mu_minus = to_lab(FourMomentum::from_xyzm(0., 0., -2.5, MUON_MASS), beta);
        let track = FourMomentum::from_xyzm(0.3, 0., -0.2, PION_MASS);
        let kshort = FourMomentum::from_xyzm(-0.1, 0.2, -0.4, KSHORT_MASS);
        DecayKinematics {
            b_charge,
            b: FourMomentum::from_xyzm(0., 0., 0., B_MASS),
            kstar: track + kshort,
            track,
            mu_plus,
            mu_minus,
        }
    }

    #[test]
    fn reference_lepton_follows_b_charge() {
        assert_eq!(theta_l_reference(1), LeptonCharge::Negative);
        assert_eq!(theta_l_reference(-1), LeptonCharge::Positive);
        assert_eq!(phi_reference(1), LeptonCharge::Positive);
        assert_eq!(phi_reference(-1), LeptonCharge::Negative);
    }

    #[test]
    fn collinear_leptons_give_extreme_cos_theta_l() {
        // In the dimuon frame, the B flies along -z like the μ⁻
        let b_plus = collinear_decay(1);
        let obs = AngularObservables::compute(&b_plus, b_plus.dimuon().mass2());
        assert_relative_eq!(obs.cos_theta_l, 1., epsilon = 1e-9);

        // For a B⁻ the μ⁺ is used instead, which flies along +z
        let b_minus = collinear_decay(-1);
        let obs = AngularObservables::compute(&b_minus, b_minus.dimuon().mass2());
        assert_relative_eq!(obs.cos_theta_l, -1., epsilon = 1e-9);

        let direct = cos_theta_l(&b_plus.b, &b_plus.dimuon(), &b_plus.mu_minus);
        assert_relative_eq!(direct, 1., epsilon = 1e-9);
    }

    #[test]
    fn b_at_rest_in_dimuon_frame_is_undefined() {
        let b = FourMomentum::from_xyzm(0., 0., 0., B_MASS);
        let mu_plus = FourMomentum::from_xyzm(0., 0., 2.5, MUON_MASS);
        let mu_minus = FourMomentum::from_xyzm(0., 0., -2.5, MUON_MASS);
        let cos = cos_theta_l(&b, &(mu_plus + mu_minus), &mu_minus);
        assert!(is_undefined(cos));
    }

    #[test]
    fn massless_frame_is_undefined() {
        let b = FourMomentum::from_xyzm(1., 0., 0., B_MASS);
        let nothing = FourMomentum::from_xyze(0., 0., 0., 0.);
        assert!(is_undefined(cos_theta_k(&b, &nothing, &b)));
    }

    #[test]
    fn kstar_daughters_are_back_to_back() {
        let track = FourMomentum::from_xyzm(1.1, 0.3, 2.0, PION_MASS);
        let kshort = FourMomentum::from_xyzm(0.4, -0.6, 3.1, KSHORT_MASS);
        let kstar = track + kshort;
        let b = FourMomentum::from_xyzm(3., 1., 9., B_MASS);
        let with_track = cos_theta_k(&b, &kstar, &track);
        let with_kshort = cos_theta_k(&b, &kstar, &kshort);
        assert!(!is_undefined(with_track));
        assert_relative_eq!(with_track, -with_kshort, epsilon = 1e-9);
    }

    #[test]
    fn planar_angle_of_orthogonal_planes() {
        let beta = Vector3::new(0., 0., 0.5);
        let b = to_lab(FourMomentum::from_xyzm(0., 0., 0., B_MASS), beta);
        let track = to_lab(FourMomentum::from_xyzm(1., 0., 0.3, PION_MASS), beta);
        let muon = to_lab(FourMomentum::from_xyzm(0., 1., -0.2, MUON_MASS), beta);
        assert_relative_eq!(planar_angle(&track, &muon, &b), FRAC_PI_2, epsilon = 1e-9);

        let opposite = to_lab(FourMomentum::from_xyzm(-2., 0., 0.7, MUON_MASS), beta);
        assert_relative_eq!(planar_angle(&track, &opposite, &b), PI, epsilon = 1e-6);
    }

    #[test]
    fn planar_angle_needs_a_flight_direction() {
        let b = FourMomentum::from_xyzm(0., 0., 0., B_MASS);
        let track = FourMomentum::from_xyzm(1., 0., 0.3, PION_MASS);
        let muon = FourMomentum::from_xyzm(0., 1., -0.2, MUON_MASS);
        assert!(is_undefined(planar_angle(&track, &muon, &b)));
        assert!(!AngularObservables::compute(&collinear_decay(1), 1.).is_defined());
    }

    fn momentum() -> impl Strategy<Value = FourMomentum> {
        (-10.0..10.0f64, -10.0..10.0f64, -10.0..10.0f64, 0.0..6.0f64)
            .prop_map(|(px, py, pz, m)| FourMomentum::from_xyzm(px, py, pz, m))
    }

    proptest! {
        #[test]
        fn observables_stay_in_range(
            b in momentum(),
            track in momentum(),
            kshort in momentum(),
            mu_plus in momentum(),
            mu_minus in momentum(),
            b_charge in prop_oneof![Just(1), Just(-1)],
        ) {
            let decay = DecayKinematics {
                b_charge,
                b,
                kstar: track + kshort,
                track,
                mu_plus,
                mu_minus,
            };
            let obs = AngularObservables::compute(&decay, 1.);
            for cos in [obs.cos_theta_l, obs.cos_theta_k] {
                prop_assert!(!cos.is_nan());
                prop_assert!(is_undefined(cos) || (-1. ..=1.).contains(&cos));
            }
            prop_assert!(!obs.phi.is_nan());
            prop_assert!(is_undefined(obs.phi) || (0. ..=PI).contains(&obs.phi));
        }
    }
}
