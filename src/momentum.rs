//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::{floats::consts::PI, Float, TINY};
use nalgebra::{SVector, Vector3};
use prefix_num_ops::real::*;
use std::ops::Add;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Raw relativistic 4-momentum storage
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Pseudorapidity reported for particles flying exactly along the beam
const BEAM_AXIS_ETA: Float = 1e10;

/// Immutable relativistic 4-momentum (px, py, pz, E) in GeV
///
/// The energy is never negative. Rounding can leave E² slightly below |p|²,
/// so the squared mass is clamped at zero rather than going negative.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FourMomentum(Momentum);
//
impl FourMomentum {
    // ### CONSTRUCTION ###

    /// Build from cartesian momentum components and energy
    pub fn from_xyze(px: Float, py: Float, pz: Float, e: Float) -> Self {
        Self(Momentum::new(px, py, pz, e.max(0.)))
    }

    /// Build from cartesian momentum components and a mass hypothesis
    pub fn from_xyzm(px: Float, py: Float, pz: Float, mass: Float) -> Self {
        let p2 = px * px + py * py + pz * pz;
        Self::from_xyze(px, py, pz, sqrt(p2 + mass * mass))
    }

    /// Build from transverse momentum, pseudorapidity, azimuth and mass
    pub fn from_pt_eta_phi_m(pt: Float, eta: Float, phi: Float, mass: Float) -> Self {
        let pt = abs(pt);
        Self::from_xyzm(pt * cos(phi), pt * sin(phi), pt * eta.sinh(), mass)
    }

    // ### COMPONENTS ###

    /// Momentum along X
    pub fn px(&self) -> Float {
        self.0[X]
    }

    /// Momentum along Y
    pub fn py(&self) -> Float {
        self.0[Y]
    }

    /// Momentum along Z
    pub fn pz(&self) -> Float {
        self.0[Z]
    }

    /// Energy
    pub fn e(&self) -> Float {
        self.0[E]
    }

    /// Spatial part of the 4-momentum
    pub fn momentum(&self) -> Vector3<Float> {
        self.0.xyz()
    }

    // ### DERIVED QUANTITIES ###

    /// Squared norm of the 3-momentum
    pub fn p2(&self) -> Float {
        self.momentum().norm_squared()
    }

    /// Norm of the 3-momentum
    pub fn p(&self) -> Float {
        sqrt(self.p2())
    }

    /// Transverse momentum
    pub fn pt(&self) -> Float {
        sqrt(self.px() * self.px() + self.py() * self.py())
    }

    /// Invariant mass squared, clamped at zero
    pub fn mass2(&self) -> Float {
        (self.e() * self.e() - self.p2()).max(0.)
    }

    /// Invariant mass
    pub fn mass(&self) -> Float {
        sqrt(self.mass2())
    }

    /// Pseudorapidity
    pub fn eta(&self) -> Float {
        let pt = self.pt();
        if pt > TINY {
            (self.pz() / pt).asinh()
        } else if self.pz() == 0. {
            0.
        } else {
            BEAM_AXIS_ETA.copysign(self.pz())
        }
    }

    /// Azimuthal angle in (-π, π]
    pub fn phi(&self) -> Float {
        if self.px() == 0. && self.py() == 0. {
            0.
        } else {
            self.py().atan2(self.px())
        }
    }

    /// Distance to another momentum in the (η, φ) plane
    pub fn delta_r(&self, other: &Self) -> Float {
        let d_eta = self.eta() - other.eta();
        let mut d_phi = self.phi() - other.phi();
        while d_phi > PI {
            d_phi -= 2. * PI;
        }
        while d_phi <= -PI {
            d_phi += 2. * PI;
        }
        sqrt(d_eta * d_eta + d_phi * d_phi)
    }

    // ### LORENTZ BOOSTS ###

    /// Velocity of this momentum's rest frame, or None at vanishing energy
    pub fn boost_vector(&self) -> Option<Vector3<Float>> {
        (self.e() > TINY).then(|| self.momentum() / self.e())
    }

    /// Apply a Lorentz boost of velocity `beta` (in units of c)
    ///
    /// Returns None if the boost is not slower than light.
    ///
    pub fn boost(&self, beta: &Vector3<Float>) -> Option<Self> {
        let b2 = beta.norm_squared();
        if b2 >= 1. {
            return None;
        }
        let gamma = 1. / sqrt(1. - b2);
        let bp = beta.dot(&self.momentum());
        let gamma2 = if b2 > 0. { (gamma - 1.) / b2 } else { 0. };
        let p = self.momentum() + (gamma2 * bp + gamma * self.e()) * beta;
        let e = gamma * (self.e() + bp);
        Some(Self::from_xyze(p.x, p.y, p.z, e))
    }

    /// Express this momentum in the rest frame of `frame`
    pub fn in_rest_frame_of(&self, frame: &Self) -> Option<Self> {
        let beta = frame.boost_vector()?;
        self.boost(&-beta)
    }
}

impl Add for FourMomentum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}
