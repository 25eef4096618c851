//! Named q² bins of the angular analysis
//!
//! Bins are defined in q² (GeV²) but applied to the fitted dimuon mass, with
//! exclusive bounds. The charmonium resonances (J/ψ and ψ(2S)) can be vetoed
//! or, conversely, selected alone.

use crate::numeric::Float;
use prefix_num_ops::real::*;

/// Dimuon mass windows of the J/ψ and ψ(2S) resonances (GeV)
pub const CHARMONIUM_WINDOWS: [(Float, Float); 2] = [(2.94618, 3.17648), (3.58608, 3.76563)];

/// Treatment of the charmonium resonances
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resonances {
    /// No special treatment
    Keep,

    /// Events in the resonance windows are rejected
    Veto,

    /// Only events in the resonance windows are accepted
    Only,
}

/// A named q² bin
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Q2Bin {
    /// Key used to refer to the bin in configuration files
    pub key: &'static str,

    /// Short label used in output file names
    pub label: &'static str,

    /// Lower q² bound (GeV²)
    pub q2_min: Float,

    /// Upper q² bound (GeV²)
    pub q2_max: Float,

    /// Treatment of the charmonium resonances
    pub resonances: Resonances,
}
//
impl Q2Bin {
    const fn new(key: &'static str, label: &'static str, q2_min: Float, q2_max: Float) -> Self {
        Self {
            key,
            label,
            q2_min,
            q2_max,
            resonances: Resonances::Keep,
        }
    }

    /// Decide whether a fitted dimuon mass belongs to this bin
    pub fn contains_mass(&self, dimuon_mass: Float) -> bool {
        let in_range = dimuon_mass > sqrt(self.q2_min) && dimuon_mass < sqrt(self.q2_max);
        let in_resonance = CHARMONIUM_WINDOWS
            .iter()
            .any(|&(low, high)| dimuon_mass > low && dimuon_mass < high);
        in_range
            && match self.resonances {
                Resonances::Keep => true,
                Resonances::Veto => !in_resonance,
                Resonances::Only => in_resonance,
            }
    }

    /// Decide whether a q² value belongs to this bin
    pub fn contains_q2(&self, q2: Float) -> bool {
        q2 > 0. && self.contains_mass(sqrt(q2))
    }
}

/// All the bins of the analysis
pub const Q2_BINS: [Q2Bin; 10] = [
    Q2Bin::new("belowJpsi", "bin1", 1., 8.68),
    Q2Bin::new("jpsi", "bin2", 8.68, 10.09),
    Q2Bin::new("jpsiLo", "bin2a", 8.68, 9.37),
    Q2Bin::new("jpsiHi", "bin2b", 9.37, 10.09),
    Q2Bin::new("betweenPeaks", "bin3", 10.09, 12.86),
    Q2Bin::new("psi2s", "bin4", 12.86, 14.18),
    Q2Bin::new("abovePsi2s", "bin5", 14.18, 19.),
    Q2Bin {
        resonances: Resonances::Veto,
        ..Q2Bin::new("summary", "bin0", 1., 19.)
    },
    Q2Bin {
        resonances: Resonances::Only,
        ..Q2Bin::new("peaks", "peaks", 1., 19.)
    },
    Q2Bin::new("full", "full", 1., 19.),
];

/// Look up a bin by its key
pub fn find(key: &str) -> Option<&'static Q2Bin> {
    Q2_BINS.iter().find(|bin| bin.key == key)
}
