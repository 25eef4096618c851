//! K*⁺μ⁺μ⁻: selection and angular analysis of B⁺ → K*⁺ μ⁺μ⁻ decays
//!
//!
//! # Introduction (for the physicist)
//!
//! This program selects B⁺ → K*⁺(K⁰_S π⁺) μ⁺μ⁻ candidates from reconstructed
//! collision or simulated events, keeping at most one candidate per event. For
//! each selected candidate, it reconstructs the angular observables of the
//! decay (cosθ_L, cosθ_K and φ) and, in simulation, matches it against the
//! generated decay.
//!
//! The (cosθ_L, cosθ_K) distribution of the candidates falling in a chosen q²
//! bin is then histogrammed and fitted with a two-dimensional polynomial.
//!
//!
//! # Introduction (for the numerical guy)
//!
//! Angles are computed through successive Lorentz boosts, with degenerate
//! geometries flagged by a sentinel value rather than aborting. The fit is a
//! variable-metric minimisation with bounded retries, followed by an error
//! matrix computation and optional asymmetric profile errors.
//!
//!
//! # Introduction (for the computer guy)
//!
//! The program is a straight pipeline:
//!
//! * read in the configuration and the event table
//! * process events in batches (possibly in parallel), each event yielding at
//!   most one output row and one histogram entry
//! * merge batch results in a reproducible order
//! * fit the histogram, then write the output table and fit summary.

#![warn(missing_docs)]

pub mod angles;
pub mod candidate;
pub mod config;
pub mod event;
pub mod fit;
pub mod histogram;
pub mod input;
pub mod model;
pub mod momentum;
pub mod numeric;
pub mod output;
pub mod pipeline;
pub mod q2bins;
pub mod random;
pub mod record;
pub mod resacc;
pub mod resfin;
pub mod scheduling;
pub mod selection;
pub mod toy;
pub mod truth;
