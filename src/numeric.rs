//! Basic numerical concepts used throughout the program

#![allow(missing_docs)]

// Fits and boosts need double precision, so unlike some other HEP codes we do
// not offer a single-precision build.
pub type Float = f64;
pub use std::f64 as floats;

/// Magnitude below which a length, energy or denominator counts as zero
pub const TINY: Float = 1e-12;
