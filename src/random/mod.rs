//! Random number generation, on top of the "rand" crate ecosystem
//!
//! Every consumer owns its own seeded generator, so that toy generation and
//! fit retries are reproducible and independent of scheduling.

mod standard;

pub use self::standard::{RandomGenerator, DEFAULT_SEED};
