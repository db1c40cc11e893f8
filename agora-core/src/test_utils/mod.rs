//! Test utilities and helpers for Agora
//!
//! Deterministic identities, description builders and assertion helpers
//! shared by unit tests, integration tests and benchmarks.

pub mod assertions;
pub mod deterministic_rng;
pub mod fixtures;

pub use assertions::*;
pub use deterministic_rng::*;
pub use fixtures::*;
