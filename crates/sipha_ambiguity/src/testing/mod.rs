//! # Testing Utilities
//!
//! Fixture grammars and token streams used by the unit tests, the
//! integration tests and the benchmarks.

pub mod fixtures;
