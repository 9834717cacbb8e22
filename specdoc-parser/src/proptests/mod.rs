//! Property-based tests for the parser and resolver.
//!
//! These check invariants that must hold for any input, complementing the unit
//! tests next to each module and the fixture-based integration tests.

mod generators;
mod invariants;
