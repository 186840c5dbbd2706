//! Deterministic random number generation
//!
//! Uses xorshift64* algorithm for fast, deterministic random number generation.
//! All randomness in the simulator — dealer layoff draws, VBT anchor jitter —
//! goes through a single `RngManager` owned by the ledger so that its state
//! can be snapshotted and restored alongside everything else (§9 PRNG note).

mod xorshift;

pub use xorshift::RngManager;
