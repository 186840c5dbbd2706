//! Deterministic discrete-time agent-based simulator of a closed monetary
//! economy: a double-entry ledger with scheduled settlement, a
//! means-of-payment selector, and an optional dealer-ring secondary market.
//!
//! # Module map
//!
//! - [`core`]: id allocation and decimal/minor-unit rounding shared by every layer.
//! - [`models`]: agents, instruments, stock lots, aliases, the event log, and
//!   the [`models::ledger::LedgerState`] that owns them all.
//! - [`ops`]: the primitive operations (§4.2) every higher-level flow composes.
//! - [`mop`]: the means-of-payment selector (§4.3).
//! - [`settlement`]: Phase B2 maturity settlement and Phase C clearing (§4.4-4.5).
//! - [`orchestrator`]: the daily phase pipeline and the outer run loop (§4.6).
//! - [`dealer`]: the optional dealer-ring subsystem (§4.7-4.11).
//! - [`scenario`]: the external scenario-input shape and its application.
//! - [`config`]: the read-only policy object built once per run.
//! - [`invariants`]: the double-entry/holder-list/stock-ownership checker.
//! - [`artifacts`]: balances snapshots and canonical decimal formatting.
//! - [`error`]: the two error classes (`ValidationError`, `DefaultError`) that
//!   cross every boundary.
//! - [`rng`]: the single seeded PRNG the dealer subsystem draws through.
//!
//! # Critical invariants
//!
//! 1. All monetary amounts are signed `i64` minor units; all prices, ratios,
//!    and anchors are exact [`rust_decimal::Decimal`] values. The two never
//!    mix implicitly (§3, §9).
//! 2. Every mutation runs inside one atomic scope
//!    ([`models::ledger::LedgerState::with_atomic_scope`]) that rewinds on
//!    error, including the dealer subsystem's PRNG state (§4.1, §9).
//! 3. The simulator is single-threaded and fully deterministic given a seed:
//!    no operation yields, nothing runs concurrently with anything else (§5).

pub mod artifacts;
pub mod config;
pub mod core;
pub mod dealer;
pub mod error;
pub mod invariants;
pub mod models;
pub mod mop;
pub mod ops;
pub mod orchestrator;
pub mod rng;
pub mod scenario;
pub mod settlement;

pub use config::SimConfig;
pub use error::{DefaultError, SettlementError, ValidationError};
pub use models::ledger::{DefaultMode, LedgerState};
pub use orchestrator::{run_to_completion, DayReport, RunOutcome, RunStopReason};
pub use scenario::{build_config, build_ledger, ScenarioInput};
