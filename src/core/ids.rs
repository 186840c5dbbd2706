//! Deterministic, kind-prefixed id allocation.
//!
//! Every agent, instrument, and stock lot in the ledger is referenced only by a
//! stable string id (see the arena-and-index design note in the crate root
//! docs). Ids are never reused and never freed: the ledger grows monotonically
//! for the lifetime of a simulation.

use std::collections::BTreeMap;

/// Allocates fresh ids of the form `"{prefix}_{seq:08}"`.
///
/// The counter is per-prefix so that instrument kinds (`pay`, `dlv`, `cash`,
/// ...) get their own compact, human-readable sequences instead of sharing one
/// global counter.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counters: BTreeMap<&'static str, u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id for `prefix`, e.g. `next("pay") -> "pay_00000001"`.
    pub fn next(&mut self, prefix: &'static str) -> String {
        let counter = self.counters.entry(prefix).or_insert(0);
        *counter += 1;
        format!("{prefix}_{:08}", *counter)
    }

    /// Current count allocated under `prefix` (for snapshot/rollback).
    pub fn count(&self, prefix: &str) -> u64 {
        self.counters.get(prefix).copied().unwrap_or(0)
    }

    /// Restore counters to a previously observed state (used by the atomic
    /// scope rewind path so that ids freed by a rolled-back op are not
    /// reissued out of order on retry).
    pub fn restore(&mut self, snapshot: BTreeMap<&'static str, u64>) {
        self.counters = snapshot;
    }

    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters.clone()
    }
}
