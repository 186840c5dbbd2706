//! Artifact outputs (§6): a balances snapshot for a point in time, and the
//! canonical decimal-string formatting that keeps every serialized price and
//! ratio bit-exact across runs and languages.
//!
//! The event log itself (`crate::models::event::EventLog`) is already the
//! ordered artifact of record; this module adds the derived views external
//! writers ask for on top of it.

use crate::models::ledger::LedgerState;
use crate::models::InstrumentKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Net financial asset/liability totals for one agent, by instrument kind,
/// plus non-financial holdings valued at their recorded price (§6 "balances
/// snapshot").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBalances {
    pub agent_id: String,
    pub assets_by_kind: BTreeMap<String, i64>,
    pub liabilities_by_kind: BTreeMap<String, i64>,
    pub stock_value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesSnapshot {
    pub day: u64,
    pub agents: Vec<AgentBalances>,
}

/// Snapshot every agent's asset/liability totals (grouped by `InstrumentKind`)
/// and non-financial stock value, as of `ledger`'s current day.
pub fn snapshot_balances(ledger: &LedgerState) -> BalancesSnapshot {
    let mut agents = Vec::new();
    for agent in ledger.agents() {
        let mut assets_by_kind: BTreeMap<String, i64> = BTreeMap::new();
        for id in agent.asset_ids() {
            if let Ok(instrument) = ledger.instrument(id) {
                *assets_by_kind.entry(kind_label(instrument.kind())).or_insert(0) += instrument.amount();
            }
        }
        let mut liabilities_by_kind: BTreeMap<String, i64> = BTreeMap::new();
        for id in agent.liability_ids() {
            if let Ok(instrument) = ledger.instrument(id) {
                *liabilities_by_kind.entry(kind_label(instrument.kind())).or_insert(0) += instrument.amount();
            }
        }
        let stock_value: i64 = agent.stock_ids().iter().filter_map(|id| ledger.stock(id).ok()).map(|lot| lot.value()).sum();

        agents.push(AgentBalances { agent_id: agent.id().to_string(), assets_by_kind, liabilities_by_kind, stock_value });
    }
    BalancesSnapshot { day: ledger.day(), agents }
}

fn kind_label(kind: InstrumentKind) -> String {
    match kind {
        InstrumentKind::Cash => "cash",
        InstrumentKind::BankDeposit => "bank_deposit",
        InstrumentKind::ReserveDeposit => "reserve_deposit",
        InstrumentKind::Payable => "payable",
        InstrumentKind::DeliveryObligation => "delivery_obligation",
        InstrumentKind::InterbankOvernight => "interbank_overnight",
    }
    .to_string()
}

/// Render a decimal the way artifact writers must (§6 "bit-exact
/// compatibility"): the shortest exact string with no scientific notation and
/// no trailing zeros beyond the value's own scale. `rust_decimal`'s `Display`
/// already satisfies this (it tracks scale internally and never switches to
/// exponential form), so this is a thin, explicitly-named wrapper rather than
/// a reimplementation — callers should prefer it over an ad hoc `to_string()`
/// so the contract is visible at the call site.
pub fn canonical_decimal_string(value: Decimal) -> String {
    value.normalize().to_string()
}
