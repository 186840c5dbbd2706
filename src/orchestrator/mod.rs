//! Simulation driver (L11, §4.6): sequences one day's phases and runs the
//! outer loop to completion. [`daily_loop`] holds the per-day pipeline;
//! everything here is the public surface a CLI or test harness drives.

pub mod daily_loop;

pub use daily_loop::{run_day, DayReport, RunOutcome, RunStopReason};

use crate::config::SimConfig;
use crate::error::SettlementError;
use crate::models::ledger::LedgerState;
use crate::scenario::{Action, ScheduledAction};
use std::collections::BTreeMap;

/// Group `scheduled[]` by day, preserving each day's original order (§4.6
/// "in original order").
pub fn index_scheduled_actions(scheduled: &[ScheduledAction]) -> BTreeMap<u64, Vec<Action>> {
    let mut by_day: BTreeMap<u64, Vec<Action>> = BTreeMap::new();
    for entry in scheduled {
        by_day.entry(entry.day).or_default().push(entry.action.clone());
    }
    by_day
}

/// Run the full outer driver loop (§4.6 "outer driver loop") starting the day
/// after `ledger`'s current day, until either the quiet-day stop condition or
/// `config.max_days` is reached.
pub fn run_to_completion(
    ledger: &mut LedgerState,
    config: &SimConfig,
    scheduled: &BTreeMap<u64, Vec<Action>>,
) -> Result<RunOutcome, SettlementError> {
    daily_loop::run_to_completion(ledger, config, scheduled)
}
