//! One day's phase pipeline and the outer run loop (§4.6).
//!
//! `run_day` advances the ledger by exactly one day: Phase A (begin-day
//! marker, then the optional dealer phase), Phase B1 (today's scheduled
//! actions, in original order), Phase B2 (settlement of obligations due
//! today, followed by the dealer anchor update so it can see today's
//! defaults), and Phase C (interbank clearing). `run_to_completion` calls it
//! repeatedly until the scenario's stop condition is met.

use crate::config::SimConfig;
use crate::dealer;
use crate::error::SettlementError;
use crate::models::event::{Event, Phase};
use crate::models::ledger::LedgerState;
use crate::models::InstrumentKind;
use crate::scenario::Action;
use crate::settlement::{run_clearing, run_settlement};
use std::collections::BTreeMap;

/// One day's summary (§4.6 "day report"): whether anything actually happened,
/// and whether any obligation remains outstanding across the whole ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayReport {
    pub day: u64,
    pub quiet: bool,
    pub open_obligations_remain: bool,
}

/// Why the outer loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStopReason {
    /// `quiet_days` consecutive quiet days with no open obligations
    /// (non-rollover mode only).
    Stabilized,
    /// `max_days` was reached before the scenario stabilized.
    MaxDaysReached,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub stop_reason: RunStopReason,
    pub days_run: u64,
    pub day_reports: Vec<DayReport>,
}

fn open_obligations_remain(ledger: &LedgerState) -> bool {
    ledger
        .instruments()
        .any(|i| matches!(i.kind(), InstrumentKind::Payable | InstrumentKind::DeliveryObligation))
}

/// Advance the ledger by one day and return its report. `scheduled_today` is
/// the slice of actions queued for the day about to run (already advanced
/// past in `ledger.day()` by the time this returns).
pub fn run_day(ledger: &mut LedgerState, config: &SimConfig, scheduled_today: &[Action]) -> Result<DayReport, SettlementError> {
    ledger.advance_day();
    let day = ledger.day();
    let events_before = ledger.events().len();

    ledger.log(Event::BeginDay { day });
    ledger.log(Event::PhaseA { day });
    if ledger.has_dealer() {
        // `config.dealer` is guaranteed present whenever the ledger carries a
        // dealer subsystem — both are installed together by `scenario::build_ledger`.
        if let Some(dealer_config) = &config.dealer {
            dealer::run_dealer_phase(ledger, dealer_config)?;
        }
    }

    ledger.log(Event::SubphaseB1 { day });
    for action in scheduled_today {
        crate::scenario::apply_action(ledger, action)?;
    }

    ledger.log(Event::PhaseB { day });
    ledger.log(Event::SubphaseB2 { day });
    run_settlement(ledger, &config.mop, day)?;
    if ledger.has_dealer() {
        dealer::run_anchor_update(ledger);
    }

    ledger.log(Event::PhaseC { day });
    run_clearing(ledger, day)?;

    if config.check_mode == crate::invariants::CheckMode::Daily || config.check_mode == crate::invariants::CheckMode::OnCommit {
        crate::invariants::check_all(ledger)?;
    }

    let quiet = ledger.events().events()[events_before..].iter().all(|e| !e.is_substantive());
    Ok(DayReport { day, quiet, open_obligations_remain: open_obligations_remain(ledger) })
}

/// Run the outer driver loop (§4.6): advance one day at a time until either
/// the scenario stabilizes (non-rollover mode: `quiet_days` consecutive quiet
/// days with no open obligations) or `config.max_days` is reached.
pub fn run_to_completion(
    ledger: &mut LedgerState,
    config: &SimConfig,
    scheduled: &BTreeMap<u64, Vec<Action>>,
) -> Result<RunOutcome, SettlementError> {
    let empty: Vec<Action> = Vec::new();
    let mut day_reports = Vec::new();
    let mut consecutive_quiet = 0u64;

    for _ in 0..config.max_days {
        let day = ledger.day() + 1;
        let scheduled_today = scheduled.get(&day).unwrap_or(&empty);
        let report = run_day(ledger, config, scheduled_today)?;
        let stabilized_candidate = report.quiet && !report.open_obligations_remain;
        day_reports.push(report);

        if !config.rollover_enabled {
            if stabilized_candidate {
                consecutive_quiet += 1;
            } else {
                consecutive_quiet = 0;
            }
            if consecutive_quiet >= config.quiet_days {
                return Ok(RunOutcome { stop_reason: RunStopReason::Stabilized, days_run: ledger.day(), day_reports });
            }
        }
    }

    Ok(RunOutcome { stop_reason: RunStopReason::MaxDaysReached, days_run: ledger.day(), day_reports })
}
