//! Integration coverage for the means-of-payment selector and Phase B2
//! settlement (MOP preference overrides, scenario S4, and rollover carried
//! across multiple settlement days).

use claims_ledger_sim::invariants::check_all;
use claims_ledger_sim::models::{AgentKind, InstrumentKind};
use claims_ledger_sim::orchestrator::index_scheduled_actions;
use claims_ledger_sim::scenario::{Action, AgentSpec, DefaultHandling, PolicyOverrides, RunMode, RunSettings, ScheduledAction};
use claims_ledger_sim::{build_config, build_ledger, run_to_completion, LedgerState, ScenarioInput};
use std::collections::BTreeMap;

fn cash_total(ledger: &LedgerState, agent_id: &str, kind: InstrumentKind) -> i64 {
    ledger
        .agent(agent_id)
        .unwrap()
        .asset_ids()
        .iter()
        .map(|id| ledger.instrument(id).unwrap())
        .filter(|i| i.kind() == kind)
        .map(|i| i.amount())
        .sum()
}

/// S4: a payable due on day 1 with only half the debtor's face amount
/// available settles at a 0.5 recovery rate and expels the debtor.
#[test]
fn scenario_s4_partial_recovery_expels_debtor() {
    let scenario = ScenarioInput {
        name: "s4".into(),
        description: None,
        version: 1,
        agents: vec![
            AgentSpec { id: "CB".into(), kind: AgentKind::CentralBank, name: "Central Bank".into(), bank_id: None },
            AgentSpec { id: "H1".into(), kind: AgentKind::Household, name: "Household One".into(), bank_id: None },
            AgentSpec { id: "H2".into(), kind: AgentKind::Household, name: "Household Two".into(), bank_id: None },
        ],
        initial_actions: vec![Action::MintCash { central_bank_id: "CB".into(), to: "H1".into(), amount: 50, alias: None }],
        scheduled_actions: vec![ScheduledAction {
            day: 1,
            action: Action::CreatePayable { from: "H1".into(), to: "H2".into(), amount: 100, due_day: 1, maturity_distance: None, alias: None },
        }],
        policy_overrides: None,
        dealer: None,
        run: RunSettings { mode: RunMode::UntilStable, max_days: 5, quiet_days: 2, default_handling: DefaultHandling::ExpelAgent, rollover_enabled: false },
    };

    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();
    let scheduled = index_scheduled_actions(&scenario.scheduled_actions);
    run_to_completion(&mut ledger, &config, &scheduled).unwrap();

    assert_eq!(cash_total(&ledger, "H2", InstrumentKind::Cash), 50, "recovery rate 0.5 on a face of 100");
    assert!(ledger.agent("H1").unwrap().is_defaulted());
    assert_eq!(ledger.events().events_of_kind("DefaultEvent").len(), 1);
    assert!(ledger.instruments().all(|i| i.kind() != InstrumentKind::Payable));
    check_all(&ledger).unwrap();
}

/// Overriding a household's MOP preference order to prefer cash over bank
/// deposit changes which instrument drains first.
#[test]
fn mop_preference_override_changes_drawdown_order() {
    let mut mop_preferences = BTreeMap::new();
    mop_preferences.insert(AgentKind::Household, vec![InstrumentKind::Cash, InstrumentKind::BankDeposit]);

    let scenario = ScenarioInput {
        name: "mop_override".into(),
        description: None,
        version: 1,
        agents: vec![
            AgentSpec { id: "CB".into(), kind: AgentKind::CentralBank, name: "Central Bank".into(), bank_id: None },
            AgentSpec { id: "B1".into(), kind: AgentKind::Bank, name: "Bank One".into(), bank_id: None },
            AgentSpec { id: "H1".into(), kind: AgentKind::Household, name: "Household One".into(), bank_id: Some("B1".into()) },
            AgentSpec { id: "H2".into(), kind: AgentKind::Household, name: "Household Two".into(), bank_id: Some("B1".into()) },
        ],
        initial_actions: vec![
            Action::MintCash { central_bank_id: "CB".into(), to: "H1".into(), amount: 40, alias: None },
            Action::MintCash { central_bank_id: "CB".into(), to: "H1".into(), amount: 60, alias: None },
            Action::DepositCash { customer: "H1".into(), bank: "B1".into(), amount: 60 },
        ],
        scheduled_actions: vec![ScheduledAction {
            day: 1,
            action: Action::CreatePayable { from: "H1".into(), to: "H2".into(), amount: 80, due_day: 1, maturity_distance: None, alias: None },
        }],
        policy_overrides: Some(PolicyOverrides { mop_preferences }),
        dealer: None,
        run: RunSettings { mode: RunMode::UntilStable, max_days: 5, quiet_days: 2, default_handling: DefaultHandling::ExpelAgent, rollover_enabled: false },
    };

    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();
    let scheduled = index_scheduled_actions(&scenario.scheduled_actions);
    run_to_completion(&mut ledger, &config, &scheduled).unwrap();

    // Cash preferred first: all 40 cash drains, then 40 of the 60 bank_deposit.
    assert!(!ledger.agent("H1").unwrap().is_defaulted());
    assert_eq!(cash_total(&ledger, "H1", InstrumentKind::Cash), 0);
    assert_eq!(cash_total(&ledger, "H1", InstrumentKind::BankDeposit), 20);
    check_all(&ledger).unwrap();
}

/// Rollover reissues the payable every `maturity_distance` days, anchored to
/// the settlement day, across more than one cycle.
#[test]
fn rollover_reissues_across_multiple_cycles() {
    let scenario = ScenarioInput {
        name: "rollover".into(),
        description: None,
        version: 1,
        agents: vec![
            AgentSpec { id: "CB".into(), kind: AgentKind::CentralBank, name: "Central Bank".into(), bank_id: None },
            AgentSpec { id: "H1".into(), kind: AgentKind::Household, name: "Household One".into(), bank_id: None },
            AgentSpec { id: "H2".into(), kind: AgentKind::Household, name: "Household Two".into(), bank_id: None },
        ],
        initial_actions: vec![
            Action::MintCash { central_bank_id: "CB".into(), to: "H1".into(), amount: 1000, alias: None },
            Action::CreatePayable { from: "H1".into(), to: "H2".into(), amount: 100, due_day: 2, maturity_distance: Some(2), alias: Some("rent".into()) },
        ],
        scheduled_actions: vec![],
        policy_overrides: None,
        dealer: None,
        run: RunSettings { mode: RunMode::UntilStable, max_days: 7, quiet_days: 2, default_handling: DefaultHandling::ExpelAgent, rollover_enabled: true },
    };

    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();
    let scheduled = index_scheduled_actions(&scenario.scheduled_actions);
    let outcome = run_to_completion(&mut ledger, &config, &scheduled).unwrap();

    // Rollover never stabilizes on its own (an obligation is always open),
    // so the run exhausts max_days.
    assert_eq!(outcome.stop_reason, claims_ledger_sim::RunStopReason::MaxDaysReached);
    assert_eq!(ledger.events().events_of_kind("PayableSettled").len(), 3, "settles on day 2, 4, and 6");
    let payables: Vec<_> = ledger.instruments().filter(|i| i.kind() == InstrumentKind::Payable).collect();
    assert_eq!(payables.len(), 1);
    assert_eq!(payables[0].due_day(), Some(8), "the 4th cycle's due day is 6 + 2");
    assert_eq!(ledger.aliases().resolve("rent").unwrap(), payables[0].id());
    check_all(&ledger).unwrap();
}

/// Fail-fast mode surfaces a `DefaultError` and halts the run instead of
/// expelling the debtor.
#[test]
fn fail_fast_mode_propagates_default_error_from_daily_loop() {
    let scenario = ScenarioInput {
        name: "fail_fast".into(),
        description: None,
        version: 1,
        agents: vec![
            AgentSpec { id: "CB".into(), kind: AgentKind::CentralBank, name: "Central Bank".into(), bank_id: None },
            AgentSpec { id: "H1".into(), kind: AgentKind::Household, name: "Household One".into(), bank_id: None },
            AgentSpec { id: "H2".into(), kind: AgentKind::Household, name: "Household Two".into(), bank_id: None },
        ],
        initial_actions: vec![Action::MintCash { central_bank_id: "CB".into(), to: "H1".into(), amount: 50, alias: None }],
        scheduled_actions: vec![ScheduledAction {
            day: 1,
            action: Action::CreatePayable { from: "H1".into(), to: "H2".into(), amount: 100, due_day: 1, maturity_distance: None, alias: None },
        }],
        policy_overrides: None,
        dealer: None,
        run: RunSettings { mode: RunMode::UntilStable, max_days: 5, quiet_days: 2, default_handling: DefaultHandling::FailFast, rollover_enabled: false },
    };

    let config = build_config(&scenario);
    let mut ledger = build_ledger(&scenario, &config, 1).unwrap();
    let scheduled = index_scheduled_actions(&scenario.scheduled_actions);
    let err = run_to_completion(&mut ledger, &config, &scheduled).unwrap_err();
    assert!(matches!(err, claims_ledger_sim::SettlementError::Default(_)));
}
