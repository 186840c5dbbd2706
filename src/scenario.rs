//! Scenario input model (§6): the structured value a loader hands the
//! driver, and the action application that runs it into a freshly built
//! [`LedgerState`]. The loader itself (file parsing, decimal-string-to-minor-
//! unit conversion) lives outside the core; this module only defines the
//! shape and the semantics of applying it.

use crate::config::SimConfig;
use crate::dealer::{BucketSpec, DealerConfig, OrderFlowConfig, TraderPolicyConfig};
use crate::error::ValidationError;
use crate::models::ledger::{DefaultMode, LedgerState};
use crate::models::{Agent, AgentKind};
use crate::ops;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One participant to create during setup (§6 `agents[]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    pub id: String,
    pub kind: AgentKind,
    pub name: String,
    pub bank_id: Option<String>,
}

/// One primitive operation, as named in §4.2, expressed over already-resolved
/// ids and minor-unit amounts (decimal-string parsing is the loader's job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Action {
    MintCash { central_bank_id: String, to: String, amount: i64, alias: Option<String> },
    MintReserves { central_bank_id: String, to: String, amount: i64, alias: Option<String> },
    TransferCash { from: String, to: String, amount: i64 },
    TransferReserves { from_bank: String, to_bank: String, amount: i64 },
    DepositCash { customer: String, bank: String, amount: i64 },
    WithdrawCash { customer: String, bank: String, amount: i64 },
    ClientPayment { payer: String, payer_bank: String, payee: String, payee_bank: String, amount: i64 },
    CreateStock { owner: String, sku: String, quantity: i64, unit_price: Decimal },
    TransferStock { stock_id: String, from: String, to: String, quantity: Option<i64> },
    CreatePayable { from: String, to: String, amount: i64, due_day: u64, maturity_distance: Option<u64>, alias: Option<String> },
    CreateDeliveryObligation { from: String, to: String, sku: String, quantity: i64, unit_price: Decimal, due_day: u64, alias: Option<String> },
    TransferClaim { instrument_id: String, to: String },
}

/// A `scheduled_actions[]` entry: an action queued for a specific future day
/// (§6), applied in Phase B1 of that day in original order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub day: u64,
    pub action: Action,
}

/// Per-debtor-kind MOP rank override (§6 `policy_overrides`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOverrides {
    pub mop_preferences: BTreeMap<AgentKind, Vec<crate::models::InstrumentKind>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    Step,
    UntilStable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultHandling {
    FailFast,
    ExpelAgent,
}

impl From<DefaultHandling> for DefaultMode {
    fn from(value: DefaultHandling) -> Self {
        match value {
            DefaultHandling::FailFast => DefaultMode::FailFast,
            DefaultHandling::ExpelAgent => DefaultMode::ExpelAgent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub mode: RunMode,
    pub max_days: u64,
    pub quiet_days: u64,
    pub default_handling: DefaultHandling,
    pub rollover_enabled: bool,
}

/// §6 `dealer` block: buckets keyed by name, plus the subsystem-wide knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerBlock {
    pub enabled: bool,
    pub ticket_size: Decimal,
    pub guard_m_min: Decimal,
    pub buckets: Vec<BucketSpec>,
    pub dealer_share: Decimal,
    pub vbt_share: Decimal,
    pub phi_m: Decimal,
    pub phi_o: Decimal,
    pub o_min: Decimal,
    pub clip_bid_zero: bool,
    pub order_flow: OrderFlowConfig,
    pub trader_policy: TraderPolicyConfig,
}

impl From<DealerBlock> for DealerConfig {
    fn from(block: DealerBlock) -> Self {
        DealerConfig {
            ticket_size: block.ticket_size,
            guard_m_min: block.guard_m_min,
            buckets: block.buckets,
            dealer_share: block.dealer_share,
            vbt_share: block.vbt_share,
            phi_m: block.phi_m,
            phi_o: block.phi_o,
            o_min: block.o_min,
            clip_bid_zero: block.clip_bid_zero,
            order_flow: block.order_flow,
            trader_policy: block.trader_policy,
        }
    }
}

/// The full structured scenario input (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub name: String,
    pub description: Option<String>,
    pub version: u32,
    pub agents: Vec<AgentSpec>,
    pub initial_actions: Vec<Action>,
    pub scheduled_actions: Vec<ScheduledAction>,
    pub policy_overrides: Option<PolicyOverrides>,
    pub dealer: Option<DealerBlock>,
    pub run: RunSettings,
}

/// Every agent id an action can reference, so preflight can check an alias
/// (here, an agent id) is never used before its `agents[]` entry (§4.2 B5).
fn action_agent_refs(action: &Action) -> Vec<&str> {
    match action {
        Action::MintCash { central_bank_id, to, .. } => vec![central_bank_id.as_str(), to.as_str()],
        Action::MintReserves { central_bank_id, to, .. } => vec![central_bank_id.as_str(), to.as_str()],
        Action::TransferCash { from, to, .. } => vec![from.as_str(), to.as_str()],
        Action::TransferReserves { from_bank, to_bank, .. } => vec![from_bank.as_str(), to_bank.as_str()],
        Action::DepositCash { customer, bank, .. } => vec![customer.as_str(), bank.as_str()],
        Action::WithdrawCash { customer, bank, .. } => vec![customer.as_str(), bank.as_str()],
        Action::ClientPayment { payer, payer_bank, payee, payee_bank, .. } => {
            vec![payer.as_str(), payer_bank.as_str(), payee.as_str(), payee_bank.as_str()]
        }
        Action::CreateStock { owner, .. } => vec![owner.as_str()],
        Action::TransferStock { from, to, .. } => vec![from.as_str(), to.as_str()],
        Action::CreatePayable { from, to, .. } => vec![from.as_str(), to.as_str()],
        Action::CreateDeliveryObligation { from, to, .. } => vec![from.as_str(), to.as_str()],
        Action::TransferClaim { to, .. } => vec![to.as_str()],
    }
}

/// Preflight validation (§6, §8 B5): reject any scheduled action whose agent
/// references were never declared in `agents[]` — run before a single action
/// is applied, so a malformed scenario fails before mutating anything.
pub fn validate(scenario: &ScenarioInput) -> Result<(), ValidationError> {
    if scenario.version != 1 {
        return Err(ValidationError::Other(format!("unsupported scenario version {}", scenario.version)));
    }
    let known: BTreeSet<&str> = scenario.agents.iter().map(|a| a.id.as_str()).collect();
    for action in scenario.initial_actions.iter().chain(scenario.scheduled_actions.iter().map(|s| &s.action)) {
        for id in action_agent_refs(action) {
            if !known.contains(id) {
                return Err(ValidationError::Other(format!("action references unknown agent id '{id}' (B5)")));
            }
        }
    }
    for scheduled in &scenario.scheduled_actions {
        if scheduled.day < 1 {
            return Err(ValidationError::Other("scheduled_actions entries must have day >= 1".into()));
        }
    }
    Ok(())
}

/// Apply one action to `ledger`. Each arm simply forwards to the matching
/// primitive op (§4.2) — this function's only job is unpacking the variant.
pub fn apply_action(ledger: &mut LedgerState, action: &Action) -> Result<(), ValidationError> {
    match action {
        Action::MintCash { central_bank_id, to, amount, alias } => {
            ops::mint_cash(ledger, central_bank_id, to, *amount, "cents", alias.as_deref())?;
        }
        Action::MintReserves { central_bank_id, to, amount, alias } => {
            ops::mint_reserves(ledger, central_bank_id, to, *amount, "cents", alias.as_deref())?;
        }
        Action::TransferCash { from, to, amount } => {
            ops::transfer_cash(ledger, from, to, *amount)?;
        }
        Action::TransferReserves { from_bank, to_bank, amount } => {
            ops::transfer_reserves(ledger, from_bank, to_bank, *amount)?;
        }
        Action::DepositCash { customer, bank, amount } => {
            ops::deposit_cash(ledger, customer, bank, *amount)?;
        }
        Action::WithdrawCash { customer, bank, amount } => {
            ops::withdraw_cash(ledger, customer, bank, *amount)?;
        }
        Action::ClientPayment { payer, payer_bank, payee, payee_bank, amount } => {
            ops::client_payment(ledger, payer, payer_bank, payee, payee_bank, *amount)?;
        }
        Action::CreateStock { owner, sku, quantity, unit_price } => {
            ops::create_stock(ledger, owner, sku, *quantity, *unit_price)?;
        }
        Action::TransferStock { stock_id, from, to, quantity } => {
            ops::transfer_stock(ledger, stock_id, from, to, *quantity)?;
        }
        Action::CreatePayable { from, to, amount, due_day, maturity_distance, alias } => {
            ops::create_payable(ledger, from, to, *amount, *due_day, *maturity_distance, alias.as_deref())?;
        }
        Action::CreateDeliveryObligation { from, to, sku, quantity, unit_price, due_day, alias } => {
            ops::create_delivery_obligation(ledger, from, to, sku, *quantity, *unit_price, *due_day, alias.as_deref())?;
        }
        Action::TransferClaim { instrument_id, to } => {
            ops::transfer_claim(ledger, instrument_id, to)?;
        }
    }
    Ok(())
}

/// Build the [`SimConfig`] this scenario implies (§9 "Dynamic config
/// objects"): policy overrides layered onto the MOP default, run settings,
/// and the dealer block translated into a [`DealerConfig`] when enabled.
pub fn build_config(scenario: &ScenarioInput) -> SimConfig {
    let mut mop = crate::mop::MopConfig::default();
    if let Some(overrides) = &scenario.policy_overrides {
        for (kind, order) in &overrides.mop_preferences {
            mop.set_preference(*kind, order.clone());
        }
    }
    let mut config = SimConfig {
        mop,
        default_mode: scenario.run.default_handling.into(),
        rollover_enabled: scenario.run.rollover_enabled,
        check_mode: crate::invariants::CheckMode::OnCommit,
        max_days: scenario.run.max_days,
        quiet_days: scenario.run.quiet_days,
        dealer: None,
    };
    if let Some(block) = scenario.dealer.clone() {
        if block.enabled {
            config.dealer = Some(block.into());
        }
    }
    config
}

/// Build a fresh ledger from `scenario`'s `agents[]` and `initial_actions[]`,
/// then — if a dealer block is configured — install the dealer subsystem
/// over the payables just created (§4.7 initialization). `seed` is the
/// simulation's single PRNG seed (R3 determinism).
pub fn build_ledger(scenario: &ScenarioInput, config: &SimConfig, seed: u64) -> Result<LedgerState, ValidationError> {
    validate(scenario)?;
    let mut ledger = LedgerState::new(seed).with_default_mode(config.default_mode).with_rollover_enabled(config.rollover_enabled);

    for spec in &scenario.agents {
        let mut agent = Agent::new(&spec.id, &spec.name, spec.kind);
        if let Some(bank_id) = &spec.bank_id {
            agent = agent.with_bank(bank_id);
        }
        ledger.insert_agent(agent);
    }

    for action in &scenario.initial_actions {
        apply_action(&mut ledger, action)?;
    }

    if let Some(dealer_config) = &config.dealer {
        crate::dealer::init_from_payables(&mut ledger, dealer_config)?;
    }

    Ok(ledger)
}
