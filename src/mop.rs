//! Means-of-payment selector (L8, §4.3).
//!
//! Given a debtor, a creditor, and an amount owed, produces and executes an
//! ordered drawdown plan across the debtor's means of payment. Iterates the
//! debtor kind's preference list; for each kind, draws `min(remaining,
//! available)` via the matching primitive op, deterministically in lot
//! creation order (no randomness — §4.3 "Determinism").

use crate::error::ValidationError;
use crate::models::ledger::LedgerState;
use crate::models::{AgentKind, InstrumentKind};
use crate::ops;
use std::collections::BTreeMap;

/// The per-kind preference list consulted by the selector, one of the knobs
/// collected into a single read-only policy object (§9 "Dynamic config
/// objects").
#[derive(Debug, Clone)]
pub struct MopConfig {
    preferences: BTreeMap<AgentKind, Vec<InstrumentKind>>,
}

impl Default for MopConfig {
    fn default() -> Self {
        let mut preferences = BTreeMap::new();
        preferences.insert(AgentKind::Household, vec![InstrumentKind::BankDeposit, InstrumentKind::Cash]);
        preferences.insert(AgentKind::Firm, vec![InstrumentKind::BankDeposit, InstrumentKind::Cash]);
        preferences.insert(AgentKind::Dealer, vec![InstrumentKind::BankDeposit, InstrumentKind::Cash]);
        preferences.insert(AgentKind::Vbt, vec![InstrumentKind::BankDeposit, InstrumentKind::Cash]);
        preferences.insert(AgentKind::Bank, vec![InstrumentKind::ReserveDeposit]);
        preferences.insert(AgentKind::CentralBank, vec![InstrumentKind::ReserveDeposit]);
        preferences.insert(AgentKind::Treasury, vec![InstrumentKind::ReserveDeposit, InstrumentKind::BankDeposit]);
        Self { preferences }
    }
}

impl MopConfig {
    pub fn preference_for(&self, kind: AgentKind) -> &[InstrumentKind] {
        self.preferences.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Override the preference list for a debtor kind (§6 `policy_overrides`).
    pub fn set_preference(&mut self, kind: AgentKind, order: Vec<InstrumentKind>) {
        self.preferences.insert(kind, order);
    }
}

/// Context needed to route bank-deposit and reserve-deposit drawdowns: the
/// debtor and creditor's own bank relationships (meaningless for banks, who
/// settle reserves directly).
#[derive(Debug, Clone, Copy)]
pub struct BankRouting<'a> {
    pub debtor_bank: Option<&'a str>,
    pub creditor_bank: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MopOutcome {
    pub paid: i64,
    pub remaining: i64,
}

impl MopOutcome {
    pub fn is_full(&self) -> bool {
        self.remaining == 0
    }
}

fn available_balance(ledger: &LedgerState, agent_id: &str, kind: InstrumentKind) -> Result<i64, ValidationError> {
    Ok(ledger
        .agent(agent_id)?
        .asset_ids()
        .iter()
        .filter_map(|id| ledger.instrument(id).ok())
        .filter(|i| i.kind() == kind)
        .map(|i| i.amount())
        .sum())
}

/// Attempt to discharge `amount` owed by `debtor` to `creditor`, drawing down
/// the debtor's means of payment per `config`'s preference list for the
/// debtor's agent kind. Returns how much was actually paid; `remaining > 0`
/// means the debtor was insufficient and the caller (settlement) decides the
/// policy from there (§4.3 "If the loop ends with remaining > 0...").
pub fn settle_amount(
    ledger: &mut LedgerState,
    config: &MopConfig,
    debtor: &str,
    creditor: &str,
    amount: i64,
    routing: BankRouting,
) -> Result<MopOutcome, ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    let debtor_kind = ledger.agent(debtor)?.kind();
    let preference = config.preference_for(debtor_kind).to_vec();

    let mut remaining = amount;
    for kind in preference {
        if remaining == 0 {
            break;
        }
        let available = available_balance(ledger, debtor, kind)?;
        if available == 0 {
            continue;
        }
        let draw = remaining.min(available);

        match kind {
            InstrumentKind::Cash => {
                ops::transfer_cash(ledger, debtor, creditor, draw)?;
            }
            InstrumentKind::ReserveDeposit => {
                ops::transfer_reserves(ledger, debtor, creditor, draw)?;
            }
            InstrumentKind::BankDeposit => {
                let debtor_bank = routing.debtor_bank.ok_or_else(|| {
                    ValidationError::Other(format!("'{debtor}' has bank_deposit balances but no bank_id on record"))
                })?;
                let creditor_bank = routing.creditor_bank.ok_or_else(|| {
                    ValidationError::Other(format!("'{creditor}' has no bank_id on record to receive a bank_deposit payment"))
                })?;
                ops::client_payment(ledger, debtor, debtor_bank, creditor, creditor_bank, draw)?;
            }
            other => {
                return Err(ValidationError::Other(format!("{other:?} is not a valid means of payment")));
            }
        }
        remaining -= draw;
    }

    Ok(MopOutcome { paid: amount - remaining, remaining })
}
