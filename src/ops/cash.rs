//! Cash-like primitive operations (§4.2): mint, transfer, deposit, withdraw,
//! and client payment. All of them operate on `Cash`, `BankDeposit`, or
//! `ReserveDeposit` instruments — the three kinds flagged
//! `InstrumentKind::is_cash_like`.

use crate::error::ValidationError;
use crate::models::event::{Event, Phase};
use crate::models::ledger::LedgerState;
use crate::models::{Instrument, InstrumentKind};

fn require_positive(amount: i64) -> Result<(), ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    Ok(())
}

/// Find (or mint) the instrument of `kind` issued by `issuer_id` held by
/// `creditor_id`, add `amount` to it, and return its id. Merges into the
/// first matching lot in creation order rather than always minting a fresh
/// one, so that an agent's cash holdings stay as few lots as possible.
fn credit_cash_like(
    ledger: &mut LedgerState,
    kind: InstrumentKind,
    issuer_id: &str,
    creditor_id: &str,
    denomination: &str,
    amount: i64,
) -> Result<String, ValidationError> {
    let asset_ids: Vec<String> = ledger.agent(creditor_id)?.asset_ids().to_vec();
    for id in &asset_ids {
        let instrument = ledger.instrument(id)?;
        if instrument.kind() == kind && instrument.liability_issuer_id() == issuer_id {
            let new_amount = instrument.amount() + amount;
            ledger.instrument_mut(id)?.set_amount(new_amount);
            return Ok(id.clone());
        }
    }

    let id = ledger.alloc_id(kind.id_prefix());
    ledger.insert_instrument(Instrument::new_cash_like(
        id.clone(),
        kind,
        amount,
        denomination,
        creditor_id,
        issuer_id,
    ));
    ledger.agent_mut(creditor_id)?.add_asset(&id);
    ledger.agent_mut(issuer_id)?.add_liability(&id);
    Ok(id)
}

/// Remove `amount` of `kind` from `holder_id`'s holdings, splitting the last
/// partially-consumed lot and removing any lot drained to zero (from both the
/// instrument map and the holder's and issuer's lists).
fn debit_cash_like(ledger: &mut LedgerState, holder_id: &str, kind: InstrumentKind, amount: i64) -> Result<(), ValidationError> {
    let asset_ids: Vec<String> = ledger.agent(holder_id)?.asset_ids().to_vec();
    let mut remaining = amount;

    for id in &asset_ids {
        if remaining == 0 {
            break;
        }
        let (instrument_kind, available, issuer_id) = {
            let instrument = ledger.instrument(id)?;
            (instrument.kind(), instrument.amount(), instrument.liability_issuer_id().to_string())
        };
        if instrument_kind != kind {
            continue;
        }
        let draw = remaining.min(available);
        let left = available - draw;
        if left == 0 {
            ledger.remove_instrument(id);
            ledger.agent_mut(holder_id)?.remove_asset(id);
            ledger.agent_mut(&issuer_id)?.remove_liability(id);
        } else {
            ledger.instrument_mut(id)?.set_amount(left);
        }
        remaining -= draw;
    }

    if remaining > 0 {
        let available_total = amount - remaining;
        return Err(ValidationError::InsufficientBalance {
            agent_id: holder_id.to_string(),
            needed: amount,
            available: available_total,
        });
    }
    Ok(())
}

pub fn mint_cash(
    ledger: &mut LedgerState,
    central_bank_id: &str,
    to: &str,
    amount: i64,
    denomination: &str,
    alias: Option<&str>,
) -> Result<String, ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(central_bank_id)?;
        ledger.agent(to)?;
        let id = credit_cash_like(ledger, InstrumentKind::Cash, central_bank_id, to, denomination, amount)?;
        if let Some(alias) = alias {
            ledger
                .aliases_mut()
                .register(alias, &id)
                .map_err(|_| ValidationError::DuplicateAlias(alias.to_string()))?;
        }
        ledger.log(Event::CashMinted { day, phase: Phase::A, to: to.to_string(), instrument_id: id.clone(), amount });
        Ok(id)
    })
}

pub fn mint_reserves(
    ledger: &mut LedgerState,
    central_bank_id: &str,
    to: &str,
    amount: i64,
    denomination: &str,
    alias: Option<&str>,
) -> Result<String, ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(central_bank_id)?;
        ledger.agent(to)?;
        let id = credit_cash_like(ledger, InstrumentKind::ReserveDeposit, central_bank_id, to, denomination, amount)?;
        if let Some(alias) = alias {
            ledger
                .aliases_mut()
                .register(alias, &id)
                .map_err(|_| ValidationError::DuplicateAlias(alias.to_string()))?;
        }
        ledger.log(Event::ReservesMinted { day, phase: Phase::A, to: to.to_string(), instrument_id: id.clone(), amount });
        Ok(id)
    })
}

/// The issuer of `holder_id`'s first lot of `kind`, captured before any debit
/// so that fully draining a lot never makes the issuer unrecoverable.
fn issuer_of_holding(ledger: &LedgerState, holder_id: &str, kind: InstrumentKind) -> Result<String, ValidationError> {
    ledger
        .agent(holder_id)?
        .asset_ids()
        .iter()
        .find_map(|id| {
            let instrument = ledger.instrument(id).ok()?;
            (instrument.kind() == kind).then(|| instrument.liability_issuer_id().to_string())
        })
        .or_else(|| {
            // Fall back to any instrument of this kind in the whole ledger —
            // covers the case where `holder_id` has none yet (e.g. a bank
            // about to receive its first cash lot via deposit_cash).
            ledger
                .instruments()
                .find(|i| i.kind() == kind)
                .map(|i| i.liability_issuer_id().to_string())
        })
        .ok_or_else(|| ValidationError::Other(format!("no instrument of kind {kind:?} exists to infer its issuer")))
}

pub fn transfer_cash(ledger: &mut LedgerState, from: &str, to: &str, amount: i64) -> Result<(), ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(from)?;
        ledger.agent(to)?;
        let central_bank_id = issuer_of_holding(ledger, from, InstrumentKind::Cash)?;
        debit_cash_like(ledger, from, InstrumentKind::Cash, amount)?;
        credit_cash_like(ledger, InstrumentKind::Cash, &central_bank_id, to, "cents", amount)?;
        ledger.log(Event::CashTransferred { day, phase: Phase::A, from: from.to_string(), to: to.to_string(), amount });
        Ok(())
    })
}

pub fn transfer_reserves(ledger: &mut LedgerState, from_bank: &str, to_bank: &str, amount: i64) -> Result<(), ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(from_bank)?;
        ledger.agent(to_bank)?;
        let central_bank_id = issuer_of_holding(ledger, from_bank, InstrumentKind::ReserveDeposit)?;
        debit_cash_like(ledger, from_bank, InstrumentKind::ReserveDeposit, amount)?;
        credit_cash_like(ledger, InstrumentKind::ReserveDeposit, &central_bank_id, to_bank, "cents", amount)?;
        ledger.log(Event::ReservesTransferred { day, phase: Phase::A, from: from_bank.to_string(), to: to_bank.to_string(), amount });
        Ok(())
    })
}

pub fn deposit_cash(ledger: &mut LedgerState, customer: &str, bank: &str, amount: i64) -> Result<(), ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(customer)?;
        ledger.agent(bank)?;
        let central_bank_id = issuer_of_holding(ledger, customer, InstrumentKind::Cash)?;
        debit_cash_like(ledger, customer, InstrumentKind::Cash, amount)?;
        credit_cash_like(ledger, InstrumentKind::BankDeposit, bank, customer, "cents", amount)?;
        credit_cash_like(ledger, InstrumentKind::Cash, &central_bank_id, bank, "cents", amount)?;
        ledger.log(Event::CashDeposited { day, phase: Phase::A, customer: customer.to_string(), bank: bank.to_string(), amount });
        Ok(())
    })
}

pub fn withdraw_cash(ledger: &mut LedgerState, customer: &str, bank: &str, amount: i64) -> Result<(), ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(customer)?;
        ledger.agent(bank)?;
        let central_bank_id = issuer_of_holding(ledger, bank, InstrumentKind::Cash)?;
        debit_cash_like(ledger, customer, InstrumentKind::BankDeposit, amount)?;
        debit_cash_like(ledger, bank, InstrumentKind::Cash, amount)?;
        credit_cash_like(ledger, InstrumentKind::Cash, &central_bank_id, customer, "cents", amount)?;
        ledger.log(Event::CashWithdrawn { day, phase: Phase::A, customer: customer.to_string(), bank: bank.to_string(), amount });
        Ok(())
    })
}

/// Discharge a client-to-client payment (§4.2). Same-bank payments move bank
/// deposits directly; cross-bank payments additionally create or augment an
/// `interbank_overnight` between the two banks, due the same day (settled in
/// Phase C, per the T+0 design note in §9). Reserves do not move here.
pub fn client_payment(
    ledger: &mut LedgerState,
    payer: &str,
    payer_bank: &str,
    payee: &str,
    payee_bank: &str,
    amount: i64,
) -> Result<Option<String>, ValidationError> {
    require_positive(amount)?;
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(payer)?;
        ledger.agent(payee)?;
        ledger.agent(payer_bank)?;
        ledger.agent(payee_bank)?;

        debit_cash_like(ledger, payer, InstrumentKind::BankDeposit, amount)?;

        let interbank_id = if payer_bank == payee_bank {
            credit_cash_like(ledger, InstrumentKind::BankDeposit, payer_bank, payee, "cents", amount)?;
            None
        } else {
            credit_cash_like(ledger, InstrumentKind::BankDeposit, payee_bank, payee, "cents", amount)?;
            let id = credit_or_augment_interbank(ledger, payer_bank, payee_bank, amount, day)?;
            Some(id)
        };

        ledger.log(Event::ClientPayment {
            day,
            phase: Phase::A,
            payer: payer.to_string(),
            payee: payee.to_string(),
            amount,
            created_interbank_id: interbank_id.clone(),
        });
        Ok(interbank_id)
    })
}

/// Find an existing `interbank_overnight` between the same debtor/creditor
/// bank pair due today and add to it, or mint a fresh one.
fn credit_or_augment_interbank(
    ledger: &mut LedgerState,
    debtor_bank_id: &str,
    creditor_bank_id: &str,
    amount: i64,
    due_day: u64,
) -> Result<String, ValidationError> {
    let existing = ledger
        .instruments()
        .find(|i| {
            i.kind() == InstrumentKind::InterbankOvernight
                && i.debtor_bank_id() == Some(debtor_bank_id)
                && i.creditor_bank_id() == Some(creditor_bank_id)
                && i.due_day() == Some(due_day)
        })
        .map(|i| i.id().to_string());

    if let Some(id) = existing {
        let new_amount = ledger.instrument(&id)?.amount() + amount;
        ledger.instrument_mut(&id)?.set_amount(new_amount);
        return Ok(id);
    }

    let id = ledger.alloc_id(InstrumentKind::InterbankOvernight.id_prefix());
    ledger.insert_instrument(Instrument::new_interbank_overnight(
        id.clone(),
        amount,
        "cents",
        debtor_bank_id,
        creditor_bank_id,
        due_day,
    ));
    ledger.agent_mut(creditor_bank_id)?.add_asset(&id);
    ledger.agent_mut(debtor_bank_id)?.add_liability(&id);
    Ok(id)
}
