//! Claim-creating and claim-transferring primitive operations (§4.2):
//! `create_payable`, `create_delivery_obligation`, `transfer_claim`.

use crate::error::ValidationError;
use crate::models::event::{Event, Phase};
use crate::models::ledger::LedgerState;
use crate::models::{Instrument, InstrumentKind};
use rust_decimal::Decimal;

pub fn create_payable(
    ledger: &mut LedgerState,
    from: &str,
    to: &str,
    amount: i64,
    due_day: u64,
    maturity_distance: Option<u64>,
    alias: Option<&str>,
) -> Result<String, ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(from)?;
        ledger.agent(to)?;
        let id = ledger.alloc_id(InstrumentKind::Payable.id_prefix());
        ledger.insert_instrument(Instrument::new_payable(id.clone(), amount, "cents", from, to, due_day, maturity_distance));
        ledger.agent_mut(to)?.add_asset(&id);
        ledger.agent_mut(from)?.add_liability(&id);
        if let Some(alias) = alias {
            ledger
                .aliases_mut()
                .register(alias, &id)
                .map_err(|_| ValidationError::DuplicateAlias(alias.to_string()))?;
            ledger.instrument_mut(&id)?.set_alias(Some(alias.to_string()));
        }
        ledger.log(Event::PayableCreated { day, phase: Phase::A, payable_id: id.clone(), debtor: from.to_string(), creditor: to.to_string(), amount, due_day });
        Ok(id)
    })
}

pub fn create_delivery_obligation(
    ledger: &mut LedgerState,
    from: &str,
    to: &str,
    sku: &str,
    quantity: i64,
    unit_price: Decimal,
    due_day: u64,
    alias: Option<&str>,
) -> Result<String, ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::NonPositiveAmount(quantity));
    }
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(from)?;
        ledger.agent(to)?;
        let id = ledger.alloc_id(InstrumentKind::DeliveryObligation.id_prefix());
        ledger.insert_instrument(Instrument::new_delivery_obligation(id.clone(), from, to, sku, quantity, unit_price, due_day));
        ledger.agent_mut(to)?.add_asset(&id);
        ledger.agent_mut(from)?.add_liability(&id);
        if let Some(alias) = alias {
            ledger
                .aliases_mut()
                .register(alias, &id)
                .map_err(|_| ValidationError::DuplicateAlias(alias.to_string()))?;
        }
        Ok(id)
    })
}

/// Reassign the effective creditor of an existing payable or delivery
/// obligation (§4.2). For a payable this sets the secondary `holder_id`,
/// preserving `asset_holder_id` as the original creditor; for a delivery
/// obligation it reassigns `asset_holder_id` directly. Either way the
/// instrument id moves from the old effective creditor's asset list to the
/// new one's.
pub fn transfer_claim(ledger: &mut LedgerState, instrument_id: &str, to: &str) -> Result<(), ValidationError> {
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(to)?;
        let kind = ledger.instrument(instrument_id)?.kind();
        if !matches!(kind, InstrumentKind::Payable | InstrumentKind::DeliveryObligation) {
            return Err(ValidationError::WrongInstrumentKind(instrument_id.to_string()));
        }
        let from = ledger.instrument(instrument_id)?.effective_creditor().to_string();
        if from == to {
            return Ok(());
        }
        ledger.agent_mut(&from)?.remove_asset(instrument_id);
        ledger.instrument_mut(instrument_id)?.set_effective_creditor(to);
        ledger.agent_mut(to)?.add_asset(instrument_id);
        ledger.log(Event::ClaimTransferred { day, phase: Phase::A, instrument_id: instrument_id.to_string(), from, to: to.to_string() });
        Ok(())
    })
}
