//! Phase B2: settlement of obligations maturing today (§4.4, L9).

use crate::core::round_half_up_to_i64;
use crate::error::{DefaultError, ValidationError};
use crate::models::event::{Event, Phase};
use crate::models::ledger::{DefaultMode, LedgerState};
use crate::models::InstrumentKind;
use crate::mop::{self, BankRouting, MopConfig};
use crate::ops;
use rust_decimal::Decimal;

/// One obligation due today, resolved to the generic shape settlement needs
/// regardless of whether it started life as a payable or a delivery
/// obligation — both carry an `amount` in minor units (for a delivery
/// obligation this is its `valued_amount`, computed at creation).
#[derive(Debug, Clone)]
struct DueObligation {
    instrument_id: String,
    debtor: String,
    creditor: String,
    amount: i64,
    kind: InstrumentKind,
}

fn kind_priority(kind: InstrumentKind) -> u8 {
    match kind {
        InstrumentKind::DeliveryObligation => 0,
        InstrumentKind::Payable => 1,
        _ => 2,
    }
}

fn due_obligations(ledger: &LedgerState, day: u64) -> Vec<DueObligation> {
    let mut obligations: Vec<DueObligation> = ledger
        .instruments()
        .filter(|i| matches!(i.kind(), InstrumentKind::Payable | InstrumentKind::DeliveryObligation))
        .filter(|i| i.due_day() == Some(day))
        .map(|i| DueObligation {
            instrument_id: i.id().to_string(),
            debtor: i.liability_issuer_id().to_string(),
            creditor: i.effective_creditor().to_string(),
            amount: i.amount(),
            kind: i.kind(),
        })
        .collect();

    // §4.4: group by debtor (stable by id), within a debtor sort by (kind
    // priority, due_day — constant here since all are due today — then id).
    obligations.sort_by(|a, b| {
        a.debtor
            .cmp(&b.debtor)
            .then(kind_priority(a.kind).cmp(&kind_priority(b.kind)))
            .then(a.instrument_id.cmp(&b.instrument_id))
    });
    obligations
}

/// Remove an obligation instrument and its links from both agents' lists.
fn extinguish_obligation(ledger: &mut LedgerState, instrument_id: &str, debtor: &str, creditor: &str) {
    ledger.remove_instrument(instrument_id);
    if let Ok(agent) = ledger.agent_mut(creditor) {
        agent.remove_asset(instrument_id);
    }
    if let Ok(agent) = ledger.agent_mut(debtor) {
        agent.remove_liability(instrument_id);
    }
}

/// Settle one obligation in full via the MOP selector (payable) or a direct
/// stock transfer (delivery obligation), then remove it and emit the
/// matching settled event.
fn settle_in_full(
    ledger: &mut LedgerState,
    config: &MopConfig,
    day: u64,
    obligation: &DueObligation,
) -> Result<(), ValidationError> {
    let debtor_bank = ledger.agent(&obligation.debtor)?.bank_id().map(str::to_string);
    let creditor_bank = ledger.agent(&obligation.creditor)?.bank_id().map(str::to_string);
    let routing = BankRouting { debtor_bank: debtor_bank.as_deref(), creditor_bank: creditor_bank.as_deref() };

    match obligation.kind {
        InstrumentKind::Payable => {
            mop::settle_amount(ledger, config, &obligation.debtor, &obligation.creditor, obligation.amount, routing)?;

            let rollover = if ledger.rollover_enabled() {
                let instrument = ledger.instrument(&obligation.instrument_id)?;
                instrument.maturity_distance().map(|distance| (instrument.alias().map(str::to_string), distance))
            } else {
                None
            };

            extinguish_obligation(ledger, &obligation.instrument_id, &obligation.debtor, &obligation.creditor);
            ledger.log(Event::PayableSettled {
                day,
                phase: Phase::B2,
                payable_id: obligation.instrument_id.clone(),
                debtor: obligation.debtor.clone(),
                creditor: obligation.creditor.clone(),
                amount: obligation.amount,
            });

            // Rollover (§4.4): the debt never drains, it just reissues at
            // `settlement_day + maturity_distance`. Resolves the spec's open
            // question in favor of the settlement day, not the original
            // creation day, so a chain of rollovers keeps a constant period
            // rather than drifting earlier each time.
            if let Some((alias, distance)) = rollover {
                let new_due_day = day + distance;
                let new_id = ops::create_payable(ledger, &obligation.debtor, &obligation.creditor, obligation.amount, new_due_day, Some(distance), None)?;
                if let Some(alias) = alias {
                    ledger.aliases_mut().rebind(&alias, &new_id);
                    ledger.instrument_mut(&new_id)?.set_alias(Some(alias));
                }
            }
        }
        InstrumentKind::DeliveryObligation => {
            let (sku, quantity) = {
                let instrument = ledger.instrument(&obligation.instrument_id)?;
                (instrument.sku().unwrap_or_default().to_string(), instrument.quantity().unwrap_or(0))
            };
            settle_delivery_in_full(ledger, &obligation.debtor, &obligation.creditor, &sku, quantity)?;
            extinguish_obligation(ledger, &obligation.instrument_id, &obligation.debtor, &obligation.creditor);
            ledger.log(Event::DeliveryObligationSettled {
                day,
                phase: Phase::B2,
                obligation_id: obligation.instrument_id.clone(),
                debtor: obligation.debtor.clone(),
                creditor: obligation.creditor.clone(),
                sku,
                quantity,
            });
        }
        _ => unreachable!("due_obligations only collects payables and delivery obligations"),
    }
    Ok(())
}

/// Total stock of `sku` the debtor currently holds, across all its lots.
fn stock_available(ledger: &LedgerState, debtor: &str, sku: &str) -> Result<i64, ValidationError> {
    Ok(ledger
        .agent(debtor)?
        .stock_ids()
        .iter()
        .filter_map(|id| ledger.stock(id).ok())
        .filter(|lot| lot.sku() == sku)
        .map(|lot| lot.quantity())
        .sum())
}

fn settle_delivery_in_full(ledger: &mut LedgerState, debtor: &str, creditor: &str, sku: &str, quantity: i64) -> Result<(), ValidationError> {
    let lot_ids: Vec<String> = ledger.agent(debtor)?.stock_ids().to_vec();
    let mut remaining = quantity;
    for lot_id in lot_ids {
        if remaining == 0 {
            break;
        }
        let (lot_sku, lot_quantity) = {
            let lot = ledger.stock(&lot_id)?;
            (lot.sku().to_string(), lot.quantity())
        };
        if lot_sku != sku || lot_quantity == 0 {
            continue;
        }
        let moved = remaining.min(lot_quantity);
        ops::transfer_stock(ledger, &lot_id, debtor, creditor, Some(moved))?;
        remaining -= moved;
    }
    if remaining > 0 {
        return Err(ValidationError::InsufficientBalance { agent_id: debtor.to_string(), needed: quantity, available: quantity - remaining });
    }
    Ok(())
}

/// Does `debtor` currently hold enough means of payment / stock to cover
/// `obligation` in full? Probing without mutating lets settlement decide
/// success/shortfall before committing to either path.
fn can_settle_in_full(ledger: &LedgerState, config: &MopConfig, obligation: &DueObligation) -> Result<bool, ValidationError> {
    match obligation.kind {
        InstrumentKind::Payable => {
            let available = mop_available_total(ledger, config, &obligation.debtor)?;
            Ok(available >= obligation.amount)
        }
        InstrumentKind::DeliveryObligation => {
            let instrument = ledger.instrument(&obligation.instrument_id)?;
            let sku = instrument.sku().unwrap_or_default().to_string();
            let quantity = instrument.quantity().unwrap_or(0);
            Ok(stock_available(ledger, &obligation.debtor, &sku)? >= quantity)
        }
        _ => unreachable!(),
    }
}

fn mop_available_total(ledger: &LedgerState, config: &MopConfig, debtor: &str) -> Result<i64, ValidationError> {
    let kind = ledger.agent(debtor)?.kind();
    let mut total = 0;
    for instrument_kind in config.preference_for(kind) {
        total += ledger
            .agent(debtor)?
            .asset_ids()
            .iter()
            .filter_map(|id| ledger.instrument(id).ok())
            .filter(|i| i.kind() == *instrument_kind)
            .map(|i| i.amount())
            .sum::<i64>();
    }
    Ok(total)
}

/// Liquidate `debtor`'s remaining means of payment — plus, when a dealer
/// subsystem exists, its ticket-backed claims sold at the prevailing dealer
/// bid (§4.4) — and distribute the pool pro rata across `group` (partial-
/// recovery waterfall), then expel the debtor. `group` is the suffix of
/// today's obligations for this debtor that were not settled before the
/// shortfall was detected.
fn run_waterfall(
    ledger: &mut LedgerState,
    config: &MopConfig,
    day: u64,
    debtor: &str,
    group: &[DueObligation],
) -> Result<(), ValidationError> {
    crate::dealer::liquidate_debtor_tickets(ledger, debtor)?;
    let pool = mop_available_total(ledger, config, debtor)?;
    let total_due: i64 = group.iter().map(|o| o.amount).sum();
    let recovery_rate = if total_due > 0 {
        Decimal::from(pool) / Decimal::from(total_due)
    } else {
        Decimal::ZERO
    };

    let amounts: Vec<i64> = group.iter().map(|o| o.amount).collect();
    let shares = crate::core::decimal::distribute_pro_rata(pool, &amounts);

    for (obligation, recovered) in group.iter().zip(shares.iter().copied()) {
        if recovered > 0 {
            let debtor_bank = ledger.agent(debtor)?.bank_id().map(str::to_string);
            let creditor_bank = ledger.agent(&obligation.creditor)?.bank_id().map(str::to_string);
            let routing = BankRouting { debtor_bank: debtor_bank.as_deref(), creditor_bank: creditor_bank.as_deref() };
            mop::settle_amount(ledger, config, debtor, &obligation.creditor, recovered, routing)?;
        }
        extinguish_obligation(ledger, &obligation.instrument_id, debtor, &obligation.creditor);
        ledger.log(Event::DefaultEvent {
            day,
            phase: Phase::B2,
            debtor: debtor.to_string(),
            creditor: obligation.creditor.clone(),
            obligation_id: obligation.instrument_id.clone(),
            face_amount: obligation.amount,
            recovery_rate,
            paid_amount: recovered,
        });
    }

    ledger.agent_mut(debtor)?.expel();
    Ok(())
}

/// Run Phase B2 for `day`: settle every obligation due today, handling
/// shortfalls per `ledger.default_mode()`.
pub fn run_settlement(ledger: &mut LedgerState, config: &MopConfig, day: u64) -> Result<(), crate::error::SettlementError> {
    let obligations = due_obligations(ledger, day);
    let mut index = 0usize;

    while index < obligations.len() {
        let debtor = obligations[index].debtor.clone();
        let mut group_end = index;
        while group_end < obligations.len() && obligations[group_end].debtor == debtor {
            group_end += 1;
        }
        let debtor_group = &obligations[index..group_end];

        let mut defaulted_at: Option<usize> = None;
        for (offset, obligation) in debtor_group.iter().enumerate() {
            if can_settle_in_full(ledger, config, obligation)? {
                settle_in_full(ledger, config, day, obligation)?;
            } else {
                defaulted_at = Some(offset);
                break;
            }
        }

        if let Some(offset) = defaulted_at {
            let remaining_group = &debtor_group[offset..];
            match ledger.default_mode() {
                DefaultMode::FailFast => {
                    let failing = &remaining_group[0];
                    return Err(crate::error::SettlementError::Default(DefaultError {
                        debtor_id: debtor.clone(),
                        obligation_id: failing.instrument_id.clone(),
                        due_amount: failing.amount,
                        recovered_amount: 0,
                    }));
                }
                DefaultMode::ExpelAgent => {
                    run_waterfall(ledger, config, day, &debtor, remaining_group)?;
                }
            }
        }

        index = group_end;
    }

    Ok(())
}
