//! Trade executor (D4, §4.9): routes one customer order to the bucket's
//! dealer when it has room, otherwise passes it through to the bucket's VBT
//! at the outside quote.

use crate::dealer::bridge;
use crate::dealer::metrics::TradeRecord;
use crate::dealer::ticket::Ticket;
use crate::error::ValidationError;
use crate::models::event::Event;
use crate::models::ledger::LedgerState;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The customer sells a ticket into the market.
    Sell,
    /// The customer buys a ticket out of the market.
    Buy,
}

#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub side: Side,
    pub passthrough: bool,
    pub ticket_id: String,
    pub price: Decimal,
    pub amount_minor: i64,
}

fn no_dealer() -> ValidationError {
    ValidationError::DealerConfiguration("dealer subsystem not installed".into())
}

fn unknown_bucket(bucket: &str) -> ValidationError {
    ValidationError::DealerConfiguration(format!("unknown dealer bucket '{bucket}'"))
}

/// The lowest-`maturity_day`, then lowest-`serial` ticket among `ids` — a
/// deterministic tie-break so that which ticket changes hands never depends
/// on map iteration order.
fn pick_ticket(ids: &[String], tickets: &BTreeMap<String, Ticket>) -> Option<String> {
    ids.iter()
        .filter_map(|id| tickets.get(id).map(|t| (id.clone(), t.maturity_day(), t.serial())))
        .min_by_key(|(_, maturity, serial)| (*maturity, *serial))
        .map(|(id, _, _)| id)
}

/// A customer sells `ticket_id` (which it must currently own) into `bucket`'s
/// market — the dealer is the one taking on the ticket. Interior feasible iff
/// `x + S ≤ X*` (the dealer has room under its capacity once this ticket is
/// added) and `C ≥ bid` (the dealer can afford to pay for it); otherwise
/// passthrough to the VBT at the outside bid (§4.9, §8 D-C3/D-C4, B3).
pub fn execute_sell(ledger: &mut LedgerState, trader_id: &str, bucket: &str, ticket_id: &str) -> Result<TradeOutcome, ValidationError> {
    let day = ledger.day();
    let ticket_size = ledger.dealer().ok_or_else(no_dealer)?.ticket_size;

    let (interior, price, counterparty, inventory_before, cash_before) = {
        let state = ledger.dealer().ok_or_else(no_dealer)?;
        let dealer_record = state.dealer(bucket).ok_or_else(|| unknown_bucket(bucket))?;
        let has_room = (dealer_record.ticket_ids.len() as i64) < dealer_record.quote.capacity;
        let can_afford = dealer_record.cash >= dealer_record.quote.bid;
        if !dealer_record.quote.guard && has_room && can_afford {
            (true, dealer_record.quote.bid, dealer_record.agent_id.clone(), dealer_record.ticket_ids.len() as i64, dealer_record.cash)
        } else {
            let vbt = state.vbt(bucket).ok_or_else(|| unknown_bucket(bucket))?;
            let (vbt_bid, _) = vbt.outside_quotes();
            (false, vbt_bid, vbt.agent_id.clone(), vbt.ticket_ids.len() as i64, vbt.cash)
        }
    };

    let amount = bridge::settle_trade(ledger, &counterparty, trader_id, ticket_id, price, ticket_size)?;

    let (inventory_after, cash_after) = if let Some(state) = ledger.dealer_mut() {
        if interior {
            let record = state.dealer_mut(bucket).expect("bucket checked above");
            record.cash -= Decimal::from(amount);
            record.ticket_ids.push(ticket_id.to_string());
            let after = (record.ticket_ids.len() as i64, record.cash);
            state.recompute_quote(bucket);
            after
        } else {
            let record = state.vbt_mut(bucket).expect("bucket checked above");
            record.cash -= Decimal::from(amount);
            record.ticket_ids.push(ticket_id.to_string());
            let after = (record.ticket_ids.len() as i64, record.cash);
            state.recompute_quote(bucket);
            after
        }
    } else {
        (inventory_before, cash_before)
    };

    if interior {
        ledger.log(Event::DealerTrade { day, bucket: bucket.to_string(), side: "SELL".into(), dealer_id: counterparty.clone(), trader_id: trader_id.to_string(), ticket_id: ticket_id.to_string(), price });
    } else {
        ledger.log(Event::DealerPassthrough { day, bucket: bucket.to_string(), side: "SELL".into(), vbt_id: counterparty.clone(), trader_id: trader_id.to_string(), ticket_id: ticket_id.to_string(), price });
    }
    if let Some(state) = ledger.dealer_mut() {
        state.metrics.record_trade(TradeRecord {
            day,
            bucket: bucket.to_string(),
            side: "SELL".into(),
            passthrough: !interior,
            ticket_id: ticket_id.to_string(),
            price,
            dealer_cash_before: cash_before,
            dealer_cash_after: cash_after,
            dealer_inventory_before: inventory_before,
            dealer_inventory_after: inventory_after,
        });
    }

    Ok(TradeOutcome { side: Side::Sell, passthrough: !interior, ticket_id: ticket_id.to_string(), price, amount_minor: amount })
}

/// A customer buys a ticket out of `bucket`'s market — the dealer is the one
/// giving up the ticket. Interior feasible iff `x ≥ S` (the dealer holds at
/// least one ticket) and `X* > 0` (the dealer has positive capacity, i.e. not
/// in guard regime); otherwise passthrough to the VBT at the outside ask. A
/// `ValidationError` if the VBT's inventory is also empty — there is nothing
/// to sell (§4.9, §8 B2/B4).
pub fn execute_buy(ledger: &mut LedgerState, trader_id: &str, bucket: &str) -> Result<TradeOutcome, ValidationError> {
    let day = ledger.day();
    let ticket_size = ledger.dealer().ok_or_else(no_dealer)?.ticket_size;

    let (interior, ticket_id, price, counterparty, inventory_before, cash_before) = {
        let state = ledger.dealer().ok_or_else(no_dealer)?;
        let dealer_record = state.dealer(bucket).ok_or_else(|| unknown_bucket(bucket))?;
        if !dealer_record.ticket_ids.is_empty() && dealer_record.quote.capacity > 0 && !dealer_record.quote.guard {
            let ticket_id = pick_ticket(&dealer_record.ticket_ids, &state.tickets)
                .ok_or_else(|| ValidationError::Other(format!("bucket '{bucket}' dealer inventory references no live ticket")))?;
            (true, ticket_id, dealer_record.quote.ask, dealer_record.agent_id.clone(), dealer_record.ticket_ids.len() as i64, dealer_record.cash)
        } else {
            let vbt = state.vbt(bucket).ok_or_else(|| unknown_bucket(bucket))?;
            if vbt.ticket_ids.is_empty() {
                return Err(ValidationError::Other(format!("bucket '{bucket}' has no inventory on either side for a BUY order (B4)")));
            }
            let (_, vbt_ask) = vbt.outside_quotes();
            let ticket_id = pick_ticket(&vbt.ticket_ids, &state.tickets)
                .ok_or_else(|| ValidationError::Other(format!("bucket '{bucket}' VBT inventory references no live ticket")))?;
            (false, ticket_id, vbt_ask, vbt.agent_id.clone(), vbt.ticket_ids.len() as i64, vbt.cash)
        }
    };

    let amount = bridge::settle_trade(ledger, trader_id, &counterparty, &ticket_id, price, ticket_size)?;

    let (inventory_after, cash_after) = if let Some(state) = ledger.dealer_mut() {
        if interior {
            let record = state.dealer_mut(bucket).expect("bucket checked above");
            record.cash += Decimal::from(amount);
            record.ticket_ids.retain(|id| id != &ticket_id);
            let after = (record.ticket_ids.len() as i64, record.cash);
            state.recompute_quote(bucket);
            after
        } else {
            let record = state.vbt_mut(bucket).expect("bucket checked above");
            record.cash += Decimal::from(amount);
            record.ticket_ids.retain(|id| id != &ticket_id);
            let after = (record.ticket_ids.len() as i64, record.cash);
            state.recompute_quote(bucket);
            after
        }
    } else {
        (inventory_before, cash_before)
    };

    if interior {
        ledger.log(Event::DealerTrade { day, bucket: bucket.to_string(), side: "BUY".into(), dealer_id: counterparty.clone(), trader_id: trader_id.to_string(), ticket_id: ticket_id.clone(), price });
    } else {
        ledger.log(Event::DealerPassthrough { day, bucket: bucket.to_string(), side: "BUY".into(), vbt_id: counterparty.clone(), trader_id: trader_id.to_string(), ticket_id: ticket_id.clone(), price });
    }
    if let Some(state) = ledger.dealer_mut() {
        state.metrics.record_trade(TradeRecord {
            day,
            bucket: bucket.to_string(),
            side: "BUY".into(),
            passthrough: !interior,
            ticket_id: ticket_id.clone(),
            price,
            dealer_cash_before: cash_before,
            dealer_cash_after: cash_after,
            dealer_inventory_before: inventory_before,
            dealer_inventory_after: inventory_after,
        });
    }

    Ok(TradeOutcome { side: Side::Buy, passthrough: !interior, ticket_id, price, amount_minor: amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::kernel;
    use crate::dealer::state::{DealerBucketRecord, DealerState, VbtBucketRecord};
    use crate::dealer::ticket::BucketDef;
    use crate::models::{Agent, AgentKind};
    use rust_decimal_macros::dec;

    fn ledger_with_one_ticket_held_by_trader() -> LedgerState {
        let mut ledger = LedgerState::new(1);
        ledger.insert_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank));
        ledger.insert_agent(Agent::new("H1", "Household One", AgentKind::Household));
        ledger.insert_agent(Agent::new("DEALER_short", "Dealer", AgentKind::Dealer));
        ledger.insert_agent(Agent::new("VBT_short", "VBT", AgentKind::Vbt));
        crate::ops::mint_cash(&mut ledger, "CB", "DEALER_short", 1000, "cents", None).unwrap();
        crate::ops::mint_cash(&mut ledger, "CB", "VBT_short", 1000, "cents", None).unwrap();

        let payable_id = crate::ops::create_payable(&mut ledger, "CB", "H1", 100, 5, None, None).unwrap();

        let buckets = vec![BucketDef::new("short", 1, None)];
        let mut state = DealerState::new(buckets.clone(), dec!(100), dec!(2));
        let ticket = Ticket::new("tk_1", "CB", "H1", 100, 5, 0, 1, &buckets);
        state.tickets.insert("tk_1".into(), ticket);
        state.source_payable.insert("tk_1".into(), payable_id.clone());
        state.payable_to_ticket.insert(payable_id, "tk_1".into());
        state.dealers.insert(
            "short".into(),
            DealerBucketRecord {
                bucket: "short".into(),
                agent_id: "DEALER_short".into(),
                cash: dec!(1000),
                ticket_ids: Vec::new(),
                quote: kernel::compute_quote(0, dec!(1000), dec!(100), dec!(100), dec!(10), dec!(2), true),
            },
        );
        state.vbts.insert(
            "short".into(),
            VbtBucketRecord {
                bucket: "short".into(),
                agent_id: "VBT_short".into(),
                mid: dec!(100),
                spread: dec!(10),
                phi_m: dec!(0.1),
                phi_o: dec!(0.05),
                o_min: dec!(1),
                clip_bid_zero: true,
                ticket_ids: Vec::new(),
                cash: dec!(1000),
            },
        );
        ledger.install_dealer(state);
        ledger
    }

    #[test]
    fn sell_is_interior_when_dealer_has_capacity() {
        let mut ledger = ledger_with_one_ticket_held_by_trader();
        let outcome = execute_sell(&mut ledger, "H1", "short", "tk_1").unwrap();
        assert!(!outcome.passthrough);
        assert_eq!(ledger.dealer().unwrap().dealer("short").unwrap().ticket_ids, vec!["tk_1".to_string()]);
    }

    #[test]
    fn buy_fails_when_both_sides_have_no_inventory() {
        let mut ledger = ledger_with_one_ticket_held_by_trader();
        let err = execute_buy(&mut ledger, "H1", "short").unwrap_err();
        assert!(matches!(err, ValidationError::Other(_)));
    }

    #[test]
    fn buy_is_interior_when_dealer_holds_a_ticket() {
        let mut ledger = ledger_with_one_ticket_held_by_trader();
        execute_sell(&mut ledger, "H1", "short", "tk_1").unwrap();
        let outcome = execute_buy(&mut ledger, "H1", "short").unwrap();
        assert!(!outcome.passthrough);
        assert_eq!(outcome.ticket_id, "tk_1");
        assert!(ledger.dealer().unwrap().dealer("short").unwrap().ticket_ids.is_empty());
    }
}
