//! Dealer↔ledger bridge (§4.11): moves real cash and the real underlying
//! payable claim whenever a ticket trade executes, inside the same atomic
//! scope as the trade (I6/I8).

use crate::core::round_half_up_to_i64;
use crate::error::ValidationError;
use crate::models::ledger::LedgerState;
use rust_decimal::Decimal;

/// Move `price` (quoted per nominal unit `ticket_size`) worth of cash from
/// `buyer_id` to `seller_id`, scaled by the ticket's actual face value, and
/// reassign the underlying payable's effective creditor to `buyer_id`.
/// Returns the minor-unit cash amount moved.
pub fn settle_trade(
    ledger: &mut LedgerState,
    buyer_id: &str,
    seller_id: &str,
    ticket_id: &str,
    price: Decimal,
    ticket_size: Decimal,
) -> Result<i64, ValidationError> {
    let (payable_id, face) = {
        let dealer_state = ledger
            .dealer()
            .ok_or_else(|| ValidationError::DealerConfiguration("dealer subsystem not installed".into()))?;
        let payable_id = dealer_state
            .source_payable
            .get(ticket_id)
            .cloned()
            .ok_or_else(|| ValidationError::Other(format!("ticket '{ticket_id}' has no source payable")))?;
        let ticket = dealer_state
            .ticket(ticket_id)
            .ok_or_else(|| ValidationError::Other(format!("unknown ticket '{ticket_id}'")))?;
        (payable_id, ticket.face())
    };

    let amount = round_half_up_to_i64(price * Decimal::from(face) / ticket_size);

    ledger.with_atomic_scope(|ledger| {
        if amount > 0 {
            crate::ops::transfer_cash(ledger, buyer_id, seller_id, amount)?;
        }
        crate::ops::transfer_claim(ledger, &payable_id, buyer_id)?;
        if let Some(dealer_state) = ledger.dealer_mut() {
            if let Some(ticket) = dealer_state.ticket_mut(ticket_id) {
                ticket.set_owner(buyer_id);
            }
        }
        Ok(())
    })?;

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dealer::state::{DealerBucketRecord, DealerState, VbtBucketRecord};
    use crate::dealer::ticket::{BucketDef, Ticket};
    use crate::dealer::kernel;
    use crate::models::{Agent, AgentKind};
    use rust_decimal_macros::dec;

    fn wired_ledger() -> LedgerState {
        let mut ledger = LedgerState::new(1);
        ledger.insert_agent(Agent::new("CB", "Central Bank", AgentKind::CentralBank));
        ledger.insert_agent(Agent::new("H1", "Household One", AgentKind::Household));
        ledger.insert_agent(Agent::new("DEALER_short", "Dealer", AgentKind::Dealer));
        crate::ops::mint_cash(&mut ledger, "CB", "DEALER_short", 1000, "cents", None).unwrap();

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
                cash: dec!(0),
                ticket_ids: Vec::new(),
                quote: kernel::compute_quote(0, dec!(0), dec!(100), dec!(100), dec!(10), dec!(2), true),
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
                cash: dec!(0),
            },
        );
        ledger.install_dealer(state);
        ledger
    }

    #[test]
    fn settle_trade_moves_cash_scaled_by_face_and_transfers_claim() {
        let mut ledger = wired_ledger();
        let amount = settle_trade(&mut ledger, "DEALER_short", "H1", "tk_1", dec!(95), dec!(100)).unwrap();
        assert_eq!(amount, 95, "face equals ticket_size so price passes through unscaled");
        assert_eq!(ledger.instrument(ledger.dealer().unwrap().source_payable.get("tk_1").unwrap()).unwrap().effective_creditor(), "DEALER_short");
        assert_eq!(ledger.dealer().unwrap().ticket("tk_1").unwrap().owner_id(), "DEALER_short");
    }
}
