//! Dealer subsystem state (§3 "Dealer subsystem state"): per-bucket dealer
//! and VBT records, the ticket registry, and the bridge's payable↔ticket
//! maps. Owned exclusively by [`crate::models::ledger::LedgerState`] so it
//! is mutated only inside the ledger's atomic scope and snapshotted
//! alongside everything else.

use crate::dealer::kernel::{self, Quote};
use crate::dealer::ticket::{BucketDef, Ticket};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerBucketRecord {
    pub bucket: String,
    pub agent_id: String,
    pub cash: Decimal,
    pub ticket_ids: Vec<String>,
    pub quote: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VbtBucketRecord {
    pub bucket: String,
    pub agent_id: String,
    pub mid: Decimal,
    pub spread: Decimal,
    pub phi_m: Decimal,
    pub phi_o: Decimal,
    pub o_min: Decimal,
    pub clip_bid_zero: bool,
    pub ticket_ids: Vec<String>,
    pub cash: Decimal,
}

impl VbtBucketRecord {
    pub fn outside_quotes(&self) -> (Decimal, Decimal) {
        kernel::outside_quotes(self.mid, self.spread, self.clip_bid_zero)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealerState {
    pub buckets: Vec<BucketDef>,
    pub ticket_size: Decimal,
    pub guard_m_min: Decimal,
    pub dealers: BTreeMap<String, DealerBucketRecord>,
    pub vbts: BTreeMap<String, VbtBucketRecord>,
    pub tickets: BTreeMap<String, Ticket>,
    /// ticket_id -> the payable it was derived from (§4.11 bridge).
    pub source_payable: BTreeMap<String, String>,
    pub payable_to_ticket: BTreeMap<String, String>,
    pub metrics: crate::dealer::metrics::DealerMetrics,
    next_ticket_serial: u64,
}

impl DealerState {
    pub fn new(buckets: Vec<BucketDef>, ticket_size: Decimal, guard_m_min: Decimal) -> Self {
        Self {
            buckets,
            ticket_size,
            guard_m_min,
            dealers: BTreeMap::new(),
            vbts: BTreeMap::new(),
            tickets: BTreeMap::new(),
            source_payable: BTreeMap::new(),
            payable_to_ticket: BTreeMap::new(),
            metrics: crate::dealer::metrics::DealerMetrics::default(),
            next_ticket_serial: 0,
        }
    }

    pub fn next_serial(&mut self) -> u64 {
        self.next_ticket_serial += 1;
        self.next_ticket_serial
    }

    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets.iter().map(|b| b.name.clone()).collect()
    }

    pub fn dealer(&self, bucket: &str) -> Option<&DealerBucketRecord> {
        self.dealers.get(bucket)
    }

    pub fn dealer_mut(&mut self, bucket: &str) -> Option<&mut DealerBucketRecord> {
        self.dealers.get_mut(bucket)
    }

    pub fn vbt(&self, bucket: &str) -> Option<&VbtBucketRecord> {
        self.vbts.get(bucket)
    }

    pub fn vbt_mut(&mut self, bucket: &str) -> Option<&mut VbtBucketRecord> {
        self.vbts.get_mut(bucket)
    }

    pub fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn ticket_mut(&mut self, id: &str) -> Option<&mut Ticket> {
        self.tickets.get_mut(id)
    }

    /// Recompute a bucket's quote from its dealer's current inventory/cash
    /// and its VBT's current anchors (§4.8). Idempotent and O(1).
    pub fn recompute_quote(&mut self, bucket: &str) {
        let (inventory_count, cash) = match self.dealers.get(bucket) {
            Some(d) => (d.ticket_ids.len() as i64, d.cash),
            None => return,
        };
        let (mid, spread, clip) = match self.vbts.get(bucket) {
            Some(v) => (v.mid, v.spread, v.clip_bid_zero),
            None => return,
        };
        let quote = kernel::compute_quote(inventory_count, cash, self.ticket_size, mid, spread, self.guard_m_min, clip);
        if let Some(dealer) = self.dealers.get_mut(bucket) {
            dealer.quote = quote;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn single_bucket_state() -> DealerState {
        let mut state = DealerState::new(vec![BucketDef::new("short", 1, None)], dec!(1), dec!(0.02));
        state.dealers.insert(
            "short".into(),
            DealerBucketRecord {
                bucket: "short".into(),
                agent_id: "DEALER_short".into(),
                cash: dec!(5),
                ticket_ids: Vec::new(),
                quote: kernel::compute_quote(0, dec!(5), dec!(1), dec!(1), dec!(0.3), dec!(0.02), true),
            },
        );
        state.vbts.insert(
            "short".into(),
            VbtBucketRecord {
                bucket: "short".into(),
                agent_id: "VBT_short".into(),
                mid: dec!(1),
                spread: dec!(0.3),
                phi_m: dec!(0.1),
                phi_o: dec!(0.05),
                o_min: dec!(0.05),
                clip_bid_zero: true,
                ticket_ids: Vec::new(),
                cash: dec!(0),
            },
        );
        state
    }

    #[test]
    fn recompute_quote_reflects_current_inventory_and_cash() {
        let mut state = single_bucket_state();
        state.dealers.get_mut("short").unwrap().ticket_ids.push("tk_1".into());
        state.recompute_quote("short");
        let quote = &state.dealer("short").unwrap().quote;
        // V = M*a + C = 1*1 + 5 = 6 -> K* = floor(6/1) = 6.
        assert_eq!(quote.capacity, 6);
    }
}
