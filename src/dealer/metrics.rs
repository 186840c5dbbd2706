//! Dealer metrics collector (§6 "dealer metrics"): per-trade and per-day
//! records of prices, inventory, passthrough ratios, and anchor evolution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub day: u64,
    pub bucket: String,
    pub side: String,
    pub passthrough: bool,
    pub ticket_id: String,
    pub price: Decimal,
    pub dealer_cash_before: Decimal,
    pub dealer_cash_after: Decimal,
    pub dealer_inventory_before: i64,
    pub dealer_inventory_after: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: u64,
    pub bucket: String,
    pub mid: Decimal,
    pub spread: Decimal,
    pub bid: Decimal,
    pub ask: Decimal,
    pub inventory_count: i64,
    pub trade_count: u64,
    pub passthrough_count: u64,
}

/// Accumulates metrics across a run; cloned into every atomic-scope
/// checkpoint alongside the rest of the dealer state so a rollback also
/// discards metrics recorded by the failed scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealerMetrics {
    trades: Vec<TradeRecord>,
    days: Vec<DayRecord>,
}

impl DealerMetrics {
    pub fn record_trade(&mut self, record: TradeRecord) {
        self.trades.push(record);
    }

    pub fn record_day(&mut self, record: DayRecord) {
        self.days.push(record);
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    pub fn days(&self) -> &[DayRecord] {
        &self.days
    }

    /// Fraction of recorded trades on `day` that were passthroughs, for a
    /// given bucket. `None` if no trades were recorded.
    pub fn passthrough_ratio(&self, day: u64, bucket: &str) -> Option<Decimal> {
        let in_scope: Vec<&TradeRecord> = self.trades.iter().filter(|t| t.day == day && t.bucket == bucket).collect();
        if in_scope.is_empty() {
            return None;
        }
        let passthroughs = in_scope.iter().filter(|t| t.passthrough).count();
        Some(Decimal::from(passthroughs as i64) / Decimal::from(in_scope.len() as i64))
    }
}
