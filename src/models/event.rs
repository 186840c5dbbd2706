//! Event log — one record per significant state change (§6).
//!
//! Events are the only artifact that defines order: for day T, all of that
//! day's events precede any day-(T+1) event, and within a day they are
//! appended in the order they occur (§5). Replaying the log against the
//! initial and scheduled actions must reproduce byte-identical events for the
//! same seed (R3).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Simulation phase tag, carried on almost every event so that a reader can
/// tell which stage of the daily loop (§4.6) produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    A,
    Dealer,
    B1,
    B2,
    C,
}

/// A single logged occurrence. Every variant carries `day`; most carry
/// `phase`. Kind-specific payloads are named fields, not a nested blob, so
/// that artifact writers can serialize them directly (§6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    BeginDay { day: u64 },
    PhaseA { day: u64 },
    SubphaseB1 { day: u64 },
    PhaseB { day: u64 },
    SubphaseB2 { day: u64 },
    PhaseC { day: u64 },

    CashMinted { day: u64, phase: Phase, to: String, instrument_id: String, amount: i64 },
    ReservesMinted { day: u64, phase: Phase, to: String, instrument_id: String, amount: i64 },
    CashTransferred { day: u64, phase: Phase, from: String, to: String, amount: i64 },
    ReservesTransferred { day: u64, phase: Phase, from: String, to: String, amount: i64 },
    CashDeposited { day: u64, phase: Phase, customer: String, bank: String, amount: i64 },
    CashWithdrawn { day: u64, phase: Phase, customer: String, bank: String, amount: i64 },
    ClientPayment {
        day: u64,
        phase: Phase,
        payer: String,
        payee: String,
        amount: i64,
        created_interbank_id: Option<String>,
    },

    StockCreated { day: u64, phase: Phase, owner: String, stock_id: String, sku: String, quantity: i64 },
    StockTransferred { day: u64, phase: Phase, stock_id: String, from: String, to: String, quantity: i64 },

    PayableCreated { day: u64, phase: Phase, payable_id: String, debtor: String, creditor: String, amount: i64, due_day: u64 },
    PayableSettled { day: u64, phase: Phase, payable_id: String, debtor: String, creditor: String, amount: i64 },
    DeliveryObligationSettled { day: u64, phase: Phase, obligation_id: String, debtor: String, creditor: String, sku: String, quantity: i64 },
    ClaimTransferred { day: u64, phase: Phase, instrument_id: String, from: String, to: String },

    DefaultEvent {
        day: u64,
        phase: Phase,
        debtor: String,
        creditor: String,
        obligation_id: String,
        face_amount: i64,
        recovery_rate: Decimal,
        paid_amount: i64,
    },

    InterbankCleared { day: u64, phase: Phase, debtor_bank: String, creditor_bank: String, net_amount: i64 },

    DealerTrade {
        day: u64,
        bucket: String,
        side: String,
        dealer_id: String,
        trader_id: String,
        ticket_id: String,
        price: Decimal,
    },
    DealerPassthrough {
        day: u64,
        bucket: String,
        side: String,
        vbt_id: String,
        trader_id: String,
        ticket_id: String,
        price: Decimal,
    },
    DealerRebucket { day: u64, ticket_id: String, from_bucket: String, to_bucket: String, holder_kind: String },
    VbtAnchorUpdate { day: u64, bucket: String, mid: Decimal, spread: Decimal, loss_rate: Decimal },

    SimulationError { day: u64, phase: Phase, message: String },
}

impl Event {
    pub fn day(&self) -> u64 {
        match self {
            Event::BeginDay { day }
            | Event::PhaseA { day }
            | Event::SubphaseB1 { day }
            | Event::PhaseB { day }
            | Event::SubphaseB2 { day }
            | Event::PhaseC { day }
            | Event::CashMinted { day, .. }
            | Event::ReservesMinted { day, .. }
            | Event::CashTransferred { day, .. }
            | Event::ReservesTransferred { day, .. }
            | Event::CashDeposited { day, .. }
            | Event::CashWithdrawn { day, .. }
            | Event::ClientPayment { day, .. }
            | Event::StockCreated { day, .. }
            | Event::StockTransferred { day, .. }
            | Event::PayableCreated { day, .. }
            | Event::PayableSettled { day, .. }
            | Event::DeliveryObligationSettled { day, .. }
            | Event::ClaimTransferred { day, .. }
            | Event::DefaultEvent { day, .. }
            | Event::InterbankCleared { day, .. }
            | Event::DealerTrade { day, .. }
            | Event::DealerPassthrough { day, .. }
            | Event::DealerRebucket { day, .. }
            | Event::VbtAnchorUpdate { day, .. }
            | Event::SimulationError { day, .. } => *day,
        }
    }

    /// Short tag used by artifact writers (§6).
    pub fn kind(&self) -> &'static str {
        match self {
            Event::BeginDay { .. } => "BeginDay",
            Event::PhaseA { .. } => "PhaseA",
            Event::SubphaseB1 { .. } => "SubphaseB1",
            Event::PhaseB { .. } => "PhaseB",
            Event::SubphaseB2 { .. } => "SubphaseB2",
            Event::PhaseC { .. } => "PhaseC",
            Event::CashMinted { .. } => "CashMinted",
            Event::ReservesMinted { .. } => "ReservesMinted",
            Event::CashTransferred { .. } => "CashTransferred",
            Event::ReservesTransferred { .. } => "ReservesTransferred",
            Event::CashDeposited { .. } => "CashDeposited",
            Event::CashWithdrawn { .. } => "CashWithdrawn",
            Event::ClientPayment { .. } => "ClientPayment",
            Event::StockCreated { .. } => "StockCreated",
            Event::StockTransferred { .. } => "StockTransferred",
            Event::PayableCreated { .. } => "PayableCreated",
            Event::PayableSettled { .. } => "PayableSettled",
            Event::DeliveryObligationSettled { .. } => "DeliveryObligationSettled",
            Event::ClaimTransferred { .. } => "ClaimTransferred",
            Event::DefaultEvent { .. } => "DefaultEvent",
            Event::InterbankCleared { .. } => "InterbankCleared",
            Event::DealerTrade { .. } => "DealerTrade",
            Event::DealerPassthrough { .. } => "DealerPassthrough",
            Event::DealerRebucket { .. } => "DealerRebucket",
            Event::VbtAnchorUpdate { .. } => "VbtAnchorUpdate",
            Event::SimulationError { .. } => "SimulationError",
        }
    }

    /// Whether this event counts towards a "quiet day" (§4.6 day report).
    /// Begin/phase markers are trivial; everything else is substantive.
    pub fn is_substantive(&self) -> bool {
        !matches!(
            self,
            Event::BeginDay { .. }
                | Event::PhaseA { .. }
                | Event::SubphaseB1 { .. }
                | Event::PhaseB { .. }
                | Event::SubphaseB2 { .. }
                | Event::PhaseC { .. }
        )
    }
}

/// Append-only log of events, queryable by day/kind for replay and auditing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_for_day(&self, day: u64) -> Vec<&Event> {
        self.events.iter().filter(|e| e.day() == day).collect()
    }

    pub fn events_of_kind(&self, kind: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.kind() == kind).collect()
    }

    /// Truncate the log back to `len` entries — used by the atomic scope to
    /// rewind events appended during a rolled-back operation.
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_and_kind_are_recoverable_from_any_variant() {
        let event = Event::PayableSettled {
            day: 3,
            phase: Phase::B2,
            payable_id: "pay_1".into(),
            debtor: "H1".into(),
            creditor: "H2".into(),
            amount: 100,
        };
        assert_eq!(event.day(), 3);
        assert_eq!(event.kind(), "PayableSettled");
        assert!(event.is_substantive());
    }

    #[test]
    fn phase_markers_are_not_substantive() {
        assert!(!Event::BeginDay { day: 1 }.is_substantive());
        assert!(!Event::PhaseC { day: 1 }.is_substantive());
    }

    #[test]
    fn truncate_rewinds_appended_events() {
        let mut log = EventLog::new();
        log.log(Event::BeginDay { day: 1 });
        let checkpoint = log.len();
        log.log(Event::BeginDay { day: 2 });
        log.truncate(checkpoint);
        assert_eq!(log.len(), 1);
    }
}
