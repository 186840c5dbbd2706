//! Domain types for the ledger: agents, instruments, stock lots, aliases, and
//! the event log. See [`ledger`] for the state store that owns all of them.

pub mod agent;
pub mod alias;
pub mod event;
pub mod instrument;
pub mod ledger;
pub mod stock;

pub use agent::{Agent, AgentKind};
pub use alias::AliasTable;
pub use event::{Event, EventLog};
pub use instrument::{Instrument, InstrumentKind};
pub use ledger::{AtomicError, LedgerState};
pub use stock::StockLot;
