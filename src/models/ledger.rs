//! Ledger state store — the single owner of every agent, instrument, stock
//! lot, alias, and the event log (§3 data model, L4). All cross-references
//! are stable string ids resolved through this store's maps (see the
//! arena-and-index design note in the crate root docs): nothing in this
//! crate holds a direct reference into another agent or instrument.

use crate::core::IdAllocator;
use crate::dealer::state::DealerState;
use crate::models::agent::{Agent, AgentKind};
use crate::models::alias::AliasTable;
use crate::models::event::{Event, EventLog};
use crate::models::instrument::Instrument;
use crate::models::stock::StockLot;
use crate::rng::RngManager;
use std::collections::BTreeMap;
use thiserror::Error;

/// What the settlement engine does when a debtor cannot meet an obligation
/// in full (§4.4, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DefaultMode {
    /// Raise `DefaultError` and let it propagate like a `ValidationError`:
    /// the atomic scope rewinds and the simulation halts.
    FailFast,
    /// Run the partial-recovery waterfall, mark the debtor `defaulted`, and
    /// clear its remaining asset/liability links; the daily loop continues.
    ExpelAgent,
}

impl Default for DefaultMode {
    fn default() -> Self {
        DefaultMode::ExpelAgent
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AtomicError {
    #[error("unknown agent id '{0}'")]
    UnknownAgent(String),
    #[error("unknown instrument id '{0}'")]
    UnknownInstrument(String),
    #[error("unknown stock lot id '{0}'")]
    UnknownStock(String),
    #[error("operation aborted: {0}")]
    Aborted(String),
}

/// A point-in-time copy of every map the atomic scope must be able to roll
/// back. Cloning `BTreeMap`s is the cheapest correct way to get this: the
/// simulator is single-threaded and snapshots are taken once per primitive
/// op, not per tick (§5 concurrency note).
struct Checkpoint {
    agents: BTreeMap<String, Agent>,
    instruments: BTreeMap<String, Instrument>,
    stocks: BTreeMap<String, StockLot>,
    aliases: BTreeMap<String, String>,
    id_counters: BTreeMap<&'static str, u64>,
    rng_state: u64,
    event_log_len: usize,
    dealer: Option<DealerState>,
}

/// Owns the entire mutable state of a simulation run.
pub struct LedgerState {
    agents: BTreeMap<String, Agent>,
    instruments: BTreeMap<String, Instrument>,
    stocks: BTreeMap<String, StockLot>,
    aliases: AliasTable,
    ids: IdAllocator,
    events: EventLog,
    rng: RngManager,
    day: u64,
    default_mode: DefaultMode,
    /// Whether `maturity_distance` rolls forward day over day, or is frozen
    /// at creation (§9 open question; see DESIGN.md for the resolution).
    rollover_enabled: bool,
    /// The optional dealer-ring subsystem (D1-D5); `None` for a pure-ledger
    /// scenario with no secondary market.
    dealer: Option<DealerState>,
}

impl LedgerState {
    pub fn new(seed: u64) -> Self {
        Self {
            agents: BTreeMap::new(),
            instruments: BTreeMap::new(),
            stocks: BTreeMap::new(),
            aliases: AliasTable::new(),
            ids: IdAllocator::new(),
            events: EventLog::new(),
            rng: RngManager::new(seed),
            day: 0,
            default_mode: DefaultMode::default(),
            rollover_enabled: true,
            dealer: None,
        }
    }

    pub fn with_dealer(mut self, dealer: DealerState) -> Self {
        self.dealer = Some(dealer);
        self
    }

    /// Attach a fully-built dealer subsystem to an already-running ledger
    /// (§4.7 initialization, called mid-construction rather than through the
    /// `with_dealer` builder).
    pub fn install_dealer(&mut self, dealer: DealerState) {
        self.dealer = Some(dealer);
    }

    pub fn with_default_mode(mut self, mode: DefaultMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_rollover_enabled(mut self, enabled: bool) -> Self {
        self.rollover_enabled = enabled;
        self
    }

    // -- day / phase bookkeeping ------------------------------------------

    pub fn day(&self) -> u64 {
        self.day
    }

    pub fn advance_day(&mut self) {
        self.day += 1;
    }

    pub fn default_mode(&self) -> DefaultMode {
        self.default_mode
    }

    pub fn rollover_enabled(&self) -> bool {
        self.rollover_enabled
    }

    // -- id allocation ------------------------------------------------------

    pub fn alloc_id(&mut self, prefix: &'static str) -> String {
        self.ids.next(prefix)
    }

    // -- rng ------------------------------------------------------------

    pub fn rng(&mut self) -> &mut RngManager {
        &mut self.rng
    }

    // -- events -----------------------------------------------------------

    pub fn log(&mut self, event: Event) {
        self.events.log(event);
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // -- agents -------------------------------------------------------------

    pub fn insert_agent(&mut self, agent: Agent) {
        self.agents.insert(agent.id().to_string(), agent);
    }

    pub fn agent(&self, id: &str) -> Result<&Agent, AtomicError> {
        self.agents.get(id).ok_or_else(|| AtomicError::UnknownAgent(id.to_string()))
    }

    pub fn agent_mut(&mut self, id: &str) -> Result<&mut Agent, AtomicError> {
        self.agents.get_mut(id).ok_or_else(|| AtomicError::UnknownAgent(id.to_string()))
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agents_of_kind(&self, kind: AgentKind) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(move |a| a.kind() == kind)
    }

    // -- instruments ----------------------------------------------------------

    pub fn insert_instrument(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.id().to_string(), instrument);
    }

    pub fn instrument(&self, id: &str) -> Result<&Instrument, AtomicError> {
        self.instruments
            .get(id)
            .ok_or_else(|| AtomicError::UnknownInstrument(id.to_string()))
    }

    pub fn instrument_mut(&mut self, id: &str) -> Result<&mut Instrument, AtomicError> {
        self.instruments
            .get_mut(id)
            .ok_or_else(|| AtomicError::UnknownInstrument(id.to_string()))
    }

    pub fn remove_instrument(&mut self, id: &str) -> Option<Instrument> {
        self.instruments.remove(id)
    }

    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.values()
    }

    // -- stocks -----------------------------------------------------------

    pub fn insert_stock(&mut self, stock: StockLot) {
        self.stocks.insert(stock.id().to_string(), stock);
    }

    pub fn stock(&self, id: &str) -> Result<&StockLot, AtomicError> {
        self.stocks.get(id).ok_or_else(|| AtomicError::UnknownStock(id.to_string()))
    }

    pub fn stock_mut(&mut self, id: &str) -> Result<&mut StockLot, AtomicError> {
        self.stocks.get_mut(id).ok_or_else(|| AtomicError::UnknownStock(id.to_string()))
    }

    pub fn remove_stock_lot(&mut self, id: &str) -> Option<StockLot> {
        self.stocks.remove(id)
    }

    pub fn stocks(&self) -> impl Iterator<Item = &StockLot> {
        self.stocks.values()
    }

    // -- aliases ----------------------------------------------------------

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    // -- dealer subsystem ---------------------------------------------------

    pub fn dealer(&self) -> Option<&DealerState> {
        self.dealer.as_ref()
    }

    pub fn dealer_mut(&mut self) -> Option<&mut DealerState> {
        self.dealer.as_mut()
    }

    pub fn has_dealer(&self) -> bool {
        self.dealer.is_some()
    }

    // -- atomic scope -------------------------------------------------------

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            agents: self.agents.clone(),
            instruments: self.instruments.clone(),
            stocks: self.stocks.clone(),
            aliases: self.aliases.snapshot(),
            id_counters: self.ids.snapshot(),
            rng_state: self.rng.snapshot(),
            event_log_len: self.events.len(),
            dealer: self.dealer.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.agents = checkpoint.agents;
        self.instruments = checkpoint.instruments;
        self.stocks = checkpoint.stocks;
        self.aliases.restore(checkpoint.aliases);
        self.ids.restore(checkpoint.id_counters);
        self.rng.restore(checkpoint.rng_state);
        self.events.truncate(checkpoint.event_log_len);
        self.dealer = checkpoint.dealer;
    }

    /// Run `f` against this ledger; if it returns `Err`, every mutation it
    /// made — agents, instruments, stocks, aliases, id counters, RNG state,
    /// and any events it logged — is rolled back before the error is
    /// returned to the caller (§4.2 atomic scope, L5). This is how a
    /// multi-step primitive op like `transfer_claim` stays all-or-nothing
    /// without hand-unwinding each intermediate mutation on every error path.
    pub fn with_atomic_scope<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.restore(checkpoint);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_scope_rolls_back_on_error() {
        let mut ledger = LedgerState::new(1);
        ledger.insert_agent(Agent::new("H1", "Household One", AgentKind::Household));

        let result: Result<(), AtomicError> = ledger.with_atomic_scope(|l| {
            l.agent_mut("H1")?.add_asset("cash_00000001");
            l.log(Event::CashMinted {
                day: 0,
                phase: crate::models::event::Phase::Setup,
                to: "H1".into(),
                instrument_id: "cash_00000001".into(),
                amount: 100,
            });
            Err(AtomicError::Aborted("simulated failure".into()))
        });

        assert!(result.is_err());
        assert!(ledger.agent("H1").unwrap().asset_ids().is_empty());
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn atomic_scope_keeps_mutation_on_success() {
        let mut ledger = LedgerState::new(1);
        ledger.insert_agent(Agent::new("H1", "Household One", AgentKind::Household));

        let result: Result<(), AtomicError> = ledger.with_atomic_scope(|l| {
            l.agent_mut("H1")?.add_asset("cash_00000001");
            Ok(())
        });

        assert!(result.is_ok());
        assert_eq!(ledger.agent("H1").unwrap().asset_ids(), &["cash_00000001".to_string()]);
    }

    #[test]
    fn rng_state_is_restored_on_rollback() {
        let mut ledger = LedgerState::new(42);
        let pre_draw = ledger.rng().snapshot();

        let result: Result<(), AtomicError> = ledger.with_atomic_scope(|l| {
            l.rng().next();
            Err(AtomicError::Aborted("discard this draw".into()))
        });

        assert!(result.is_err());
        assert_eq!(ledger.rng().snapshot(), pre_draw);
    }

    #[test]
    fn unknown_agent_lookup_errors() {
        let ledger = LedgerState::new(1);
        assert_eq!(ledger.agent("ghost").unwrap_err(), AtomicError::UnknownAgent("ghost".to_string()));
    }
}
