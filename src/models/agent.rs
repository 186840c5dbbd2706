//! Agent (participant) model.
//!
//! Every economic participant — central bank, commercial bank, household,
//! firm, treasury, dealer, or VBT — is represented by one `Agent` record.
//! Agents never hold direct references to instruments; they hold ordered id
//! lists that the ledger's maps resolve (see the arena-and-index design note
//! in the crate root docs). This keeps mutation safe under a single mutable
//! borrow of the ledger and makes snapshot/rollback a shallow `Vec` clone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The kind of participant an agent represents.
///
/// Distinct from instrument kinds. `Dealer` and `Vbt` are first-class agent
/// kinds so that ownership transfers in the dealer subsystem traverse the
/// same bookkeeping paths (asset/liability lists) as any other trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    CentralBank,
    Bank,
    Household,
    Firm,
    Treasury,
    Dealer,
    Vbt,
}

/// A participant in the simulated economy.
///
/// # Invariants
///
/// * `asset_ids` contains the id of every instrument whose effective creditor
///   is this agent, exactly once (P2).
/// * `liability_ids` contains the id of every instrument whose issuer is this
///   agent, exactly once (P2).
/// * `stock_ids` contains exactly the lots this agent currently owns (I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    id: String,
    name: String,
    kind: AgentKind,
    asset_ids: Vec<String>,
    liability_ids: Vec<String>,
    stock_ids: Vec<String>,
    defaulted: bool,
    /// Clients of a bank (only meaningful for `AgentKind::Bank`).
    clients: BTreeSet<String>,
    /// The bank a household/firm/treasury/dealer/vbt clears through, if any.
    bank_id: Option<String>,
}

impl Agent {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            asset_ids: Vec::new(),
            liability_ids: Vec::new(),
            stock_ids: Vec::new(),
            defaulted: false,
            clients: BTreeSet::new(),
            bank_id: None,
        }
    }

    pub fn with_bank(mut self, bank_id: impl Into<String>) -> Self {
        self.bank_id = Some(bank_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn asset_ids(&self) -> &[String] {
        &self.asset_ids
    }

    pub fn liability_ids(&self) -> &[String] {
        &self.liability_ids
    }

    pub fn stock_ids(&self) -> &[String] {
        &self.stock_ids
    }

    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    pub fn bank_id(&self) -> Option<&str> {
        self.bank_id.as_deref()
    }

    pub fn clients(&self) -> &BTreeSet<String> {
        &self.clients
    }

    pub fn add_client(&mut self, client_id: impl Into<String>) {
        self.clients.insert(client_id.into());
    }

    pub fn add_asset(&mut self, instrument_id: impl Into<String>) {
        self.asset_ids.push(instrument_id.into());
    }

    pub fn add_liability(&mut self, instrument_id: impl Into<String>) {
        self.liability_ids.push(instrument_id.into());
    }

    pub fn remove_asset(&mut self, instrument_id: &str) -> bool {
        if let Some(pos) = self.asset_ids.iter().position(|id| id == instrument_id) {
            self.asset_ids.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn remove_liability(&mut self, instrument_id: &str) -> bool {
        if let Some(pos) = self.liability_ids.iter().position(|id| id == instrument_id) {
            self.liability_ids.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn add_stock(&mut self, stock_id: impl Into<String>) {
        self.stock_ids.push(stock_id.into());
    }

    pub fn remove_stock(&mut self, stock_id: &str) -> bool {
        if let Some(pos) = self.stock_ids.iter().position(|id| id == stock_id) {
            self.stock_ids.remove(pos);
            true
        } else {
            false
        }
    }

    /// Expel the agent: flip `defaulted` and drop all remaining asset and
    /// liability links (§4.4, expel-agent mode). Stock lots are untouched —
    /// only financial claims are cleared by expulsion.
    pub fn expel(&mut self) {
        self.defaulted = true;
        self.asset_ids.clear();
        self.liability_ids.clear();
    }
}
