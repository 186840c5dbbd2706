//! The two error classes that cross every boundary in this crate (§7).
//!
//! `ValidationError` is a precondition or invariant violation: it always
//! surfaces and the enclosing atomic scope rewinds. `DefaultError` means a
//! debtor could not meet an obligation after means-of-payment exhaustion and
//! (where available) asset liquidation; under fail-fast settlement it
//! propagates exactly like a `ValidationError`, but under expel-agent
//! settlement it is caught locally and the daily loop continues.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown agent id '{0}'")]
    UnknownAgent(String),
    #[error("unknown instrument id '{0}'")]
    UnknownInstrument(String),
    #[error("unknown stock lot id '{0}'")]
    UnknownStock(String),
    #[error("alias '{0}' already registered")]
    DuplicateAlias(String),
    #[error("alias '{0}' does not resolve to any instrument")]
    UnknownAlias(String),
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(i64),
    #[error("cash-like balance would go negative for agent '{0}' (I3)")]
    NegativeBalance(String),
    #[error("insufficient balance for agent '{0}': needed {needed}, available {available}")]
    InsufficientBalance { agent_id: String, needed: i64, available: i64 },
    #[error("instrument '{0}' is not of the expected kind")]
    WrongInstrumentKind(String),
    #[error("transfer_claim target '{0}' does not exist or is not claimable")]
    UnclaimableInstrument(String),
    #[error("closed-system identity violated for kind {kind}: assets {assets} != liabilities {liabilities} (I6/P1)")]
    ClosedSystemViolation { kind: String, assets: i64, liabilities: i64 },
    #[error("asset/liability list inconsistency for instrument '{instrument_id}': {detail}")]
    ListInconsistency { instrument_id: String, detail: String },
    #[error("stock ownership inconsistency for lot '{lot_id}': {detail}")]
    StockInconsistency { lot_id: String, detail: String },
    #[error("dealer subsystem configuration error: {0}")]
    DealerConfiguration(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("debtor '{debtor_id}' could not meet obligation '{obligation_id}' (due {due_amount}, recovered {recovered_amount})")]
pub struct DefaultError {
    pub debtor_id: String,
    pub obligation_id: String,
    pub due_amount: i64,
    pub recovered_amount: i64,
}

/// The union raised by settlement: either an outright validation failure or a
/// default, whichever the caller needs to distinguish.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Default(#[from] DefaultError),
}

impl From<crate::models::ledger::AtomicError> for ValidationError {
    fn from(err: crate::models::ledger::AtomicError) -> Self {
        use crate::models::ledger::AtomicError;
        match err {
            AtomicError::UnknownAgent(id) => ValidationError::UnknownAgent(id),
            AtomicError::UnknownInstrument(id) => ValidationError::UnknownInstrument(id),
            AtomicError::UnknownStock(id) => ValidationError::UnknownStock(id),
            AtomicError::Aborted(msg) => ValidationError::Other(msg),
        }
    }
}
