//! Instrument model — a tagged variant over the financial claims the ledger
//! tracks (§3). Dispatch on `kind`/variant replaces dynamic dispatch over a
//! class hierarchy (see the design note in the crate root docs): each variant
//! carries its own fields and serialization is a variant tag plus payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstrumentKind {
    Cash,
    BankDeposit,
    ReserveDeposit,
    Payable,
    DeliveryObligation,
    InterbankOvernight,
}

impl InstrumentKind {
    /// The id prefix used when minting fresh instruments of this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            InstrumentKind::Cash => "cash",
            InstrumentKind::BankDeposit => "dep",
            InstrumentKind::ReserveDeposit => "res",
            InstrumentKind::Payable => "pay",
            InstrumentKind::DeliveryObligation => "dlv",
            InstrumentKind::InterbankOvernight => "ibo",
        }
    }

    /// Kinds treated as "means of payment" balances (non-negative, no
    /// maturity) subject to invariant I3.
    pub fn is_cash_like(self) -> bool {
        matches!(
            self,
            InstrumentKind::Cash | InstrumentKind::BankDeposit | InstrumentKind::ReserveDeposit
        )
    }
}

/// A financial instrument: one side is the creditor (asset holder), the other
/// the debtor (liability issuer). Kind-specific fields live in the matching
/// variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    id: String,
    kind: InstrumentKind,
    amount: i64,
    denomination: String,
    asset_holder_id: String,
    liability_issuer_id: String,
    /// Secondary-market holder for a payable (§3); `None` means the original
    /// `asset_holder_id` is still the effective creditor.
    holder_id: Option<String>,
    due_day: Option<u64>,
    maturity_distance: Option<u64>,
    sku: Option<String>,
    quantity: Option<i64>,
    unit_price: Option<Decimal>,
    debtor_bank_id: Option<String>,
    creditor_bank_id: Option<String>,
    /// The alias this instrument was created under, if any. Carried so that
    /// rollover (§4.4) can re-link a fresh payable to the same alias.
    alias: Option<String>,
}

impl Instrument {
    pub fn new_cash_like(
        id: impl Into<String>,
        kind: InstrumentKind,
        amount: i64,
        denomination: impl Into<String>,
        asset_holder_id: impl Into<String>,
        liability_issuer_id: impl Into<String>,
    ) -> Self {
        assert!(kind.is_cash_like(), "new_cash_like requires a cash-like kind");
        assert!(amount >= 0, "cash-like instruments cannot be negative (I3)");
        Self {
            id: id.into(),
            kind,
            amount,
            denomination: denomination.into(),
            asset_holder_id: asset_holder_id.into(),
            liability_issuer_id: liability_issuer_id.into(),
            holder_id: None,
            due_day: None,
            maturity_distance: None,
            sku: None,
            quantity: None,
            unit_price: None,
            debtor_bank_id: None,
            creditor_bank_id: None,
            alias: None,
        }
    }

    pub fn new_payable(
        id: impl Into<String>,
        amount: i64,
        denomination: impl Into<String>,
        debtor_id: impl Into<String>,
        creditor_id: impl Into<String>,
        due_day: u64,
        maturity_distance: Option<u64>,
    ) -> Self {
        assert!(amount > 0, "payable amount must be positive");
        Self {
            id: id.into(),
            kind: InstrumentKind::Payable,
            amount,
            denomination: denomination.into(),
            asset_holder_id: creditor_id.into(),
            liability_issuer_id: debtor_id.into(),
            holder_id: None,
            due_day: Some(due_day),
            maturity_distance,
            sku: None,
            quantity: None,
            unit_price: None,
            debtor_bank_id: None,
            creditor_bank_id: None,
            alias: None,
        }
    }

    pub fn new_delivery_obligation(
        id: impl Into<String>,
        debtor_id: impl Into<String>,
        creditor_id: impl Into<String>,
        sku: impl Into<String>,
        quantity: i64,
        unit_price: Decimal,
        due_day: u64,
    ) -> Self {
        assert!(quantity > 0, "delivery quantity must be positive");
        let valued = crate::core::round_half_up_to_i64(unit_price * Decimal::from(quantity));
        Self {
            id: id.into(),
            kind: InstrumentKind::DeliveryObligation,
            amount: valued,
            denomination: "valued".to_string(),
            asset_holder_id: creditor_id.into(),
            liability_issuer_id: debtor_id.into(),
            holder_id: None,
            due_day: Some(due_day),
            maturity_distance: None,
            sku: Some(sku.into()),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            debtor_bank_id: None,
            creditor_bank_id: None,
            alias: None,
        }
    }

    pub fn new_interbank_overnight(
        id: impl Into<String>,
        amount: i64,
        denomination: impl Into<String>,
        debtor_bank_id: impl Into<String>,
        creditor_bank_id: impl Into<String>,
        due_day: u64,
    ) -> Self {
        assert!(amount > 0, "interbank overnight amount must be positive");
        let debtor_bank_id = debtor_bank_id.into();
        let creditor_bank_id = creditor_bank_id.into();
        Self {
            id: id.into(),
            kind: InstrumentKind::InterbankOvernight,
            amount,
            denomination: denomination.into(),
            asset_holder_id: creditor_bank_id.clone(),
            liability_issuer_id: debtor_bank_id.clone(),
            holder_id: None,
            due_day: Some(due_day),
            maturity_distance: None,
            sku: None,
            quantity: None,
            unit_price: None,
            debtor_bank_id: Some(debtor_bank_id),
            creditor_bank_id: Some(creditor_bank_id),
            alias: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: i64) {
        assert!(
            !self.kind.is_cash_like() || amount >= 0,
            "cash-like instruments cannot go negative (I3)"
        );
        self.amount = amount;
    }

    pub fn denomination(&self) -> &str {
        &self.denomination
    }

    /// The original creditor of record (unaffected by secondary holder).
    pub fn asset_holder_id(&self) -> &str {
        &self.asset_holder_id
    }

    pub fn liability_issuer_id(&self) -> &str {
        &self.liability_issuer_id
    }

    /// The effective creditor: `holder_id` if set, else `asset_holder_id` (§3).
    pub fn effective_creditor(&self) -> &str {
        self.holder_id.as_deref().unwrap_or(&self.asset_holder_id)
    }

    pub fn holder_id(&self) -> Option<&str> {
        self.holder_id.as_deref()
    }

    /// Reassign the effective creditor. For a payable this sets the secondary
    /// `holder_id`, preserving the original `asset_holder_id` (§4.2,
    /// `transfer_claim`); for every other kind it reassigns `asset_holder_id`
    /// directly since there is no secondary-holder concept for them.
    pub fn set_effective_creditor(&mut self, new_creditor: impl Into<String>) {
        match self.kind {
            InstrumentKind::Payable => self.holder_id = Some(new_creditor.into()),
            _ => self.asset_holder_id = new_creditor.into(),
        }
    }

    pub fn due_day(&self) -> Option<u64> {
        self.due_day
    }

    pub fn maturity_distance(&self) -> Option<u64> {
        self.maturity_distance
    }

    pub fn set_maturity_distance(&mut self, distance: Option<u64>) {
        self.maturity_distance = distance;
    }

    pub fn set_due_day(&mut self, due_day: u64) {
        self.due_day = Some(due_day);
    }

    pub fn sku(&self) -> Option<&str> {
        self.sku.as_deref()
    }

    pub fn quantity(&self) -> Option<i64> {
        self.quantity
    }

    pub fn unit_price(&self) -> Option<Decimal> {
        self.unit_price
    }

    /// `quantity * unit_price` rounded to the minor unit (§3, `valued_amount`).
    pub fn valued_amount(&self) -> Option<i64> {
        match (self.quantity, self.unit_price) {
            (Some(q), Some(p)) => {
                Some(crate::core::round_half_up_to_i64(p * Decimal::from(q)))
            }
            _ => None,
        }
    }

    pub fn debtor_bank_id(&self) -> Option<&str> {
        self.debtor_bank_id.as_deref()
    }

    pub fn creditor_bank_id(&self) -> Option<&str> {
        self.creditor_bank_id.as_deref()
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn set_alias(&mut self, alias: Option<String>) {
        self.alias = alias;
    }
}
