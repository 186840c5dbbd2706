//! Stock lot model — a non-financial holding of a SKU, used by delivery
//! obligations (§3). Transfers may split a lot; value is derived, never
//! stored, so it can never drift out of sync with `quantity * unit_price`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLot {
    id: String,
    owner_id: String,
    sku: String,
    quantity: i64,
    unit_price: Decimal,
}

impl StockLot {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        sku: impl Into<String>,
        quantity: i64,
        unit_price: Decimal,
    ) -> Self {
        assert!(quantity >= 0, "stock quantity must be non-negative");
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            sku: sku.into(),
            quantity,
            unit_price,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn set_owner(&mut self, owner_id: impl Into<String>) {
        self.owner_id = owner_id.into();
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        assert!(quantity >= 0, "stock quantity must be non-negative");
        self.quantity = quantity;
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn value(&self) -> i64 {
        crate::core::round_half_up_to_i64(self.unit_price * Decimal::from(self.quantity))
    }
}
