//! Primitive operations (L7, §4.2). Each runs inside its own atomic scope and
//! emits one or more events; callers compose them to build settlement, the
//! MOP selector, and the dealer bridge.

mod cash;
mod claims;
mod stock;

pub use cash::{client_payment, deposit_cash, mint_cash, mint_reserves, transfer_cash, transfer_reserves, withdraw_cash};
pub use claims::{create_delivery_obligation, create_payable, transfer_claim};
pub use stock::{create_stock, transfer_stock};
