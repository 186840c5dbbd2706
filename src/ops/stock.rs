//! Non-financial stock-lot operations (§4.2): create and transfer.

use crate::error::ValidationError;
use crate::models::event::{Event, Phase};
use crate::models::ledger::LedgerState;
use crate::models::StockLot;
use rust_decimal::Decimal;

pub fn create_stock(
    ledger: &mut LedgerState,
    owner: &str,
    sku: &str,
    quantity: i64,
    unit_price: Decimal,
) -> Result<String, ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::NonPositiveAmount(quantity));
    }
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(owner)?;
        let id = ledger.alloc_id("stk");
        ledger.insert_stock(StockLot::new(id.clone(), owner, sku, quantity, unit_price));
        ledger.agent_mut(owner)?.add_stock(&id);
        ledger.log(Event::StockCreated { day, phase: Phase::A, owner: owner.to_string(), stock_id: id.clone(), sku: sku.to_string(), quantity });
        Ok(id)
    })
}

/// Move `quantity` units of `stock_id` from `from` to `to`. `quantity: None`
/// moves the whole lot; otherwise the lot is split, with a fresh lot minted
/// for the transferred portion so that the original id's remaining quantity
/// stays with `from`.
pub fn transfer_stock(
    ledger: &mut LedgerState,
    stock_id: &str,
    from: &str,
    to: &str,
    quantity: Option<i64>,
) -> Result<(), ValidationError> {
    let day = ledger.day();
    ledger.with_atomic_scope(|ledger| {
        ledger.agent(from)?;
        ledger.agent(to)?;

        let (owner, total_quantity, sku, unit_price) = {
            let lot = ledger.stock(stock_id)?;
            (lot.owner_id().to_string(), lot.quantity(), lot.sku().to_string(), lot.unit_price())
        };
        if owner != from {
            return Err(ValidationError::StockInconsistency {
                lot_id: stock_id.to_string(),
                detail: format!("lot is owned by '{owner}', not '{from}'"),
            });
        }
        let moved = quantity.unwrap_or(total_quantity);
        if moved <= 0 || moved > total_quantity {
            return Err(ValidationError::NonPositiveAmount(moved));
        }

        if moved == total_quantity {
            ledger.stock_mut(stock_id)?.set_owner(to);
            ledger.agent_mut(from)?.remove_stock(stock_id);
            ledger.agent_mut(to)?.add_stock(stock_id);
        } else {
            ledger.stock_mut(stock_id)?.set_quantity(total_quantity - moved);
            let new_id = ledger.alloc_id("stk");
            ledger.insert_stock(StockLot::new(new_id.clone(), to, &sku, moved, unit_price));
            ledger.agent_mut(to)?.add_stock(&new_id);
        }

        ledger.log(Event::StockTransferred {
            day,
            phase: Phase::A,
            stock_id: stock_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            quantity: moved,
        });
        Ok(())
    })
}
