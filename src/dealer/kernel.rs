//! Dealer pricing kernel (D2, §4.8): maps a bucket's inventory and the VBT's
//! outside anchors to a quote. Pure function of state — no mutation, no RNG.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A fully recomputed quote for one bucket (§4.8, §8 D-C2/D-C5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
    pub midline: Decimal,
    pub capacity: i64,
    pub rungs: i64,
    pub lambda: Decimal,
    pub inside_width: Decimal,
    pub is_pinned_bid: bool,
    pub is_pinned_ask: bool,
    pub guard: bool,
}

/// Compute the outside bid/ask from the VBT's anchors: `A = M + O/2`,
/// `B = max(0, M - O/2)` when `clip_bid_zero` is set (§3 "clipped ≥0 if
/// configured").
pub fn outside_quotes(mid: Decimal, spread: Decimal, clip_bid_zero: bool) -> (Decimal, Decimal) {
    let ask = mid + spread / dec!(2);
    let mut bid = mid - spread / dec!(2);
    if clip_bid_zero && bid < Decimal::ZERO {
        bid = Decimal::ZERO;
    }
    (bid, ask)
}

/// Recompute a bucket's quote (§4.8). `inventory_count` is the dealer's
/// current ticket holdings in this bucket (`a`), `cash` its cash (`C`),
/// `ticket_size` the kernel's uniform trading unit `S`.
pub fn compute_quote(
    inventory_count: i64,
    cash: Decimal,
    ticket_size: Decimal,
    mid: Decimal,
    spread: Decimal,
    guard_m_min: Decimal,
    clip_bid_zero: bool,
) -> Quote {
    let (outside_bid, outside_ask) = outside_quotes(mid, spread, clip_bid_zero);

    if mid <= guard_m_min {
        return Quote {
            bid: outside_bid,
            ask: outside_ask,
            midline: mid,
            capacity: 0,
            rungs: 1,
            lambda: Decimal::ZERO,
            inside_width: Decimal::ZERO,
            is_pinned_bid: true,
            is_pinned_ask: true,
            guard: true,
        };
    }

    let x = Decimal::from(inventory_count) * ticket_size;
    let v = mid * Decimal::from(inventory_count) + cash;
    let k_star = (v / mid).floor();
    let capacity = k_star.to_string().parse::<i64>().unwrap_or(0);
    let x_star = ticket_size * k_star;
    let rungs = capacity + 1;
    let lambda = ticket_size / (x_star + ticket_size);
    let inside_width = lambda * spread;
    let midline = mid - (spread / (x_star + dec!(2) * ticket_size)) * (x - x_star / dec!(2));
    let interior_ask = midline + inside_width / dec!(2);
    let interior_bid = midline - inside_width / dec!(2);
    let ask = outside_ask.min(interior_ask);
    let bid = outside_bid.max(interior_bid);

    Quote {
        bid,
        ask,
        midline,
        capacity,
        rungs,
        lambda,
        inside_width,
        is_pinned_bid: bid == outside_bid,
        is_pinned_ask: ask == outside_ask,
        guard: false,
    }
}
