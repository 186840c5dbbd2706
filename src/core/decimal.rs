//! Conversion between exact decimal prices/ratios and integer minor units.
//!
//! Balances live in `i64` minor units; prices, ratios, shares, and dealer
//! anchors live in [`rust_decimal::Decimal`]. The two never mix implicitly —
//! every price × quantity computation is converted through
//! [`round_half_up_to_i64`], and the remainder of any pro-rata distribution is
//! absorbed by the last recipient (see the partial-recovery waterfall).

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Round a decimal amount to the nearest minor unit, ties away from zero.
///
/// This is the one rounding mode used anywhere money crosses the
/// decimal/integer boundary (stock valuations, recovery-rate distributions).
pub fn round_half_up_to_i64(value: Decimal) -> i64 {
    let rounded = value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    rounded
        .to_string()
        .parse::<i64>()
        .expect("rounded decimal must fit in i64 for minor-unit amounts")
}

/// Distribute `total` minor units across `shares` proportionally to `weights`,
/// rounding each share down to the minor unit and crediting the undistributed
/// remainder to the last (highest-index) recipient so the sum is exact.
///
/// Used by the partial-recovery waterfall (§4.4) to split a liquidation pool
/// pro rata by face amount among co-maturing creditors.
pub fn distribute_pro_rata(total: i64, weights: &[i64]) -> Vec<i64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let weight_sum: i64 = weights.iter().sum();
    if weight_sum == 0 {
        return vec![0; weights.len()];
    }
    let mut shares: Vec<i64> = weights
        .iter()
        .map(|w| {
            let share = Decimal::from(total) * Decimal::from(*w) / Decimal::from(weight_sum);
            share.floor().to_string().parse::<i64>().unwrap_or(0)
        })
        .collect();
    let distributed: i64 = shares.iter().sum();
    let remainder = total - distributed;
    if let Some(last) = shares.last_mut() {
        *last += remainder;
    }
    shares
}
