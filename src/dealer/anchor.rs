//! VBT anchor updater (D3, §4.8 anchor step, §4.10 step 7).
//!
//! Mid and spread anchors only move here — never during order flow (§8
//! D-C6) — driven by the realized loss rate in today's defaults for a
//! bucket.

use rust_decimal::Decimal;

/// `M <- M - phi_m * l`, `O <- max(o_min, O + phi_o * l)` (§4.8/§4.10 step 7).
/// Returns the updated `(mid, spread)`.
pub fn update_anchor(mid: Decimal, spread: Decimal, loss_rate: Decimal, phi_m: Decimal, phi_o: Decimal, o_min: Decimal) -> (Decimal, Decimal) {
    let new_mid = mid - phi_m * loss_rate;
    let new_spread = (spread + phi_o * loss_rate).max(o_min);
    (new_mid, new_spread)
}

/// `l = sum(face * (1 - R)) / sum(face)` over today's defaults in one bucket
/// (§4.10 step 7). `None` when nothing defaulted (no anchor movement).
pub fn realized_loss_rate(defaults: &[(i64, Decimal)]) -> Option<Decimal> {
    if defaults.is_empty() {
        return None;
    }
    let total_face: i64 = defaults.iter().map(|(face, _)| *face).sum();
    if total_face == 0 {
        return None;
    }
    let lost: Decimal = defaults
        .iter()
        .map(|(face, recovery_rate)| Decimal::from(*face) * (Decimal::ONE - recovery_rate))
        .sum();
    Some(lost / Decimal::from(total_face))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn anchor_moves_proportionally_to_loss_rate() {
        let (mid, spread) = update_anchor(dec!(1), dec!(0.3), dec!(0.2), dec!(0.1), dec!(0.05), dec!(0.05));
        assert_eq!(mid, dec!(0.98));
        assert_eq!(spread, dec!(0.31));
    }

    #[test]
    fn spread_never_falls_below_o_min() {
        let (_, spread) = update_anchor(dec!(1), dec!(0.05), dec!(0), dec!(0.1), dec!(-1), dec!(0.05));
        assert_eq!(spread, dec!(0.05));
    }

    #[test]
    fn loss_rate_is_none_with_no_defaults() {
        assert_eq!(realized_loss_rate(&[]), None);
    }

    #[test]
    fn loss_rate_weights_by_face() {
        let rate = realized_loss_rate(&[(100, dec!(0.5)), (100, dec!(1.0))]).unwrap();
        // lost = 100*0.5 + 100*0 = 50; total face = 200 -> 0.25
        assert_eq!(rate, dec!(0.25));
    }
}
