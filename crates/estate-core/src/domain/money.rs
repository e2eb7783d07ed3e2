//! Decimal helpers for ledger arithmetic

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to cents, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100`, rounded; zero when `whole` is zero.
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .map(|ratio| round2(ratio * Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}
