// src/utils/precision.rs
use rust_decimal::Decimal;

/// Rounds the quantity DOWN to the nearest multiple of `step_size`.
/// Example: amount=0.00057, step=0.0001 -> 0.0005
pub fn normalize_quantity(amount: Decimal, step_size: Decimal) -> Decimal {
    if step_size.is_zero() {
        return amount;
    }
    ((amount / step_size).floor() * step_size).normalize()
}
