use rust_decimal::Decimal;

use crate::calculations::common::{non_negative, round_half_up};

/// OAS recovery tax: `(income − threshold) × rate`, floored at zero and capped
/// at the OAS actually received.
pub fn oas_recovery_tax(
    net_income: Decimal,
    oas_received: Decimal,
    threshold: Decimal,
    recovery_rate: Decimal,
) -> Decimal {
    let recovery = round_half_up(non_negative(net_income - threshold) * recovery_rate);
    recovery.min(non_negative(oas_received))
}
