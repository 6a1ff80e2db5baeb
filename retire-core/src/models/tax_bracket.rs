use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Jurisdiction;

/// One row of a progressive bracket table.
///
/// The lower bound is implied by the previous bracket's `max_income` (zero
/// for the first bracket). `max_income` of `None` marks the unlimited top
/// bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub tax_year: i32,
    pub jurisdiction: Jurisdiction,
    pub max_income: Option<Decimal>,
    pub tax_rate: Decimal,
}
