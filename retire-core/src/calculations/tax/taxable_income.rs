//! Mapping from income received to income taxed.
//!
//! | Source                     | Inclusion |
//! |----------------------------|-----------|
//! | Employment                 | 100%      |
//! | Tax-deferred withdrawals   | 100%      |
//! | Tax-free withdrawals       | 0%        |
//! | Capital gains (taxable acct) | 50%     |
//! | CPP / OAS                  | 100%      |
//! | Other income               | 100%      |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::common::round_half_up;

pub const CAPITAL_GAINS_INCLUSION_RATE: Decimal = dec!(0.5);

/// Income received in a year, by source, before inclusion rates.
///
/// For the taxable account only the gain portion of a withdrawal appears here,
/// as `capital_gains`; return of capital is never taxed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeComponents {
    pub employment: Decimal,
    pub tax_deferred_withdrawals: Decimal,
    pub tax_free_withdrawals: Decimal,
    pub capital_gains: Decimal,
    pub cpp: Decimal,
    pub oas: Decimal,
    pub other: Decimal,
}

/// Taxable portion of each source, plus the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxableIncome {
    pub employment: Decimal,
    pub tax_deferred_withdrawals: Decimal,
    pub tax_free_withdrawals: Decimal,
    pub capital_gains: Decimal,
    pub cpp: Decimal,
    pub oas: Decimal,
    pub other: Decimal,
    pub total: Decimal,
}

impl IncomeComponents {
    /// Applies inclusion rates. Negative amounts are clamped to zero.
    pub fn taxable(&self) -> TaxableIncome {
        let employment = clamp_source("employment", self.employment);
        let tax_deferred_withdrawals =
            clamp_source("tax_deferred_withdrawals", self.tax_deferred_withdrawals);
        let capital_gains = round_half_up(
            clamp_source("capital_gains", self.capital_gains) * CAPITAL_GAINS_INCLUSION_RATE,
        );
        let cpp = clamp_source("cpp", self.cpp);
        let oas = clamp_source("oas", self.oas);
        let other = clamp_source("other", self.other);

        TaxableIncome {
            employment,
            tax_deferred_withdrawals,
            tax_free_withdrawals: Decimal::ZERO,
            capital_gains,
            cpp,
            oas,
            other,
            total: employment + tax_deferred_withdrawals + capital_gains + cpp + oas + other,
        }
    }
}

fn clamp_source(
    source: &'static str,
    amount: Decimal,
) -> Decimal {
    if amount < Decimal::ZERO {
        warn!(source, amount = %amount, "negative income clamped to zero");
        return Decimal::ZERO;
    }
    amount
}
