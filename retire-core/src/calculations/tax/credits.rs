//! Non-refundable credits and per-jurisdiction net tax.
//!
//! Both credits are valued at the jurisdiction's lowest bracket rate:
//!
//! | Credit | Base amount |
//! |--------|-------------|
//! | Basic  | basic personal amount |
//! | Age    | `max(0, max_credit − (income − threshold) × reduction_rate)`, holders 65+ only |
//!
//! Net tax is `max(0, gross − credits)`; unused credits are not refunded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::progressive::{ProgressiveTaxCalculator, TaxCalculationError};
use crate::calculations::common::{non_negative, round_half_up};
use crate::models::{AgeCredit, TaxBracket};

/// Age from which the age credit is available.
pub const AGE_CREDIT_MIN_AGE: u32 = 65;

/// Basic credit: `basic_amount × lowest_rate`.
pub fn basic_credit(
    basic_amount: Decimal,
    lowest_rate: Decimal,
) -> Decimal {
    round_half_up(non_negative(basic_amount) * lowest_rate)
}

/// Age credit base after the income-tested phase-out, before the rate is
/// applied. Zero below [`AGE_CREDIT_MIN_AGE`].
pub fn age_credit_amount(
    age: u32,
    income: Decimal,
    params: &AgeCredit,
) -> Decimal {
    if age < AGE_CREDIT_MIN_AGE {
        return Decimal::ZERO;
    }
    let excess = non_negative(income - params.income_threshold);
    non_negative(params.max_credit - excess * params.reduction_rate)
}

/// Age credit value: the phased-out base at the lowest rate.
pub fn age_credit(
    age: u32,
    income: Decimal,
    params: &AgeCredit,
    lowest_rate: Decimal,
) -> Decimal {
    round_half_up(age_credit_amount(age, income, params) * lowest_rate)
}

/// Tax for one jurisdiction after non-refundable credits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionTax {
    pub gross_tax: Decimal,
    pub basic_credit: Decimal,
    pub age_credit: Decimal,
    pub total_credits: Decimal,
    pub net_tax: Decimal,
    pub marginal_rate: Decimal,
    /// `net_tax / taxable_income`; zero when there is no income.
    pub average_rate: Decimal,
}

/// Everything needed to tax income in one jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionTables {
    pub brackets: Vec<TaxBracket>,
    pub basic_amount: Decimal,
    pub age_credit: AgeCredit,
}

impl JurisdictionTables {
    pub fn validate(&self) -> Result<(), TaxCalculationError> {
        ProgressiveTaxCalculator::new(&self.brackets).validate()
    }

    /// Gross bracket tax less basic and age credits, floored at zero.
    pub fn calculate(
        &self,
        taxable_income: Decimal,
        age: u32,
    ) -> Result<JurisdictionTax, TaxCalculationError> {
        let calculator = ProgressiveTaxCalculator::new(&self.brackets);
        let gross = calculator.calculate(taxable_income)?;
        let lowest_rate = calculator.lowest_rate()?;

        let basic = basic_credit(self.basic_amount, lowest_rate);
        let age_amount = age_credit(age, taxable_income, &self.age_credit, lowest_rate);
        let total_credits = basic + age_amount;
        let net_tax = non_negative(gross.total_tax - total_credits);
        let average_rate = if taxable_income > Decimal::ZERO {
            (net_tax / taxable_income).round_dp(6)
        } else {
            Decimal::ZERO
        };

        Ok(JurisdictionTax {
            gross_tax: gross.total_tax,
            basic_credit: basic,
            age_credit: age_amount,
            total_credits,
            net_tax,
            marginal_rate: gross.marginal_rate,
            average_rate,
        })
    }
}
