//! Annual income tax: federal and provincial bracket tax, non-refundable
//! credits, and the OAS recovery tax.
//!
//! ```text
//! total = federal.net_tax + provincial.net_tax + oas_clawback
//! marginal_rate = federal.marginal_rate + provincial.marginal_rate
//! ```
//!
//! The combined marginal rate is the plain sum of both jurisdictions' rates.

pub mod clawback;
pub mod credits;
pub mod progressive;
pub mod taxable_income;

pub use clawback::oas_recovery_tax;
pub use credits::{JurisdictionTables, JurisdictionTax};
pub use progressive::{BracketTax, ProgressiveTaxCalculator, ProgressiveTaxResult, TaxCalculationError};
pub use taxable_income::{CAPITAL_GAINS_INCLUSION_RATE, IncomeComponents, TaxableIncome};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::provider::{ProviderError, TaxDataProvider};
use crate::models::{BenefitReferenceAmounts, Jurisdiction, Province};

/// All reference data needed to tax one year, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearData {
    pub tax_year: i32,
    pub province: Province,
    pub federal: JurisdictionTables,
    pub provincial: JurisdictionTables,
    pub benefits: BenefitReferenceAmounts,
}

impl TaxYearData {
    /// Loads federal and provincial tables plus benefit amounts for `tax_year`.
    ///
    /// # Errors
    ///
    /// Any lookup failure is returned as-is; nothing is defaulted.
    pub fn resolve(
        provider: &dyn TaxDataProvider,
        tax_year: i32,
        province: Province,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            tax_year,
            province,
            federal: resolve_tables(provider, Jurisdiction::Federal, tax_year)?,
            provincial: resolve_tables(provider, Jurisdiction::Provincial(province), tax_year)?,
            benefits: provider.get_benefit_reference_amounts(tax_year)?,
        })
    }
}

fn resolve_tables(
    provider: &dyn TaxDataProvider,
    jurisdiction: Jurisdiction,
    tax_year: i32,
) -> Result<JurisdictionTables, ProviderError> {
    let brackets = provider.get_bracket_table(jurisdiction, tax_year)?;
    if brackets.is_empty() {
        return Err(ProviderError::NotFound(format!(
            "no tax brackets for {jurisdiction} {tax_year}"
        )));
    }
    Ok(JurisdictionTables {
        brackets,
        basic_amount: provider.get_basic_credit(jurisdiction, tax_year)?,
        age_credit: provider.get_age_credit(jurisdiction, tax_year)?,
    })
}

/// Full tax picture for one year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub taxable_income: TaxableIncome,
    pub federal: JurisdictionTax,
    pub provincial: JurisdictionTax,
    pub oas_clawback: Decimal,
    pub total: Decimal,
    /// Sum of the federal and provincial marginal rates.
    pub marginal_rate: Decimal,
    pub average_rate: Decimal,
}

impl TaxBreakdown {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Combines both jurisdictions and the clawback for one year's income.
#[derive(Debug, Clone)]
pub struct TaxCalculator<'a> {
    data: &'a TaxYearData,
}

impl<'a> TaxCalculator<'a> {
    /// # Errors
    ///
    /// Returns [`TaxCalculationError`] if either bracket table is malformed.
    pub fn new(data: &'a TaxYearData) -> Result<Self, TaxCalculationError> {
        data.federal.validate()?;
        data.provincial.validate()?;
        Ok(Self { data })
    }

    pub fn calculate(
        &self,
        income: &IncomeComponents,
        age: u32,
    ) -> Result<TaxBreakdown, TaxCalculationError> {
        let taxable_income = income.taxable();
        let federal = self.data.federal.calculate(taxable_income.total, age)?;
        let provincial = self.data.provincial.calculate(taxable_income.total, age)?;
        let oas_clawback = oas_recovery_tax(
            taxable_income.total,
            taxable_income.oas,
            self.data.benefits.oas_recovery_threshold,
            self.data.benefits.oas_recovery_rate,
        );

        let total = federal.net_tax + provincial.net_tax + oas_clawback;
        let average_rate = if taxable_income.total > Decimal::ZERO {
            (total / taxable_income.total).round_dp(6)
        } else {
            Decimal::ZERO
        };

        Ok(TaxBreakdown {
            taxable_income,
            marginal_rate: federal.marginal_rate + provincial.marginal_rate,
            federal,
            provincial,
            oas_clawback,
            total,
            average_rate,
        })
    }
}
