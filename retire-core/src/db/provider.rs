use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{AgeCredit, BenefitReferenceAmounts, Jurisdiction, TaxBracket};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Reference data not found: {0}")]
    NotFound(String),

    #[error("Invalid reference data: {0}")]
    Data(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Read-only source of tax and benefit reference data.
///
/// Every lookup is a pure read keyed by calendar year and, where relevant,
/// jurisdiction. Implementations must fail rather than substitute defaults
/// when a table is missing.
pub trait TaxDataProvider: Send + Sync {
    fn list_tax_years(&self) -> Result<Vec<i32>, ProviderError>;

    /// Brackets for the jurisdiction and year, ordered by ascending limit.
    fn get_bracket_table(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, ProviderError>;

    /// Basic personal amount (the credit base, before the lowest rate is applied).
    fn get_basic_credit(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Decimal, ProviderError>;

    fn get_age_credit(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<AgeCredit, ProviderError>;

    /// Fraction of the tax-deferred balance that must be withdrawn at `age`.
    fn get_minimum_withdrawal_percentage(
        &self,
        age: u32,
    ) -> Result<Decimal, ProviderError>;

    fn get_benefit_reference_amounts(
        &self,
        tax_year: i32,
    ) -> Result<BenefitReferenceAmounts, ProviderError>;
}
