//! Scenario input model.
//!
//! A [`Scenario`] is the complete, immutable input to one projection run. It
//! deserializes from the TOML layout used by scenario files: every optional
//! section falls back to an empty default so a minimal file only needs the
//! basics, the assets, and the expenses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountBalances, Province};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub basic: BasicInfo,
    pub assets: Assets,
    #[serde(default)]
    pub income: IncomeSources,
    pub expenses: Expenses,
    pub assumptions: Assumptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub current_age: u32,
    pub retirement_age: u32,
    /// End-of-plan age; the projection runs through this age inclusive.
    pub longevity_age: u32,
    pub province: Province,
    /// Calendar year in which the holder is `current_age`. Reference data is
    /// resolved for this year.
    pub tax_year: i32,
}

impl BasicInfo {
    /// Calendar year in which the holder reaches `age`.
    pub fn calendar_year(
        &self,
        age: u32,
    ) -> i32 {
        self.tax_year + (i64::from(age) - i64::from(self.current_age)) as i32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDefinition {
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub annual_contribution: Decimal,
    /// Overrides the phase return assumption for this account when present.
    #[serde(default)]
    pub rate_of_return: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxableAccountDefinition {
    #[serde(flatten)]
    pub account: AccountDefinition,
    /// Adjusted cost base. When unknown, withdrawals are assumed to be half
    /// capital gain.
    #[serde(default)]
    pub cost_basis: Option<Decimal>,
}

/// Starting positions of the three account classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assets {
    /// RRSP/RRIF.
    #[serde(default)]
    pub tax_deferred: AccountDefinition,
    /// TFSA.
    #[serde(default)]
    pub tax_free: AccountDefinition,
    /// Non-registered.
    #[serde(default)]
    pub taxable: TaxableAccountDefinition,
}

impl Assets {
    pub fn starting_balances(&self) -> AccountBalances {
        AccountBalances::new(
            self.tax_deferred.balance,
            self.tax_free.balance,
            self.taxable.account.balance,
        )
    }

    pub fn annual_contributions(&self) -> AccountBalances {
        AccountBalances::new(
            self.tax_deferred.annual_contribution,
            self.tax_free.annual_contribution,
            self.taxable.account.annual_contribution,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentIncome {
    pub annual_amount: Decimal,
    /// Employment income is earned while `age < until_age`.
    pub until_age: u32,
}

/// Election for one government benefit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitElection {
    pub start_age: u32,
    /// Monthly amount payable if started at the reference age (65).
    pub monthly_amount_at_65: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherIncome {
    pub name: String,
    pub annual_amount: Decimal,
    pub start_age: u32,
    /// Last age (inclusive) the income is received. Open-ended when absent.
    #[serde(default)]
    pub end_age: Option<u32>,
    #[serde(default)]
    pub inflation_indexed: bool,
}

impl OtherIncome {
    pub fn is_active(
        &self,
        age: u32,
    ) -> bool {
        age >= self.start_age && self.end_age.is_none_or(|end| age <= end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeSources {
    #[serde(default)]
    pub employment: Option<EmploymentIncome>,
    #[serde(default)]
    pub cpp: Option<BenefitElection>,
    #[serde(default)]
    pub oas: Option<BenefitElection>,
    #[serde(default)]
    pub other: Vec<OtherIncome>,
}

/// Replaces the monthly spending amount from `age` onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseChange {
    pub age: u32,
    pub monthly_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expenses {
    pub monthly_amount: Decimal,
    #[serde(default)]
    pub variable_annual: Option<Decimal>,
    #[serde(default = "default_true")]
    pub inflation_indexed: bool,
    #[serde(default)]
    pub changes: Vec<ExpenseChange>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assumptions {
    pub pre_retirement_return: Decimal,
    pub post_retirement_return: Decimal,
    pub inflation_rate: Decimal,
}
