//! In-memory reference data and scenarios for engine tests.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::db::provider::{ProviderError, TaxDataProvider};
use crate::models::{
    AccountDefinition, AgeCredit, Assets, Assumptions, BasicInfo, BenefitReferenceAmounts, Expenses,
    IncomeSources, Jurisdiction, Province, Scenario, TaxBracket, TaxableAccountDefinition,
};

pub(crate) struct FixtureProvider {
    minimum_withdrawals: BTreeMap<u32, Decimal>,
}

impl FixtureProvider {
    pub(crate) fn new() -> Self {
        let minimum_withdrawals = [
            (55, dec!(0.0286)),
            (60, dec!(0.0333)),
            (65, dec!(0.04)),
            (70, dec!(0.05)),
            (71, dec!(0.0528)),
            (80, dec!(0.0682)),
            (90, dec!(0.1192)),
            (95, dec!(0.20)),
        ]
        .into_iter()
        .collect();
        Self { minimum_withdrawals }
    }
}

const YEAR: i32 = 2025;

fn require_year(tax_year: i32) -> Result<(), ProviderError> {
    if tax_year == YEAR {
        Ok(())
    } else {
        Err(ProviderError::NotFound(format!("tax year {tax_year}")))
    }
}

impl TaxDataProvider for FixtureProvider {
    fn list_tax_years(&self) -> Result<Vec<i32>, ProviderError> {
        Ok(vec![YEAR])
    }

    fn get_bracket_table(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Vec<TaxBracket>, ProviderError> {
        require_year(tax_year)?;
        let rows: &[(Option<Decimal>, Decimal)] = match jurisdiction {
            Jurisdiction::Federal => &[
                (Some(dec!(57375)), dec!(0.15)),
                (Some(dec!(114750)), dec!(0.205)),
                (Some(dec!(177882)), dec!(0.26)),
                (Some(dec!(253414)), dec!(0.29)),
                (None, dec!(0.33)),
            ],
            Jurisdiction::Provincial(Province::Ontario) => &[
                (Some(dec!(52886)), dec!(0.0505)),
                (Some(dec!(105775)), dec!(0.0915)),
                (Some(dec!(150000)), dec!(0.1116)),
                (Some(dec!(220000)), dec!(0.1216)),
                (None, dec!(0.1316)),
            ],
            Jurisdiction::Provincial(other) => {
                return Err(ProviderError::NotFound(format!("brackets for {other}")));
            }
        };
        Ok(rows
            .iter()
            .map(|&(max_income, tax_rate)| TaxBracket {
                tax_year,
                jurisdiction,
                max_income,
                tax_rate,
            })
            .collect())
    }

    fn get_basic_credit(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Decimal, ProviderError> {
        require_year(tax_year)?;
        Ok(match jurisdiction {
            Jurisdiction::Federal => dec!(16129),
            Jurisdiction::Provincial(_) => dec!(12747),
        })
    }

    fn get_age_credit(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<AgeCredit, ProviderError> {
        require_year(tax_year)?;
        Ok(match jurisdiction {
            Jurisdiction::Federal => AgeCredit {
                max_credit: dec!(9028),
                income_threshold: dec!(45522),
                reduction_rate: dec!(0.15),
            },
            Jurisdiction::Provincial(_) => AgeCredit {
                max_credit: dec!(6223),
                income_threshold: dec!(46330),
                reduction_rate: dec!(0.15),
            },
        })
    }

    fn get_minimum_withdrawal_percentage(
        &self,
        age: u32,
    ) -> Result<Decimal, ProviderError> {
        Ok(self
            .minimum_withdrawals
            .range(..=age)
            .next_back()
            .map_or(Decimal::ZERO, |(_, pct)| *pct))
    }

    fn get_benefit_reference_amounts(
        &self,
        tax_year: i32,
    ) -> Result<BenefitReferenceAmounts, ProviderError> {
        require_year(tax_year)?;
        Ok(BenefitReferenceAmounts {
            tax_year,
            ceiling_earnings: dec!(71300),
            cpp_max_monthly: dec!(1433.00),
            oas_max_monthly: dec!(727.67),
            oas_recovery_threshold: dec!(93454),
            oas_recovery_rate: dec!(0.15),
        })
    }
}

fn account(balance: Decimal) -> AccountDefinition {
    AccountDefinition {
        balance,
        annual_contribution: Decimal::ZERO,
        rate_of_return: None,
    }
}

/// 58-year-old retiring at 65 with $80k saved and $5,000/month of spending.
pub(crate) fn underfunded_scenario() -> Scenario {
    Scenario {
        name: "underfunded".to_string(),
        basic: BasicInfo {
            current_age: 58,
            retirement_age: 65,
            longevity_age: 90,
            province: Province::Ontario,
            tax_year: YEAR,
        },
        assets: Assets {
            tax_deferred: account(dec!(50000)),
            tax_free: account(dec!(10000)),
            taxable: TaxableAccountDefinition {
                account: account(dec!(20000)),
                cost_basis: None,
            },
        },
        income: IncomeSources::default(),
        expenses: Expenses {
            monthly_amount: dec!(5000),
            variable_annual: None,
            inflation_indexed: true,
            changes: Vec::new(),
        },
        assumptions: Assumptions {
            pre_retirement_return: dec!(0.05),
            post_retirement_return: dec!(0.04),
            inflation_rate: dec!(0.02),
        },
    }
}

/// 60-year-old retiring at 60 with $1.2M saved and modest spending.
pub(crate) fn comfortable_scenario() -> Scenario {
    Scenario {
        name: "comfortable".to_string(),
        basic: BasicInfo {
            current_age: 60,
            retirement_age: 60,
            longevity_age: 90,
            province: Province::Ontario,
            tax_year: YEAR,
        },
        assets: Assets {
            tax_deferred: account(dec!(700000)),
            tax_free: account(dec!(200000)),
            taxable: TaxableAccountDefinition {
                account: account(dec!(300000)),
                cost_basis: Some(dec!(200000)),
            },
        },
        income: IncomeSources::default(),
        expenses: Expenses {
            monthly_amount: dec!(3000),
            variable_annual: None,
            inflation_indexed: true,
            changes: Vec::new(),
        },
        assumptions: Assumptions {
            pre_retirement_return: dec!(0.05),
            post_retirement_return: dec!(0.04),
            inflation_rate: dec!(0.02),
        },
    }
}
