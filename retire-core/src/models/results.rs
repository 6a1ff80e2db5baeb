use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AccountBalances, Withdrawals};
use crate::calculations::common::round_half_up;
use crate::calculations::tax::TaxBreakdown;

/// Simulation phase a year belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Accumulation,
    Drawdown,
}

/// Income received in one year, by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearIncome {
    pub employment: Decimal,
    pub cpp: Decimal,
    pub oas: Decimal,
    pub other: Decimal,
    /// Total withdrawn from the portfolio.
    pub investment: Decimal,
    pub total: Decimal,
}

impl YearIncome {
    pub fn new(
        employment: Decimal,
        cpp: Decimal,
        oas: Decimal,
        other: Decimal,
        investment: Decimal,
    ) -> Self {
        Self {
            employment,
            cpp,
            oas,
            other,
            investment,
            total: employment + cpp + oas + other + investment,
        }
    }

    /// Income from every source except portfolio withdrawals.
    pub fn non_portfolio(&self) -> Decimal {
        self.employment + self.cpp + self.oas + self.other
    }
}

/// One simulated year. Immutable once appended to the result sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearResult {
    pub age: u32,
    pub year: i32,
    pub phase: Phase,
    pub starting_balances: AccountBalances,
    pub contributions: AccountBalances,
    pub investment_growth: AccountBalances,
    pub withdrawals: Withdrawals,
    pub ending_balances: AccountBalances,
    pub income: YearIncome,
    pub tax: TaxBreakdown,
    pub expenses: Decimal,
    pub net_cash_flow: Decimal,
}

impl YearResult {
    /// Whether the portfolio ran out this year.
    ///
    /// An empty portfolio only counts when it held money at the start of the
    /// year or when income fell short of expenses. A plan that starts
    /// drawdown with nothing saved but is carried by other income never
    /// depletes.
    pub fn depletes_portfolio(&self) -> bool {
        self.phase == Phase::Drawdown
            && self.ending_balances.total() <= Decimal::ZERO
            && (self.starting_balances.total() > Decimal::ZERO
                || self.income.total < self.expenses)
    }
}

/// Outcome of a projection run. Every summary field is derived from `years`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResults {
    pub scenario_name: String,
    pub success: bool,
    pub final_balance: Decimal,
    pub portfolio_depleted_age: Option<u32>,
    pub first_year_retirement_income: Decimal,
    pub average_retirement_tax: Decimal,
    pub total_retirement_tax: Decimal,
    pub total_cpp_received: Decimal,
    pub total_oas_received: Decimal,
    pub years: Vec<YearResult>,
}

impl CalculationResults {
    /// Builds the summary with a single pass over `years`.
    ///
    /// `starting_balances` supplies the final balance for a zero-length plan.
    pub fn from_years(
        scenario_name: impl Into<String>,
        starting_balances: AccountBalances,
        years: Vec<YearResult>,
    ) -> Self {
        let mut portfolio_depleted_age = None;
        let mut first_year_retirement_income = None;
        let mut total_retirement_tax = Decimal::ZERO;
        let mut retirement_years = 0u32;
        let mut total_cpp_received = Decimal::ZERO;
        let mut total_oas_received = Decimal::ZERO;

        for year in &years {
            total_cpp_received += year.income.cpp;
            total_oas_received += year.income.oas;

            if year.phase != Phase::Drawdown {
                continue;
            }
            first_year_retirement_income.get_or_insert(year.income.total);
            total_retirement_tax += year.tax.total;
            retirement_years += 1;
            if portfolio_depleted_age.is_none() && year.depletes_portfolio() {
                portfolio_depleted_age = Some(year.age);
            }
        }

        let final_balance = years
            .last()
            .map_or(starting_balances.total(), |year| year.ending_balances.total());
        let average_retirement_tax = if retirement_years == 0 {
            Decimal::ZERO
        } else {
            round_half_up(total_retirement_tax / Decimal::from(retirement_years))
        };

        Self {
            scenario_name: scenario_name.into(),
            success: portfolio_depleted_age.is_none(),
            final_balance,
            portfolio_depleted_age,
            first_year_retirement_income: first_year_retirement_income.unwrap_or(Decimal::ZERO),
            average_retirement_tax,
            total_retirement_tax,
            total_cpp_received,
            total_oas_received,
            years,
        }
    }

    pub fn retirement_years(&self) -> impl Iterator<Item = &YearResult> {
        self.years
            .iter()
            .filter(|year| year.phase == Phase::Drawdown)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn year(
        age: u32,
        phase: Phase,
        ending_total: Decimal,
        cpp: Decimal,
        tax: Decimal,
    ) -> YearResult {
        YearResult {
            age,
            year: 2025 + age as i32 - 60,
            phase,
            starting_balances: AccountBalances::new(ending_total + dec!(1000), Decimal::ZERO, Decimal::ZERO),
            contributions: AccountBalances::ZERO,
            investment_growth: AccountBalances::ZERO,
            withdrawals: Withdrawals::default(),
            ending_balances: AccountBalances::new(ending_total, Decimal::ZERO, Decimal::ZERO),
            income: YearIncome::new(Decimal::ZERO, cpp, Decimal::ZERO, Decimal::ZERO, dec!(1000)),
            tax: TaxBreakdown {
                total: tax,
                ..TaxBreakdown::zero()
            },
            expenses: Decimal::ZERO,
            net_cash_flow: Decimal::ZERO,
        }
    }

    #[test]
    fn summary_for_surviving_plan() {
        let years = vec![
            year(60, Phase::Accumulation, dec!(100000), dec!(0), dec!(0)),
            year(61, Phase::Drawdown, dec!(90000), dec!(5000), dec!(1000)),
            year(62, Phase::Drawdown, dec!(80000), dec!(5000), dec!(2000)),
        ];

        let results = CalculationResults::from_years("base", AccountBalances::ZERO, years);

        assert!(results.success);
        assert_eq!(results.portfolio_depleted_age, None);
        assert_eq!(results.final_balance, dec!(80000));
        assert_eq!(results.first_year_retirement_income, dec!(6000));
        assert_eq!(results.total_retirement_tax, dec!(3000));
        assert_eq!(results.average_retirement_tax, dec!(1500));
        assert_eq!(results.total_cpp_received, dec!(10000));
        assert_eq!(results.retirement_years().count(), 2);
    }

    #[test]
    fn summary_records_first_depleted_age() {
        let years = vec![
            year(61, Phase::Drawdown, dec!(1000), dec!(0), dec!(0)),
            year(62, Phase::Drawdown, dec!(0), dec!(0), dec!(0)),
        ];

        let results = CalculationResults::from_years("short", AccountBalances::ZERO, years);

        assert!(!results.success);
        assert_eq!(results.portfolio_depleted_age, Some(62));
        assert_eq!(results.final_balance, dec!(0));
    }

    #[test]
    fn empty_portfolio_carried_by_other_income_is_not_depletion() {
        let mut first = year(60, Phase::Drawdown, dec!(0), dec!(0), dec!(0));
        first.starting_balances = AccountBalances::ZERO;
        first.income = YearIncome::new(dec!(0), dec!(0), dec!(0), dec!(80000), dec!(0));
        first.expenses = dec!(36000);

        let results = CalculationResults::from_years("pension", AccountBalances::ZERO, vec![first]);

        assert!(results.success);
        assert_eq!(results.portfolio_depleted_age, None);
    }

    #[test]
    fn empty_portfolio_with_shortfall_is_depletion() {
        let mut first = year(60, Phase::Drawdown, dec!(0), dec!(0), dec!(0));
        first.starting_balances = AccountBalances::ZERO;
        first.income = YearIncome::new(dec!(0), dec!(0), dec!(0), dec!(20000), dec!(0));
        first.expenses = dec!(36000);

        assert!(first.depletes_portfolio());
    }

    #[test]
    fn zero_accumulation_balance_is_not_depletion() {
        let years = vec![year(58, Phase::Accumulation, dec!(0), dec!(0), dec!(0))];

        let results = CalculationResults::from_years("empty", AccountBalances::ZERO, years);

        assert!(results.success);
        assert_eq!(results.first_year_retirement_income, dec!(0));
        assert_eq!(results.average_retirement_tax, dec!(0));
    }

    #[test]
    fn zero_length_plan_reports_starting_balance() {
        let starting = AccountBalances::new(dec!(1), dec!(2), dec!(3));

        let results = CalculationResults::from_years("none", starting, Vec::new());

        assert!(results.success);
        assert_eq!(results.final_balance, dec!(6));
        assert!(results.years.is_empty());
    }
}
