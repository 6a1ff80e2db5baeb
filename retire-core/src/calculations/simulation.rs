//! Year-by-year projection of a [`Scenario`].
//!
//! A single age loop runs from the current age to the end-of-plan age
//! inclusive. Ages before retirement are accumulation years: contributions go
//! in, nothing comes out, and no tax or expenses are recorded. From retirement
//! onward each year computes expenses and non-portfolio income, withdraws the
//! shortfall (plus any mandatory minimum) in the fixed account order, and taxes
//! the result. The loop stops early once the portfolio is empty.
//!
//! Reference data is resolved once per run for the scenario's tax year;
//! minimum-withdrawal percentages are looked up per age.

use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::{debug, info};

use crate::calculations::accounts::{
    AccountState, MINIMUM_WITHDRAWAL_AGE, ReturnRates, minimum_withdrawal,
    project_accumulation_year, project_drawdown_year, sequence_withdrawals,
};
use crate::calculations::benefits::{AdjustedBenefit, BenefitError, calculate_cpp, calculate_oas};
use crate::calculations::common::{
    checked_compound_factor, indexed_amount, non_negative, round_half_up,
};
use crate::calculations::tax::{
    IncomeComponents, TaxBreakdown, TaxCalculationError, TaxCalculator, TaxYearData,
};
use crate::db::provider::{ProviderError, TaxDataProvider};
use crate::models::{
    BasicInfo, CalculationResults, Expenses, IncomeSources, Phase, Scenario, YearIncome, YearResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionErrorKind {
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error(transparent)]
    Benefit(#[from] BenefitError),

    #[error(transparent)]
    Tax(#[from] TaxCalculationError),

    #[error(transparent)]
    ReferenceData(#[from] ProviderError),
}

/// A failed run, tagged with the scenario it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scenario '{scenario}': {kind}")]
pub struct ProjectionError {
    pub scenario: String,
    #[source]
    pub kind: ProjectionErrorKind,
}

/// Upper bound on any amount a projection may produce. Tax and rate
/// arithmetic on amounts below it cannot overflow a `Decimal`.
pub const MAX_PROJECTED_AMOUNT: Decimal = dec!(1000000000000000000);

/// Checks a scenario's inputs before anything is simulated.
///
/// Benefit start ages are left to the benefit calculator. Inputs whose
/// growth over the plan could exceed [`MAX_PROJECTED_AMOUNT`] are rejected.
pub fn validate_scenario(scenario: &Scenario) -> Result<(), ProjectionErrorKind> {
    let invalid = |message: String| Err(ProjectionErrorKind::InvalidScenario(message));

    let assumptions = &scenario.assumptions;
    let mut rates = vec![
        ("pre_retirement_return", Some(assumptions.pre_retirement_return)),
        ("post_retirement_return", Some(assumptions.post_retirement_return)),
        ("inflation_rate", Some(assumptions.inflation_rate)),
    ];
    let assets = &scenario.assets;
    rates.push(("tax_deferred.rate_of_return", assets.tax_deferred.rate_of_return));
    rates.push(("tax_free.rate_of_return", assets.tax_free.rate_of_return));
    rates.push(("taxable.rate_of_return", assets.taxable.account.rate_of_return));
    for (field, rate) in &rates {
        if let Some(rate) = rate.filter(|rate| *rate <= -Decimal::ONE) {
            return invalid(format!("{field} must be greater than -1, got {rate}"));
        }
    }
    let fastest_rate = rates
        .iter()
        .filter_map(|(_, rate)| *rate)
        .fold(Decimal::ZERO, Decimal::max);

    let mut amounts = vec![
        ("tax_deferred.balance", Some(assets.tax_deferred.balance)),
        ("tax_deferred.annual_contribution", Some(assets.tax_deferred.annual_contribution)),
        ("tax_free.balance", Some(assets.tax_free.balance)),
        ("tax_free.annual_contribution", Some(assets.tax_free.annual_contribution)),
        ("taxable.balance", Some(assets.taxable.account.balance)),
        ("taxable.annual_contribution", Some(assets.taxable.account.annual_contribution)),
        ("taxable.cost_basis", assets.taxable.cost_basis),
        ("expenses.monthly_amount", Some(scenario.expenses.monthly_amount)),
        ("expenses.variable_annual", scenario.expenses.variable_annual),
    ];
    let income = &scenario.income;
    amounts.push((
        "employment.annual_amount",
        income.employment.as_ref().map(|e| e.annual_amount),
    ));
    amounts.push(("cpp.monthly_amount_at_65", income.cpp.as_ref().map(|b| b.monthly_amount_at_65)));
    amounts.push(("oas.monthly_amount_at_65", income.oas.as_ref().map(|b| b.monthly_amount_at_65)));
    for (field, amount) in &amounts {
        if let Some(amount) = amount.filter(|amount| *amount < Decimal::ZERO) {
            return invalid(format!("{field} must not be negative, got {amount}"));
        }
    }

    for change in &scenario.expenses.changes {
        if change.monthly_amount < Decimal::ZERO {
            return invalid(format!(
                "expense change at age {} must not be negative, got {}",
                change.age, change.monthly_amount
            ));
        }
    }

    for other in &income.other {
        if other.annual_amount < Decimal::ZERO {
            return invalid(format!(
                "other income '{}' must not be negative, got {}",
                other.name, other.annual_amount
            ));
        }
        if let Some(end_age) = other.end_age.filter(|end| *end < other.start_age) {
            return invalid(format!(
                "other income '{}' ends at {end_age}, before it starts at {}",
                other.name, other.start_age
            ));
        }
    }

    let plan_years = scenario
        .basic
        .longevity_age
        .saturating_sub(scenario.basic.current_age)
        .saturating_add(1);
    let inputs = amounts
        .iter()
        .filter_map(|(_, amount)| *amount)
        .chain(scenario.expenses.changes.iter().map(|change| change.monthly_amount))
        .chain(income.other.iter().map(|other| other.annual_amount));
    if !within_projection_range(inputs, fastest_rate, plan_years) {
        return invalid(format!(
            "amounts growing at {fastest_rate} for {plan_years} years exceed the supported range"
        ));
    }

    Ok(())
}

/// Checks that no amount can outgrow [`MAX_PROJECTED_AMOUNT`].
///
/// Every input is weighted by 24 per plan year, enough for a monthly amount
/// with a deferral increase paid every year, and then compounded at the
/// fastest rate for the whole plan.
fn within_projection_range(
    mut inputs: impl Iterator<Item = Decimal>,
    fastest_rate: Decimal,
    plan_years: u32,
) -> bool {
    let weight = Decimal::from(plan_years) * Decimal::from(24);
    let exposure = inputs.try_fold(Decimal::ZERO, |total, amount| {
        total.checked_add(amount.checked_mul(weight)?)
    });
    exposure
        .zip(checked_compound_factor(fastest_rate, plan_years))
        .and_then(|(exposure, growth)| exposure.checked_mul(growth))
        .is_some_and(|bound| bound <= MAX_PROJECTED_AMOUNT)
}

/// Annual spending at `age`: `monthly × 12 + variable`, indexed for inflation.
///
/// The latest expense change at or before `age` replaces the monthly amount;
/// the variable annual amount is still added on top of it.
/// Indexing starts at retirement, or at the change age if that is later.
pub fn annual_expenses_at(
    expenses: &Expenses,
    retirement_age: u32,
    inflation_rate: Decimal,
    age: u32,
) -> Decimal {
    let latest_change = expenses
        .changes
        .iter()
        .filter(|change| change.age <= age)
        .max_by_key(|change| change.age);
    let (monthly, index_from) = match latest_change {
        Some(change) => (change.monthly_amount, change.age.max(retirement_age)),
        None => (expenses.monthly_amount, retirement_age),
    };

    let base = monthly * Decimal::from(12) + expenses.variable_annual.unwrap_or(Decimal::ZERO);
    if expenses.inflation_indexed {
        round_half_up(indexed_amount(base, inflation_rate, index_from, age))
    } else {
        round_half_up(base)
    }
}

/// Non-portfolio income for one age.
struct IncomeSchedule<'a> {
    basic: &'a BasicInfo,
    sources: &'a IncomeSources,
    inflation_rate: Decimal,
    cpp: Option<AdjustedBenefit>,
    oas: Option<AdjustedBenefit>,
}

impl<'a> IncomeSchedule<'a> {
    fn new(scenario: &'a Scenario) -> Result<Self, BenefitError> {
        let sources = &scenario.income;
        let cpp = sources
            .cpp
            .as_ref()
            .map(|e| calculate_cpp(e.start_age, e.monthly_amount_at_65))
            .transpose()?;
        let oas = sources
            .oas
            .as_ref()
            .map(|e| calculate_oas(e.start_age, e.monthly_amount_at_65))
            .transpose()?;
        Ok(Self {
            basic: &scenario.basic,
            sources,
            inflation_rate: scenario.assumptions.inflation_rate,
            cpp,
            oas,
        })
    }

    fn employment(
        &self,
        age: u32,
    ) -> Decimal {
        match &self.sources.employment {
            Some(job) if age < job.until_age => round_half_up(indexed_amount(
                job.annual_amount,
                self.inflation_rate,
                self.basic.current_age,
                age,
            )),
            _ => Decimal::ZERO,
        }
    }

    fn benefit(
        &self,
        benefit: Option<&AdjustedBenefit>,
        age: u32,
    ) -> Decimal {
        match benefit {
            Some(b) if age >= b.start_age => round_half_up(indexed_amount(
                b.annual_amount,
                self.inflation_rate,
                b.start_age,
                age,
            )),
            _ => Decimal::ZERO,
        }
    }

    fn other(
        &self,
        age: u32,
    ) -> Decimal {
        self.sources
            .other
            .iter()
            .filter(|income| income.is_active(age))
            .map(|income| {
                if income.inflation_indexed {
                    round_half_up(indexed_amount(
                        income.annual_amount,
                        self.inflation_rate,
                        income.start_age,
                        age,
                    ))
                } else {
                    income.annual_amount
                }
            })
            .sum()
    }

    fn at(
        &self,
        age: u32,
    ) -> YearIncome {
        YearIncome::new(
            self.employment(age),
            self.benefit(self.cpp.as_ref(), age),
            self.benefit(self.oas.as_ref(), age),
            self.other(age),
            Decimal::ZERO,
        )
    }
}

/// Runs projections against one reference-data provider.
#[derive(Clone, Copy)]
pub struct ProjectionEngine<'a> {
    provider: &'a dyn TaxDataProvider,
}

impl<'a> ProjectionEngine<'a> {
    pub fn new(provider: &'a dyn TaxDataProvider) -> Self {
        Self { provider }
    }

    /// Projects one scenario.
    ///
    /// # Errors
    ///
    /// Invalid inputs, out-of-range benefit start ages, and missing or
    /// malformed reference data all abort the run. Depletion is not an error.
    pub fn project(
        &self,
        scenario: &Scenario,
    ) -> Result<CalculationResults, ProjectionError> {
        self.run(scenario).map_err(|kind| ProjectionError {
            scenario: scenario.name.clone(),
            kind,
        })
    }

    /// Projects every scenario independently, in parallel. Output order
    /// matches input order.
    pub fn compare(
        &self,
        scenarios: &[Scenario],
    ) -> Vec<Result<CalculationResults, ProjectionError>> {
        scenarios
            .par_iter()
            .map(|scenario| self.project(scenario))
            .collect()
    }

    fn run(
        &self,
        scenario: &Scenario,
    ) -> Result<CalculationResults, ProjectionErrorKind> {
        validate_scenario(scenario)?;

        let basic = &scenario.basic;
        let schedule = IncomeSchedule::new(scenario)?;
        let data = TaxYearData::resolve(self.provider, basic.tax_year, basic.province)?;
        let calculator = TaxCalculator::new(&data)?;

        let contributions = scenario.assets.annual_contributions();
        let pre_rates =
            ReturnRates::for_phase(&scenario.assets, scenario.assumptions.pre_retirement_return);
        let post_rates =
            ReturnRates::for_phase(&scenario.assets, scenario.assumptions.post_retirement_return);

        let mut state = AccountState::from_assets(&scenario.assets);
        let starting_balances = state.balances;
        let plan_length = basic.longevity_age.saturating_sub(basic.current_age) + 1;
        let mut years = Vec::with_capacity(plan_length as usize);

        for age in basic.current_age..=basic.longevity_age {
            let income = schedule.at(age);

            let year = if age < basic.retirement_age {
                let accounts = project_accumulation_year(&state, &contributions, &pre_rates);
                state = accounts.ending;
                YearResult {
                    age,
                    year: basic.calendar_year(age),
                    phase: Phase::Accumulation,
                    starting_balances: accounts.starting_balances,
                    contributions: accounts.contributions,
                    investment_growth: accounts.investment_growth,
                    withdrawals: accounts.withdrawals,
                    ending_balances: accounts.ending.balances,
                    income,
                    tax: TaxBreakdown::zero(),
                    expenses: Decimal::ZERO,
                    net_cash_flow: income.total,
                }
            } else {
                let expenses = annual_expenses_at(
                    &scenario.expenses,
                    basic.retirement_age,
                    scenario.assumptions.inflation_rate,
                    age,
                );
                let target = non_negative(expenses - income.non_portfolio());
                let minimum = if age >= MINIMUM_WITHDRAWAL_AGE {
                    let percentage = self.provider.get_minimum_withdrawal_percentage(age)?;
                    minimum_withdrawal(age, state.balances.tax_deferred, percentage)
                } else {
                    Decimal::ZERO
                };
                let withdrawals =
                    sequence_withdrawals(target, &state.balances, state.cost_basis, minimum);
                let accounts = project_drawdown_year(&state, &withdrawals, &post_rates);
                state = accounts.ending;

                let income = YearIncome::new(
                    income.employment,
                    income.cpp,
                    income.oas,
                    income.other,
                    withdrawals.total(),
                );
                let tax = calculator.calculate(
                    &IncomeComponents {
                        employment: income.employment,
                        tax_deferred_withdrawals: withdrawals.tax_deferred,
                        tax_free_withdrawals: withdrawals.tax_free,
                        capital_gains: withdrawals.taxable_gains,
                        cpp: income.cpp,
                        oas: income.oas,
                        other: income.other,
                    },
                    age,
                )?;
                let net_cash_flow = income.total - expenses - tax.total;

                YearResult {
                    age,
                    year: basic.calendar_year(age),
                    phase: Phase::Drawdown,
                    starting_balances: accounts.starting_balances,
                    contributions: accounts.contributions,
                    investment_growth: accounts.investment_growth,
                    withdrawals,
                    ending_balances: accounts.ending.balances,
                    income,
                    tax,
                    expenses,
                    net_cash_flow,
                }
            };

            debug!(
                scenario = %scenario.name,
                age,
                phase = ?year.phase,
                ending_balance = %year.ending_balances.total(),
                "projected year"
            );

            let depleted = year.depletes_portfolio();
            years.push(year);
            if depleted {
                info!(scenario = %scenario.name, age, "portfolio depleted");
                break;
            }
        }

        let results = CalculationResults::from_years(&scenario.name, starting_balances, years);
        info!(
            scenario = %results.scenario_name,
            success = results.success,
            final_balance = %results.final_balance,
            "projection complete"
        );
        Ok(results)
    }
}
