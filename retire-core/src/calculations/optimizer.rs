//! Binary search for the monthly spending that just exhausts the portfolio
//! at the end-of-plan age.
//!
//! Every trial is a full projection of a fresh copy of the scenario with its
//! spending profile rescaled. A trial "survives" when the portfolio is not
//! depleted before the end-of-plan age.
//!
//! * Baseline depletes early: search `[0, baseline]` for the most that
//!   survives.
//! * Baseline survives: search `[80%, 300%]` of baseline for the most that
//!   still survives, i.e. the spending that runs the money out on time.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calculations::common::round_half_up;
use crate::calculations::simulation::{ProjectionEngine, ProjectionError};
use crate::models::{CalculationResults, Scenario};

/// Terminal balance treated as "exhausted".
pub const BALANCE_TOLERANCE: Decimal = dec!(1000);

/// Monthly amount used to scale the search when the baseline is zero.
pub const ZERO_BASELINE_ANCHOR: Decimal = dec!(1000);

const UPPER_BAND_LOW: Decimal = dec!(0.8);
const UPPER_BAND_HIGH: Decimal = dec!(3);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingOptimization {
    pub monthly_spending: Decimal,
    pub iterations: u32,
    pub final_balance: Decimal,
    pub depleted_age: Option<u32>,
    /// Whether the search converged on the end-of-plan age.
    pub success: bool,
    pub message: String,
}

/// Copy of `scenario` spending `monthly` per month.
///
/// Age-triggered expense changes are scaled by the same ratio as the base
/// amount so the shape of the spending profile is kept. With a zero base
/// there is no ratio, and the changes are left as they are.
pub fn with_monthly_spending(
    scenario: &Scenario,
    monthly: Decimal,
) -> Scenario {
    let mut variant = scenario.clone();
    let base = scenario.expenses.monthly_amount;
    variant.expenses.monthly_amount = monthly;
    if base > Decimal::ZERO {
        let ratio = monthly / base;
        for change in &mut variant.expenses.changes {
            change.monthly_amount = round_half_up(change.monthly_amount * ratio);
        }
    }
    variant
}

fn spending_anchor(scenario: &Scenario) -> Decimal {
    if scenario.expenses.monthly_amount > Decimal::ZERO {
        scenario.expenses.monthly_amount
    } else {
        ZERO_BASELINE_ANCHOR
    }
}

fn survives(
    results: &CalculationResults,
    longevity_age: u32,
) -> bool {
    results
        .portfolio_depleted_age
        .is_none_or(|age| age >= longevity_age)
}

/// Finds the highest monthly spending that lasts until the end-of-plan age.
///
/// Stops once the search interval is no wider than `tolerance` or after
/// `max_iterations` trials. Failing to converge is not an error: the best
/// estimate is returned with `success = false`.
///
/// # Errors
///
/// Any projection error, including one from the baseline run.
pub fn optimize_spending_to_exhaust(
    engine: &ProjectionEngine<'_>,
    scenario: &Scenario,
    tolerance: Decimal,
    max_iterations: u32,
) -> Result<SpendingOptimization, ProjectionError> {
    let longevity_age = scenario.basic.longevity_age;
    let anchor = spending_anchor(scenario);
    let baseline = engine.project(scenario)?;

    let (mut low, mut high) = if survives(&baseline, longevity_age) {
        (round_half_up(anchor * UPPER_BAND_LOW), round_half_up(anchor * UPPER_BAND_HIGH))
    } else {
        (Decimal::ZERO, anchor)
    };

    let mut best: Option<(Decimal, CalculationResults)> = None;
    let mut last_failure: Option<CalculationResults> = None;
    let mut iterations = 0;

    while iterations < max_iterations && high - low > tolerance {
        iterations += 1;
        let monthly = round_half_up((low + high) / dec!(2));
        let results = engine.project(&with_monthly_spending(scenario, monthly))?;
        debug!(
            scenario = %scenario.name,
            iteration = iterations,
            monthly = %monthly,
            depleted_age = ?results.portfolio_depleted_age,
            final_balance = %results.final_balance,
            "spending trial"
        );

        if survives(&results, longevity_age) {
            low = monthly;
            best = Some((monthly, results));
        } else {
            high = monthly;
            last_failure = Some(results);
        }
    }

    if last_failure.is_none() {
        warn!(
            scenario = %scenario.name,
            upper_bound = %high,
            "no trial depleted the portfolio; spending may exceed the search band"
        );
    }

    let (monthly_spending, results) = match best {
        Some(found) => found,
        // Every trial failed; fall back to the lower bound.
        None => {
            let results = engine.project(&with_monthly_spending(scenario, low))?;
            (low, results)
        }
    };

    let depletes_on_time = last_failure
        .as_ref()
        .and_then(|failure| failure.portfolio_depleted_age)
        .is_some_and(|age| age + 1 >= longevity_age);
    let balance_exhausted = results.final_balance <= BALANCE_TOLERANCE;
    let success = survives(&results, longevity_age) && (depletes_on_time || balance_exhausted);

    let message = if success {
        format!("converged on ${monthly_spending}/month after {iterations} iterations")
    } else if high - low > tolerance {
        format!(
            "did not converge within {max_iterations} iterations; best estimate ${monthly_spending}/month"
        )
    } else {
        format!("no spending level in the search band exhausts the portfolio at age {longevity_age}")
    };
    info!(
        scenario = %scenario.name,
        monthly_spending = %monthly_spending,
        iterations,
        success,
        "spending optimization finished"
    );

    Ok(SpendingOptimization {
        monthly_spending,
        iterations,
        final_balance: results.final_balance,
        depleted_age: results.portfolio_depleted_age,
        success,
        message,
    })
}
