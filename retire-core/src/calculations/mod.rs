//! Projection calculations.
//!
//! Bottom-up: [`common`] helpers, [`tax`] and [`benefits`] for one year's
//! figures, [`accounts`] for one year's balances, [`simulation`] for the
//! year-by-year loop, and [`optimizer`] on top of the loop.

pub mod accounts;
pub mod benefits;
pub mod common;
pub mod optimizer;
pub mod simulation;
pub mod tax;

#[cfg(test)]
pub(crate) mod fixtures;

pub use benefits::{
    AdjustedBenefit, BenefitError, BenefitProgram, StartAgeComparison, StartAgeOption, calculate_cpp,
    calculate_oas, estimate_cpp_from_earnings, optimal_start_age,
};
pub use tax::{TaxBreakdown, TaxCalculationError, TaxCalculator, TaxYearData};
