//! CPP and OAS start-age adjustments.
//!
//! Both benefits are quoted at the reference age of 65 and adjusted linearly
//! per month of early or delayed start:
//!
//! | Program | Valid start ages | Before 65       | After 65        |
//! |---------|------------------|-----------------|-----------------|
//! | CPP     | 60–70            | −0.6% per month | +0.7% per month |
//! | OAS     | 65–70            | not available   | +0.6% per month |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use retire_core::calculations::benefits::calculate_cpp;
//!
//! let benefit = calculate_cpp(70, dec!(1000)).unwrap();
//!
//! assert_eq!(benefit.adjustment_factor, dec!(1.42));
//! assert_eq!(benefit.annual_amount, dec!(17040.00));
//! ```

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::{non_negative, round_half_up};
use crate::models::BenefitReferenceAmounts;

pub const REFERENCE_AGE: u32 = 65;

pub const CPP_MIN_START_AGE: u32 = 60;
pub const CPP_MAX_START_AGE: u32 = 70;
pub const CPP_EARLY_REDUCTION_PER_MONTH: Decimal = dec!(0.006);
pub const CPP_LATE_INCREASE_PER_MONTH: Decimal = dec!(0.007);

pub const OAS_MIN_START_AGE: u32 = 65;
pub const OAS_MAX_START_AGE: u32 = 70;
pub const OAS_DEFERRAL_INCREASE_PER_MONTH: Decimal = dec!(0.006);

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BenefitError {
    #[error("CPP start age must be between 60 and 70, got {0}")]
    CppStartAgeOutOfRange(u32),

    #[error("OAS start age must be between 65 and 70, got {0}")]
    OasStartAgeOutOfRange(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenefitProgram {
    Cpp,
    Oas,
}

impl BenefitProgram {
    pub fn start_ages(&self) -> std::ops::RangeInclusive<u32> {
        match self {
            Self::Cpp => CPP_MIN_START_AGE..=CPP_MAX_START_AGE,
            Self::Oas => OAS_MIN_START_AGE..=OAS_MAX_START_AGE,
        }
    }

    pub fn calculate(
        &self,
        start_age: u32,
        monthly_at_65: Decimal,
    ) -> Result<AdjustedBenefit, BenefitError> {
        match self {
            Self::Cpp => calculate_cpp(start_age, monthly_at_65),
            Self::Oas => calculate_oas(start_age, monthly_at_65),
        }
    }
}

impl fmt::Display for BenefitProgram {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Cpp => f.write_str("CPP"),
            Self::Oas => f.write_str("OAS"),
        }
    }
}

/// A benefit after its start-age adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedBenefit {
    pub start_age: u32,
    pub adjustment_factor: Decimal,
    pub monthly_amount: Decimal,
    pub annual_amount: Decimal,
}

impl AdjustedBenefit {
    fn new(
        start_age: u32,
        adjustment_factor: Decimal,
        monthly_at_65: Decimal,
    ) -> Self {
        let monthly_amount = round_half_up(non_negative(monthly_at_65) * adjustment_factor);
        Self {
            start_age,
            adjustment_factor,
            monthly_amount,
            annual_amount: monthly_amount * Decimal::from(12),
        }
    }
}

/// Signed months between 65 and `start_age`.
fn months_from_reference(start_age: u32) -> Decimal {
    Decimal::from((i64::from(start_age) - i64::from(REFERENCE_AGE)) * 12)
}

pub fn cpp_adjustment_factor(start_age: u32) -> Result<Decimal, BenefitError> {
    if !(CPP_MIN_START_AGE..=CPP_MAX_START_AGE).contains(&start_age) {
        return Err(BenefitError::CppStartAgeOutOfRange(start_age));
    }
    let months = months_from_reference(start_age);
    let per_month = if start_age < REFERENCE_AGE {
        CPP_EARLY_REDUCTION_PER_MONTH
    } else {
        CPP_LATE_INCREASE_PER_MONTH
    };
    Ok(Decimal::ONE + months * per_month)
}

pub fn oas_adjustment_factor(start_age: u32) -> Result<Decimal, BenefitError> {
    if !(OAS_MIN_START_AGE..=OAS_MAX_START_AGE).contains(&start_age) {
        return Err(BenefitError::OasStartAgeOutOfRange(start_age));
    }
    Ok(Decimal::ONE + months_from_reference(start_age) * OAS_DEFERRAL_INCREASE_PER_MONTH)
}

pub fn calculate_cpp(
    start_age: u32,
    monthly_at_65: Decimal,
) -> Result<AdjustedBenefit, BenefitError> {
    let factor = cpp_adjustment_factor(start_age)?;
    Ok(AdjustedBenefit::new(start_age, factor, monthly_at_65))
}

pub fn calculate_oas(
    start_age: u32,
    monthly_at_65: Decimal,
) -> Result<AdjustedBenefit, BenefitError> {
    let factor = oas_adjustment_factor(start_age)?;
    Ok(AdjustedBenefit::new(start_age, factor, monthly_at_65))
}

/// Rough CPP entitlement at 65 from average career earnings.
///
/// Scales the maximum pension by `earnings / ceiling`, capped at the maximum.
/// This is an approximation: contribution years, dropout provisions and the
/// enhancement are not modelled.
pub fn estimate_cpp_from_earnings(
    average_earnings: Decimal,
    reference: &BenefitReferenceAmounts,
) -> Decimal {
    if reference.ceiling_earnings <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = (non_negative(average_earnings) / reference.ceiling_earnings).min(Decimal::ONE);
    round_half_up(reference.cpp_max_monthly * ratio)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAgeOption {
    pub start_age: u32,
    pub monthly_amount: Decimal,
    pub lifetime_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartAgeComparison {
    pub program: BenefitProgram,
    pub assumed_death_age: u32,
    pub options: Vec<StartAgeOption>,
    pub best_start_age: u32,
}

/// Undiscounted, pre-tax lifetime total for every valid start age.
///
/// `lifetime_total = monthly × 12 × max(0, death_age − start_age)`. The best
/// age is the one with the largest total; ties go to the earliest age.
pub fn optimal_start_age(
    program: BenefitProgram,
    monthly_at_65: Decimal,
    assumed_death_age: u32,
) -> Result<StartAgeComparison, BenefitError> {
    let mut options = Vec::new();
    for start_age in program.start_ages() {
        let benefit = program.calculate(start_age, monthly_at_65)?;
        let years_paid = assumed_death_age.saturating_sub(start_age);
        options.push(StartAgeOption {
            start_age,
            monthly_amount: benefit.monthly_amount,
            lifetime_total: benefit.annual_amount * Decimal::from(years_paid),
        });
    }

    // max_by_key keeps the last maximum, so walk in reverse to prefer the earliest age.
    let best_start_age = options
        .iter()
        .rev()
        .max_by_key(|option| option.lifetime_total)
        .map_or(*program.start_ages().start(), |option| option.start_age);

    Ok(StartAgeComparison {
        program,
        assumed_death_age,
        options,
        best_start_age,
    })
}
