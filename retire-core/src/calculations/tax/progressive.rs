//! Strict bracket-by-bracket progressive tax.
//!
//! Income is split across the brackets of an ascending table: each bracket
//! taxes only the slice of income between the previous bracket's limit and its
//! own, at its own rate. The marginal rate reported is the rate of the highest
//! bracket that received any income.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use retire_core::calculations::tax::ProgressiveTaxCalculator;
//! use retire_core::{Jurisdiction, TaxBracket};
//!
//! let brackets = vec![
//!     TaxBracket {
//!         tax_year: 2025,
//!         jurisdiction: Jurisdiction::Federal,
//!         max_income: Some(dec!(50000)),
//!         tax_rate: dec!(0.15),
//!     },
//!     TaxBracket {
//!         tax_year: 2025,
//!         jurisdiction: Jurisdiction::Federal,
//!         max_income: None,
//!         tax_rate: dec!(0.25),
//!     },
//! ];
//!
//! let result = ProgressiveTaxCalculator::new(&brackets)
//!     .calculate(dec!(60000))
//!     .unwrap();
//!
//! // 50,000 × 15% + 10,000 × 25%
//! assert_eq!(result.total_tax, dec!(10000.00));
//! assert_eq!(result.marginal_rate, dec!(0.25));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TaxBracket;
use crate::calculations::common::round_half_up;

/// Errors raised for malformed bracket tables.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaxCalculationError {
    #[error("no tax brackets provided")]
    NoTaxBrackets,

    #[error("bracket limits must be strictly ascending: {limit} follows {previous}")]
    UnsortedBrackets { previous: Decimal, limit: Decimal },

    #[error("only the last bracket may be unlimited, found one at position {0}")]
    UnboundedBracketNotLast(usize),

    #[error("tax rate must be between 0 and 1, got {0}")]
    InvalidRate(Decimal),

    #[error("no tax bracket covers taxable income {0}")]
    NoMatchingBracket(Decimal),
}

/// Tax owed on the slice of income falling in one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTax {
    pub lower_limit: Decimal,
    pub upper_limit: Option<Decimal>,
    pub rate: Decimal,
    pub income_in_bracket: Decimal,
    pub tax: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressiveTaxResult {
    pub taxable_income: Decimal,
    /// Sum of `brackets[..].tax`.
    pub total_tax: Decimal,
    pub marginal_rate: Decimal,
    /// One entry per bracket that received income, lowest first.
    pub brackets: Vec<BracketTax>,
}

impl ProgressiveTaxResult {
    fn zero(taxable_income: Decimal) -> Self {
        Self {
            taxable_income,
            total_tax: Decimal::ZERO,
            marginal_rate: Decimal::ZERO,
            brackets: Vec::new(),
        }
    }
}

/// Calculator over one jurisdiction's bracket table.
#[derive(Debug, Clone)]
pub struct ProgressiveTaxCalculator<'a> {
    brackets: &'a [TaxBracket],
}

impl<'a> ProgressiveTaxCalculator<'a> {
    /// Brackets must be sorted by ascending `max_income`, with only the last
    /// one allowed to be unlimited. [`validate`](Self::validate) checks this.
    pub fn new(brackets: &'a [TaxBracket]) -> Self {
        Self { brackets }
    }

    /// Checks ordering, rates, and the position of the unlimited bracket.
    pub fn validate(&self) -> Result<(), TaxCalculationError> {
        if self.brackets.is_empty() {
            return Err(TaxCalculationError::NoTaxBrackets);
        }

        let mut previous = Decimal::ZERO;
        let last = self.brackets.len() - 1;
        for (index, bracket) in self.brackets.iter().enumerate() {
            if bracket.tax_rate < Decimal::ZERO || bracket.tax_rate > Decimal::ONE {
                return Err(TaxCalculationError::InvalidRate(bracket.tax_rate));
            }
            match bracket.max_income {
                Some(limit) if limit <= previous => {
                    return Err(TaxCalculationError::UnsortedBrackets { previous, limit });
                }
                Some(limit) => previous = limit,
                None if index != last => {
                    return Err(TaxCalculationError::UnboundedBracketNotLast(index));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Rate of the first bracket; non-refundable credits are valued at it.
    pub fn lowest_rate(&self) -> Result<Decimal, TaxCalculationError> {
        self.brackets
            .first()
            .map(|bracket| bracket.tax_rate)
            .ok_or(TaxCalculationError::NoTaxBrackets)
    }

    /// Computes tax on `taxable_income`.
    ///
    /// Income at or below zero yields zero tax and a zero marginal rate.
    ///
    /// # Errors
    ///
    /// Returns [`TaxCalculationError`] if the table is invalid, or if the
    /// income exceeds a table whose top bracket is bounded.
    pub fn calculate(
        &self,
        taxable_income: Decimal,
    ) -> Result<ProgressiveTaxResult, TaxCalculationError> {
        self.validate()?;

        if taxable_income <= Decimal::ZERO {
            return Ok(ProgressiveTaxResult::zero(taxable_income));
        }

        let mut remaining = taxable_income;
        let mut lower_limit = Decimal::ZERO;
        let mut breakdown = Vec::new();
        let mut marginal_rate = Decimal::ZERO;

        for bracket in self.brackets {
            if remaining <= Decimal::ZERO {
                break;
            }

            let income_in_bracket = match bracket.max_income {
                Some(limit) => remaining.min(limit - lower_limit),
                None => remaining,
            };
            let tax = round_half_up(income_in_bracket * bracket.tax_rate);

            breakdown.push(BracketTax {
                lower_limit,
                upper_limit: bracket.max_income,
                rate: bracket.tax_rate,
                income_in_bracket,
                tax,
            });
            marginal_rate = bracket.tax_rate;
            remaining -= income_in_bracket;
            if let Some(limit) = bracket.max_income {
                lower_limit = limit;
            }
        }

        if remaining > Decimal::ZERO {
            return Err(TaxCalculationError::NoMatchingBracket(taxable_income));
        }

        let total_tax: Decimal = breakdown.iter().map(|b| b.tax).sum();

        Ok(ProgressiveTaxResult {
            taxable_income,
            total_tax,
            marginal_rate,
            brackets: breakdown,
        })
    }
}
