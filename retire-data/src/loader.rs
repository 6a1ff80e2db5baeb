use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use retire_core::calculations::tax::ProgressiveTaxCalculator;
use retire_core::{
    AgeCredit, BenefitReferenceAmounts, Jurisdiction, TaxBracket, TaxCreditAmounts,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::provider::InMemoryReferenceData;

pub const TAX_BRACKETS_FILE: &str = "tax_brackets.csv";
pub const TAX_CREDITS_FILE: &str = "tax_credits.csv";
pub const BENEFIT_AMOUNTS_FILE: &str = "benefit_amounts.csv";
pub const MINIMUM_WITHDRAWALS_FILE: &str = "minimum_withdrawals.csv";

/// Errors that can occur when loading reference data.
#[derive(Debug, Error)]
pub enum ReferenceLoadError {
    #[error("Failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown jurisdiction '{0}'")]
    UnknownJurisdiction(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid bracket table for {jurisdiction} {tax_year}: {reason}")]
    InvalidTable {
        jurisdiction: Jurisdiction,
        tax_year: i32,
        reason: String,
    },
}

impl From<csv::Error> for ReferenceLoadError {
    fn from(err: csv::Error) -> Self {
        ReferenceLoadError::CsvParse(err.to_string())
    }
}

/// A single row of `tax_brackets.csv`.
///
/// - `jurisdiction`: `FED` or a two-letter province code
/// - `max_income`: upper limit of the bracket (empty for unlimited)
/// - `rate`: marginal rate as a decimal (e.g., 0.15 for 15%)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxBracketRecord {
    pub tax_year: i32,
    pub jurisdiction: String,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub max_income: Option<Decimal>,
    pub rate: Decimal,
}

/// A single row of `tax_credits.csv`: basic and age amounts for one
/// jurisdiction and year.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaxCreditRecord {
    pub tax_year: i32,
    pub jurisdiction: String,
    pub basic_amount: Decimal,
    pub age_amount: Decimal,
    pub age_threshold: Decimal,
    pub age_reduction_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenefitAmountRecord {
    pub tax_year: i32,
    pub ceiling_earnings: Decimal,
    pub cpp_max_monthly: Decimal,
    pub oas_max_monthly: Decimal,
    pub oas_recovery_threshold: Decimal,
    pub oas_recovery_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MinimumWithdrawalRecord {
    pub age: u32,
    pub percentage: Decimal,
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn parse_jurisdiction(code: &str) -> Result<Jurisdiction, ReferenceLoadError> {
    Jurisdiction::parse(code).ok_or_else(|| ReferenceLoadError::UnknownJurisdiction(code.to_string()))
}

fn parse_records<R: Read, T: serde::de::DeserializeOwned>(
    reader: R
) -> Result<Vec<T>, ReferenceLoadError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in csv_reader.deserialize() {
        let record: T = result?;
        records.push(record);
    }

    Ok(records)
}

/// Loader for the reference-data CSV files.
///
/// Each `parse_*` method accepts any `Read` (a file or a string slice), so
/// the tables can be tested without touching the filesystem.
pub struct ReferenceDataLoader;

impl ReferenceDataLoader {
    pub fn parse_brackets<R: Read>(reader: R) -> Result<Vec<TaxBracketRecord>, ReferenceLoadError> {
        parse_records(reader)
    }

    pub fn parse_credits<R: Read>(reader: R) -> Result<Vec<TaxCreditRecord>, ReferenceLoadError> {
        parse_records(reader)
    }

    pub fn parse_benefits<R: Read>(
        reader: R
    ) -> Result<Vec<BenefitAmountRecord>, ReferenceLoadError> {
        parse_records(reader)
    }

    pub fn parse_minimum_withdrawals<R: Read>(
        reader: R
    ) -> Result<Vec<MinimumWithdrawalRecord>, ReferenceLoadError> {
        parse_records(reader)
    }

    /// Groups bracket rows by (jurisdiction, year), keeping file order within
    /// a group, and checks each table.
    ///
    /// A table must have ascending limits and end in exactly one unlimited
    /// bracket.
    pub fn group_brackets(
        records: &[TaxBracketRecord]
    ) -> Result<HashMap<(Jurisdiction, i32), Vec<TaxBracket>>, ReferenceLoadError> {
        let mut groups: HashMap<(Jurisdiction, i32), Vec<TaxBracket>> = HashMap::new();

        for record in records {
            let jurisdiction = parse_jurisdiction(&record.jurisdiction)?;
            groups
                .entry((jurisdiction, record.tax_year))
                .or_default()
                .push(TaxBracket {
                    tax_year: record.tax_year,
                    jurisdiction,
                    max_income: record.max_income,
                    tax_rate: record.rate,
                });
        }

        for ((jurisdiction, tax_year), brackets) in &groups {
            let invalid = |reason: String| ReferenceLoadError::InvalidTable {
                jurisdiction: *jurisdiction,
                tax_year: *tax_year,
                reason,
            };
            ProgressiveTaxCalculator::new(brackets)
                .validate()
                .map_err(|e| invalid(e.to_string()))?;
            if brackets.last().is_some_and(|b| b.max_income.is_some()) {
                return Err(invalid("top bracket must be unlimited".to_string()));
            }
        }

        Ok(groups)
    }

    pub fn index_credits(
        records: &[TaxCreditRecord]
    ) -> Result<HashMap<(Jurisdiction, i32), TaxCreditAmounts>, ReferenceLoadError> {
        let mut credits = HashMap::new();

        for record in records {
            let jurisdiction = parse_jurisdiction(&record.jurisdiction)?;
            let amounts = TaxCreditAmounts {
                tax_year: record.tax_year,
                jurisdiction,
                basic_amount: record.basic_amount,
                age_credit: AgeCredit {
                    max_credit: record.age_amount,
                    income_threshold: record.age_threshold,
                    reduction_rate: record.age_reduction_rate,
                },
            };
            if credits.insert((jurisdiction, record.tax_year), amounts).is_some() {
                return Err(ReferenceLoadError::Duplicate(format!(
                    "credits for {jurisdiction} {}",
                    record.tax_year
                )));
            }
        }

        Ok(credits)
    }

    pub fn index_benefits(
        records: &[BenefitAmountRecord]
    ) -> Result<HashMap<i32, BenefitReferenceAmounts>, ReferenceLoadError> {
        let mut benefits = HashMap::new();

        for record in records {
            let amounts = BenefitReferenceAmounts {
                tax_year: record.tax_year,
                ceiling_earnings: record.ceiling_earnings,
                cpp_max_monthly: record.cpp_max_monthly,
                oas_max_monthly: record.oas_max_monthly,
                oas_recovery_threshold: record.oas_recovery_threshold,
                oas_recovery_rate: record.oas_recovery_rate,
            };
            if benefits.insert(record.tax_year, amounts).is_some() {
                return Err(ReferenceLoadError::Duplicate(format!(
                    "benefit amounts for {}",
                    record.tax_year
                )));
            }
        }

        Ok(benefits)
    }

    /// Builds an in-memory provider from the four tables.
    pub fn build(
        brackets: &[TaxBracketRecord],
        credits: &[TaxCreditRecord],
        benefits: &[BenefitAmountRecord],
        minimum_withdrawals: &[MinimumWithdrawalRecord],
    ) -> Result<InMemoryReferenceData, ReferenceLoadError> {
        let mut minimums = std::collections::BTreeMap::new();
        for record in minimum_withdrawals {
            if minimums.insert(record.age, record.percentage).is_some() {
                return Err(ReferenceLoadError::Duplicate(format!(
                    "minimum withdrawal for age {}",
                    record.age
                )));
            }
        }

        Ok(InMemoryReferenceData::new(
            Self::group_brackets(brackets)?,
            Self::index_credits(credits)?,
            Self::index_benefits(benefits)?,
            minimums,
        ))
    }

    /// Reads the four CSV files from `dir`.
    pub fn load_dir(dir: &Path) -> Result<InMemoryReferenceData, ReferenceLoadError> {
        let brackets = Self::parse_brackets(open(&dir.join(TAX_BRACKETS_FILE))?)?;
        let credits = Self::parse_credits(open(&dir.join(TAX_CREDITS_FILE))?)?;
        let benefits = Self::parse_benefits(open(&dir.join(BENEFIT_AMOUNTS_FILE))?)?;
        let minimums =
            Self::parse_minimum_withdrawals(open(&dir.join(MINIMUM_WITHDRAWALS_FILE))?)?;
        debug!(
            dir = %dir.display(),
            brackets = brackets.len(),
            credits = credits.len(),
            benefits = benefits.len(),
            minimum_withdrawals = minimums.len(),
            "parsed reference data"
        );

        Self::build(&brackets, &credits, &benefits, &minimums)
    }
}

fn open(path: &Path) -> Result<File, ReferenceLoadError> {
    File::open(path).map_err(|source| ReferenceLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
