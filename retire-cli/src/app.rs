use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use retire_core::calculations::benefits::{
    BenefitProgram, StartAgeComparison, estimate_cpp_from_earnings, optimal_start_age,
};
use retire_core::calculations::tax::TaxYearData;
use retire_core::{
    CalculationResults, ProjectionEngine, ProviderConfig, ProviderRegistry, Province,
    SpendingOptimization, TaxDataProvider, optimize_spending_to_exhaust,
};
use retire_data::CsvProviderFactory;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::scenario_file;

/// Environment variable naming the reference-data directory.
pub const DATA_DIR_ENV: &str = "RETIRE_DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "data";

/// Ages listed in the `reference` report's minimum-withdrawal table.
const REPORT_MIN_AGE: u32 = 55;
const REPORT_MAX_AGE: u32 = 100;

/// Registry with every backend this binary knows about.
pub fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(CsvProviderFactory));
    registry
}

/// `--data` wins, then `RETIRE_DATA_DIR`, then `./data`.
pub fn resolve_data_location(
    flag: Option<String>,
    env: Option<String>,
) -> String {
    flag.or(env)
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
}

pub fn open_provider(
    registry: &ProviderRegistry,
    config: &ProviderConfig,
) -> Result<Box<dyn TaxDataProvider>> {
    debug!(backend = %config.backend, location = %config.location, "opening reference data");
    registry
        .create(config)
        .with_context(|| format!("cannot open '{}' reference data", config.backend))
}

pub fn project(
    provider: &dyn TaxDataProvider,
    path: &Path,
) -> Result<CalculationResults> {
    let scenario = scenario_file::load_from_file(path)?;
    Ok(ProjectionEngine::new(provider).project(&scenario)?)
}

/// One line of a comparison report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ComparisonRow {
    Completed {
        scenario: String,
        success: bool,
        final_balance: Decimal,
        portfolio_depleted_age: Option<u32>,
        first_year_retirement_income: Decimal,
        average_retirement_tax: Decimal,
        total_retirement_tax: Decimal,
    },
    Failed {
        scenario: String,
        error: String,
    },
}

impl From<&CalculationResults> for ComparisonRow {
    fn from(results: &CalculationResults) -> Self {
        ComparisonRow::Completed {
            scenario: results.scenario_name.clone(),
            success: results.success,
            final_balance: results.final_balance,
            portfolio_depleted_age: results.portfolio_depleted_age,
            first_year_retirement_income: results.first_year_retirement_income,
            average_retirement_tax: results.average_retirement_tax,
            total_retirement_tax: results.total_retirement_tax,
        }
    }
}

/// Projects every scenario file. A scenario that fails to project is
/// reported in its row; an unreadable file aborts the comparison.
pub fn compare(
    provider: &dyn TaxDataProvider,
    paths: &[PathBuf],
) -> Result<Vec<ComparisonRow>> {
    let scenarios = paths
        .iter()
        .map(|path| scenario_file::load_from_file(path))
        .collect::<Result<Vec<_>, _>>()?;

    let rows = ProjectionEngine::new(provider)
        .compare(&scenarios)
        .iter()
        .map(|result| match result {
            Ok(results) => ComparisonRow::from(results),
            Err(err) => ComparisonRow::Failed {
                scenario: err.scenario.clone(),
                error: err.to_string(),
            },
        })
        .collect();
    Ok(rows)
}

pub fn optimize(
    provider: &dyn TaxDataProvider,
    path: &Path,
    tolerance: Decimal,
    max_iterations: u32,
) -> Result<SpendingOptimization> {
    if tolerance <= Decimal::ZERO {
        bail!("tolerance must be positive, got {tolerance}");
    }
    let scenario = scenario_file::load_from_file(path)?;
    let engine = ProjectionEngine::new(provider);
    Ok(optimize_spending_to_exhaust(
        &engine,
        &scenario,
        tolerance,
        max_iterations,
    )?)
}

/// Monthly amount at 65 for the `benefits` command: given directly, or for
/// CPP estimated from average career earnings against `tax_year` figures.
pub enum BenefitBasis {
    Monthly(Decimal),
    AverageEarnings { amount: Decimal, tax_year: i32 },
}

pub fn compare_start_ages(
    provider: &dyn TaxDataProvider,
    program: BenefitProgram,
    basis: BenefitBasis,
    death_age: u32,
) -> Result<StartAgeComparison> {
    let monthly_at_65 = match basis {
        BenefitBasis::Monthly(amount) => amount,
        BenefitBasis::AverageEarnings { amount, tax_year } => {
            if program != BenefitProgram::Cpp {
                bail!("average earnings only apply to CPP");
            }
            let reference = provider.get_benefit_reference_amounts(tax_year)?;
            let estimate = estimate_cpp_from_earnings(amount, &reference);
            info!(average_earnings = %amount, monthly = %estimate, "estimated CPP at 65");
            estimate
        }
    };
    Ok(optimal_start_age(program, monthly_at_65, death_age)?)
}

/// Everything the engine would read for one year and province.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceReport {
    #[serde(flatten)]
    pub tax_data: TaxYearData,
    pub minimum_withdrawals: BTreeMap<u32, Decimal>,
}

pub fn reference(
    provider: &dyn TaxDataProvider,
    tax_year: i32,
    province: Province,
) -> Result<ReferenceReport> {
    let tax_data = TaxYearData::resolve(provider, tax_year, province)
        .with_context(|| format!("no reference data for {province} {tax_year}"))?;
    let minimum_withdrawals = (REPORT_MIN_AGE..=REPORT_MAX_AGE)
        .map(|age| -> Result<(u32, Decimal)> {
            Ok((age, provider.get_minimum_withdrawal_percentage(age)?))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;
    Ok(ReferenceReport {
        tax_data,
        minimum_withdrawals,
    })
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn bundled_provider() -> Box<dyn TaxDataProvider> {
        let location = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../retire-data/data")
            .display()
            .to_string();
        open_provider(
            &build_registry(),
            &ProviderConfig {
                backend: "csv".to_string(),
                location,
            },
        )
        .expect("bundled data loads")
    }

    // ============================================================
    // Configuration
    // ============================================================

    #[test]
    fn registry_offers_csv() {
        assert_eq!(build_registry().available_backends(), vec!["csv"]);
    }

    #[test]
    fn data_flag_beats_environment() {
        let location = resolve_data_location(Some("flag".into()), Some("env".into()));

        assert_eq!(location, "flag");
    }

    #[test]
    fn environment_beats_default() {
        assert_eq!(resolve_data_location(None, Some("env".into())), "env");
        assert_eq!(resolve_data_location(None, None), DEFAULT_DATA_DIR);
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let config = ProviderConfig {
            backend: "postgres".to_string(),
            location: "data".to_string(),
        };

        let err = open_provider(&build_registry(), &config).err().expect("unknown backend");

        assert!(format!("{err:#}").contains("postgres"));
    }

    // ============================================================
    // Commands
    // ============================================================

    #[test]
    fn benefits_from_monthly_amount() {
        let provider = bundled_provider();

        let comparison = compare_start_ages(
            provider.as_ref(),
            BenefitProgram::Oas,
            BenefitBasis::Monthly(dec!(727.67)),
            90,
        )
        .unwrap();

        assert_eq!(comparison.options.len(), 6);
        assert_eq!(comparison.options[0].start_age, 65);
    }

    #[test]
    fn benefits_from_average_earnings_caps_at_maximum() {
        let provider = bundled_provider();

        let comparison = compare_start_ages(
            provider.as_ref(),
            BenefitProgram::Cpp,
            BenefitBasis::AverageEarnings {
                amount: dec!(200000),
                tax_year: 2025,
            },
            85,
        )
        .unwrap();

        let at_65 = comparison
            .options
            .iter()
            .find(|option| option.start_age == 65)
            .unwrap();
        assert_eq!(at_65.monthly_amount, dec!(1433.00));
    }

    #[test]
    fn average_earnings_rejected_for_oas() {
        let provider = bundled_provider();

        let result = compare_start_ages(
            provider.as_ref(),
            BenefitProgram::Oas,
            BenefitBasis::AverageEarnings {
                amount: dec!(50000),
                tax_year: 2025,
            },
            85,
        );

        assert!(result.is_err());
    }

    #[test]
    fn reference_report_lists_minimum_withdrawals() {
        let provider = bundled_provider();

        let report = reference(provider.as_ref(), 2025, Province::Ontario).unwrap();

        assert_eq!(report.tax_data.province, Province::Ontario);
        assert_eq!(report.minimum_withdrawals.len(), 46);
        assert_eq!(report.minimum_withdrawals[&71], dec!(0.0528));
        assert_eq!(report.minimum_withdrawals[&100], dec!(0.2000));
    }

    #[test]
    fn reference_for_missing_year_names_it() {
        let provider = bundled_provider();

        let err = reference(provider.as_ref(), 1990, Province::Ontario).unwrap_err();

        assert!(err.to_string().contains("ON 1990"), "got: {err}");
    }

    #[test]
    fn optimize_rejects_non_positive_tolerance() {
        let provider = bundled_provider();

        let err = optimize(provider.as_ref(), Path::new("unused.toml"), dec!(0), 50).unwrap_err();

        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn comparison_row_from_results() {
        let results = CalculationResults::from_years(
            "empty",
            retire_core::AccountBalances::new(dec!(1), dec!(2), dec!(3)),
            Vec::new(),
        );

        let row = ComparisonRow::from(&results);

        let ComparisonRow::Completed {
            scenario,
            final_balance,
            success,
            ..
        } = row
        else {
            panic!("expected a completed row");
        };
        assert_eq!(scenario, "empty");
        assert_eq!(final_balance, dec!(6));
        assert!(success);
    }
}
