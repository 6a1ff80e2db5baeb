//! Integration tests against the shipped `data/` reference tables.

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use retire_core::calculations::tax::{IncomeComponents, TaxCalculator, TaxYearData};
use retire_core::{
    AccountDefinition, Assets, Assumptions, BasicInfo, BenefitElection, Expenses, IncomeSources, Jurisdiction,
    ProjectionEngine, ProviderConfig, ProviderRegistry, Province, Scenario,
    TaxableAccountDefinition, TaxDataProvider,
};
use retire_data::{CsvProviderFactory, InMemoryReferenceData, ReferenceDataLoader};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn load_bundled() -> InMemoryReferenceData {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    ReferenceDataLoader::load_dir(&dir).expect("bundled reference data should load")
}

fn account(balance: Decimal) -> AccountDefinition {
    AccountDefinition {
        balance,
        ..AccountDefinition::default()
    }
}

fn retiree(province: Province) -> Scenario {
    Scenario {
        name: format!("retiree-{province}"),
        basic: BasicInfo {
            current_age: 65,
            retirement_age: 65,
            longevity_age: 95,
            province,
            tax_year: 2025,
        },
        assets: Assets {
            tax_deferred: account(dec!(500000)),
            tax_free: account(dec!(100000)),
            taxable: TaxableAccountDefinition {
                account: account(dec!(150000)),
                cost_basis: Some(dec!(100000)),
            },
        },
        income: IncomeSources {
            cpp: Some(BenefitElection {
                start_age: 65,
                monthly_amount_at_65: dec!(1000),
            }),
            oas: Some(BenefitElection {
                start_age: 65,
                monthly_amount_at_65: dec!(727.67),
            }),
            ..IncomeSources::default()
        },
        expenses: Expenses {
            monthly_amount: dec!(4000),
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

// ============================================================
// Loading
// ============================================================

#[test]
fn bundled_data_lists_2025() {
    let data = load_bundled();

    assert_eq!(data.list_tax_years().unwrap(), vec![2025]);
}

#[test]
fn federal_table_has_five_brackets_ending_unlimited() {
    let data = load_bundled();

    let brackets = data.get_bracket_table(Jurisdiction::Federal, 2025).unwrap();

    assert_eq!(brackets.len(), 5);
    assert_eq!(brackets[0].tax_rate, dec!(0.15));
    assert_eq!(brackets[4].max_income, None);
}

#[test]
fn every_province_with_brackets_has_credits() {
    let data = load_bundled();

    for province in [Province::Ontario, Province::BritishColumbia, Province::Alberta] {
        let resolved = TaxYearData::resolve(&data, 2025, province);
        assert!(resolved.is_ok(), "{province}: {:#?}", resolved.err());
    }
}

#[test]
fn minimum_withdrawal_table_matches_known_ages() {
    let data = load_bundled();

    assert_eq!(data.get_minimum_withdrawal_percentage(54).unwrap(), Decimal::ZERO);
    assert_eq!(data.get_minimum_withdrawal_percentage(65).unwrap(), dec!(0.0400));
    assert_eq!(data.get_minimum_withdrawal_percentage(71).unwrap(), dec!(0.0528));
    assert_eq!(data.get_minimum_withdrawal_percentage(100).unwrap(), dec!(0.2000));
}

#[test]
fn unsupported_province_is_not_found() {
    let data = load_bundled();

    let err = TaxYearData::resolve(&data, 2025, Province::Quebec).unwrap_err();

    assert!(err.to_string().contains("QC"), "got: {err}");
}

// ============================================================
// Registry and engine
// ============================================================

#[test]
fn registry_creates_csv_provider() {
    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(CsvProviderFactory));

    let provider = registry
        .create(&ProviderConfig::default())
        .expect("csv backend with bundled data");

    assert!(provider.list_tax_years().unwrap().contains(&2025));
}

#[test]
fn ontario_marginal_rate_at_60k() {
    let data = load_bundled();
    let year = TaxYearData::resolve(&data, 2025, Province::Ontario).unwrap();
    let calculator = TaxCalculator::new(&year).unwrap();
    let income = IncomeComponents {
        employment: dec!(60000),
        ..IncomeComponents::default()
    };

    let tax = calculator.calculate(&income, 45).unwrap();

    assert_eq!(tax.marginal_rate, dec!(0.2965));
    assert!(tax.total > Decimal::ZERO);
    assert_eq!(tax.total, tax.federal.net_tax + tax.provincial.net_tax);
}

#[test]
fn income_below_basic_amounts_is_untaxed() {
    let data = load_bundled();
    let year = TaxYearData::resolve(&data, 2025, Province::Ontario).unwrap();
    let calculator = TaxCalculator::new(&year).unwrap();
    let income = IncomeComponents {
        other: dec!(10000),
        ..IncomeComponents::default()
    };

    let tax = calculator.calculate(&income, 70).unwrap();

    assert_eq!(tax.total, Decimal::ZERO);
}

#[test]
fn projection_runs_for_each_bundled_province() {
    let data = load_bundled();
    let engine = ProjectionEngine::new(&data);
    let scenarios: Vec<Scenario> = [Province::Ontario, Province::BritishColumbia, Province::Alberta]
        .into_iter()
        .map(retiree)
        .collect();

    let results = engine.compare(&scenarios);

    assert_eq!(results.len(), 3);
    for (scenario, result) in scenarios.iter().zip(results) {
        let result = result.expect("projection succeeds");
        assert_eq!(result.scenario_name, scenario.name);
        assert!(result.success, "{} depleted at {:?}", result.scenario_name, result.portfolio_depleted_age);
        assert_eq!(result.years.len(), 31);
        assert!(result.total_retirement_tax > Decimal::ZERO);
    }
}

#[test]
fn projection_fails_for_missing_year() {
    let data = load_bundled();
    let engine = ProjectionEngine::new(&data);
    let mut scenario = retiree(Province::Ontario);
    scenario.basic.tax_year = 2030;

    let err = engine.project(&scenario).unwrap_err();

    assert_eq!(err.scenario, "retiree-ON");
}
