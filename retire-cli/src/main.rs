use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::debug;

use retire_cli::app::{self, BenefitBasis};
use retire_cli::logging;
use retire_core::calculations::benefits::BenefitProgram;
use retire_core::{ProviderConfig, Province};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Retirement projection calculator.
///
/// Loads tax and benefit reference data, runs the requested command, and
/// prints the result as JSON.
#[derive(Debug, Parser)]
#[command(name = "retire", version)]
struct Cli {
    /// Reference-data backend to use.
    #[arg(long, global = true, default_value = "csv")]
    backend: String,

    /// Reference-data location. For `csv` this is the directory holding the
    /// tables. Defaults to `$RETIRE_DATA_DIR`, then `./data`.
    #[arg(long, global = true)]
    data: Option<String>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Project one scenario year by year.
    Project { scenario: PathBuf },

    /// Project several scenarios and summarize them side by side.
    Compare {
        #[arg(required = true, num_args = 1..)]
        scenarios: Vec<PathBuf>,
    },

    /// Find the monthly spending that runs the portfolio out at the end-of-plan age.
    Optimize {
        scenario: PathBuf,

        /// Stop once the search interval is this narrow, in dollars per month.
        #[arg(long, default_value = "10")]
        tolerance: Decimal,

        #[arg(long, default_value_t = 50)]
        max_iterations: u32,
    },

    /// Compare lifetime benefit totals for every valid start age.
    Benefits {
        #[arg(long, value_enum)]
        program: ProgramArg,

        /// Monthly amount at 65.
        #[arg(long, required_unless_present = "average_earnings")]
        monthly: Option<Decimal>,

        /// Estimate the CPP amount at 65 from average career earnings instead.
        #[arg(long, conflicts_with = "monthly")]
        average_earnings: Option<Decimal>,

        /// Reference year for the earnings estimate.
        #[arg(long, default_value_t = 2025)]
        year: i32,

        #[arg(long, default_value_t = 85)]
        death_age: u32,
    },

    /// Print the reference data for one year and province.
    Reference {
        #[arg(long, default_value_t = 2025)]
        year: i32,

        #[arg(long, value_parser = parse_province)]
        province: Province,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProgramArg {
    Cpp,
    Oas,
}

impl From<ProgramArg> for BenefitProgram {
    fn from(arg: ProgramArg) -> Self {
        match arg {
            ProgramArg::Cpp => BenefitProgram::Cpp,
            ProgramArg::Oas => BenefitProgram::Oas,
        }
    }
}

fn parse_province(s: &str) -> Result<Province, String> {
    Province::parse(s).ok_or_else(|| format!("unknown province code '{s}'"))
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_file.as_deref())?;

    let config = ProviderConfig {
        backend: cli.backend,
        location: app::resolve_data_location(cli.data, std::env::var(app::DATA_DIR_ENV).ok()),
    };
    debug!(command = ?cli.command, "starting");

    let registry = app::build_registry();
    let provider = app::open_provider(&registry, &config)?;
    let provider = provider.as_ref();

    let output = match cli.command {
        Command::Project { scenario } => app::to_json(
            &app::project(provider, &scenario)
                .with_context(|| format!("projecting {}", scenario.display()))?,
        )?,
        Command::Compare { scenarios } => app::to_json(&app::compare(provider, &scenarios)?)?,
        Command::Optimize {
            scenario,
            tolerance,
            max_iterations,
        } => app::to_json(
            &app::optimize(provider, &scenario, tolerance, max_iterations)
                .with_context(|| format!("optimizing {}", scenario.display()))?,
        )?,
        Command::Benefits {
            program,
            monthly,
            average_earnings,
            year,
            death_age,
        } => {
            let basis = match (monthly, average_earnings) {
                (Some(amount), _) => BenefitBasis::Monthly(amount),
                (None, Some(amount)) => BenefitBasis::AverageEarnings {
                    amount,
                    tax_year: year,
                },
                (None, None) => anyhow::bail!("either --monthly or --average-earnings is required"),
            };
            app::to_json(&app::compare_start_ages(
                provider,
                program.into(),
                basis,
                death_age,
            )?)?
        }
        Command::Reference { year, province } => {
            app::to_json(&app::reference(provider, year, province)?)?
        }
    };

    println!("{output}");
    Ok(())
}
