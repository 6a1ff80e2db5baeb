//! TOML loader for retirement scenarios.
//!
//! ## Layout
//!
//! Sections map one-to-one onto [`Scenario`]. Money amounts and rates are
//! best written as strings so they parse as exact decimals; TOML integers are
//! accepted too. Optional sections may be omitted entirely.
//!
//! | Section                 | Required | Notes                                         |
//! |-------------------------|----------|-----------------------------------------------|
//! | `name`                  | yes      | Top-level key, used in results and errors     |
//! | `[basic]`               | yes      | Ages, `province` code (e.g. `"ON"`), `tax_year` |
//! | `[assets.<account>]`    | no       | `tax_deferred`, `tax_free`, `taxable`; zero when absent |
//! | `[income.employment]`   | no       | `annual_amount`, `until_age`                  |
//! | `[income.cpp]` / `[income.oas]` | no | `start_age`, `monthly_amount_at_65`       |
//! | `[[income.other]]`      | no       | Repeatable; `end_age` is optional             |
//! | `[expenses]`            | yes      | `monthly_amount`; indexed unless `inflation_indexed = false` |
//! | `[[expenses.changes]]`  | no       | Repeatable; replaces the monthly amount from `age` |
//! | `[assumptions]`         | yes      | Pre/post-retirement returns and inflation     |
//!
//! ### Minimal example
//!
//! ```toml
//! name = "minimal"
//!
//! [basic]
//! current_age = 60
//! retirement_age = 65
//! longevity_age = 90
//! province = "ON"
//! tax_year = 2025
//!
//! [assets.tax_deferred]
//! balance = "250000"
//!
//! [expenses]
//! monthly_amount = "3500"
//!
//! [assumptions]
//! pre_retirement_return = "0.05"
//! post_retirement_return = "0.04"
//! inflation_rate = "0.02"
//! ```

use std::path::{Path, PathBuf};

use retire_core::Scenario;

/// Errors that can occur while reading a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioFileError {
    #[error("cannot read scenario file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML or a field that does not fit the scenario layout.
    #[error("invalid scenario: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Parse TOML text into a [`Scenario`].
///
/// No range checks happen here; the projection engine validates the
/// scenario before running it.
pub fn load_from_str(input: &str) -> Result<Scenario, ScenarioFileError> {
    Ok(toml::from_str(input)?)
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Scenario, ScenarioFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ScenarioFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents)
}
