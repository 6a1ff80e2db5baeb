use std::path::PathBuf;

use retire_core::{ProviderConfig, ProviderError, ProviderFactory, TaxDataProvider};
use tracing::info;

use crate::loader::{ReferenceDataLoader, ReferenceLoadError};

/// Resolve the reference-data directory so the shipped tables are found both
/// from a packaged install and from the build tree.
///
/// Resolution order:
/// 1. `location` itself, if it names an existing directory.
/// 2. `$CARGO_MANIFEST_DIR/<location>` when `location` is relative (dev and
///    tests run from another working directory).
fn data_dir(location: &str) -> PathBuf {
    let direct = PathBuf::from(location);
    if direct.is_dir() || direct.is_absolute() {
        return direct;
    }
    let bundled = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(location);
    if bundled.is_dir() { bundled } else { direct }
}

/// [`ProviderFactory`] for CSV reference tables.
///
/// Register this with a [`retire_core::ProviderRegistry`] to make the
/// `"csv"` backend available:
///
/// ```rust,no_run
/// use retire_core::ProviderRegistry;
/// use retire_data::CsvProviderFactory;
///
/// let mut registry = ProviderRegistry::new();
/// registry.register(Box::new(CsvProviderFactory));
/// ```
pub struct CsvProviderFactory;

impl ProviderFactory for CsvProviderFactory {
    fn backend_name(&self) -> &'static str {
        "csv"
    }

    /// Load every table under `config.location` and validate it up front.
    fn create(
        &self,
        config: &ProviderConfig,
    ) -> Result<Box<dyn TaxDataProvider>, ProviderError> {
        let dir = data_dir(&config.location);
        let data = ReferenceDataLoader::load_dir(&dir).map_err(|err| match err {
            ReferenceLoadError::Io { .. } => ProviderError::Configuration(err.to_string()),
            other => ProviderError::Data(other.to_string()),
        })?;
        info!(dir = %dir.display(), "loaded reference data");
        Ok(Box::new(data))
    }
}
