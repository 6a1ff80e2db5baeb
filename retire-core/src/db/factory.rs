use std::collections::HashMap;

use super::provider::{ProviderError, TaxDataProvider};

/// Backend-agnostic reference-data configuration.
///
/// `backend` must match the [`ProviderFactory::backend_name`] of a
/// registered factory.  `location` is passed through to that factory
/// unchanged; its meaning is entirely backend-specific.
///
/// | backend | location examples        |
/// |---------|--------------------------|
/// | `csv`   | `data`, `/opt/retire/data` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Lowercase identifier matching a registered factory (e.g. `"csv"`).
    pub backend: String,
    /// Opaque value forwarded to the factory's `create` method.
    pub location: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: "csv".to_string(),
            location: "data".to_string(),
        }
    }
}

/// One implementation per reference-data backend.  Each backend crate
/// exports a unit struct that implements this trait and is registered with a
/// [`ProviderRegistry`] at startup.
pub trait ProviderFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Open the source and return a ready-to-use provider. Implementations
    /// may load and validate everything up front.
    fn create(
        &self,
        config: &ProviderConfig,
    ) -> Result<Box<dyn TaxDataProvider>, ProviderError>;
}

/// Registry of [`ProviderFactory`] instances, keyed by backend name.
pub struct ProviderRegistry {
    factories: HashMap<&'static str, Box<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory, replacing any factory with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn ProviderFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory that matches `config.backend`.
    ///
    /// # Errors
    /// * [`ProviderError::Configuration`]: no factory is registered for
    ///   the requested backend name.
    /// * Any error the chosen factory itself returns.
    pub fn create(
        &self,
        config: &ProviderConfig,
    ) -> Result<Box<dyn TaxDataProvider>, ProviderError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use rust_decimal::Decimal;

    use crate::models::{AgeCredit, BenefitReferenceAmounts, Jurisdiction, TaxBracket};

    use super::{ProviderConfig, ProviderError, ProviderFactory, ProviderRegistry, TaxDataProvider};

    // ── stub provider ────────────────────────────────────────────────────
    // The tests only verify routing, so no lookup is ever called.
    struct StubProvider;

    impl TaxDataProvider for StubProvider {
        fn list_tax_years(&self) -> Result<Vec<i32>, ProviderError> {
            unimplemented!()
        }
        fn get_bracket_table(
            &self,
            _jurisdiction: Jurisdiction,
            _tax_year: i32,
        ) -> Result<Vec<TaxBracket>, ProviderError> {
            unimplemented!()
        }
        fn get_basic_credit(
            &self,
            _jurisdiction: Jurisdiction,
            _tax_year: i32,
        ) -> Result<Decimal, ProviderError> {
            unimplemented!()
        }
        fn get_age_credit(
            &self,
            _jurisdiction: Jurisdiction,
            _tax_year: i32,
        ) -> Result<AgeCredit, ProviderError> {
            unimplemented!()
        }
        fn get_minimum_withdrawal_percentage(
            &self,
            _age: u32,
        ) -> Result<Decimal, ProviderError> {
            unimplemented!()
        }
        fn get_benefit_reference_amounts(
            &self,
            _tax_year: i32,
        ) -> Result<BenefitReferenceAmounts, ProviderError> {
            unimplemented!()
        }
    }

    // ── stub factory ─────────────────────────────────────────────────────
    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    impl ProviderFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }
        fn create(
            &self,
            _config: &ProviderConfig,
        ) -> Result<Box<dyn TaxDataProvider>, ProviderError> {
            self.called.store(true, Ordering::SeqCst);
            Ok(Box::new(StubProvider))
        }
    }

    struct FailingFactory;

    impl ProviderFactory for FailingFactory {
        fn backend_name(&self) -> &'static str {
            "failing"
        }
        fn create(
            &self,
            _config: &ProviderConfig,
        ) -> Result<Box<dyn TaxDataProvider>, ProviderError> {
            Err(ProviderError::Connection("intentional failure".to_string()))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn ProviderFactory>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            Box::new(StubFactory {
                name,
                called: flag.clone(),
            }),
            flag,
        )
    }

    fn config(backend: &str) -> ProviderConfig {
        ProviderConfig {
            backend: backend.to_string(),
            location: "data".to_string(),
        }
    }

    #[test]
    fn provider_config_default_is_csv_data_dir() {
        let cfg = ProviderConfig::default();
        assert_eq!(cfg.backend, "csv");
        assert_eq!(cfg.location, "data");
    }

    #[test]
    fn new_registry_has_no_backends() {
        assert!(ProviderRegistry::new().available_backends().is_empty());
    }

    #[test]
    fn available_backends_is_sorted() {
        let mut reg = ProviderRegistry::new();
        let (f1, _) = stub_factory("memory");
        let (f2, _) = stub_factory("csv");
        reg.register(f1);
        reg.register(f2);
        assert_eq!(reg.available_backends(), vec!["csv", "memory"]);
    }

    #[test]
    fn duplicate_registration_replaces_previous() {
        let mut reg = ProviderRegistry::new();
        let (old, old_called) = stub_factory("csv");
        let (new, new_called) = stub_factory("csv");
        reg.register(old);
        reg.register(new);

        assert_eq!(reg.available_backends(), vec!["csv"]);
        reg.create(&config("csv")).expect("registered backend");
        assert!(!old_called.load(Ordering::SeqCst));
        assert!(new_called.load(Ordering::SeqCst));
    }

    #[test]
    fn create_calls_only_matching_factory() {
        let mut reg = ProviderRegistry::new();
        let (csv_factory, csv_called) = stub_factory("csv");
        let (memory_factory, memory_called) = stub_factory("memory");
        reg.register(csv_factory);
        reg.register(memory_factory);

        let result = reg.create(&config("csv"));

        assert!(result.is_ok(), "expected Ok, got {:#?}", result.err());
        assert!(csv_called.load(Ordering::SeqCst));
        assert!(!memory_called.load(Ordering::SeqCst));
    }

    #[test]
    fn configuration_error_names_requested_and_available_backends() {
        let mut reg = ProviderRegistry::new();
        let (f, _) = stub_factory("csv");
        reg.register(f);

        match reg.create(&config("postgres")) {
            Err(ProviderError::Configuration(msg)) => {
                assert!(msg.contains("postgres"), "error should name the requested backend");
                assert!(msg.contains("csv"), "error should list available backends");
            }
            Err(other) => panic!("expected Configuration error, got {other:#?}"),
            Ok(_) => panic!("expected Configuration error, got a provider"),
        }
    }

    #[test]
    fn create_propagates_factory_error() {
        let mut reg = ProviderRegistry::new();
        reg.register(Box::new(FailingFactory));

        match reg.create(&config("failing")) {
            Err(err) => assert_eq!(
                err,
                ProviderError::Connection("intentional failure".to_string())
            ),
            Ok(_) => panic!("expected factory error"),
        }
    }
}
