pub mod calculations;
pub mod db;
pub mod models;

pub use calculations::optimizer::{SpendingOptimization, optimize_spending_to_exhaust};
pub use calculations::simulation::{ProjectionEngine, ProjectionError, ProjectionErrorKind};
pub use db::provider::{ProviderError, TaxDataProvider};
pub use db::{ProviderConfig, ProviderFactory, ProviderRegistry};
pub use models::*;
