//! CSV reference data for the retirement engine.
//!
//! [`ReferenceDataLoader`] reads the four reference tables into an
//! [`InMemoryReferenceData`], which implements
//! [`retire_core::TaxDataProvider`]. [`CsvProviderFactory`] exposes the same
//! loader as the `csv` provider backend.

pub mod factory;
pub mod loader;
pub mod provider;

pub use factory::CsvProviderFactory;
pub use loader::{
    BenefitAmountRecord, MinimumWithdrawalRecord, ReferenceDataLoader, ReferenceLoadError,
    TaxBracketRecord, TaxCreditRecord,
};
pub use provider::InMemoryReferenceData;
