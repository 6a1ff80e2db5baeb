use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The three account classes the projection tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountClass {
    /// Contributions are deductible; withdrawals are fully taxable (RRSP/RRIF).
    TaxDeferred,
    /// Withdrawals are never taxable (TFSA).
    TaxFree,
    /// Only the capital-gain portion of a withdrawal is taxable (non-registered).
    Taxable,
}

/// An amount per account class.
///
/// Used for balances as well as for per-account contributions and growth.
/// The total is always derived from the three components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalances {
    pub tax_deferred: Decimal,
    pub tax_free: Decimal,
    pub taxable: Decimal,
}

impl AccountBalances {
    pub const ZERO: Self = Self {
        tax_deferred: Decimal::ZERO,
        tax_free: Decimal::ZERO,
        taxable: Decimal::ZERO,
    };

    pub fn new(
        tax_deferred: Decimal,
        tax_free: Decimal,
        taxable: Decimal,
    ) -> Self {
        Self {
            tax_deferred,
            tax_free,
            taxable,
        }
    }

    pub fn total(&self) -> Decimal {
        self.tax_deferred + self.tax_free + self.taxable
    }

    pub fn get(
        &self,
        class: AccountClass,
    ) -> Decimal {
        match class {
            AccountClass::TaxDeferred => self.tax_deferred,
            AccountClass::TaxFree => self.tax_free,
            AccountClass::Taxable => self.taxable,
        }
    }

    /// Applies `f` to each component.
    pub fn map(
        self,
        f: impl Fn(AccountClass, Decimal) -> Decimal,
    ) -> Self {
        Self {
            tax_deferred: f(AccountClass::TaxDeferred, self.tax_deferred),
            tax_free: f(AccountClass::TaxFree, self.tax_free),
            taxable: f(AccountClass::Taxable, self.taxable),
        }
    }
}

/// Withdrawals taken in one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawals {
    /// Everything drawn from the tax-deferred account, including the minimum.
    pub tax_deferred: Decimal,
    pub tax_free: Decimal,
    pub taxable: Decimal,
    /// Capital-gain portion of `taxable`.
    pub taxable_gains: Decimal,
    /// Mandatory minimum the tax-deferred withdrawal had to cover.
    pub minimum_required: Decimal,
}

impl Withdrawals {
    pub fn total(&self) -> Decimal {
        self.tax_deferred + self.tax_free + self.taxable
    }

    pub fn as_balances(&self) -> AccountBalances {
        AccountBalances::new(self.tax_deferred, self.tax_free, self.taxable)
    }
}
