//! Per-year account projection and withdrawal sequencing.
//!
//! Every account grows the same way each year, with contributions and
//! withdrawals applied at the start of the year:
//!
//! ```text
//! ending = max(0, (starting + contribution − withdrawal) × (1 + rate))
//! ```
//!
//! Withdrawals follow a fixed order:
//!
//! 1. mandatory minimum from the tax-deferred account (age 55+)
//! 2. taxable account
//! 3. the rest of the tax-deferred account
//! 4. tax-free account
//!
//! No step ever takes more than the account holds.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::common::{non_negative, round_half_up};
use crate::models::{AccountBalances, AccountClass, Assets, Withdrawals};

/// Age from which the tax-deferred account carries a mandatory minimum.
pub const MINIMUM_WITHDRAWAL_AGE: u32 = 55;

/// Gain share assumed for taxable withdrawals when the cost basis is unknown.
pub const UNKNOWN_BASIS_GAIN_FRACTION: Decimal = dec!(0.5);

/// Annual rate of return per account class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRates {
    pub tax_deferred: Decimal,
    pub tax_free: Decimal,
    pub taxable: Decimal,
}

impl ReturnRates {
    /// Uses each account's own rate when set, otherwise `phase_rate`.
    pub fn for_phase(
        assets: &Assets,
        phase_rate: Decimal,
    ) -> Self {
        Self {
            tax_deferred: assets.tax_deferred.rate_of_return.unwrap_or(phase_rate),
            tax_free: assets.tax_free.rate_of_return.unwrap_or(phase_rate),
            taxable: assets.taxable.account.rate_of_return.unwrap_or(phase_rate),
        }
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
}

/// Balances plus the taxable account's running cost basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub balances: AccountBalances,
    /// `None` when the basis was never supplied.
    pub cost_basis: Option<Decimal>,
}

impl AccountState {
    pub fn from_assets(assets: &Assets) -> Self {
        Self {
            balances: assets.starting_balances(),
            cost_basis: assets.taxable.cost_basis,
        }
    }
}

/// Result of projecting one year of account activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountYear {
    pub starting_balances: AccountBalances,
    pub contributions: AccountBalances,
    pub withdrawals: Withdrawals,
    pub investment_growth: AccountBalances,
    pub ending: AccountState,
}

/// Mandatory minimum for the year: `balance × percentage`, zero below
/// [`MINIMUM_WITHDRAWAL_AGE`].
pub fn minimum_withdrawal(
    age: u32,
    tax_deferred_balance: Decimal,
    percentage: Decimal,
) -> Decimal {
    if age < MINIMUM_WITHDRAWAL_AGE {
        return Decimal::ZERO;
    }
    round_half_up(non_negative(tax_deferred_balance) * non_negative(percentage))
}

/// Share of a taxable withdrawal that is capital gain.
///
/// `max(0, (balance − basis) / balance)` with a known basis, otherwise
/// [`UNKNOWN_BASIS_GAIN_FRACTION`].
pub fn capital_gain_fraction(
    balance: Decimal,
    cost_basis: Option<Decimal>,
) -> Decimal {
    if balance <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match cost_basis {
        Some(basis) => non_negative((balance - basis) / balance),
        None => UNKNOWN_BASIS_GAIN_FRACTION,
    }
}

/// Splits `target` across the accounts in the fixed withdrawal order.
///
/// The minimum is always taken, even when `target` is already covered or is
/// zero, so the total may exceed `target`. When the accounts cannot cover
/// `target` the shortfall is simply left unmet.
pub fn sequence_withdrawals(
    target: Decimal,
    balances: &AccountBalances,
    cost_basis: Option<Decimal>,
    minimum_required: Decimal,
) -> Withdrawals {
    let minimum = non_negative(minimum_required).min(non_negative(balances.tax_deferred));
    let mut withdrawals = Withdrawals {
        tax_deferred: minimum,
        minimum_required: minimum,
        ..Withdrawals::default()
    };

    let mut remaining = target - minimum;
    if remaining <= Decimal::ZERO {
        return withdrawals;
    }

    let taxable = remaining.min(non_negative(balances.taxable));
    withdrawals.taxable = taxable;
    withdrawals.taxable_gains =
        round_half_up(taxable * capital_gain_fraction(balances.taxable, cost_basis));
    remaining -= taxable;

    let extra_deferred = remaining.min(non_negative(balances.tax_deferred - minimum));
    withdrawals.tax_deferred += extra_deferred;
    remaining -= extra_deferred;

    let tax_free = remaining.min(non_negative(balances.tax_free));
    withdrawals.tax_free = tax_free;
    remaining -= tax_free;

    if remaining > Decimal::ZERO {
        warn!(
            target = %target,
            shortfall = %remaining,
            "accounts cannot cover the withdrawal target"
        );
    }
    withdrawals
}

/// Cost basis after a taxable withdrawal: reduced by the fraction of the
/// pre-withdrawal balance that was withdrawn.
pub fn reduce_cost_basis(
    cost_basis: Decimal,
    balance_before: Decimal,
    withdrawal: Decimal,
) -> Decimal {
    if balance_before <= Decimal::ZERO || withdrawal <= Decimal::ZERO {
        return cost_basis;
    }
    let fraction_withdrawn = (withdrawal / balance_before).min(Decimal::ONE);
    round_half_up(non_negative(cost_basis * (Decimal::ONE - fraction_withdrawn)))
}

fn grow(
    start: &AccountBalances,
    contributions: &AccountBalances,
    withdrawn: &AccountBalances,
    rates: &ReturnRates,
) -> (AccountBalances, AccountBalances) {
    let invested = start.map(|class, balance| {
        balance + contributions.get(class) - withdrawn.get(class)
    });
    let ending = invested.map(|class, amount| {
        round_half_up(non_negative(amount * (Decimal::ONE + rates.get(class))))
    });
    let growth = ending.map(|class, amount| amount - invested.get(class));
    (ending, growth)
}

/// Accumulation year: contributions in, no withdrawals.
///
/// A known cost basis grows by the full taxable contribution.
pub fn project_accumulation_year(
    state: &AccountState,
    contributions: &AccountBalances,
    rates: &ReturnRates,
) -> AccountYear {
    let (ending, growth) = grow(&state.balances, contributions, &AccountBalances::ZERO, rates);
    AccountYear {
        starting_balances: state.balances,
        contributions: *contributions,
        withdrawals: Withdrawals::default(),
        investment_growth: growth,
        ending: AccountState {
            balances: ending,
            cost_basis: state
                .cost_basis
                .map(|basis| basis + non_negative(contributions.taxable)),
        },
    }
}

/// Drawdown year: `withdrawals` out, no contributions.
pub fn project_drawdown_year(
    state: &AccountState,
    withdrawals: &Withdrawals,
    rates: &ReturnRates,
) -> AccountYear {
    let (ending, growth) = grow(
        &state.balances,
        &AccountBalances::ZERO,
        &withdrawals.as_balances(),
        rates,
    );
    AccountYear {
        starting_balances: state.balances,
        contributions: AccountBalances::ZERO,
        withdrawals: *withdrawals,
        investment_growth: growth,
        ending: AccountState {
            balances: ending,
            cost_basis: state.cost_basis.map(|basis| {
                reduce_cost_basis(basis, state.balances.taxable, withdrawals.taxable)
            }),
        },
    }
}
