//! Currency-precision helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount and balance is a `rust_decimal::Decimal` with at most
//! two fractional digits.

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Number of fractional digits carried by amounts and balances.
pub const CURRENCY_SCALE: u32 = 2;

/// Errors raised when a value does not fit currency precision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// More fractional digits than the currency allows.
    #[error("{value} has more than 2 decimal places")]
    TooPrecise {
        /// The offending value.
        value: Decimal,
    },
}

/// Rounds a value to currency precision using Banker's Rounding.
#[must_use]
pub fn to_currency_precision(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// Checks that a value is representable at currency precision and returns
/// it rescaled to exactly two fractional digits.
///
/// Trailing zeros do not count: `12.500` is accepted as `12.50`.
pub fn ensure_currency_precision(value: Decimal) -> Result<Decimal, MoneyError> {
    if value.normalize().scale() > CURRENCY_SCALE {
        return Err(MoneyError::TooPrecise { value });
    }
    Ok(to_currency_precision(value))
}
