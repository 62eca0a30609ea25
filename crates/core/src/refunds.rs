//! Refunds

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

/// Errors that can occur while calculating a refund.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefundError {
    /// The refund could not be represented safely.
    #[error("refund amount overflows the supported range")]
    Overflow,
}

/// Share of the paid amount returned to a customer who sends units back.
pub fn return_refund_rate() -> Percentage {
    Percentage::from(Decimal::new(90, 2))
}

/// Refund owed for returning `count` units bought at `unit_price`.
///
/// The amount is `floor(unit_price × count × 0.9)`, always rounding in the store's favour.
///
/// # Errors
///
/// Returns [`RefundError::Overflow`] if the gross amount or the percentage calculation overflows.
pub fn refund_amount(unit_price: u64, count: u32) -> Result<u64, RefundError> {
    let gross = unit_price
        .checked_mul(u64::from(count))
        .ok_or(RefundError::Overflow)?;

    percent_of_floor(&return_refund_rate(), gross)
}

fn percent_of_floor(percent: &Percentage, amount: u64) -> Result<u64, RefundError> {
    let amount = Decimal::from_u64(amount).ok_or(RefundError::Overflow)?;

    ((*percent) * Decimal::ONE)
        .checked_mul(amount)
        .ok_or(RefundError::Overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::ToNegativeInfinity)
        .to_u64()
        .ok_or(RefundError::Overflow)
}
