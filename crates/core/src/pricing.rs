//! Pricing
//!
//! Orders are priced in whole won. The delivery fee is a flat charge that is waived once the
//! item total reaches the free-shipping threshold.

use rusty_money::{Money, MoneyError, iso};
use thiserror::Error;

/// Item total at or above which delivery is free.
pub const FREE_SHIPPING_THRESHOLD: u64 = 30_000;

/// Flat delivery fee charged below the free-shipping threshold.
pub const DELIVERY_FEE: u64 = 3_000;

/// Errors that can occur while pricing an order.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// An amount does not fit the money representation.
    #[error("amount overflows the supported range")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A single priced order line: a unit price and a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    /// Unit price in won.
    pub unit_price: u64,

    /// Number of units.
    pub quantity: u32,
}

impl PricedLine {
    /// Create a priced line.
    pub const fn new(unit_price: u64, quantity: u32) -> Self {
        Self {
            unit_price,
            quantity,
        }
    }

    /// Line total as money.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Overflow`] if `unit_price × quantity` does not fit.
    pub fn total(&self) -> Result<Money<'static, iso::Currency>, PricingError> {
        let minor = self
            .unit_price
            .checked_mul(u64::from(self.quantity))
            .ok_or(PricingError::Overflow)?;

        Ok(Money::from_minor(to_minor(minor)?, iso::KRW))
    }
}

/// The three amounts stored on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderTotals {
    /// Sum of `price × quantity` over every line.
    pub total_amount: u64,

    /// Delivery fee derived from `total_amount`.
    pub delivery_fee: u64,

    /// `total_amount + delivery_fee`.
    pub final_amount: u64,
}

impl OrderTotals {
    /// Totals of an order with nothing left to pay for.
    pub const ZERO: Self = Self {
        total_amount: 0,
        delivery_fee: 0,
        final_amount: 0,
    };
}

/// Delivery fee charged for an item total.
pub const fn delivery_fee_for(total_amount: u64) -> u64 {
    if total_amount >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        DELIVERY_FEE
    }
}

/// Calculates order totals for a list of lines.
///
/// An empty list prices to [`OrderTotals::ZERO`]; there is nothing to deliver.
///
/// # Errors
///
/// - [`PricingError::Overflow`]: a line or the running total does not fit.
/// - [`PricingError::Money`]: wrapped money arithmetic error.
pub fn order_totals(lines: &[PricedLine]) -> Result<OrderTotals, PricingError> {
    if lines.is_empty() {
        return Ok(OrderTotals::ZERO);
    }

    let total = lines
        .iter()
        .try_fold(Money::from_minor(0, iso::KRW), |acc, line| {
            Ok::<_, PricingError>(acc.add(line.total()?)?)
        })?;

    let total_amount = from_minor(total.to_minor_units())?;
    let delivery_fee = delivery_fee_for(total_amount);

    let final_amount = total
        .add(Money::from_minor(to_minor(delivery_fee)?, iso::KRW))?
        .to_minor_units();

    Ok(OrderTotals {
        total_amount,
        delivery_fee,
        final_amount: from_minor(final_amount)?,
    })
}

fn to_minor(amount: u64) -> Result<i64, PricingError> {
    i64::try_from(amount).map_err(|_err| PricingError::Overflow)
}

fn from_minor(minor: i64) -> Result<u64, PricingError> {
    u64::try_from(minor).map_err(|_err| PricingError::Overflow)
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn totals_below_threshold_add_delivery_fee() -> TestResult {
        let totals = order_totals(&[PricedLine::new(12_000, 2)])?;

        assert_eq!(totals.total_amount, 24_000);
        assert_eq!(totals.delivery_fee, DELIVERY_FEE);
        assert_eq!(totals.final_amount, 27_000);

        Ok(())
    }

    #[test]
    fn totals_at_threshold_ship_free() -> TestResult {
        let totals = order_totals(&[PricedLine::new(10_000, 2), PricedLine::new(5_000, 2)])?;

        assert_eq!(totals.total_amount, 30_000);
        assert_eq!(totals.delivery_fee, 0);
        assert_eq!(totals.final_amount, 30_000);

        Ok(())
    }

    #[test]
    fn totals_just_below_threshold_pay_fee() -> TestResult {
        let totals = order_totals(&[PricedLine::new(29_999, 1)])?;

        assert_eq!(totals.delivery_fee, 3_000);
        assert_eq!(totals.final_amount, 32_999);

        Ok(())
    }

    #[test]
    fn empty_lines_price_to_zero() -> TestResult {
        assert_eq!(order_totals(&[])?, OrderTotals::ZERO);

        Ok(())
    }

    #[test]
    fn oversized_line_overflows() {
        let result = order_totals(&[PricedLine::new(u64::MAX, 2)]);

        assert!(
            matches!(result, Err(PricingError::Overflow)),
            "expected Overflow, got {result:?}"
        );
    }
}
