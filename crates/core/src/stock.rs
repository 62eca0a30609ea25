//! Stock arithmetic

use thiserror::Error;

/// Errors raised by stock changes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StockError {
    /// Fewer units are on hand than requested.
    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient {
        /// Units on hand.
        available: u32,

        /// Units requested.
        requested: u32,
    },

    /// The change would leave the stock negative or beyond the supported range.
    #[error("stock change of {delta} from {current} is out of range")]
    OutOfRange {
        /// Units on hand before the change.
        current: u32,

        /// Requested signed change.
        delta: i64,
    },
}

/// Check that `requested` units can be taken from `available`.
///
/// # Errors
///
/// Returns [`StockError::Insufficient`] when `requested > available`.
pub const fn ensure_available(available: u32, requested: u32) -> Result<(), StockError> {
    if requested > available {
        return Err(StockError::Insufficient {
            available,
            requested,
        });
    }

    Ok(())
}

/// Apply a signed change to a stock level.
///
/// # Errors
///
/// Returns [`StockError::OutOfRange`] if the result would be negative or exceed `u32::MAX`.
pub fn apply_delta(current: u32, delta: i64) -> Result<u32, StockError> {
    i64::from(current)
        .checked_add(delta)
        .and_then(|next| u32::try_from(next).ok())
        .ok_or(StockError::OutOfRange { current, delta })
}
