//! Order and purchase statuses.
//!
//! Orders move strictly forward through `pending → paid → shipped → delivered`, one step at a
//! time. Cancellation is terminal for both orders and purchase records.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by a rejected status change.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The requested status is not the immediate successor of the current one.
    #[error("cannot move order from {from} to {to}")]
    Order {
        /// Status before the request.
        from: OrderStatus,

        /// Requested status.
        to: OrderStatus,
    },

    /// A cancelled purchase record cannot be reactivated.
    #[error("cannot move purchase from {from} to {to}")]
    Purchase {
        /// Status before the request.
        from: PurchaseStatus,

        /// Requested status.
        to: PurchaseStatus,
    },
}

/// Lifecycle of an order aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created but not yet paid for.
    Pending,

    /// Paid; checkout creates orders in this state.
    Paid,

    /// Handed to the courier.
    Shipped,

    /// Received by the customer.
    Delivered,

    /// Withdrawn; no further changes apply.
    Cancelled,
}

impl OrderStatus {
    /// The only status this one may advance to, if any.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Paid),
            Self::Paid => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Validate a forward move to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Order`] unless `next` is the immediate successor.
    pub fn advance_to(self, next: Self) -> Result<Self, TransitionError> {
        if self.next() == Some(next) {
            Ok(next)
        } else {
            Err(TransitionError::Order {
                from: self,
                to: next,
            })
        }
    }

    /// Whether the order has been withdrawn.
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single purchased unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Awaiting fulfilment.
    Pending,

    /// Fulfilled; checkout records units in this state.
    Shipped,

    /// Received by the customer.
    Delivered,

    /// Cancelled or returned.
    Cancelled,
}

impl PurchaseStatus {
    /// Whether the unit still counts towards holdings and units sold.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Validate a move to `next`.
    ///
    /// Re-applying the current status is allowed and changes nothing. A cancelled unit stays
    /// cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Purchase`] when a cancelled unit would be reactivated.
    pub fn transition_to(self, next: Self) -> Result<Self, TransitionError> {
        if self == Self::Cancelled && next != Self::Cancelled {
            return Err(TransitionError::Purchase {
                from: self,
                to: next,
            });
        }

        Ok(next)
    }

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl Display for PurchaseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
