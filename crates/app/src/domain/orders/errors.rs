//! Reconciliation errors.

use jiff::Timestamp;
use thiserror::Error;
use tome::{refunds::RefundError, status::TransitionError, stock::StockError};

use crate::{
    domain::{
        catalog::{models::BookUuid, store::CatalogError},
        orders::{book::OrderBookError, models::OrderId},
        purchases::{ledger::LedgerError, models::PurchaseUuid},
        users::models::UserId,
    },
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("insufficient stock for book {book}: requested {requested}, available {available}")]
    InsufficientStock {
        book: BookUuid,
        available: u32,
        requested: u32,
    },

    #[error("not allowed")]
    Unauthorized,

    #[error("account is suspended until {until}")]
    Suspended { until: Timestamp },

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("book {0} not found")]
    BookNotFound(BookUuid),

    #[error("book {0} is not available for purchase")]
    NotPurchasable(BookUuid),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} is already cancelled")]
    OrderCancelled(OrderId),

    #[error("purchase {0} not found")]
    PurchaseNotFound(PurchaseUuid),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("checkout has no lines")]
    EmptyCheckout,

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("invalid selection for order line {index}")]
    InvalidSelection { index: usize },

    #[error("purchases must all be for the same book")]
    MixedBooks,

    #[error("invalid stock for book {book}")]
    InvalidStock {
        book: BookUuid,
        #[source]
        source: StockError,
    },

    #[error("amount overflow")]
    Overflow,

    #[error("storage error")]
    Storage(#[from] StorageError),
}

impl From<CatalogError> for OrdersServiceError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::NotFound(book) => Self::BookNotFound(book),
            CatalogError::InvalidStock { book, source } => Self::InvalidStock { book, source },
        }
    }
}

impl From<LedgerError> for OrdersServiceError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound(id) => Self::PurchaseNotFound(id),
            LedgerError::Transition(error) => Self::InvalidTransition(error),
        }
    }
}

impl From<OrderBookError> for OrdersServiceError {
    fn from(error: OrderBookError) -> Self {
        match error {
            OrderBookError::NotFound(order_id) => Self::OrderNotFound(order_id),
            OrderBookError::AlreadyCancelled(order_id) => Self::OrderCancelled(order_id),
            OrderBookError::InvalidSelection { index } => Self::InvalidSelection { index },
            OrderBookError::Transition(error) => Self::InvalidTransition(error),
            OrderBookError::Pricing(_) => Self::Overflow,
        }
    }
}

impl From<RefundError> for OrdersServiceError {
    fn from(_error: RefundError) -> Self {
        Self::Overflow
    }
}
