//! Carts service errors.

use thiserror::Error;

use crate::{
    domain::{catalog::models::BookUuid, orders::OrdersServiceError},
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("book {0} not found")]
    BookNotFound(BookUuid),

    #[error("book {0} is not available for purchase")]
    NotPurchasable(BookUuid),

    #[error("insufficient stock for book {book}: requested {requested}, available {available}")]
    InsufficientStock {
        book: BookUuid,
        available: u32,
        requested: u32,
    },

    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("book {0} is not in the cart")]
    LineNotFound(BookUuid),

    #[error("no cart lines selected")]
    EmptySelection,

    #[error("checkout failed")]
    Checkout(#[from] OrdersServiceError),

    #[error("storage error")]
    Storage(#[from] StorageError),
}
