//! Users service errors.

use thiserror::Error;

use crate::{
    domain::{catalog::models::BookUuid, users::models::UserId},
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum UsersServiceError {
    #[error("user {0} already exists")]
    AlreadyExists(UserId),

    #[error("user {0} not found")]
    NotFound(UserId),

    #[error("book {0} not found")]
    BookNotFound(BookUuid),

    #[error("invalid id or password")]
    InvalidCredentials,

    #[error("invalid data: {0}")]
    InvalidData(&'static str),

    #[error("not allowed")]
    Unauthorized,

    #[error("storage error")]
    Storage(#[from] StorageError),
}
