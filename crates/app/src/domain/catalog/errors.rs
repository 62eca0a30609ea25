//! Catalog service errors.

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    domain::{
        catalog::models::{ArchiveUuid, BookUuid, ReviewUuid},
        users::models::UserId,
    },
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum CatalogServiceError {
    #[error("book {0} not found")]
    BookNotFound(BookUuid),

    #[error("book {0} already exists")]
    AlreadyExists(BookUuid),

    #[error("review {0} not found")]
    ReviewNotFound(ReviewUuid),

    #[error("archived book {0} not found")]
    ArchiveNotFound(ArchiveUuid),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("not allowed")]
    Unauthorized,

    #[error("account is suspended until {until}")]
    Suspended { until: Timestamp },

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("comment cannot be empty")]
    EmptyComment,

    #[error("storage error")]
    Storage(#[from] StorageError),
}
