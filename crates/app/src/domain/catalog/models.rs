//! Catalog Models

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{domain::users::models::UserId, uuids::TypedUuid};

/// Book UUID
pub type BookUuid = TypedUuid<Book>;

/// Review UUID
pub type ReviewUuid = TypedUuid<Review>;

/// Edit Record UUID
pub type EditUuid = TypedUuid<EditRecord>;

/// Archived Book UUID
pub type ArchiveUuid = TypedUuid<DeleteRecord>;

/// Whether a book is on sale or still awaiting an administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    #[default]
    Approved,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: UserId,
    pub rating: u8,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub user_id: UserId,
    pub reason: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewUuid,
    pub user_id: UserId,
    pub comment: String,
    pub timestamp: Timestamp,
    #[serde(default)]
    pub likes: Vec<UserId>,
    #[serde(default)]
    pub reports: Vec<Report>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl Review {
    #[must_use]
    pub fn is_reported_by(&self, user: &UserId) -> bool {
        self.reports.iter().any(|report| &report.user_id == user)
    }
}

/// Book Model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookUuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub cover_image: String,
    pub published_year: i32,
    pub price: u64,
    pub stock: u32,
    pub created_by: UserId,
    pub created_at: Timestamp,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub status: BookStatus,
}

impl Book {
    /// Whether the book can be bought or added to a cart.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.status == BookStatus::Approved
    }

    #[must_use]
    pub fn average_rating(&self) -> Option<f64> {
        if self.ratings.is_empty() {
            return None;
        }

        let sum: u32 = self.ratings.iter().map(|rating| u32::from(rating.rating)).sum();

        Some(f64::from(sum) / self.ratings.len() as f64)
    }

    #[must_use]
    pub fn review(&self, review: ReviewUuid) -> Option<&Review> {
        self.reviews.iter().find(|entry| entry.id == review)
    }
}

/// New Book Model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub cover_image: String,
    pub published_year: i32,
    pub price: u64,
}

/// Book Update Model
///
/// Stock is deliberately absent; it only changes through inventory operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub published_year: Option<i32>,
    pub price: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

/// A recorded edit of a book's descriptive fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRecord {
    pub id: EditUuid,
    pub book_id: BookUuid,
    pub timestamp: Timestamp,
    pub before: Book,
    pub after: Book,
    pub changes: Vec<FieldChange>,
}

/// A deleted book, kept so it can be restored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecord {
    pub id: ArchiveUuid,
    pub book: Book,
    pub timestamp: Timestamp,
}
