//! Catalog service.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use tracing::{debug, info};

use crate::{
    clock::Clock,
    database::Db,
    domain::{
        catalog::{
            errors::CatalogServiceError,
            history::{BookArchive, EditHistory},
            models::{
                ArchiveUuid, Book, BookStatus, BookUpdate, BookUuid, DeleteRecord, EditRecord,
                EditUuid, FieldChange, NewBook, Rating, Report, Review, ReviewUuid,
            },
            store::Catalog,
        },
        users::{directory::UserDirectory, models::UserId},
    },
};

/// Reports after which a review is hidden automatically.
pub const REPORTS_BEFORE_HIDDEN: usize = 3;

#[derive(Clone)]
pub struct LocalCatalogService {
    db: Db,
    clock: Arc<dyn Clock>,
}

impl LocalCatalogService {
    #[must_use]
    pub fn new(db: Db, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Fail unless `caller` exists and is not suspended right now.
    fn ensure_active(&self, users: &UserDirectory, caller: &UserId) -> Result<(), CatalogServiceError> {
        let user = users
            .get(caller)
            .ok_or_else(|| CatalogServiceError::UserNotFound(caller.clone()))?;

        match user.suspension_until {
            Some(until) if user.is_suspended_at(self.clock.now()) => {
                debug!(user_id = %caller, %until, "rejected suspended user");

                Err(CatalogServiceError::Suspended { until })
            }
            _ => Ok(()),
        }
    }
}

fn is_admin(users: &UserDirectory, caller: &UserId) -> Result<bool, CatalogServiceError> {
    users
        .get(caller)
        .map(|user| user.is_admin())
        .ok_or_else(|| CatalogServiceError::UserNotFound(caller.clone()))
}

fn require_admin(users: &UserDirectory, caller: &UserId) -> Result<(), CatalogServiceError> {
    if is_admin(users, caller)? {
        Ok(())
    } else {
        Err(CatalogServiceError::Unauthorized)
    }
}

fn book_mut(catalog: &mut Catalog, book: BookUuid) -> Result<&mut Book, CatalogServiceError> {
    catalog
        .get_mut(book)
        .ok_or(CatalogServiceError::BookNotFound(book))
}

fn review_mut(book: &mut Book, review: ReviewUuid) -> Result<&mut Review, CatalogServiceError> {
    book.reviews
        .iter_mut()
        .find(|entry| entry.id == review)
        .ok_or(CatalogServiceError::ReviewNotFound(review))
}

/// Apply `update` to `book`, returning one change per field that actually changed.
fn apply_update(book: &mut Book, update: BookUpdate) -> Vec<FieldChange> {
    fn change<T: PartialEq + ToString>(
        changes: &mut Vec<FieldChange>,
        field: &str,
        current: &mut T,
        next: Option<T>,
    ) {
        let Some(next) = next else {
            return;
        };

        if *current == next {
            return;
        }

        changes.push(FieldChange {
            field: field.to_string(),
            old_value: current.to_string(),
            new_value: next.to_string(),
        });

        *current = next;
    }

    let BookUpdate {
        title,
        author,
        genre,
        description,
        cover_image,
        published_year,
        price,
    } = update;

    let mut changes = Vec::new();

    change(&mut changes, "title", &mut book.title, title);
    change(&mut changes, "author", &mut book.author, author);
    change(&mut changes, "genre", &mut book.genre, genre);
    change(&mut changes, "description", &mut book.description, description);
    change(&mut changes, "coverImage", &mut book.cover_image, cover_image);
    change(&mut changes, "publishedYear", &mut book.published_year, published_year);
    change(&mut changes, "price", &mut book.price, price);

    changes
}

#[async_trait]
impl CatalogService for LocalCatalogService {
    async fn list_books(&self, include_pending: bool) -> Result<Vec<Book>, CatalogServiceError> {
        let tx = self.db.begin().await;
        let catalog = Catalog::load(&tx).await?;

        Ok(catalog
            .iter()
            .filter(|book| include_pending || book.is_purchasable())
            .cloned()
            .collect())
    }

    async fn get_book(&self, book: BookUuid) -> Result<Book, CatalogServiceError> {
        let tx = self.db.begin().await;
        let catalog = Catalog::load(&tx).await?;

        catalog
            .get(book)
            .cloned()
            .ok_or(CatalogServiceError::BookNotFound(book))
    }

    async fn add_book(&self, caller: &UserId, book: NewBook) -> Result<Book, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        let status = if is_admin(&users, caller)? {
            BookStatus::Approved
        } else {
            BookStatus::Pending
        };

        let NewBook {
            title,
            author,
            genre,
            description,
            cover_image,
            published_year,
            price,
        } = book;

        let created = Book {
            id: BookUuid::new(),
            title,
            author,
            genre,
            description,
            cover_image,
            published_year,
            price,
            stock: 0,
            created_by: caller.clone(),
            created_at: self.clock.now(),
            ratings: Vec::new(),
            reviews: Vec::new(),
            status,
        };

        catalog.upsert(created.clone());
        catalog.stage(&mut tx)?;

        tx.commit().await?;

        info!(book_id = %created.id, created_by = %caller, status = ?status, "added book");

        Ok(created)
    }

    async fn update_book(
        &self,
        caller: &UserId,
        book: BookUuid,
        update: BookUpdate,
    ) -> Result<Book, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        require_admin(&users, caller)?;

        let entry = book_mut(&mut catalog, book)?;
        let before = entry.clone();
        let changes = apply_update(entry, update);

        if changes.is_empty() {
            return Ok(before);
        }

        let after = entry.clone();

        let mut edits = EditHistory::load(&tx).await?;

        edits.push(EditRecord {
            id: EditUuid::new(),
            book_id: book,
            timestamp: self.clock.now(),
            before,
            after: after.clone(),
            changes,
        });

        catalog.stage(&mut tx)?;
        edits.stage(&mut tx)?;

        tx.commit().await?;

        info!(book_id = %book, edited_by = %caller, "updated book");

        Ok(after)
    }

    async fn approve_book(&self, caller: &UserId, book: BookUuid) -> Result<Book, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        require_admin(&users, caller)?;

        let entry = book_mut(&mut catalog, book)?;

        if entry.status == BookStatus::Approved {
            return Ok(entry.clone());
        }

        entry.status = BookStatus::Approved;

        let approved = entry.clone();

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(book_id = %book, approved_by = %caller, "approved book");

        Ok(approved)
    }

    async fn delete_book(
        &self,
        caller: &UserId,
        book: BookUuid,
    ) -> Result<DeleteRecord, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;
        let mut archive = BookArchive::load(&tx).await?;

        require_admin(&users, caller)?;

        let removed = catalog
            .remove(book)
            .ok_or(CatalogServiceError::BookNotFound(book))?;

        let record = DeleteRecord {
            id: ArchiveUuid::new(),
            book: removed,
            timestamp: self.clock.now(),
        };

        archive.push(record.clone());

        archive.stage(&mut tx)?;
        catalog.stage(&mut tx)?;

        tx.commit().await?;

        info!(book_id = %book, archive_id = %record.id, deleted_by = %caller, "deleted book");

        Ok(record)
    }

    async fn restore_book(
        &self,
        caller: &UserId,
        archive_id: ArchiveUuid,
    ) -> Result<Book, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;
        let mut archive = BookArchive::load(&tx).await?;

        require_admin(&users, caller)?;

        let record = archive
            .take(archive_id)
            .ok_or(CatalogServiceError::ArchiveNotFound(archive_id))?;

        if catalog.get(record.book.id).is_some() {
            return Err(CatalogServiceError::AlreadyExists(record.book.id));
        }

        let restored = record.book;

        catalog.upsert(restored.clone());

        catalog.stage(&mut tx)?;
        archive.stage(&mut tx)?;

        tx.commit().await?;

        info!(book_id = %restored.id, stock = restored.stock, "restored book");

        Ok(restored)
    }

    async fn list_deleted_books(&self) -> Result<Vec<DeleteRecord>, CatalogServiceError> {
        let tx = self.db.begin().await;
        let archive = BookArchive::load(&tx).await?;

        Ok(archive.newest_first())
    }

    async fn list_book_edits(
        &self,
        book: Option<BookUuid>,
    ) -> Result<Vec<EditRecord>, CatalogServiceError> {
        let tx = self.db.begin().await;
        let edits = EditHistory::load(&tx).await?;

        Ok(edits.newest_first(book))
    }

    async fn rate_book(
        &self,
        caller: &UserId,
        book: BookUuid,
        rating: u8,
    ) -> Result<Book, CatalogServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(CatalogServiceError::InvalidRating(rating));
        }

        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        self.ensure_active(&users, caller)?;

        let entry = book_mut(&mut catalog, book)?;

        entry.ratings.retain(|existing| &existing.user_id != caller);
        entry.ratings.push(Rating {
            user_id: caller.clone(),
            rating,
            timestamp: self.clock.now(),
        });

        let rated = entry.clone();

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(book_id = %book, user_id = %caller, rating, "rated book");

        Ok(rated)
    }

    async fn submit_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        comment: &str,
    ) -> Result<Review, CatalogServiceError> {
        let comment = comment.trim();

        if comment.is_empty() {
            return Err(CatalogServiceError::EmptyComment);
        }

        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        self.ensure_active(&users, caller)?;

        let entry = book_mut(&mut catalog, book)?;

        let review = Review {
            id: ReviewUuid::new(),
            user_id: caller.clone(),
            comment: comment.to_string(),
            timestamp: self.clock.now(),
            likes: Vec::new(),
            reports: Vec::new(),
            is_hidden: false,
        };

        entry.reviews.push(review.clone());

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(book_id = %book, review_id = %review.id, user_id = %caller, "submitted review");

        Ok(review)
    }

    async fn edit_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
        comment: &str,
    ) -> Result<Review, CatalogServiceError> {
        let comment = comment.trim();

        if comment.is_empty() {
            return Err(CatalogServiceError::EmptyComment);
        }

        let mut tx = self.db.begin().await;
        let mut catalog = Catalog::load(&tx).await?;

        let entry = review_mut(book_mut(&mut catalog, book)?, review)?;

        if &entry.user_id != caller {
            return Err(CatalogServiceError::Unauthorized);
        }

        comment.clone_into(&mut entry.comment);
        entry.timestamp = self.clock.now();

        let edited = entry.clone();

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        Ok(edited)
    }

    async fn delete_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
    ) -> Result<(), CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        let caller_is_admin = is_admin(&users, caller)?;
        let entry = book_mut(&mut catalog, book)?;

        let index = entry
            .reviews
            .iter()
            .position(|existing| existing.id == review)
            .ok_or(CatalogServiceError::ReviewNotFound(review))?;

        if !caller_is_admin && entry.reviews.get(index).map(|existing| &existing.user_id) != Some(caller) {
            return Err(CatalogServiceError::Unauthorized);
        }

        entry.reviews.remove(index);

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(book_id = %book, review_id = %review, deleted_by = %caller, "deleted review");

        Ok(())
    }

    async fn toggle_review_like(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
    ) -> Result<bool, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        if !users.contains(caller) {
            return Err(CatalogServiceError::UserNotFound(caller.clone()));
        }

        let entry = review_mut(book_mut(&mut catalog, book)?, review)?;

        let liked = if let Some(index) = entry.likes.iter().position(|user| user == caller) {
            entry.likes.remove(index);
            false
        } else {
            entry.likes.push(caller.clone());
            true
        };

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        Ok(liked)
    }

    async fn report_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
        reason: &str,
    ) -> Result<Review, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        if !users.contains(caller) {
            return Err(CatalogServiceError::UserNotFound(caller.clone()));
        }

        let entry = review_mut(book_mut(&mut catalog, book)?, review)?;

        if entry.is_reported_by(caller) {
            debug!(review_id = %review, user_id = %caller, "review already reported");

            return Ok(entry.clone());
        }

        entry.reports.push(Report {
            user_id: caller.clone(),
            reason: reason.to_string(),
            timestamp: self.clock.now(),
        });

        if entry.reports.len() >= REPORTS_BEFORE_HIDDEN {
            entry.is_hidden = true;
        }

        let reported = entry.clone();

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        info!(
            review_id = %review,
            reports = reported.reports.len(),
            hidden = reported.is_hidden,
            "reported review"
        );

        Ok(reported)
    }

    async fn set_review_hidden(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
        hidden: bool,
    ) -> Result<Review, CatalogServiceError> {
        let mut tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;
        let mut catalog = Catalog::load(&tx).await?;

        require_admin(&users, caller)?;

        let entry = review_mut(book_mut(&mut catalog, book)?, review)?;

        entry.is_hidden = hidden;

        let updated = entry.clone();

        catalog.stage(&mut tx)?;
        tx.commit().await?;

        Ok(updated)
    }
}

#[automock]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Retrieve books; pending requests only when `include_pending` is set.
    async fn list_books(&self, include_pending: bool) -> Result<Vec<Book>, CatalogServiceError>;

    /// Retrieve a single book.
    async fn get_book(&self, book: BookUuid) -> Result<Book, CatalogServiceError>;

    /// Add a book with no stock. Requests from regular users start pending.
    async fn add_book(&self, caller: &UserId, book: NewBook) -> Result<Book, CatalogServiceError>;

    /// Update descriptive fields and price, recording what changed.
    async fn update_book(
        &self,
        caller: &UserId,
        book: BookUuid,
        update: BookUpdate,
    ) -> Result<Book, CatalogServiceError>;

    /// Approve a pending book request.
    async fn approve_book(&self, caller: &UserId, book: BookUuid)
    -> Result<Book, CatalogServiceError>;

    /// Archive and remove a book.
    async fn delete_book(
        &self,
        caller: &UserId,
        book: BookUuid,
    ) -> Result<DeleteRecord, CatalogServiceError>;

    /// Put an archived book back into the catalog with its archived stock.
    async fn restore_book(
        &self,
        caller: &UserId,
        archive_id: ArchiveUuid,
    ) -> Result<Book, CatalogServiceError>;

    /// Retrieve archived books, newest first.
    async fn list_deleted_books(&self) -> Result<Vec<DeleteRecord>, CatalogServiceError>;

    /// Retrieve edit records, newest first.
    async fn list_book_edits(
        &self,
        book: Option<BookUuid>,
    ) -> Result<Vec<EditRecord>, CatalogServiceError>;

    /// Rate a book from 1 to 5, replacing the caller's previous rating.
    async fn rate_book(
        &self,
        caller: &UserId,
        book: BookUuid,
        rating: u8,
    ) -> Result<Book, CatalogServiceError>;

    async fn submit_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        comment: &str,
    ) -> Result<Review, CatalogServiceError>;

    async fn edit_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
        comment: &str,
    ) -> Result<Review, CatalogServiceError>;

    async fn delete_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
    ) -> Result<(), CatalogServiceError>;

    /// Like or unlike a review, returning whether the caller now likes it.
    async fn toggle_review_like(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
    ) -> Result<bool, CatalogServiceError>;

    /// Report a review once per user.
    async fn report_review(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
        reason: &str,
    ) -> Result<Review, CatalogServiceError>;

    async fn set_review_hidden(
        &self,
        caller: &UserId,
        book: BookUuid,
        review: ReviewUuid,
        hidden: bool,
    ) -> Result<Review, CatalogServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use testresult::TestResult;

    use crate::{domain::users::UsersService, test::TestContext};

    use super::*;

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Hermann Hesse".to_string(),
            genre: "Novel".to_string(),
            published_year: 1919,
            price: 12_000,
            ..NewBook::default()
        }
    }

    #[tokio::test]
    async fn user_requests_start_pending_until_approved() -> TestResult {
        let ctx = TestContext::new().await;

        let requested = ctx.catalog.add_book(&ctx.alice, new_book("Demian")).await?;

        assert_eq!(requested.status, BookStatus::Pending);
        assert_eq!(requested.stock, 0);
        assert!(ctx.catalog.list_books(false).await?.is_empty());

        ctx.catalog.approve_book(&ctx.admin, requested.id).await?;
        let again = ctx.catalog.approve_book(&ctx.admin, requested.id).await?;

        assert_eq!(again.status, BookStatus::Approved);
        assert_eq!(ctx.catalog.list_books(false).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn only_admins_approve() -> TestResult {
        let ctx = TestContext::new().await;
        let requested = ctx.catalog.add_book(&ctx.alice, new_book("Demian")).await?;

        let result = ctx.catalog.approve_book(&ctx.bob, requested.id).await;

        assert!(
            matches!(result, Err(CatalogServiceError::Unauthorized)),
            "expected Unauthorized, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_records_changed_fields_only() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 4).await?;

        let updated = ctx
            .catalog
            .update_book(
                &ctx.admin,
                book.id,
                BookUpdate {
                    title: Some("Demian".to_string()),
                    price: Some(13_500),
                    ..BookUpdate::default()
                },
            )
            .await?;

        assert_eq!(updated.price, 13_500);
        assert_eq!(updated.stock, 4);

        let edits = ctx.catalog.list_book_edits(Some(book.id)).await?;
        let edit = edits.first().ok_or("missing edit record")?;

        assert_eq!(edits.len(), 1);
        assert_eq!(
            edit.changes,
            vec![FieldChange {
                field: "price".to_string(),
                old_value: "12000".to_string(),
                new_value: "13500".to_string(),
            }]
        );
        assert_eq!(edit.before.price, 12_000);

        Ok(())
    }

    #[tokio::test]
    async fn unchanged_update_records_nothing() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 4).await?;

        ctx.catalog
            .update_book(&ctx.admin, book.id, BookUpdate::default())
            .await?;

        assert!(ctx.catalog.list_book_edits(None).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn deleted_books_restore_with_their_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 7).await?;

        let record = ctx.catalog.delete_book(&ctx.admin, book.id).await?;

        let result = ctx.catalog.get_book(book.id).await;

        assert!(
            matches!(result, Err(CatalogServiceError::BookNotFound(_))),
            "expected BookNotFound, got {result:?}"
        );
        assert_eq!(ctx.catalog.list_deleted_books().await?.len(), 1);

        let restored = ctx.catalog.restore_book(&ctx.admin, record.id).await?;

        assert_eq!(restored.stock, 7);
        assert!(ctx.catalog.list_deleted_books().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn later_rating_replaces_earlier() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 1).await?;

        ctx.catalog.rate_book(&ctx.alice, book.id, 2).await?;
        ctx.catalog.rate_book(&ctx.bob, book.id, 5).await?;
        let rated = ctx.catalog.rate_book(&ctx.alice, book.id, 4).await?;

        assert_eq!(rated.ratings.len(), 2);
        assert_eq!(rated.average_rating(), Some(4.5));

        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 1).await?;

        let result = ctx.catalog.rate_book(&ctx.alice, book.id, 6).await;

        assert!(
            matches!(result, Err(CatalogServiceError::InvalidRating(6))),
            "expected InvalidRating, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn suspended_users_cannot_rate_or_review_until_expiry() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 1).await?;

        ctx.users.suspend_user(&ctx.admin, &ctx.alice, 1).await?;

        let rating = ctx.catalog.rate_book(&ctx.alice, book.id, 5).await;
        let review = ctx.catalog.submit_review(&ctx.alice, book.id, "great").await;

        assert!(
            matches!(rating, Err(CatalogServiceError::Suspended { .. })),
            "expected Suspended, got {rating:?}"
        );
        assert!(
            matches!(review, Err(CatalogServiceError::Suspended { .. })),
            "expected Suspended, got {review:?}"
        );

        ctx.clock.advance(SignedDuration::from_hours(25));

        ctx.catalog.rate_book(&ctx.alice, book.id, 5).await?;
        ctx.catalog.submit_review(&ctx.alice, book.id, "great").await?;

        Ok(())
    }

    #[tokio::test]
    async fn third_report_hides_review_and_repeats_are_ignored() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 1).await?;
        let review = ctx.catalog.submit_review(&ctx.alice, book.id, "spoilers").await?;

        ctx.catalog
            .report_review(&ctx.bob, book.id, review.id, "spam")
            .await?;
        let repeated = ctx
            .catalog
            .report_review(&ctx.bob, book.id, review.id, "spam")
            .await?;

        assert_eq!(repeated.reports.len(), 1);
        assert!(!repeated.is_hidden);

        ctx.catalog
            .report_review(&ctx.alice, book.id, review.id, "mistake")
            .await?;
        let hidden = ctx
            .catalog
            .report_review(&ctx.admin, book.id, review.id, "spoilers")
            .await?;

        assert!(hidden.is_hidden);

        let shown = ctx
            .catalog
            .set_review_hidden(&ctx.admin, book.id, review.id, false)
            .await?;

        assert!(!shown.is_hidden);

        Ok(())
    }

    #[tokio::test]
    async fn review_likes_toggle() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 1).await?;
        let review = ctx.catalog.submit_review(&ctx.alice, book.id, "lovely").await?;

        assert!(ctx.catalog.toggle_review_like(&ctx.bob, book.id, review.id).await?);
        assert!(!ctx.catalog.toggle_review_like(&ctx.bob, book.id, review.id).await?);

        let stored = ctx.catalog.get_book(book.id).await?;

        assert!(stored.review(review.id).ok_or("missing review")?.likes.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn reviews_are_edited_by_owner_and_deleted_by_owner_or_admin() -> TestResult {
        let ctx = TestContext::new().await;
        let book = ctx.create_book("Demian", 12_000, 1).await?;
        let review = ctx.catalog.submit_review(&ctx.alice, book.id, "first").await?;

        let result = ctx
            .catalog
            .edit_review(&ctx.bob, book.id, review.id, "hijacked")
            .await;

        assert!(
            matches!(result, Err(CatalogServiceError::Unauthorized)),
            "expected Unauthorized, got {result:?}"
        );

        let edited = ctx
            .catalog
            .edit_review(&ctx.alice, book.id, review.id, "second")
            .await?;

        assert_eq!(edited.comment, "second");

        let result = ctx.catalog.delete_review(&ctx.bob, book.id, review.id).await;

        assert!(
            matches!(result, Err(CatalogServiceError::Unauthorized)),
            "expected Unauthorized, got {result:?}"
        );

        ctx.catalog.delete_review(&ctx.admin, book.id, review.id).await?;

        assert!(ctx.catalog.get_book(book.id).await?.reviews.is_empty());

        Ok(())
    }
}
