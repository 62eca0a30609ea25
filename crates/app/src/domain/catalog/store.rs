//! Catalog Store
//!
//! Books keyed by id, persisted as one document. Stock never drops below zero: every change
//! goes through [`Catalog::adjust_stock`] or [`Catalog::set_stock`].

use thiserror::Error;
use tome::stock::{StockError, apply_delta};

use crate::{
    database::Transaction,
    documents::DocumentKey,
    domain::catalog::models::{Book, BookUuid},
    storage::StorageError,
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CatalogError {
    #[error("book {0} not found")]
    NotFound(BookUuid),

    #[error("invalid stock change for book {book}")]
    InvalidStock {
        book: BookUuid,
        #[source]
        source: StockError,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub(crate) async fn load(tx: &Transaction) -> Result<Self, StorageError> {
        Ok(Self {
            books: tx.load(&DocumentKey::Books).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::Books, &self.books)
    }

    pub(crate) fn get(&self, book: BookUuid) -> Option<&Book> {
        self.books.iter().find(|entry| entry.id == book)
    }

    pub(crate) fn get_mut(&mut self, book: BookUuid) -> Option<&mut Book> {
        self.books.iter_mut().find(|entry| entry.id == book)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.iter()
    }

    /// Insert a book, replacing any book with the same id.
    pub(crate) fn upsert(&mut self, book: Book) {
        match self.get_mut(book.id) {
            Some(existing) => *existing = book,
            None => self.books.push(book),
        }
    }

    /// Apply a signed change to a book's stock, returning the new level.
    pub(crate) fn adjust_stock(&mut self, book: BookUuid, delta: i64) -> Result<u32, CatalogError> {
        let entry = self.get_mut(book).ok_or(CatalogError::NotFound(book))?;

        entry.stock = apply_delta(entry.stock, delta)
            .map_err(|source| CatalogError::InvalidStock { book, source })?;

        Ok(entry.stock)
    }

    pub(crate) fn set_stock(&mut self, book: BookUuid, stock: u32) -> Result<&Book, CatalogError> {
        let entry = self.get_mut(book).ok_or(CatalogError::NotFound(book))?;

        entry.stock = stock;

        Ok(entry)
    }

    /// Remove a book. Callers archive it first.
    pub(crate) fn remove(&mut self, book: BookUuid) -> Option<Book> {
        let index = self.books.iter().position(|entry| entry.id == book)?;

        Some(self.books.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use jiff::Timestamp;
    use testresult::TestResult;

    use crate::domain::{catalog::models::BookStatus, users::models::UserId};

    use super::*;

    fn book(stock: u32) -> Book {
        Book {
            id: BookUuid::new(),
            title: "The Little Prince".to_string(),
            author: "Antoine de Saint-Exupéry".to_string(),
            genre: "Novel".to_string(),
            description: String::new(),
            cover_image: String::new(),
            published_year: 1943,
            price: 8_000,
            stock,
            created_by: UserId::from("ADMIN"),
            created_at: Timestamp::UNIX_EPOCH,
            ratings: Vec::new(),
            reviews: Vec::new(),
            status: BookStatus::Approved,
        }
    }

    #[test]
    fn adjust_stock_returns_new_level() -> TestResult {
        let entry = book(5);
        let id = entry.id;
        let mut catalog = Catalog::default();
        catalog.upsert(entry);

        assert_eq!(catalog.adjust_stock(id, -3)?, 2);
        assert_eq!(catalog.adjust_stock(id, 1)?, 3);

        Ok(())
    }

    #[test]
    fn adjust_stock_below_zero_is_invalid_and_leaves_stock() -> TestResult {
        let entry = book(1);
        let id = entry.id;
        let mut catalog = Catalog::default();
        catalog.upsert(entry);

        let result = catalog.adjust_stock(id, -2);

        assert!(
            matches!(result, Err(CatalogError::InvalidStock { .. })),
            "expected InvalidStock, got {result:?}"
        );
        assert_eq!(catalog.get(id).ok_or("missing book")?.stock, 1);

        Ok(())
    }

    #[test]
    fn unknown_book_is_not_found() {
        let mut catalog = Catalog::default();

        let result = catalog.adjust_stock(BookUuid::new(), 1);

        assert!(
            matches!(result, Err(CatalogError::NotFound(_))),
            "expected NotFound, got {result:?}"
        );
    }

    #[test]
    fn upsert_replaces_existing_book() -> TestResult {
        let mut entry = book(2);
        let id = entry.id;
        let mut catalog = Catalog::default();
        catalog.upsert(entry.clone());

        entry.price = 9_500;
        catalog.upsert(entry);

        assert_eq!(catalog.iter().count(), 1);
        assert_eq!(catalog.get(id).ok_or("missing book")?.price, 9_500);

        Ok(())
    }
}
