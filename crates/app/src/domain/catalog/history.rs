//! Catalog History
//!
//! Deleted books and book edits are kept in their own documents so the live catalog stays small.

use crate::{
    database::Transaction,
    documents::DocumentKey,
    domain::catalog::models::{ArchiveUuid, BookUuid, DeleteRecord, EditRecord},
    storage::StorageError,
};

#[derive(Debug, Default)]
pub(crate) struct BookArchive {
    records: Vec<DeleteRecord>,
}

impl BookArchive {
    pub(crate) async fn load(tx: &Transaction) -> Result<Self, StorageError> {
        Ok(Self {
            records: tx.load(&DocumentKey::DeletedBooks).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::DeletedBooks, &self.records)
    }

    pub(crate) fn push(&mut self, record: DeleteRecord) {
        self.records.push(record);
    }

    pub(crate) fn take(&mut self, archive: ArchiveUuid) -> Option<DeleteRecord> {
        let index = self.records.iter().position(|record| record.id == archive)?;

        Some(self.records.remove(index))
    }

    /// Most recent deletions first.
    pub(crate) fn newest_first(&self) -> Vec<DeleteRecord> {
        let mut records = self.records.clone();

        records.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));

        records
    }
}

#[derive(Debug, Default)]
pub(crate) struct EditHistory {
    records: Vec<EditRecord>,
}

impl EditHistory {
    pub(crate) async fn load(tx: &Transaction) -> Result<Self, StorageError> {
        Ok(Self {
            records: tx.load(&DocumentKey::BookEdits).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::BookEdits, &self.records)
    }

    pub(crate) fn push(&mut self, record: EditRecord) {
        self.records.push(record);
    }

    /// Edits newest first, optionally narrowed to one book.
    pub(crate) fn newest_first(&self, book: Option<BookUuid>) -> Vec<EditRecord> {
        let mut records: Vec<EditRecord> = self
            .records
            .iter()
            .filter(|record| book.is_none_or(|book| record.book_id == book))
            .cloned()
            .collect();

        records.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));

        records
    }
}
