//! Purchase Ledger
//!
//! A flat list of unit records. Records are never removed; cancellation and returns only move
//! them to [`PurchaseStatus::Cancelled`].

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use thiserror::Error;
use tome::status::{PurchaseStatus, TransitionError};

use crate::{
    database::Transaction,
    documents::DocumentKey,
    domain::{
        catalog::models::BookUuid,
        purchases::models::{PurchaseRecord, PurchaseUuid},
        users::models::UserId,
    },
    storage::StorageError,
};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LedgerError {
    #[error("purchase {0} not found")]
    NotFound(PurchaseUuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

#[derive(Debug, Default)]
pub(crate) struct PurchaseLedger {
    records: Vec<PurchaseRecord>,
}

impl PurchaseLedger {
    pub(crate) async fn load(tx: &Transaction) -> Result<Self, StorageError> {
        Ok(Self {
            records: tx.load(&DocumentKey::Purchases).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::Purchases, &self.records)
    }

    /// Record `count` independent units, returning their ids.
    pub(crate) fn create_units(
        &mut self,
        book: BookUuid,
        user: &UserId,
        count: u32,
        status: PurchaseStatus,
        purchased_at: Timestamp,
    ) -> Vec<PurchaseUuid> {
        (0..count)
            .map(|_| {
                let id = PurchaseUuid::new();

                self.records.push(PurchaseRecord {
                    id,
                    book_id: book,
                    user_id: user.clone(),
                    purchase_date: purchased_at,
                    status,
                });

                id
            })
            .collect()
    }

    pub(crate) fn get(&self, id: PurchaseUuid) -> Option<&PurchaseRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Move every record in `ids` to `status`, returning the ids that actually changed.
    ///
    /// All ids are validated before any record is touched. Records already in `status` are left
    /// alone.
    pub(crate) fn set_status(
        &mut self,
        ids: &[PurchaseUuid],
        status: PurchaseStatus,
    ) -> Result<Vec<PurchaseUuid>, LedgerError> {
        let mut changed = Vec::new();
        let mut seen = FxHashSet::default();

        for &id in ids {
            let record = self.get(id).ok_or(LedgerError::NotFound(id))?;

            record.status.transition_to(status)?;

            if record.status != status && seen.insert(id) {
                changed.push(id);
            }
        }

        for record in &mut self.records {
            if seen.contains(&record.id) {
                record.status = status;
            }
        }

        Ok(changed)
    }

    /// Records bought by `user`, oldest first.
    pub(crate) fn list_by_user(&self, user: &UserId, include_cancelled: bool) -> Vec<PurchaseRecord> {
        self.filtered(|record| &record.user_id == user, include_cancelled)
    }

    /// Records of `book` across all users, oldest first.
    pub(crate) fn list_by_book(&self, book: BookUuid, include_cancelled: bool) -> Vec<PurchaseRecord> {
        self.filtered(|record| record.book_id == book, include_cancelled)
    }

    /// Up to `count` of `user`'s active records of `book`, oldest first.
    pub(crate) fn oldest_active(&self, user: &UserId, book: BookUuid, count: u32) -> Vec<PurchaseUuid> {
        self.filtered(
            |record| &record.user_id == user && record.book_id == book,
            false,
        )
        .into_iter()
        .take(usize::try_from(count).unwrap_or(usize::MAX))
        .map(|record| record.id)
        .collect()
    }

    /// Active units of `book` across all users.
    pub(crate) fn units_sold(&self, book: BookUuid) -> usize {
        self.records
            .iter()
            .filter(|record| record.book_id == book && record.is_active())
            .count()
    }

    fn filtered(
        &self,
        predicate: impl Fn(&PurchaseRecord) -> bool,
        include_cancelled: bool,
    ) -> Vec<PurchaseRecord> {
        let mut records: Vec<PurchaseRecord> = self
            .records
            .iter()
            .filter(|record| predicate(record) && (include_cancelled || record.is_active()))
            .cloned()
            .collect();

        records.sort_by_key(|record| record.purchase_date);

        records
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn create_units_records_one_entry_per_unit() {
        let mut ledger = PurchaseLedger::default();
        let book = BookUuid::new();
        let user = UserId::from("KT");

        let ids = ledger.create_units(book, &user, 3, PurchaseStatus::Shipped, Timestamp::UNIX_EPOCH);

        assert_eq!(ids.len(), 3);
        assert_eq!(ledger.units_sold(book), 3);
        assert_eq!(ledger.list_by_user(&user, false).len(), 3);
    }

    #[test]
    fn set_status_is_idempotent() -> TestResult {
        let mut ledger = PurchaseLedger::default();
        let book = BookUuid::new();
        let ids = ledger.create_units(
            book,
            &UserId::from("KT"),
            2,
            PurchaseStatus::Shipped,
            Timestamp::UNIX_EPOCH,
        );

        let first = ledger.set_status(&ids, PurchaseStatus::Cancelled)?;
        let second = ledger.set_status(&ids, PurchaseStatus::Cancelled)?;

        assert_eq!(first, ids);
        assert!(second.is_empty());
        assert_eq!(ledger.units_sold(book), 0);
        assert_eq!(ledger.list_by_book(book, true).len(), 2);

        Ok(())
    }

    #[test]
    fn unknown_id_rejects_the_whole_batch() {
        let mut ledger = PurchaseLedger::default();
        let book = BookUuid::new();
        let mut ids = ledger.create_units(
            book,
            &UserId::from("KT"),
            1,
            PurchaseStatus::Shipped,
            Timestamp::UNIX_EPOCH,
        );
        ids.push(PurchaseUuid::new());

        let result = ledger.set_status(&ids, PurchaseStatus::Cancelled);

        assert!(
            matches!(result, Err(LedgerError::NotFound(_))),
            "expected NotFound, got {result:?}"
        );
        assert_eq!(ledger.units_sold(book), 1);
    }

    #[test]
    fn cancelled_units_cannot_be_reactivated() -> TestResult {
        let mut ledger = PurchaseLedger::default();
        let ids = ledger.create_units(
            BookUuid::new(),
            &UserId::from("KT"),
            1,
            PurchaseStatus::Shipped,
            Timestamp::UNIX_EPOCH,
        );

        ledger.set_status(&ids, PurchaseStatus::Cancelled)?;

        let result = ledger.set_status(&ids, PurchaseStatus::Delivered);

        assert!(
            matches!(result, Err(LedgerError::Transition(_))),
            "expected Transition, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn oldest_active_skips_cancelled_and_other_owners() -> TestResult {
        let mut ledger = PurchaseLedger::default();
        let book = BookUuid::new();
        let user = UserId::from("KT");
        let early = Timestamp::UNIX_EPOCH;
        let late = Timestamp::from_second(60)?;

        let first = ledger.create_units(book, &user, 2, PurchaseStatus::Shipped, early);
        let second = ledger.create_units(book, &user, 2, PurchaseStatus::Shipped, late);
        ledger.create_units(book, &UserId::from("other"), 2, PurchaseStatus::Shipped, early);

        ledger.set_status(first.get(..1).ok_or("missing id")?, PurchaseStatus::Cancelled)?;

        let picked = ledger.oldest_active(&user, book, 2);

        assert_eq!(
            picked,
            vec![
                *first.get(1).ok_or("missing id")?,
                *second.first().ok_or("missing id")?
            ]
        );

        Ok(())
    }
}
