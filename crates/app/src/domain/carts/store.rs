//! Cart Store

use crate::{
    database::Transaction,
    documents::DocumentKey,
    domain::{carts::models::CartLine, catalog::models::BookUuid, users::models::UserId},
    storage::StorageError,
};

#[derive(Debug)]
pub(crate) struct Cart {
    owner: UserId,
    lines: Vec<CartLine>,
}

impl Cart {
    pub(crate) async fn load(tx: &Transaction, owner: &UserId) -> Result<Self, StorageError> {
        Ok(Self {
            owner: owner.clone(),
            lines: tx.load(&DocumentKey::Cart(owner.clone())).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::Cart(self.owner.clone()), &self.lines)
    }

    pub(crate) fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub(crate) fn line_mut(&mut self, book: BookUuid) -> Option<&mut CartLine> {
        self.lines.iter_mut().find(|line| line.book_id == book)
    }

    pub(crate) fn push(&mut self, line: CartLine) {
        self.lines.push(line);
    }

    /// Drop the lines for `books`, returning how many were removed.
    pub(crate) fn remove(&mut self, books: &[BookUuid]) -> usize {
        let before = self.lines.len();

        self.lines.retain(|line| !books.contains(&line.book_id));

        before - self.lines.len()
    }

    pub(crate) fn clear(&mut self) {
        self.lines.clear();
    }
}
