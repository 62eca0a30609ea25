//! User Directory

use crate::{
    database::Transaction,
    documents::DocumentKey,
    domain::users::models::{User, UserId},
    storage::StorageError,
};

/// All accounts, as persisted under the `users` key.
#[derive(Debug, Default)]
pub(crate) struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    pub(crate) async fn load(tx: &Transaction) -> Result<Self, StorageError> {
        Ok(Self {
            users: tx.load(&DocumentKey::Users).await?,
        })
    }

    pub(crate) fn stage(&self, tx: &mut Transaction) -> Result<(), StorageError> {
        tx.stage(&DocumentKey::Users, &self.users)
    }

    pub(crate) fn get(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|user| &user.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &UserId) -> Option<&mut User> {
        self.users.iter_mut().find(|user| &user.id == id)
    }

    pub(crate) fn contains(&self, id: &UserId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn insert(&mut self, user: User) {
        self.users.push(user);
    }

    pub(crate) fn remove(&mut self, id: &UserId) -> Option<User> {
        let index = self.users.iter().position(|user| &user.id == id)?;

        Some(self.users.remove(index))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }
}
