//! Users service.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::SignedDuration;
use mockall::automock;
use tracing::info;

use crate::{
    clock::Clock,
    database::Db,
    domain::{
        catalog::{models::BookUuid, store::Catalog},
        users::{
            directory::UserDirectory,
            errors::UsersServiceError,
            models::{NewUser, ProfileUpdate, Role, User, UserId},
            password::{hash_password, verify_password},
        },
    },
};

/// Accounts seeded into an empty store: `(id, password, role)`.
pub const DEFAULT_ACCOUNTS: [(&str, &str, Role); 2] =
    [("ADMIN", "1234", Role::Admin), ("KT", "1234", Role::User)];

#[derive(Clone)]
pub struct LocalUsersService {
    db: Db,
    clock: Arc<dyn Clock>,
}

impl LocalUsersService {
    #[must_use]
    pub fn new(db: Db, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

fn account(id: UserId, password: &str, role: Role) -> User {
    User {
        id,
        password_hash: hash_password(password),
        role,
        email: None,
        name: None,
        gender: None,
        phone: None,
        address: None,
        detail_address: None,
        zip_code: None,
        wishlist: Vec::new(),
        suspension_until: None,
    }
}

fn require<'a>(users: &'a UserDirectory, id: &UserId) -> Result<&'a User, UsersServiceError> {
    users
        .get(id)
        .ok_or_else(|| UsersServiceError::NotFound(id.clone()))
}

fn require_mut<'a>(
    users: &'a mut UserDirectory,
    id: &UserId,
) -> Result<&'a mut User, UsersServiceError> {
    users
        .get_mut(id)
        .ok_or_else(|| UsersServiceError::NotFound(id.clone()))
}

#[async_trait]
impl UsersService for LocalUsersService {
    async fn register(&self, user: NewUser) -> Result<User, UsersServiceError> {
        if user.id.as_str().trim().is_empty() {
            return Err(UsersServiceError::InvalidData("id cannot be empty"));
        }

        if user.password.is_empty() {
            return Err(UsersServiceError::InvalidData("password cannot be empty"));
        }

        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        if users.contains(&user.id) {
            return Err(UsersServiceError::AlreadyExists(user.id));
        }

        let created = User {
            email: user.email,
            name: user.name,
            gender: user.gender,
            phone: user.phone,
            address: user.address,
            detail_address: user.detail_address,
            zip_code: user.zip_code,
            ..account(user.id, &user.password, Role::User)
        };

        users.insert(created.clone());
        users.stage(&mut tx)?;

        tx.commit().await?;

        info!(user_id = %created.id, "registered user");

        Ok(created)
    }

    async fn authenticate(&self, id: &UserId, password: &str) -> Result<User, UsersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        users
            .get(id)
            .filter(|user| verify_password(password, &user.password_hash))
            .cloned()
            .ok_or(UsersServiceError::InvalidCredentials)
    }

    async fn get_user(&self, id: &UserId) -> Result<User, UsersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        require(&users, id).cloned()
    }

    async fn list_users(&self) -> Result<Vec<User>, UsersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        Ok(users.iter().cloned().collect())
    }

    async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<User, UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        let user = require_mut(&mut users, id)?;

        let ProfileUpdate {
            email,
            name,
            gender,
            phone,
            address,
            detail_address,
            zip_code,
        } = update;

        user.email = email.or(user.email.take());
        user.name = name.or(user.name.take());
        user.gender = gender.or(user.gender);
        user.phone = phone.or(user.phone.take());
        user.address = address.or(user.address.take());
        user.detail_address = detail_address.or(user.detail_address.take());
        user.zip_code = zip_code.or(user.zip_code.take());

        let updated = user.clone();

        users.stage(&mut tx)?;
        tx.commit().await?;

        Ok(updated)
    }

    async fn change_password(
        &self,
        id: &UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), UsersServiceError> {
        if new_password.is_empty() {
            return Err(UsersServiceError::InvalidData("password cannot be empty"));
        }

        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        let user = require_mut(&mut users, id)?;

        if !verify_password(current, &user.password_hash) {
            return Err(UsersServiceError::InvalidCredentials);
        }

        user.password_hash = hash_password(new_password);

        users.stage(&mut tx)?;
        tx.commit().await?;

        info!(user_id = %id, "changed password");

        Ok(())
    }

    async fn reset_password(
        &self,
        id: &UserId,
        email: &str,
        new_password: &str,
    ) -> Result<(), UsersServiceError> {
        if new_password.is_empty() {
            return Err(UsersServiceError::InvalidData("password cannot be empty"));
        }

        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        let user = users
            .get_mut(id)
            .filter(|user| user.email.as_deref() == Some(email))
            .ok_or(UsersServiceError::InvalidCredentials)?;

        user.password_hash = hash_password(new_password);

        users.stage(&mut tx)?;
        tx.commit().await?;

        info!(user_id = %id, "reset password");

        Ok(())
    }

    async fn find_user_ids(
        &self,
        email: &str,
        name: &str,
    ) -> Result<Vec<UserId>, UsersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        Ok(users
            .iter()
            .filter(|user| {
                user.email.as_deref() == Some(email) && user.name.as_deref() == Some(name)
            })
            .map(|user| user.id.clone())
            .collect())
    }

    async fn delete_user(&self, caller: &UserId, id: &UserId) -> Result<(), UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        let caller_is_admin = require(&users, caller)?.is_admin();

        if caller != id && !caller_is_admin {
            return Err(UsersServiceError::Unauthorized);
        }

        users
            .remove(id)
            .ok_or_else(|| UsersServiceError::NotFound(id.clone()))?;

        users.stage(&mut tx)?;
        tx.commit().await?;

        info!(user_id = %id, deleted_by = %caller, "deleted user");

        Ok(())
    }

    async fn suspend_user(
        &self,
        caller: &UserId,
        id: &UserId,
        days: u32,
    ) -> Result<User, UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        if !require(&users, caller)?.is_admin() {
            return Err(UsersServiceError::Unauthorized);
        }

        let user = require_mut(&mut users, id)?;

        if user.is_admin() {
            return Err(UsersServiceError::InvalidData("administrators cannot be suspended"));
        }

        user.suspension_until = if days == 0 {
            None
        } else {
            let span = SignedDuration::from_hours(i64::from(days) * 24);

            Some(
                self.clock
                    .now()
                    .checked_add(span)
                    .map_err(|_err| UsersServiceError::InvalidData("suspension is too long"))?,
            )
        };

        let updated = user.clone();

        users.stage(&mut tx)?;
        tx.commit().await?;

        info!(
            user_id = %id,
            days,
            until = ?updated.suspension_until,
            "updated suspension"
        );

        Ok(updated)
    }

    async fn is_suspended(&self, id: &UserId) -> Result<bool, UsersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        Ok(require(&users, id)?.is_suspended_at(self.clock.now()))
    }

    async fn toggle_wishlist(
        &self,
        id: &UserId,
        book: BookUuid,
    ) -> Result<bool, UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;
        let catalog = Catalog::load(&tx).await?;

        let user = require_mut(&mut users, id)?;

        let listed = if let Some(index) = user.wishlist.iter().position(|entry| *entry == book) {
            user.wishlist.remove(index);
            false
        } else {
            if catalog.get(book).is_none() {
                return Err(UsersServiceError::BookNotFound(book));
            }

            user.wishlist.push(book);
            true
        };

        users.stage(&mut tx)?;
        tx.commit().await?;

        Ok(listed)
    }

    async fn add_to_wishlist(
        &self,
        id: &UserId,
        book: BookUuid,
    ) -> Result<Vec<BookUuid>, UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;
        let catalog = Catalog::load(&tx).await?;

        if catalog.get(book).is_none() {
            return Err(UsersServiceError::BookNotFound(book));
        }

        let user = require_mut(&mut users, id)?;

        if user.wishlist.contains(&book) {
            return Ok(user.wishlist.clone());
        }

        user.wishlist.push(book);

        let wishlist = user.wishlist.clone();

        users.stage(&mut tx)?;
        tx.commit().await?;

        Ok(wishlist)
    }

    async fn remove_from_wishlist(
        &self,
        id: &UserId,
        books: Vec<BookUuid>,
    ) -> Result<Vec<BookUuid>, UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        let user = require_mut(&mut users, id)?;

        user.wishlist.retain(|entry| !books.contains(entry));

        let wishlist = user.wishlist.clone();

        users.stage(&mut tx)?;
        tx.commit().await?;

        Ok(wishlist)
    }

    async fn wishlist(&self, id: &UserId) -> Result<Vec<BookUuid>, UsersServiceError> {
        let tx = self.db.begin().await;
        let users = UserDirectory::load(&tx).await?;

        Ok(require(&users, id)?.wishlist.clone())
    }

    async fn ensure_default_accounts(&self) -> Result<Vec<UserId>, UsersServiceError> {
        let mut tx = self.db.begin().await;
        let mut users = UserDirectory::load(&tx).await?;

        let mut created = Vec::new();

        for (id, password, role) in DEFAULT_ACCOUNTS {
            let id = UserId::from(id);

            if !users.contains(&id) {
                users.insert(account(id.clone(), password, role));
                created.push(id);
            }
        }

        if created.is_empty() {
            return Ok(created);
        }

        users.stage(&mut tx)?;
        tx.commit().await?;

        info!(accounts = created.len(), "seeded default accounts");

        Ok(created)
    }
}

#[automock]
#[async_trait]
pub trait UsersService: Send + Sync {
    /// Register a regular user account.
    async fn register(&self, user: NewUser) -> Result<User, UsersServiceError>;

    /// Check an id and password pair.
    async fn authenticate(&self, id: &UserId, password: &str) -> Result<User, UsersServiceError>;

    /// Retrieve a single user.
    async fn get_user(&self, id: &UserId) -> Result<User, UsersServiceError>;

    /// Retrieve all users.
    async fn list_users(&self) -> Result<Vec<User>, UsersServiceError>;

    /// Update profile fields; `None` keeps the current value.
    async fn update_profile(
        &self,
        id: &UserId,
        update: ProfileUpdate,
    ) -> Result<User, UsersServiceError>;

    /// Change a password after checking the current one.
    async fn change_password(
        &self,
        id: &UserId,
        current: &str,
        new_password: &str,
    ) -> Result<(), UsersServiceError>;

    /// Replace a forgotten password, proving ownership with the account email.
    async fn reset_password(
        &self,
        id: &UserId,
        email: &str,
        new_password: &str,
    ) -> Result<(), UsersServiceError>;

    /// Find the ids registered with an email and name.
    async fn find_user_ids(&self, email: &str, name: &str)
    -> Result<Vec<UserId>, UsersServiceError>;

    /// Delete an account. Users may delete themselves; admins may delete anyone.
    async fn delete_user(&self, caller: &UserId, id: &UserId) -> Result<(), UsersServiceError>;

    /// Suspend a user for `days` days from now; `0` lifts the suspension.
    async fn suspend_user(
        &self,
        caller: &UserId,
        id: &UserId,
        days: u32,
    ) -> Result<User, UsersServiceError>;

    /// Whether the user is currently suspended.
    async fn is_suspended(&self, id: &UserId) -> Result<bool, UsersServiceError>;

    /// Add or remove a book from the wishlist, returning whether it is now listed.
    async fn toggle_wishlist(&self, id: &UserId, book: BookUuid)
    -> Result<bool, UsersServiceError>;

    /// Add a book to the wishlist if it is not already there.
    async fn add_to_wishlist(
        &self,
        id: &UserId,
        book: BookUuid,
    ) -> Result<Vec<BookUuid>, UsersServiceError>;

    /// Remove every given book from the wishlist.
    async fn remove_from_wishlist(
        &self,
        id: &UserId,
        books: Vec<BookUuid>,
    ) -> Result<Vec<BookUuid>, UsersServiceError>;

    /// Retrieve the wishlist.
    async fn wishlist(&self, id: &UserId) -> Result<Vec<BookUuid>, UsersServiceError>;

    /// Create the default administrator and user accounts when missing.
    async fn ensure_default_accounts(&self) -> Result<Vec<UserId>, UsersServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, Timestamp};
    use testresult::TestResult;

    use crate::{
        clock::MockClock,
        database::Db,
        storage::MemoryStorage,
        test::TestContext,
    };

    use super::*;

    fn new_user(id: &str) -> NewUser {
        NewUser {
            id: UserId::from(id),
            password: "secret".to_string(),
            email: Some(format!("{}@example.com", id.to_lowercase())),
            name: Some(id.to_string()),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.users.register(new_user("reader")).await?;

        let user = ctx
            .users
            .authenticate(&UserId::from("reader"), "secret")
            .await?;

        assert_eq!(user.role, Role::User);
        assert!(user.wishlist.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn register_duplicate_id_returns_already_exists() {
        let ctx = TestContext::new().await;

        let result = ctx.users.register(new_user("KT")).await;

        assert!(
            matches!(result, Err(UsersServiceError::AlreadyExists(_))),
            "expected AlreadyExists, got {result:?}"
        );
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let ctx = TestContext::new().await;

        let result = ctx.users.authenticate(&ctx.alice, "nope").await;

        assert!(
            matches!(result, Err(UsersServiceError::InvalidCredentials)),
            "expected InvalidCredentials, got {result:?}"
        );
    }

    #[tokio::test]
    async fn default_accounts_are_seeded_once() -> TestResult {
        let db = Db::new(Arc::new(MemoryStorage::new()));
        let mut clock = MockClock::new();
        clock.expect_now().return_const(Timestamp::UNIX_EPOCH);

        let users = LocalUsersService::new(db, Arc::new(clock));

        let created = users.ensure_default_accounts().await?;
        let again = users.ensure_default_accounts().await?;

        assert_eq!(created, vec![UserId::from("ADMIN"), UserId::from("KT")]);
        assert!(again.is_empty());
        assert!(users.get_user(&UserId::from("ADMIN")).await?.is_admin());

        Ok(())
    }

    #[tokio::test]
    async fn suspension_expires_with_time() -> TestResult {
        let ctx = TestContext::new().await;

        let user = ctx.users.suspend_user(&ctx.admin, &ctx.alice, 3).await?;

        assert!(user.suspension_until.is_some());
        assert!(ctx.users.is_suspended(&ctx.alice).await?);

        ctx.clock.advance(SignedDuration::from_hours(72));

        assert!(!ctx.users.is_suspended(&ctx.alice).await?);

        Ok(())
    }

    #[tokio::test]
    async fn zero_day_suspension_lifts_it() -> TestResult {
        let ctx = TestContext::new().await;

        ctx.users.suspend_user(&ctx.admin, &ctx.alice, 7).await?;
        let user = ctx.users.suspend_user(&ctx.admin, &ctx.alice, 0).await?;

        assert!(user.suspension_until.is_none());
        assert!(!ctx.users.is_suspended(&ctx.alice).await?);

        Ok(())
    }

    #[tokio::test]
    async fn only_admins_suspend() {
        let ctx = TestContext::new().await;

        let result = ctx.users.suspend_user(&ctx.alice, &ctx.bob, 1).await;

        assert!(
            matches!(result, Err(UsersServiceError::Unauthorized)),
            "expected Unauthorized, got {result:?}"
        );
    }

    #[tokio::test]
    async fn wishlist_toggle_and_bulk_remove() -> TestResult {
        let ctx = TestContext::new().await;
        let first = ctx.create_book("Demian", 9_000, 1).await?;
        let second = ctx.create_book("Siddhartha", 11_000, 1).await?;

        assert!(ctx.users.toggle_wishlist(&ctx.alice, first.id).await?);
        ctx.users.add_to_wishlist(&ctx.alice, second.id).await?;
        let wishlist = ctx.users.add_to_wishlist(&ctx.alice, second.id).await?;

        assert_eq!(wishlist, vec![first.id, second.id]);

        assert!(!ctx.users.toggle_wishlist(&ctx.alice, first.id).await?);

        let wishlist = ctx
            .users
            .remove_from_wishlist(&ctx.alice, vec![first.id, second.id])
            .await?;

        assert!(wishlist.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn wishlist_rejects_unknown_books() {
        let ctx = TestContext::new().await;

        let result = ctx.users.toggle_wishlist(&ctx.alice, BookUuid::new()).await;

        assert!(
            matches!(result, Err(UsersServiceError::BookNotFound(_))),
            "expected BookNotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn reset_password_requires_matching_email() -> TestResult {
        let ctx = TestContext::new().await;
        ctx.users.register(new_user("reader")).await?;
        let id = UserId::from("reader");

        let result = ctx
            .users
            .reset_password(&id, "someone@example.com", "fresh")
            .await;

        assert!(
            matches!(result, Err(UsersServiceError::InvalidCredentials)),
            "expected InvalidCredentials, got {result:?}"
        );

        ctx.users
            .reset_password(&id, "reader@example.com", "fresh")
            .await?;
        ctx.users.authenticate(&id, "fresh").await?;

        Ok(())
    }

    #[tokio::test]
    async fn find_user_ids_matches_email_and_name() -> TestResult {
        let ctx = TestContext::new().await;
        ctx.users.register(new_user("reader")).await?;

        let ids = ctx
            .users
            .find_user_ids("reader@example.com", "reader")
            .await?;

        assert_eq!(ids, vec![UserId::from("reader")]);

        Ok(())
    }

    #[tokio::test]
    async fn users_cannot_delete_each_other() -> TestResult {
        let ctx = TestContext::new().await;

        let result = ctx.users.delete_user(&ctx.alice, &ctx.bob).await;

        assert!(
            matches!(result, Err(UsersServiceError::Unauthorized)),
            "expected Unauthorized, got {result:?}"
        );

        ctx.users.delete_user(&ctx.admin, &ctx.bob).await?;

        let result = ctx.users.get_user(&ctx.bob).await;

        assert!(
            matches!(result, Err(UsersServiceError::NotFound(_))),
            "expected NotFound after deletion, got {result:?}"
        );

        Ok(())
    }
}
