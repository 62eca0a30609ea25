//! Test context for service-level tests.

use std::sync::Arc;

use testresult::TestResult;

use crate::{
    database::Db,
    domain::{
        carts::LocalCartsService,
        catalog::{
            CatalogService, LocalCatalogService,
            models::{Book, NewBook},
        },
        orders::{LocalReconciliationService, ReconciliationService},
        users::{
            LocalUsersService, UsersService,
            models::{NewUser, UserId},
        },
    },
    storage::MemoryStorage,
};

use super::clock::ManualClock;

pub struct TestContext {
    pub clock: Arc<ManualClock>,
    pub users: LocalUsersService,
    pub catalog: LocalCatalogService,
    pub orders: Arc<LocalReconciliationService>,
    pub carts: LocalCartsService,
    pub admin: UserId,
    pub alice: UserId,
    pub bob: UserId,
}

impl TestContext {
    /// Services over empty in-memory storage, with the default accounts plus `alice` and `bob`.
    pub async fn new() -> Self {
        let db = Db::new(Arc::new(MemoryStorage::new()));
        let clock = Arc::new(ManualClock::new());

        let users = LocalUsersService::new(db.clone(), clock.clone());
        let catalog = LocalCatalogService::new(db.clone(), clock.clone());
        let orders = Arc::new(LocalReconciliationService::new(db.clone(), clock.clone()));
        let carts = LocalCartsService::new(db.clone(), orders.clone());

        users
            .ensure_default_accounts()
            .await
            .expect("Failed to seed default accounts");

        for id in ["alice", "bob"] {
            users
                .register(NewUser {
                    id: UserId::from(id),
                    password: "password".to_string(),
                    ..NewUser::default()
                })
                .await
                .expect("Failed to register test user");
        }

        Self {
            clock,
            users,
            catalog,
            orders,
            carts,
            admin: UserId::from("ADMIN"),
            alice: UserId::from("alice"),
            bob: UserId::from("bob"),
        }
    }

    /// Add an approved book and give it `stock` units.
    pub async fn create_book(&self, title: &str, price: u64, stock: u32) -> TestResult<Book> {
        let book = self
            .catalog
            .add_book(
                &self.admin,
                NewBook {
                    title: title.to_string(),
                    author: "Hermann Hesse".to_string(),
                    genre: "Novel".to_string(),
                    published_year: 1919,
                    price,
                    ..NewBook::default()
                },
            )
            .await?;

        Ok(self.orders.set_book_stock(&self.admin, book.id, stock).await?)
    }
}
