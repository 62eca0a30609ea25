//! App Context

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::{
    clock::{Clock, SystemClock},
    database::{self, Db},
    domain::{
        carts::{CartsService, LocalCartsService},
        catalog::{CatalogService, LocalCatalogService},
        orders::{LocalReconciliationService, ReconciliationService},
        users::{LocalUsersService, UsersService, UsersServiceError},
    },
    storage::StorageError,
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] StorageError),

    #[error("failed to seed default accounts")]
    Seed(#[source] UsersServiceError),
}

#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<dyn UsersService>,
    pub catalog: Arc<dyn CatalogService>,
    pub orders: Arc<dyn ReconciliationService>,
    pub carts: Arc<dyn CartsService>,
}

impl AppContext {
    /// Wire every service over one database and clock.
    #[must_use]
    pub fn new(db: &Db, clock: &Arc<dyn Clock>) -> Self {
        let orders: Arc<dyn ReconciliationService> = Arc::new(LocalReconciliationService::new(
            db.clone(),
            Arc::clone(clock),
        ));

        Self {
            users: Arc::new(LocalUsersService::new(db.clone(), Arc::clone(clock))),
            catalog: Arc::new(LocalCatalogService::new(db.clone(), Arc::clone(clock))),
            carts: Arc::new(LocalCartsService::new(db.clone(), Arc::clone(&orders))),
            orders,
        }
    }

    /// Build application context from a database URL.
    ///
    /// The default accounts are created when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection or seeding accounts fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let db = database::connect(url)
            .await
            .map_err(AppInitError::Database)?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let context = Self::new(&db, &clock);

        let created = context
            .users
            .ensure_default_accounts()
            .await
            .map_err(AppInitError::Seed)?;

        if !created.is_empty() {
            info!(accounts = created.len(), "created default accounts");
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::users::models::UserId;

    use super::*;

    #[tokio::test]
    async fn in_memory_context_seeds_default_accounts() -> TestResult {
        let context = AppContext::from_database_url("sqlite::memory:").await?;

        let admin = context.users.get_user(&UserId::from("ADMIN")).await?;
        let regular = context.users.authenticate(&UserId::from("KT"), "1234").await?;

        assert!(admin.is_admin());
        assert!(!regular.is_admin());

        Ok(())
    }
}
