use std::sync::Arc;

use storage::repository::Storage;
use storage::seed::default_catalog;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::leaderboard::LeaderboardService;
use crate::sessions::QuizEngine;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    engine: Arc<QuizEngine>,
    leaderboard: Arc<LeaderboardService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, seeding the starter catalog
    /// into an empty database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or seeding fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let services = Self::from_storage(&storage, clock);
        services.catalog.seed_if_empty(default_catalog()).await?;
        Ok(services)
    }

    /// Build services over fresh in-memory storage, seeded with the starter catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if seeding fails.
    pub async fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        let services = Self::from_storage(&Storage::in_memory(), clock);
        services.catalog.seed_if_empty(default_catalog()).await?;
        Ok(services)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.questions)));
        let engine = Arc::new(QuizEngine::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.results),
        ));
        let leaderboard = Arc::new(LeaderboardService::new(Arc::clone(&storage.results)));
        Self {
            catalog,
            engine,
            leaderboard,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn engine(&self) -> Arc<QuizEngine> {
        Arc::clone(&self.engine)
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }
}
