pub mod api;
pub mod model;
pub mod service;
pub mod store;
pub mod worker;

use std::sync::Arc;

use axum::Router;
use cookery_core::Module;
use cookery_sql::SQLStore;

use service::{EngagementConfig, RecipeEngine};
use store::EngagementStore;
use worker::WorkerConfig;

/// The Recipe module — publication workflow plus engagement.
///
/// Embed this in the server to get recipe CRUD, the review workflow
/// (with the background checks worker), threaded comments, like/favorite
/// toggles and deduplicated view counting.
pub struct RecipeModule {
    engine: Arc<RecipeEngine>,
    _worker_cancel: tokio_util::sync::CancellationToken,
}

impl RecipeModule {
    /// Create the recipe module, initialise storage, and start the
    /// background checks worker.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, cookery_core::ServiceError> {
        Self::with_config(db, EngagementConfig::default(), WorkerConfig::default())
    }

    /// Create with explicit engagement and worker configuration.
    pub fn with_config(
        db: Arc<dyn SQLStore>,
        engagement: EngagementConfig,
        worker_config: WorkerConfig,
    ) -> Result<Self, cookery_core::ServiceError> {
        let store = Arc::new(EngagementStore::new(db)?);
        let engine = Arc::new(RecipeEngine::with_config(store, engagement));
        let cancel = worker::start(Arc::clone(&engine), worker_config);

        Ok(Self {
            engine,
            _worker_cancel: cancel,
        })
    }

    /// Get a reference to the RecipeEngine for programmatic access.
    pub fn engine(&self) -> &Arc<RecipeEngine> {
        &self.engine
    }
}

impl Module for RecipeModule {
    fn name(&self) -> &str {
        "recipe"
    }

    fn routes(&self) -> Router {
        api::router(Arc::clone(&self.engine))
    }
}
