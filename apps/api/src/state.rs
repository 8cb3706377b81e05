//! Shared application state.

use std::sync::Arc;

use galley_db::Database;
use galley_relay::{Broadcaster, CacheStore};

use crate::config::ApiConfig;

/// Handles shared by every request. Cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: Arc<dyn CacheStore>,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(
        db: Database,
        cache: Arc<dyn CacheStore>,
        broadcaster: Arc<dyn Broadcaster>,
        config: ApiConfig,
    ) -> Self {
        AppState {
            db,
            cache,
            broadcaster,
            config: Arc::new(config),
        }
    }
}
