//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use crate::auth::JwksCache;
use crate::config::Config;
use crate::db::{PageParams, PageQuery, Store};
use crate::error::ApiError;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (PostgreSQL, or memory when no database is configured)
    pub store: Arc<dyn Store>,
    /// JWKS cache for identity provider token validation
    pub jwks_cache: Option<Arc<JwksCache>>,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, jwks_cache: Option<Arc<JwksCache>>, config: Config) -> Self {
        Self {
            store,
            jwks_cache,
            config: Arc::new(config),
        }
    }

    /// Resolve list query parameters against the configured page size
    pub fn page_params(&self, query: &PageQuery) -> Result<PageParams, ApiError> {
        PageParams::from_query(query, self.config.page_size).map_err(ApiError::bad_request)
    }
}
