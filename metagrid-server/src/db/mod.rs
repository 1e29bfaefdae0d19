//! Database module for Metagrid Server
//!
//! Contains entities, repositories, and the two storage backends:
//! - **PostgreSQL** ([`PgStore`]): production storage, migrations embedded.
//! - **Memory** ([`MemoryStore`]): used when `DATABASE_URL` is not set
//!   (development and tests). Data is lost on restart.

pub mod cart;
pub mod memory;
pub mod page;
pub mod postgres;
pub mod project;
pub mod search;
pub mod subscription;
pub mod user;

use std::sync::Arc;

use async_trait::async_trait;
use metagrid_core::JsonList;
use uuid::Uuid;

use crate::config::Config;

pub use cart::{Cart, CartItemsUpdate, CartResponse};
pub use memory::MemoryStore;
pub use page::{Page, PageParams, PageQuery, MAX_PAGE_LIMIT};
pub use postgres::PgStore;
pub use project::{Facet, FacetGroup, Project, ProjectResponse, ProjectWithFacets, SeedSummary};
pub use search::{NewSearch, Search, SearchResponse};
pub use subscription::{
    NewSubscription, SavedSubscriptions, SavedSubscriptionsResponse, SavedSubscriptionsUpdate,
    Subscription, SubscriptionPatch, SubscriptionResponse,
};
pub use user::{SyncUser, User, UserResponse};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Stored data is invalid: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Translate a unique-constraint violation into [`StoreError::Conflict`].
    pub(crate) fn from_sqlx(err: sqlx::Error, conflict_message: &str) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(conflict_message.to_string())
            }
            _ => StoreError::Query(err),
        }
    }
}

/// Users synchronized from the identity provider.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by identity provider subject
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError>;

    /// Find user by internal ID
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Create or update a user by subject. New users get an empty cart and an
    /// empty saved-subscriptions list. Returns the user and whether it was created.
    async fn sync_user(&self, input: SyncUser) -> Result<(User, bool), StoreError>;
}

/// Read access to projects and facets, plus catalogue seeding.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// List projects ordered by id, each with its facets ordered by id
    async fn list_projects(
        &self,
        params: &PageParams,
    ) -> Result<Page<ProjectWithFacets>, StoreError>;

    /// Find a project with its facets
    async fn find_project(&self, id: i32) -> Result<Option<ProjectWithFacets>, StoreError>;

    /// Check that a project exists
    async fn project_exists(&self, id: i32) -> Result<bool, StoreError>;

    /// Upsert the built-in catalogue of projects, facet groups and facets
    async fn seed_catalog(&self) -> Result<SeedSummary, StoreError>;
}

/// Per-user cart of selected datasets.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError>;

    /// Replace the cart's items; `None` when the user has no cart
    async fn replace_cart_items(
        &self,
        user_id: Uuid,
        items: JsonList,
    ) -> Result<Option<Cart>, StoreError>;
}

/// Saved searches, always scoped to their owner.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    async fn list_searches(
        &self,
        user_id: Uuid,
        params: &PageParams,
    ) -> Result<Page<Search>, StoreError>;

    async fn create_search(&self, user_id: Uuid, input: NewSearch) -> Result<Search, StoreError>;

    async fn find_search(&self, user_id: Uuid, uuid: Uuid) -> Result<Option<Search>, StoreError>;

    /// Delete a search; `false` when it does not exist for this user
    async fn delete_search(&self, user_id: Uuid, uuid: Uuid) -> Result<bool, StoreError>;
}

/// Saved subscriptions list and subscription definitions, scoped to their owner.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_saved_subscriptions(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SavedSubscriptions>, StoreError>;

    async fn replace_saved_subscriptions(
        &self,
        user_id: Uuid,
        subscriptions: JsonList,
    ) -> Result<Option<SavedSubscriptions>, StoreError>;

    async fn list_subscriptions(
        &self,
        user_id: Uuid,
        params: &PageParams,
    ) -> Result<Page<Subscription>, StoreError>;

    async fn create_subscription(
        &self,
        user_id: Uuid,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError>;

    async fn find_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Replace all mutable fields of a subscription
    async fn replace_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
        input: NewSubscription,
    ) -> Result<Option<Subscription>, StoreError>;

    /// Update only the fields present in `patch`
    async fn patch_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, StoreError>;

    async fn delete_subscription(&self, user_id: Uuid, uuid: Uuid) -> Result<bool, StoreError>;
}

/// A complete storage backend.
#[async_trait]
pub trait Store:
    UserRepository + ProjectRepository + CartRepository + SearchRepository + SubscriptionRepository
{
    /// Backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Check backend health (always Ok for memory backend)
    async fn check_health(&self) -> Result<(), StoreError>;
}

/// Open the configured backend.
///
/// PostgreSQL is migrated and, unless `seed_catalog` is off, the built-in
/// catalogue is upserted. The memory fallback always starts with the
/// catalogue so projects can be browsed and searches saved.
pub async fn open_store(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    match config.database_url.as_deref() {
        Some(database_url) => {
            let store = PgStore::connect(
                database_url,
                config.database_max_connections,
                config.database_min_connections,
            )
            .await?;
            store.migrate().await?;
            if config.seed_catalog {
                store.seed_catalog().await?;
            }
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Ok(Arc::new(MemoryStore::with_catalog()))
        }
    }
}
