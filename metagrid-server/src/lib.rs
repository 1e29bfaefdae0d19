//! Metagrid Server Library - REST API for the climate data search portal
//!
//! This library exposes the server components for use in integration tests
//! and the CLI. The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod validation;

pub use auth::{AuthenticatedUser, JwksCache, JwtClaims};
pub use config::Config;
pub use db::{open_store, MemoryStore, Page, PageParams, PgStore, SeedSummary, Store, StoreError, User};
pub use error::ApiError;
pub use openapi::ApiDoc;
pub use routes::create_router;
pub use state::AppState;
