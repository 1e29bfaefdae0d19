//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod carts;
pub mod health;
pub mod projects;
pub mod searches;
pub mod subscriptions;
pub mod users;

pub use crate::state::AppState;
pub use carts::{get_cart_handler, update_cart_handler};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use projects::{get_project_handler, list_projects_handler};
pub use searches::{
    create_search_handler, delete_search_handler, get_search_handler, list_searches_handler,
};
pub use subscriptions::{
    create_subscription_handler, delete_subscription_handler, get_saved_subscriptions_handler,
    get_subscription_handler, list_subscriptions_handler, patch_subscription_handler,
    replace_subscription_handler, update_saved_subscriptions_handler,
};
pub use users::{
    get_current_user_handler, sync_user_handler, CurrentUserResponse, SyncUserRequest,
    SyncUserResponse,
};
