//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 specification served at `/api-docs/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::db::{
    CartItemsUpdate, CartResponse, NewSearch, NewSubscription, ProjectResponse,
    SavedSubscriptionsResponse, SavedSubscriptionsUpdate, SearchResponse, SubscriptionPatch,
    SubscriptionResponse, UserResponse,
};
use crate::handlers::{
    CurrentUserResponse, HealthResponse, ReadyResponse, SyncUserRequest, SyncUserResponse,
};

/// Registers the bearer token scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        let scheme = Http::builder()
            .scheme(HttpAuthScheme::Bearer)
            .bearer_format("JWT")
            .description(Some("Access token issued by the Keycloak realm"))
            .build();
        components.add_security_scheme("bearer_token", SecurityScheme::Http(scheme));
    }
}

/// Metagrid API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Metagrid API",
        version = "0.1.0",
        description = r#"
## Backend for the Metagrid climate data search portal

Stores the per-user state of the ESGF search frontend:

- **Projects** with their facets, grouped for display, and the ESG-Search
  URL that returns facet counts
- **Carts** of selected datasets
- **Saved searches** that reproduce a result set
- **Subscriptions** with a notification period

Users are identified by access tokens issued by a Keycloak realm. Call
`POST /api/v1/users/sync` once after sign-in to create the user's records.
"#,
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    tags(
        (name = "Users", description = "User synchronization from the identity provider"),
        (name = "Projects", description = "Project and facet catalogue"),
        (name = "Carts", description = "Per-user dataset carts"),
        (name = "Searches", description = "Saved searches"),
        (name = "Subscriptions", description = "Saved subscriptions and subscription definitions"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::users::sync_user_handler,
        crate::handlers::users::get_current_user_handler,
        crate::handlers::projects::list_projects_handler,
        crate::handlers::projects::get_project_handler,
        crate::handlers::carts::get_cart_handler,
        crate::handlers::carts::update_cart_handler,
        crate::handlers::searches::list_searches_handler,
        crate::handlers::searches::create_search_handler,
        crate::handlers::searches::get_search_handler,
        crate::handlers::searches::delete_search_handler,
        crate::handlers::subscriptions::get_saved_subscriptions_handler,
        crate::handlers::subscriptions::update_saved_subscriptions_handler,
        crate::handlers::subscriptions::list_subscriptions_handler,
        crate::handlers::subscriptions::create_subscription_handler,
        crate::handlers::subscriptions::get_subscription_handler,
        crate::handlers::subscriptions::replace_subscription_handler,
        crate::handlers::subscriptions::patch_subscription_handler,
        crate::handlers::subscriptions::delete_subscription_handler,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            SyncUserRequest,
            SyncUserResponse,
            CurrentUserResponse,
            UserResponse,
            ProjectResponse,
            CartResponse,
            CartItemsUpdate,
            NewSearch,
            SearchResponse,
            SavedSubscriptionsResponse,
            SavedSubscriptionsUpdate,
            NewSubscription,
            SubscriptionPatch,
            SubscriptionResponse,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/health",
            "/api/v1/users/sync",
            "/api/v1/projects/{id}",
            "/api/v1/carts/items/{user_id}",
            "/api/v1/carts/searches/{uuid}",
            "/api/v1/subscriptions/saved/{user_id}",
            "/api/v1/subscriptions/{uuid}",
        ] {
            assert!(paths.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_bearer_scheme_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_token"));
    }
}
