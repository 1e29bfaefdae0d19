//! JWT authentication module
//!
//! Provides `AuthenticatedUser` and `JwtClaims` extractors for Axum handlers.
//! Access tokens issued by the Keycloak realm are validated against its JWKS
//! endpoint with a 1-hour cache TTL.

use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, jwk, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::db::User;
use crate::error::ApiError;
use crate::state::AppState;

/// JWKS cache TTL (1 hour)
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Claims read from OIDC access tokens
#[derive(Debug, Deserialize)]
struct TokenClaims {
    /// Subject (identity provider user ID)
    sub: String,
    /// Expiration time (validated by jsonwebtoken)
    #[allow(dead_code)]
    exp: u64,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

/// Cached JWKS keys with timestamp
struct CachedJwks {
    keys: Vec<jwk::Jwk>,
    fetched_at: Instant,
}

/// JWKS cache that fetches and caches the realm's JSON Web Key Set
pub struct JwksCache {
    keys: RwLock<Option<CachedJwks>>,
    /// `None` for caches built from a fixed key set
    jwks_url: Option<String>,
    issuer: Option<String>,
    http_client: reqwest::Client,
}

/// JWKS document
#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<jwk::Jwk>,
}

impl JwksCache {
    /// Create a new JWKS cache for the given JWKS URL
    pub fn new(jwks_url: String) -> Self {
        Self {
            keys: RwLock::new(None),
            jwks_url: Some(jwks_url),
            issuer: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Create a cache that always serves `keys` and never fetches
    pub fn with_keys(keys: Vec<jwk::Jwk>) -> Self {
        Self {
            keys: RwLock::new(Some(CachedJwks {
                keys,
                fetched_at: Instant::now(),
            })),
            jwks_url: None,
            issuer: None,
            http_client: reqwest::Client::new(),
        }
    }

    /// Require the `iss` claim to match `issuer`
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Get cached JWKS keys, fetching if expired or not yet cached
    async fn get_keys(&self) -> Result<Vec<jwk::Jwk>, ApiError> {
        let Some(jwks_url) = self.jwks_url.as_deref() else {
            // Fixed key set never expires
            let cache = self.keys.read().await;
            return Ok(cache.as_ref().map(|c| c.keys.clone()).unwrap_or_default());
        };

        // Try read lock first (fast path)
        {
            let cache = self.keys.read().await;
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let mut cache = self.keys.write().await;

        // Double-check after acquiring write lock (another task may have refreshed)
        if let Some(ref cached) = *cache {
            if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                return Ok(cached.keys.clone());
            }
        }

        let response = self.http_client.get(jwks_url).send().await.map_err(|e| {
            tracing::error!(error = %e, jwks_url = %jwks_url, "Failed to fetch JWKS");
            ApiError::service_unavailable("Authentication service temporarily unavailable")
        })?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(status = %status, jwks_url = %jwks_url, "JWKS endpoint returned error");
            return Err(ApiError::service_unavailable(
                "Authentication service temporarily unavailable",
            ));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse JWKS response");
            ApiError::service_unavailable("Authentication service temporarily unavailable")
        })?;

        let keys = jwks.keys;
        tracing::info!(key_count = keys.len(), "Refreshed JWKS cache");

        *cache = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    /// Find a JWK by key ID
    async fn find_key(&self, kid: &str) -> Result<jwk::Jwk, ApiError> {
        let keys = self.get_keys().await?;
        keys.into_iter()
            .find(|k| k.common.key_id.as_deref() == Some(kid))
            .ok_or_else(|| {
                ApiError::auth_error(
                    "AUTH_UNKNOWN_KEY",
                    format!("No matching key found for kid '{}'", kid),
                )
            })
    }
}

/// Validate a JWT token and extract its claims.
async fn validate_jwt(token: &str, jwks_cache: &JwksCache) -> Result<TokenClaims, ApiError> {
    let header = decode_header(token).map_err(|e| {
        ApiError::auth_error("AUTH_INVALID_TOKEN", format!("Invalid JWT header: {}", e))
    })?;

    let kid = header.kid.ok_or_else(|| {
        ApiError::auth_error("AUTH_INVALID_TOKEN", "JWT header missing 'kid' field")
    })?;

    let jwk = jwks_cache.find_key(&kid).await?;

    let decoding_key = DecodingKey::from_jwk(&jwk).map_err(|e| {
        tracing::error!(error = %e, kid = %kid, "Failed to convert JWK to decoding key");
        ApiError::auth_error("AUTH_INVALID_TOKEN", "Failed to process signing key")
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.validate_exp = true;
    // Keycloak access tokens carry `account` or client-specific audiences
    validation.validate_aud = false;
    if let Some(issuer) = jwks_cache.issuer.as_deref() {
        validation.set_issuer(&[issuer]);
    }

    let token_data =
        decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::auth_error("AUTH_TOKEN_EXPIRED", "JWT token has expired")
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::auth_error("AUTH_INVALID_TOKEN", "Invalid JWT signature")
            }
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
                ApiError::auth_error("AUTH_INVALID_TOKEN", "JWT issuer is not trusted")
            }
            _ => ApiError::auth_error(
                "AUTH_INVALID_TOKEN",
                format!("JWT validation failed: {}", e),
            ),
        })?;

    Ok(token_data.claims)
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::auth_error("AUTH_MISSING_TOKEN", "Missing Authorization header")
        })?;

    let auth_value = auth_header.to_str().map_err(|_| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Invalid Authorization header encoding",
        )
    })?;

    auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Authorization header must use Bearer scheme",
        )
    })
}

/// Validate the request's bearer token against the configured key set
async fn claims_from_parts(parts: &Parts, state: &AppState) -> Result<TokenClaims, ApiError> {
    let token = extract_bearer_token(parts)?;

    let jwks_cache = state.jwks_cache.as_ref().ok_or_else(|| {
        ApiError::service_unavailable(
            "JWT authentication not configured (set JWKS_URL or KEYCLOAK_URL and KEYCLOAK_REALM)",
        )
    })?;

    validate_jwt(token, jwks_cache).await
}

/// Authenticated user extractor that validates the JWT and resolves the user from the store.
///
/// The extractor:
/// 1. Reads `Authorization: Bearer <token>` header
/// 2. Validates the JWT against the realm's JWKS
/// 3. Looks up the user by subject (JWT `sub` claim)
///
/// Returns 401 with structured error codes on any failure. Users that never
/// called `POST /users/sync` get `AUTH_USER_NOT_FOUND`.
pub struct AuthenticatedUser {
    pub user: User,
    pub subject: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state).await?;

        let user = state
            .store
            .find_by_subject(&claims.sub)
            .await?
            .ok_or_else(|| {
                ApiError::auth_error(
                    "AUTH_USER_NOT_FOUND",
                    "Valid token but user not found (call POST /api/v1/users/sync first)",
                )
            })?;

        Ok(AuthenticatedUser {
            subject: claims.sub,
            user,
        })
    }
}

/// JWT claims extractor that validates the token without a store lookup.
///
/// Used by the sync endpoint, where the user may not exist yet.
pub struct JwtClaims {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl FromRequestParts<AppState> for JwtClaims {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = claims_from_parts(parts, state).await?;

        Ok(JwtClaims {
            subject: claims.sub,
            email: claims.email,
            name: claims.name.or(claims.preferred_username),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;
    use std::time::{SystemTime, UNIX_EPOCH};

    const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/test_rsa_private.pem");
    const JWKS: &str = include_str!("../../tests/fixtures/test_jwks.json");
    const KID: &str = "test-key-1";

    #[derive(Debug, Serialize)]
    struct TestClaims {
        sub: String,
        exp: u64,
        iat: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        iss: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        preferred_username: Option<String>,
    }

    impl TestClaims {
        fn new(sub: &str, exp: u64) -> Self {
            Self {
                sub: sub.to_string(),
                exp,
                iat: now_epoch(),
                iss: None,
                email: None,
                preferred_username: None,
            }
        }
    }

    fn now_epoch() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn sign(claims: &TestClaims, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());

        let encoding_key = EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap();
        encode(&header, claims, &encoding_key).unwrap()
    }

    fn fixture_cache() -> JwksCache {
        let jwks: JwksResponse = serde_json::from_str(JWKS).unwrap();
        JwksCache::with_keys(jwks.keys)
    }

    fn auth_code(err: ApiError) -> String {
        match err {
            ApiError::AuthError { code, .. } => code,
            other => panic!("Expected AuthError, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_valid_jwt_validation() {
        let mut claims = TestClaims::new("3f1c2a9e-sub", now_epoch() + 3600);
        claims.email = Some("researcher@example.org".to_string());
        claims.preferred_username = Some("researcher".to_string());

        let validated = validate_jwt(&sign(&claims, KID), &fixture_cache())
            .await
            .unwrap();
        assert_eq!(validated.sub, "3f1c2a9e-sub");
        assert_eq!(validated.email.as_deref(), Some("researcher@example.org"));
        assert_eq!(validated.preferred_username.as_deref(), Some("researcher"));
        assert!(validated.name.is_none());
    }

    #[tokio::test]
    async fn test_expired_jwt() {
        let claims = TestClaims::new("3f1c2a9e-sub", now_epoch() - 3600);
        let err = validate_jwt(&sign(&claims, KID), &fixture_cache())
            .await
            .unwrap_err();
        assert_eq!(auth_code(err), "AUTH_TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn test_unknown_kid() {
        let claims = TestClaims::new("3f1c2a9e-sub", now_epoch() + 3600);
        let err = validate_jwt(&sign(&claims, "rotated-key"), &fixture_cache())
            .await
            .unwrap_err();
        assert_eq!(auth_code(err), "AUTH_UNKNOWN_KEY");
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let err = validate_jwt("not-a-valid-jwt", &fixture_cache())
            .await
            .unwrap_err();
        assert_eq!(auth_code(err), "AUTH_INVALID_TOKEN");
    }

    #[tokio::test]
    async fn test_issuer_enforced_when_configured() {
        let cache = fixture_cache()
            .with_issuer(Some("https://auth.example.org/realms/esgf".to_string()));

        let mut claims = TestClaims::new("3f1c2a9e-sub", now_epoch() + 3600);
        claims.iss = Some("https://evil.example.org/realms/esgf".to_string());
        let err = validate_jwt(&sign(&claims, KID), &cache).await.unwrap_err();
        assert_eq!(auth_code(err), "AUTH_INVALID_TOKEN");

        claims.iss = Some("https://auth.example.org/realms/esgf".to_string());
        assert!(validate_jwt(&sign(&claims, KID), &cache).await.is_ok());
    }

    #[test]
    fn test_extract_bearer_token_missing_header() {
        let (parts, _) = axum::http::Request::builder()
            .body(())
            .unwrap()
            .into_parts();

        let err = extract_bearer_token(&parts).unwrap_err();
        assert_eq!(auth_code(err), "AUTH_MISSING_TOKEN");
    }

    #[test]
    fn test_extract_bearer_token_wrong_scheme() {
        let (parts, _) = axum::http::Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap()
            .into_parts();

        let err = extract_bearer_token(&parts).unwrap_err();
        assert_eq!(auth_code(err), "AUTH_INVALID_TOKEN");
    }

    #[test]
    fn test_extract_bearer_token_success() {
        let (parts, _) = axum::http::Request::builder()
            .header("Authorization", "Bearer my-jwt-token")
            .body(())
            .unwrap()
            .into_parts();

        assert_eq!(extract_bearer_token(&parts).unwrap(), "my-jwt-token");
    }

    #[tokio::test]
    async fn test_fixed_key_set_is_served_without_fetching() {
        let cache = fixture_cache();

        let keys = cache.get_keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].common.key_id.as_deref(), Some(KID));
    }
}
