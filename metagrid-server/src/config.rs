//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::{Ipv4Addr, SocketAddr};

use metagrid_core::DEFAULT_ESGF_SEARCH_URL;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: Ipv4Addr,
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 5)
    pub body_limit_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// PostgreSQL connection string; in-memory storage is used when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// JWKS URL of the identity provider (enables JWT auth when set)
    pub jwks_url: Option<String>,
    /// Expected `iss` claim; issuer is not checked when unset
    pub jwt_issuer: Option<String>,
    /// Default page size for list endpoints (default: 10)
    pub page_size: i64,
    /// ESG-Search endpoint used to build project facet URLs
    pub esgf_search_url: String,
    /// Seed the built-in project catalogue after migrating (default: true)
    pub seed_catalog: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            host: Ipv4Addr::LOCALHOST,
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 5,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            jwks_url: None,
            jwt_issuer: None,
            page_size: 10,
            esgf_search_url: DEFAULT_ESGF_SEARCH_URL.to_string(),
            seed_catalog: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .and_then(|h| parse_host(&h))
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let jwks_url = env_non_empty("JWKS_URL").or_else(|| {
            let base = env_non_empty("KEYCLOAK_URL")?;
            let realm = env_non_empty("KEYCLOAK_REALM")?;
            keycloak_jwks_url(&base, &realm)
        });

        let seed_catalog = std::env::var("SEED_CATALOG")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(defaults.seed_catalog);

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            database_url: env_non_empty("DATABASE_URL"),
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            database_min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                .unwrap_or(defaults.database_min_connections),
            jwks_url,
            jwt_issuer: env_non_empty("JWT_ISSUER"),
            page_size: env_parse::<i64>("PAGINATION_LIMIT")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.page_size),
            esgf_search_url: env_non_empty("ESGF_SEARCH_URL").unwrap_or(defaults.esgf_search_url),
            seed_catalog,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

/// Parse `HOST` as an IPv4 address, warning when it is not one
fn parse_host(value: &str) -> Option<Ipv4Addr> {
    match value.trim().parse() {
        Ok(host) => Some(host),
        Err(_) => {
            tracing::warn!(host = %value, "HOST is not an IPv4 address, using 127.0.0.1");
            None
        }
    }
}

/// Derive the JWKS URL of a Keycloak realm.
///
/// Keycloak publishes realm signing keys at
/// `<base>/realms/<realm>/protocol/openid-connect/certs`.
fn keycloak_jwks_url(base: &str, realm: &str) -> Option<String> {
    let mut url = url::Url::parse(base).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["realms", realm, "protocol", "openid-connect", "certs"]);

    let url = url.to_string();
    tracing::info!("Derived JWKS_URL from Keycloak settings: {}", url);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycloak_jwks_url() {
        let url = keycloak_jwks_url("https://auth.example.org", "esgf").unwrap();
        assert_eq!(
            url,
            "https://auth.example.org/realms/esgf/protocol/openid-connect/certs"
        );
    }

    #[test]
    fn test_keycloak_jwks_url_keeps_base_path() {
        // Older Keycloak deployments are served under /auth
        let url = keycloak_jwks_url("https://auth.example.org/auth/", "metagrid").unwrap();
        assert_eq!(
            url,
            "https://auth.example.org/auth/realms/metagrid/protocol/openid-connect/certs"
        );
    }

    #[test]
    fn test_keycloak_jwks_url_invalid_base() {
        assert!(keycloak_jwks_url("not a url", "esgf").is_none());
        assert!(keycloak_jwks_url("ftp://auth.example.org", "esgf").is_none());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.page_size, 10);
        assert!(config.jwks_url.is_none());
        assert!(config.database_url.is_none());
        assert!(!config.rate_limit_enabled);
        assert_eq!(config.esgf_search_url, DEFAULT_ESGF_SEARCH_URL);
        assert!(config.seed_catalog);
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host("0.0.0.0"), Some(Ipv4Addr::UNSPECIFIED));
        assert_eq!(parse_host(" 10.1.2.3 "), Some(Ipv4Addr::new(10, 1, 2, 3)));
        assert_eq!(parse_host("localhost"), None);
        assert_eq!(parse_host("::1"), None);
    }
}
