//! Common utility functions shared across CLI commands.

use anyhow::{bail, Context, Result};
use metagrid_server::PgStore;
use tracing_subscriber::EnvFilter;

/// Pool sizes for one-shot operator commands
const CLI_MAX_CONNECTIONS: u32 = 2;
const CLI_MIN_CONNECTIONS: u32 = 1;

/// Log to stderr so stdout stays clean for piping.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "metagrid_cli=debug,metagrid_server=debug"
    } else {
        "metagrid_server=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the database URL given on the command line or via `DATABASE_URL`.
pub fn require_database_url(database_url: Option<String>) -> Result<String> {
    match database_url {
        Some(url) if !url.trim().is_empty() => Ok(url),
        _ => bail!("DATABASE_URL is not set (use --database-url or the DATABASE_URL environment variable)"),
    }
}

/// Connect to PostgreSQL and apply pending migrations.
pub async fn connect_and_migrate(database_url: Option<String>) -> Result<PgStore> {
    let url = require_database_url(database_url)?;

    let store = PgStore::connect(&url, CLI_MAX_CONNECTIONS, CLI_MIN_CONNECTIONS)
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to apply migrations")?;

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_database_url() {
        assert_eq!(
            require_database_url(Some("postgres://localhost/metagrid".into())).unwrap(),
            "postgres://localhost/metagrid"
        );
        assert!(require_database_url(None).is_err());
        assert!(require_database_url(Some("  ".into())).is_err());
    }
}
