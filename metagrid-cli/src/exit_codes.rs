//! Exit codes following sysexits.h conventions.
//!
//! Scripts running migrations or seeding from CI can tell a missing
//! configuration apart from a database that is not up yet.

use metagrid_server::StoreError;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Input data error (unknown project, project without facets).
/// Maps to EX_DATAERR from sysexits.h.
pub const DATA_ERROR: i32 = 65;

/// Database unreachable.
/// Maps to EX_UNAVAILABLE from sysexits.h.
pub const UNAVAILABLE: i32 = 69;

/// Required configuration missing.
/// Maps to EX_CONFIG from sysexits.h.
pub const CONFIG_ERROR: i32 = 78;

/// Exit code with the rendered error chain.
pub struct ExitCode {
    pub code: i32,
    pub message: String,
}

impl ExitCode {
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");

        let store_error = err.chain().find_map(|e| e.downcast_ref::<StoreError>());
        let code = match store_error {
            Some(StoreError::Connection(_)) => UNAVAILABLE,
            Some(_) => GENERAL_ERROR,
            None if message.contains("DATABASE_URL") => CONFIG_ERROR,
            None if message.contains("Unknown project") || message.contains("has no facets") => {
                DATA_ERROR
            }
            None => GENERAL_ERROR,
        };

        Self { code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_connection_failure_is_unavailable() {
        let err = Err::<(), _>(StoreError::Connection("refused".into()))
            .context("Failed to connect to database")
            .unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err).code, UNAVAILABLE);
    }

    #[test]
    fn test_migration_failure_is_general() {
        let err = anyhow::Error::new(StoreError::Migration("checksum mismatch".into()));
        assert_eq!(ExitCode::from_anyhow(&err).code, GENERAL_ERROR);
    }

    #[test]
    fn test_message_classification() {
        let missing = anyhow!("DATABASE_URL is not set (use --database-url)");
        assert_eq!(ExitCode::from_anyhow(&missing).code, CONFIG_ERROR);

        let unknown = anyhow!("Unknown project: CMIP7");
        let exit = ExitCode::from_anyhow(&unknown);
        assert_eq!(exit.code, DATA_ERROR);
        assert_eq!(exit.message, "Unknown project: CMIP7");
    }
}
