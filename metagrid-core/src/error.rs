use thiserror::Error;

/// Maximum length of short text fields (names, version dates, list entries).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum length of a saved search result URL.
pub const MAX_URL_LENGTH: usize = 2000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetagridError {
    #[error("Project name must not be empty")]
    EmptyProjectName,

    #[error("Field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Unknown result type '{0}' (expected 'all', 'originals only' or 'replicas only')")]
    InvalidResultType(String),

    #[error("Unknown subscription period '{0}' (expected D, W, BW or M)")]
    InvalidPeriod(String),

    #[error("Invalid version date for '{field}': '{value}' (expected YYYYMMDD)")]
    InvalidVersionDate { field: &'static str, value: String },

    #[error("min_version_date {min} is after max_version_date {max}")]
    VersionDateRange { min: String, max: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Expected a JSON {expected}, got {found}")]
    UnexpectedJsonShape {
        expected: &'static str,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, MetagridError>;

/// Reject `value` when it is longer than `max` characters.
pub fn ensure_max_length(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(MetagridError::TooLong { field, max });
    }
    Ok(())
}
