//! Saved search parameters.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_max_length, MetagridError, Result, MAX_NAME_LENGTH, MAX_URL_LENGTH};

/// Which copies of a dataset a search returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "originals only")]
    OriginalsOnly,
    #[serde(rename = "replicas only")]
    ReplicasOnly,
}

impl ResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::All => "all",
            ResultType::OriginalsOnly => "originals only",
            ResultType::ReplicasOnly => "replicas only",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = MetagridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(ResultType::All),
            "originals only" => Ok(ResultType::OriginalsOnly),
            "replicas only" => Ok(ResultType::ReplicasOnly),
            other => Err(MetagridError::InvalidResultType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ResultType {
    type Error = MetagridError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Parse a version date in the ESG-Search `YYYYMMDD` form.
pub fn parse_version_date(field: &'static str, value: &str) -> Result<NaiveDate> {
    let invalid = || MetagridError::InvalidVersionDate {
        field,
        value: value.to_string(),
    };

    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").map_err(|_| invalid())
}

/// Validate optional lower and upper version date bounds.
pub fn validate_version_range(min: Option<&str>, max: Option<&str>) -> Result<()> {
    let min_date = min
        .map(|v| parse_version_date("min_version_date", v))
        .transpose()?;
    let max_date = max
        .map(|v| parse_version_date("max_version_date", v))
        .transpose()?;

    if let (Some(lo), Some(hi)) = (min_date, max_date) {
        if lo > hi {
            return Err(MetagridError::VersionDateRange {
                min: min.unwrap_or_default().to_string(),
                max: max.unwrap_or_default().to_string(),
            });
        }
    }
    Ok(())
}

/// Validate the result URL of a saved search.
pub fn validate_result_url(value: &str) -> Result<()> {
    ensure_max_length("url", value, MAX_URL_LENGTH)?;
    let parsed = url::Url::parse(value).map_err(|e| MetagridError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(MetagridError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// Validate free-text filters (filename variables, text inputs).
pub fn validate_text_filters(field: &'static str, values: &[String]) -> Result<()> {
    values
        .iter()
        .try_for_each(|v| ensure_max_length(field, v, MAX_NAME_LENGTH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_type_wire_values() {
        assert_eq!(
            serde_json::to_string(&ResultType::OriginalsOnly).unwrap(),
            "\"originals only\""
        );
        let parsed: ResultType = serde_json::from_str("\"replicas only\"").unwrap();
        assert_eq!(parsed, ResultType::ReplicasOnly);
        assert_eq!(ResultType::default(), ResultType::All);
        assert!(serde_json::from_str::<ResultType>("\"originals\"").is_err());
    }

    #[test]
    fn test_result_type_from_str() {
        assert_eq!("all".parse::<ResultType>().unwrap(), ResultType::All);
        assert_eq!(
            "ALL".parse::<ResultType>(),
            Err(MetagridError::InvalidResultType("ALL".into()))
        );
    }

    #[test]
    fn test_parse_version_date() {
        let date = parse_version_date("min_version_date", "20200101").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());

        assert!(parse_version_date("min_version_date", "2020-01-01").is_err());
        assert!(parse_version_date("min_version_date", "20201301").is_err());
        assert!(parse_version_date("min_version_date", "20210229").is_err());
        assert!(parse_version_date("min_version_date", "+2020101").is_err());
    }

    #[test]
    fn test_version_range() {
        assert!(validate_version_range(None, None).is_ok());
        assert!(validate_version_range(Some("20200101"), None).is_ok());
        assert!(validate_version_range(Some("20200101"), Some("20200101")).is_ok());

        let err = validate_version_range(Some("20210101"), Some("20200101")).unwrap_err();
        assert_eq!(
            err,
            MetagridError::VersionDateRange {
                min: "20210101".into(),
                max: "20200101".into()
            }
        );
    }

    #[test]
    fn test_result_url() {
        assert!(validate_result_url("https://esgf-node.llnl.gov/search?project=CMIP6").is_ok());
        assert!(validate_result_url("ftp://example.com/data").is_err());
        assert!(validate_result_url("not a url").is_err());

        let long = format!("https://example.com/?q={}", "a".repeat(MAX_URL_LENGTH));
        assert!(matches!(
            validate_result_url(&long),
            Err(MetagridError::TooLong { field: "url", .. })
        ));
    }

    #[test]
    fn test_text_filters() {
        assert!(validate_text_filters("text_inputs", &["tas".into(), "pr".into()]).is_ok());
        assert!(validate_text_filters("text_inputs", &["x".repeat(256)]).is_err());
    }
}
