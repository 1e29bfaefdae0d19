//! Project reference data helpers.
//!
//! Builds the ESG-Search query URL that the frontend uses to fetch facet
//! counts for a project, and groups facet names for display.

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::error::{ensure_max_length, MetagridError, Result, MAX_NAME_LENGTH};

/// ESG-Search endpoint used when no other base URL is configured.
pub const DEFAULT_ESGF_SEARCH_URL: &str = "https://esgf-node.llnl.gov/esg-search/search/?";

/// Result format requested from ESG-Search.
const SOLR_JSON_FORMAT: &str = "application/solr+json";

/// Validate a project acronym before it is stored.
pub fn validate_project_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MetagridError::EmptyProjectName);
    }
    ensure_max_length("name", name, MAX_NAME_LENGTH)
}

/// Build the ESG-Search facet query URL for a project.
///
/// `facets` must already be in display order (facet id order). The project
/// is queried under its stored, upper-case and lower-case spellings because
/// index nodes are inconsistent about the casing of project names.
///
/// Returns `None` when the project has no facets.
pub fn facets_url<S: AsRef<str>>(base_url: &str, project: &str, facets: &[S]) -> Option<String> {
    if facets.is_empty() {
        tracing::warn!(project = %project, "No facets found for project");
        return None;
    }

    let joined = facets
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");

    let upper = project.to_uppercase();
    let lower = project.to_lowercase();

    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("offset", "0")
        .append_pair("limit", "0")
        .append_pair("type", "Dataset")
        .append_pair("replica", "False")
        .append_pair("latest", "True")
        .append_pair("format", SOLR_JSON_FORMAT)
        .append_pair("project", project)
        .append_pair("project", &upper)
        .append_pair("project", &lower)
        .append_pair("facets", &joined)
        .finish();

    Some(format!("{}{}", base_url, query))
}

/// Group facet names by facet group name, preserving the input order inside
/// each group. Facets without a group are left out.
pub fn group_facets<'a, I>(facets: I) -> BTreeMap<String, Vec<String>>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (facet, group) in facets {
        if let Some(group) = group {
            grouped
                .entry(group.to_string())
                .or_default()
                .push(facet.to_string());
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facets_url_matches_esg_search_format() {
        let url = facets_url(
            DEFAULT_ESGF_SEARCH_URL,
            "CMIP6",
            &["activity_id", "data_node"],
        )
        .unwrap();

        assert_eq!(
            url,
            "https://esgf-node.llnl.gov/esg-search/search/?offset=0&limit=0&type=Dataset\
             &replica=False&latest=True&format=application%2Fsolr%2Bjson\
             &project=CMIP6&project=CMIP6&project=cmip6\
             &facets=activity_id%2C+data_node"
        );
    }

    #[test]
    fn test_facets_url_queries_all_casings() {
        let url = facets_url("http://localhost/search?", "input4MIPs", &["frequency"]).unwrap();
        assert!(url.starts_with("http://localhost/search?offset=0"));
        assert!(url.contains("project=input4MIPs&project=INPUT4MIPS&project=input4mips"));
        assert!(url.ends_with("&facets=frequency"));
    }

    #[test]
    fn test_facets_url_none_without_facets() {
        let empty: [&str; 0] = [];
        assert!(facets_url(DEFAULT_ESGF_SEARCH_URL, "CMIP6", &empty).is_none());
    }

    #[test]
    fn test_group_facets_skips_ungrouped() {
        let grouped = group_facets([
            ("source_id", Some("Identifiers")),
            ("data_node", Some("General")),
            ("orphan", None),
            ("experiment_id", Some("Identifiers")),
        ]);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["General"], vec!["data_node"]);
        assert_eq!(grouped["Identifiers"], vec!["source_id", "experiment_id"]);
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("CMIP6").is_ok());
        assert_eq!(
            validate_project_name("   "),
            Err(MetagridError::EmptyProjectName)
        );
        assert!(validate_project_name(&"x".repeat(256)).is_err());
    }
}
