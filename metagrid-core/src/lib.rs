//! Metagrid Core - domain model for the climate-data search portal
//!
//! This crate holds the parts of the portal backend that do not touch I/O:
//!
//! - Validation rules for projects, saved searches and subscriptions
//! - Opaque client-defined JSON payloads ([`JsonList`], [`JsonMap`])
//! - The ESG-Search facet query builder ([`facets_url`])
//! - The built-in project and facet group catalogue
//!
//! # Example
//!
//! ```
//! use metagrid_core::{catalog, facets_url, DEFAULT_ESGF_SEARCH_URL};
//!
//! let cmip6 = catalog::find_project("CMIP6").unwrap();
//! let facets: Vec<&str> = cmip6.facets().map(|(facet, _)| facet).collect();
//! let url = facets_url(DEFAULT_ESGF_SEARCH_URL, cmip6.name, &facets).unwrap();
//! assert!(url.contains("project=CMIP6&project=CMIP6&project=cmip6"));
//! ```

pub mod catalog;
pub mod error;
pub mod opaque;
pub mod project;
pub mod search;
pub mod subscription;

pub use error::{ensure_max_length, MetagridError, Result, MAX_NAME_LENGTH, MAX_URL_LENGTH};
pub use opaque::{JsonList, JsonMap};
pub use project::{facets_url, group_facets, validate_project_name, DEFAULT_ESGF_SEARCH_URL};
pub use search::{
    parse_version_date, validate_result_url, validate_text_filters, validate_version_range,
    ResultType,
};
pub use subscription::Period;
