//! CLI command implementations.

pub mod catalog;
pub mod facets_url;
pub mod migrate;
pub mod seed;
