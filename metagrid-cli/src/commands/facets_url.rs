//! Facets URL command implementation.

use anyhow::{anyhow, Result};
use metagrid_core::{catalog, facets_url};
use tracing::debug;

/// Execute the facets-url command.
///
/// Prints only the URL so the output can be piped into `curl`.
pub fn execute(project: &str, base_url: &str) -> Result<()> {
    let entry =
        catalog::find_project(project).ok_or_else(|| anyhow!("Unknown project: {}", project))?;

    let facets: Vec<&str> = entry.facets().map(|(facet, _)| facet).collect();
    debug!(project = entry.name, facets = facets.len(), "Building facets URL");

    let url = facets_url(base_url, entry.name, &facets)
        .ok_or_else(|| anyhow!("Project {} has no facets", entry.name))?;

    println!("{}", url);
    Ok(())
}
