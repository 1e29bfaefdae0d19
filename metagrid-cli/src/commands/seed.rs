//! Seed command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use metagrid_server::db::ProjectRepository;

use crate::utils::connect_and_migrate;

/// Execute the seed command.
pub async fn execute(database_url: Option<String>) -> Result<()> {
    let store = connect_and_migrate(database_url).await?;

    let summary = store
        .seed_catalog()
        .await
        .context("Failed to seed catalogue")?;

    println!("{} Catalogue seeded", "✓".green().bold());
    println!("   {} {}", "Projects:".dimmed(), summary.projects);
    println!("   {} {}", "Facet groups:".dimmed(), summary.groups);
    println!("   {} {}", "Facets:".dimmed(), summary.facets);
    Ok(())
}
