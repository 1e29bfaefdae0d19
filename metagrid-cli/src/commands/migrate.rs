//! Migrate command implementation.

use anyhow::Result;
use colored::Colorize;
use tracing::info;

use crate::utils::connect_and_migrate;

/// Execute the migrate command.
pub async fn execute(database_url: Option<String>) -> Result<()> {
    connect_and_migrate(database_url).await?;
    info!("Migrations applied");

    println!("{} Database schema is up to date", "✓".green().bold());
    Ok(())
}
