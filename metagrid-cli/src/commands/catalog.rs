//! Catalog command implementation.

use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use metagrid_core::catalog::{self, CatalogProject};

/// Execute the catalog command.
pub fn execute(project: Option<String>, json: bool) -> Result<()> {
    let projects: Vec<&CatalogProject> = match project {
        Some(name) => {
            let found = catalog::find_project(&name)
                .ok_or_else(|| anyhow!("Unknown project: {}", name))?;
            vec![found]
        }
        None => catalog::PROJECTS.iter().collect(),
    };

    if json {
        let rendered = serde_json::to_string_pretty(&projects)
            .context("Failed to serialize catalogue")?;
        println!("{}", rendered);
        return Ok(());
    }

    for project in projects {
        println!();
        println!("{} {}", project.name.bold(), project.full_name.dimmed());
        for (group, facets) in project.groups {
            println!("   {} {}", format!("{}:", group).cyan(), facets.join(", "));
        }
    }
    println!();

    Ok(())
}
