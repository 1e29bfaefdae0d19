//! Metagrid CLI - operator tooling for the portal backend.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use metagrid_core::DEFAULT_ESGF_SEARCH_URL;

mod commands;
mod exit_codes;
mod utils;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  65  Unknown project or project without facets
  69  Database unavailable
  78  Missing configuration (DATABASE_URL)";

#[derive(Parser)]
#[command(name = "metagrid")]
#[command(author, version, about = "Metagrid backend operator tool", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the built-in project and facet catalogue
    Catalog {
        /// Only show this project (case-insensitive)
        #[arg(short, long)]
        project: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the ESG-Search URL that returns facet counts for a project
    FacetsUrl {
        /// Catalogue project name (case-insensitive)
        #[arg(value_name = "PROJECT")]
        project: String,

        /// ESG-Search endpoint the query string is appended to
        #[arg(long, env = "ESGF_SEARCH_URL", default_value = DEFAULT_ESGF_SEARCH_URL)]
        base_url: String,
    },

    /// Apply pending database migrations
    Migrate {
        /// PostgreSQL connection URL
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// Migrate, then upsert the built-in catalogue into the database
    Seed {
        /// PostgreSQL connection URL
        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    utils::init_tracing(cli.verbose);

    if let Err(err) = run(cli.command).await {
        let exit = exit_codes::ExitCode::from_anyhow(&err);
        eprintln!("{} {}", "error:".red().bold(), exit.message);
        std::process::exit(exit.code);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Catalog { project, json } => commands::catalog::execute(project, json),
        Commands::FacetsUrl { project, base_url } => {
            commands::facets_url::execute(&project, &base_url)
        }
        Commands::Migrate { database_url } => commands::migrate::execute(database_url).await,
        Commands::Seed { database_url } => commands::seed::execute(database_url).await,
    }
}
