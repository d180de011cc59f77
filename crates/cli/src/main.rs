//! Catalog CLI - Database migrations, seeding and inspection tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply embedded migrations
//! catalog migrate
//!
//! # Load the sample catalog (safe to run repeatedly)
//! catalog seed
//!
//! # Print the category forest
//! catalog categories tree
//!
//! # List products, optionally one category's active ones
//! catalog products list --category chairs --active-only
//!
//! # Row counts and stock figures
//! catalog stats
//! ```
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `SQLite` connection string (or `--database-url`)
//! - `RUST_LOG` - Log filter (default: `info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "catalog")]
#[command(author, version, about = "Catalog store CLI tools")]
struct Cli {
    /// Database URL, overriding `CATALOG_DATABASE_URL`
    #[arg(long, global = true, env = "CATALOG_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Load the sample catalog
    Seed,
    /// Inspect categories
    Categories {
        #[command(subcommand)]
        action: CategoriesAction,
    },
    /// Inspect products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Print row counts and stock figures
    Stats,
}

#[derive(Subcommand)]
enum CategoriesAction {
    /// Print the category forest
    Tree,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products by name
    List {
        /// Only products in the category with this slug
        #[arg(short, long)]
        category: Option<String>,

        /// Skip inactive products
        #[arg(long)]
        active_only: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = commands::load_config(cli.database_url)?;

    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        Commands::Seed => commands::seed::run(&config).await?,
        Commands::Categories { action } => match action {
            CategoriesAction::Tree => commands::categories::tree(&config).await?,
        },
        Commands::Products { action } => match action {
            ProductsAction::List {
                category,
                active_only,
            } => commands::products::list(&config, category.as_deref(), active_only).await?,
        },
        Commands::Stats => commands::stats::run(&config).await?,
    }
    Ok(())
}
