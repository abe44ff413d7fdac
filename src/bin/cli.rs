//! Catalog Proxy CLI
//!
//! Runs queries against the upstream catalog through the cache-and-resolve
//! engine and prints the responses as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use catalog_proxy::{
    Catalog,
    error::Result,
    models::{Config, PROVENANCE_HEADER, ResourceKind},
};
use clap::{Parser, Subcommand};
use serde::Serialize;

/// catalog-proxy - caching front for a paginated REST catalog
#[derive(Parser, Debug)]
#[command(
    name = "catalog-proxy",
    version,
    about = "Caching proxy for a paginated REST catalog"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a whole collection (people, planets, films, species, vehicles, starships)
    Collection {
        kind: ResourceKind,

        /// Replace reference URLs with the records they point to
        #[arg(long)]
        resolve: bool,

        /// Serve the collection this many times in one process
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },

    /// Search a collection upstream by name
    Search { kind: ResourceKind, name: String },

    /// Serve one record by URL
    Record {
        url: String,

        #[arg(long)]
        resolve: bool,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(&cli.config);

    if let Command::Validate = cli.command {
        log::info!("Validating configuration...");
        config.validate()?;
        log::info!("✓ Config OK (upstream {})", config.upstream.base_url);
        return Ok(());
    }

    let catalog = Catalog::from_config(&config)?;

    match cli.command {
        Command::Collection {
            kind,
            resolve,
            repeat,
        } => {
            for round in 1..=repeat.max(1) {
                let response = catalog.fetch_collection(kind, resolve).await?;
                log::info!(
                    "Round {round}: {}: {} ({} records)",
                    PROVENANCE_HEADER,
                    response.provenance,
                    response.count
                );
                print_json(&response)?;
            }
            let stats = catalog.cache().stats().await?;
            log::info!(
                "Cache: {} entries, {} hits, {} misses, {} evictions",
                stats.entries,
                stats.hits,
                stats.misses,
                stats.evictions
            );
        }

        Command::Search { kind, name } => {
            let hits = catalog.search(kind, &name).await?;
            log::info!("Found {} {kind} matching '{name}'", hits.len());
            print_json(&hits)?;
        }

        Command::Record { url, resolve } => {
            let record = catalog.fetch_record(&url, resolve).await?;
            print_json(&record)?;
        }

        Command::Validate => {}
    }

    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e} (status {})", e.status());
            ExitCode::FAILURE
        }
    }
}
