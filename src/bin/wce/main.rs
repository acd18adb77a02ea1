//! Wide-column events command line tool
//!
//! Works on JSON cell dumps (`[{"row_key", "column", "timestamp", "value"}]`)
//! loaded into an in-memory table, so mapping documents and aggregations can
//! be checked without a live store.
//!
//! # CLI Commands
//!
//! - `check-mapping` - Validate a mapping document and report its rules
//! - `events` - Translate a cell dump into events
//! - `aggregate` - Group events and aggregate them
//! - `row-key` - Build a row key from parts
//! - `fetch-mapping` / `publish-mapping` - Versioned mapping documents
//!
//! # Configuration
//!
//! Settings come from the file given with `--config`, then `WCE_*`
//! environment variables, then defaults.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use wide_column_events::config::Config;

#[derive(Parser)]
#[command(name = "wce")]
#[command(version)]
#[command(about = "Read, translate and aggregate events stored in wide-column rows", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a mapping document and print a summary
    CheckMapping {
        /// Mapping document
        path: PathBuf,
    },

    /// Translate a JSON cell dump into events
    Events {
        #[command(flatten)]
        input: commands::Input,

        /// Read only this row
        #[arg(long)]
        row: Option<String>,

        /// Keep events with a cell whose qualifier matches this expression
        #[arg(long)]
        column: Option<String>,
    },

    /// Group events and aggregate each group
    Aggregate {
        #[command(flatten)]
        input: commands::Input,

        #[command(flatten)]
        aggregation: commands::AggregationArgs,
    },

    /// Build a row key from its parts
    RowKey {
        /// Key parts, in order
        #[arg(required = true)]
        parts: Vec<String>,
    },

    /// Download a versioned mapping document from the mapping store
    FetchMapping {
        /// Event family
        family: String,
        /// Document version
        version: String,
        /// Write the document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a mapping document to the mapping store
    PublishMapping {
        /// Event family
        family: String,
        /// Document version
        version: String,
        /// Mapping document
        path: PathBuf,
    },
}

fn load_config(cli: &Cli) -> wide_column_events::Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env(),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("wce v{}", env!("CARGO_PKG_VERSION"));
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::CheckMapping { path } => commands::check_mapping(&path)?,
        Commands::Events { input, row, column } => {
            commands::events(&config, &input, row.as_deref(), column.as_deref()).await?
        },
        Commands::Aggregate { input, aggregation } => {
            commands::aggregate(&config, &input, &aggregation).await?
        },
        Commands::RowKey { parts } => commands::row_key(&config, &parts)?,
        Commands::FetchMapping {
            family,
            version,
            output,
        } => commands::fetch_mapping(&config, &family, &version, output.as_deref()).await?,
        Commands::PublishMapping {
            family,
            version,
            path,
        } => commands::publish_mapping(&config, &family, &version, &path).await?,
    }
    Ok(())
}
