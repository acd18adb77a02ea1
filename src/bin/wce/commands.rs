//! Command handlers

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tracing::{debug, info};
use wide_column_events::aggregation::{
    get_latest_by, group_by, AggregationSet, Average, Count, Max, Min, Sum,
};
use wide_column_events::config::Config;
use wide_column_events::mapping::{LocalObjectStore, Mapper, Mapping, MappingStore};
use wide_column_events::repository::{MemoryAdapter, Repository, RowFilter, RowSet};
use wide_column_events::rowkey::RowKeyBuilder;
use wide_column_events::types::{Cell, Event, EventSet};
use wide_column_events::{Error, Result};

/// Mapping document and cell dump
#[derive(Args)]
pub struct Input {
    /// Mapping document (defaults to `mapping.path` from the configuration)
    #[arg(long)]
    mapping: Option<PathBuf>,

    /// JSON array of cells
    #[arg(long)]
    cells: PathBuf,
}

/// Grouping and aggregators to apply
#[derive(Args)]
pub struct AggregationArgs {
    /// Columns forming the group key, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    group_by: Vec<String>,

    /// Keep the latest event of each group instead of aggregating
    #[arg(long)]
    latest: bool,

    /// Write the group size into this column
    #[arg(long)]
    count: Option<String>,

    /// Sum, as INPUT:OUTPUT
    #[arg(long, value_parser = parse_projection)]
    sum: Vec<(String, String)>,

    /// Average, as INPUT:OUTPUT
    #[arg(long, value_parser = parse_projection)]
    avg: Vec<(String, String)>,

    /// Minimum, as INPUT:OUTPUT
    #[arg(long, value_parser = parse_projection)]
    min: Vec<(String, String)>,

    /// Maximum, as INPUT:OUTPUT
    #[arg(long, value_parser = parse_projection)]
    max: Vec<(String, String)>,
}

fn parse_projection(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once(':') {
        Some((input, output)) if !input.is_empty() && !output.is_empty() => {
            Ok((input.to_string(), output.to_string()))
        },
        _ => Err(format!("expected INPUT:OUTPUT, got {:?}", s)),
    }
}

impl AggregationArgs {
    fn aggregation_set(&self) -> AggregationSet {
        let mut set = AggregationSet::new();
        if let Some(projection) = &self.count {
            set.add(Count::new(projection.as_str()));
        }
        for (input, output) in &self.sum {
            set.add(Sum::new(input.as_str(), output.as_str()));
        }
        for (input, output) in &self.avg {
            set.add(Average::new(input.as_str(), output.as_str()));
        }
        for (input, output) in &self.min {
            set.add(Min::new(input.as_str(), output.as_str()));
        }
        for (input, output) in &self.max {
            set.add(Max::new(input.as_str(), output.as_str()));
        }
        set
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Print with map keys sorted
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let value = serde_json::to_value(value)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn load_mapping(config: &Config, input: &Input) -> Result<Mapping> {
    let path = input
        .mapping
        .as_ref()
        .or(config.mapping.path.as_ref())
        .ok_or_else(|| {
            Error::Configuration("no mapping document: pass --mapping or set mapping.path".to_string())
        })?;
    Ok(Mapping::from_file(path)?)
}

fn repository(config: &Config, input: &Input) -> Result<Repository> {
    let mapping = load_mapping(config, input)?;
    let data = std::fs::read(&input.cells)?;
    let cells: Vec<Cell> = serde_json::from_slice(&data)?;
    debug!(cells = cells.len(), path = %input.cells.display(), "Loaded cells");

    Ok(Repository::new(
        MemoryAdapter::with_cells(cells),
        Arc::new(Mapper::new(mapping)),
        config.repository.clone(),
    ))
}

fn mapping_store(config: &Config) -> Result<MappingStore<LocalObjectStore>> {
    let root = config.mapping.store_root.as_ref().ok_or_else(|| {
        Error::Configuration("mapping.store_root is not configured".to_string())
    })?;
    Ok(MappingStore::with_config(
        LocalObjectStore::new(root),
        config.mapping.store_config(),
    ))
}

// =============================================================================
// Commands
// =============================================================================

/// Validate a mapping document and print a summary
pub fn check_mapping(path: &Path) -> Result<()> {
    let mapping = Mapping::from_file(path)?;
    let mapper = Mapper::new(mapping);
    let mapping = mapper.mapping();

    println!("Mapping is valid!");
    println!();
    println!("  Raw columns:      {}", mapping.raws.len());
    println!("  Mapped columns:   {}", mapping.mapped.len());
    println!("  Reversed tables:  {}", mapping.reversed.len());
    println!("  Total rules:      {}", mapping.rule_count());

    let overlaps = overlap_report(mapping);
    if !overlaps.is_empty() {
        println!();
        println!("Columns declared in several classes (first rule wins: raws, mapped, reversed):");
        for line in overlaps {
            println!("  {}", line);
        }
    }
    Ok(())
}

/// One line per overlapping column, naming the class that resolves it
fn overlap_report(mapping: &Mapping) -> Vec<String> {
    mapping
        .overlapping_columns()
        .into_iter()
        .map(|column| {
            let winner = if mapping.raws.contains_key(&column) {
                "raws"
            } else {
                "mapped"
            };
            format!("{} (resolved by {})", column, winner)
        })
        .collect()
}

/// Print the events of one row, or of every row matching a column expression
pub async fn events(config: &Config, input: &Input, row: Option<&str>, column: Option<&str>) -> Result<()> {
    let repo = repository(config, input)?;
    let set = select_events(&repo, row, column).await?;
    info!(events = set.event_count(), columns = set.columns.len(), "Events built");
    print_json(&set)
}

async fn select_events(repo: &Repository, row: Option<&str>, column: Option<&str>) -> Result<EventSet> {
    let set = match row {
        Some(key) => repo.read(key).await?,
        None => {
            let filter = column.map(RowFilter::column_regex).transpose()?.unwrap_or_default();
            repo.search(&filter).await?
        },
    };
    Ok(set)
}

/// Group the events of every row and print one event per group
pub async fn aggregate(config: &Config, input: &Input, args: &AggregationArgs) -> Result<()> {
    let repo = repository(config, input)?;
    let grouped = aggregate_dump(&repo, args).await?;
    print_json(&grouped)
}

/// Every row of the dump, not only the first `max_rows`
async fn aggregate_dump(repo: &Repository, args: &AggregationArgs) -> Result<BTreeMap<String, Event>> {
    let set = repo.scan(&RowSet::All, &RowFilter::PassAll).await?;

    let mut families: Vec<&String> = set.events.keys().collect();
    families.sort();
    let events: Vec<Event> = families
        .into_iter()
        .flat_map(|family| set.events[family].iter().cloned())
        .collect();

    let grouped = if args.latest {
        get_latest_by(&events, &args.group_by)
    } else {
        let aggregators = args.aggregation_set();
        if aggregators.is_empty() {
            return Err(Error::Configuration(
                "no aggregator given: use --count, --sum, --avg, --min, --max or --latest".to_string(),
            ));
        }
        group_by(&events, &aggregators, &args.group_by)
    };

    info!(events = events.len(), groups = grouped.len(), "Aggregation complete");
    Ok(grouped.into_iter().collect())
}

/// Print the row key built from `parts`
pub fn row_key(config: &Config, parts: &[String]) -> Result<()> {
    let builder = RowKeyBuilder::new(config.row_key.to_row_key_config()?);
    println!("{}", builder.to_row_key(parts));
    Ok(())
}

/// Download a mapping document
pub async fn fetch_mapping(config: &Config, family: &str, version: &str, output: Option<&Path>) -> Result<()> {
    let store = mapping_store(config)?;
    let mapping = store.load(family, version).await?;
    let json = mapping.to_json()?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            info!(path = %path.display(), "Mapping written");
        },
        None => println!("{}", String::from_utf8_lossy(&json)),
    }
    Ok(())
}

/// Upload a mapping document
pub async fn publish_mapping(config: &Config, family: &str, version: &str, path: &Path) -> Result<()> {
    let mapping = Mapping::from_file(path)?;
    let store = mapping_store(config)?;
    store.upload(family, version, &mapping).await?;
    println!("Published {}", store.object_path(family, version));
    Ok(())
}
