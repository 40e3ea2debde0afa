//! Tribal land check for a CSV or Excel table of property addresses.
//!
//! Geocodes each address, tests it against tribal area boundaries and
//! writes the table back out with the results appended.

mod prompt;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use dialoguer::theme::ColorfulTheme;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use tribal_land_checker::batch::{BatchProcessor, ProgressLogWriter};
use tribal_land_checker::config::Config;
use tribal_land_checker::geocode::{build_providers, CoordinateResolver};
use tribal_land_checker::models::{Classification, ClassificationSummary};
use tribal_land_checker::pip::{BoundaryError, BoundaryLoader, BoundarySource, BoundaryStore, MANUAL_SOURCES};
use tribal_land_checker::table::{default_output_path, AddressTable};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "tribal-check")]
#[command(about = "Flag addresses located on federally recognized tribal lands")]
struct Args {
    /// CSV or Excel file with addresses (prompted for when omitted)
    input: Option<PathBuf>,

    /// Boundary dataset: shapefile, zipped shapefile or GeoJSON (path or URL),
    /// or an ArcGIS query URL
    #[arg(short, long)]
    boundaries: Option<String>,

    /// Output file, CSV or .xlsx by extension (default: <input>_tribal_checked.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Name of the address column (auto-detected when omitted)
    #[arg(short, long)]
    address_column: Option<String>,

    /// Worksheet name or zero-based index for Excel input (default: first sheet)
    #[arg(short, long)]
    sheet: Option<String>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; lines are written around the progress bar
    let pb = ProgressBar::hidden();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(ProgressLogWriter::new(pb.clone(), std::io::stderr))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let interactive = std::io::stdin().is_terminal();
    let theme = ColorfulTheme::default();

    println!("{}", style("=".repeat(60)).cyan());
    println!("{}", style("TRIBAL LAND CHECKER").bold());
    println!("Identifies properties on federally recognized tribal lands");
    println!("{}", style("=".repeat(60)).cyan());

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };
    if let Some(timeout) = args.timeout_secs {
        config.geocoder.timeout_secs = timeout;
    }

    let (input, prompted) = match args.input.clone() {
        Some(path) => (path, false),
        None if interactive => (prompt::input_path(&theme)?, true),
        None => bail!("No input file given"),
    };
    if !input.exists() {
        bail!("File not found: {}", input.display());
    }

    let boundaries = match args.boundaries.clone() {
        Some(source) => Some(source),
        None if prompted => prompt::boundaries_override(&theme)?,
        None => None,
    };
    if let Some(source) = boundaries {
        config.boundaries.source = source;
    }

    let table = AddressTable::read(&input, args.sheet.as_deref())
        .with_context(|| format!("Failed to read {}", input.display()))?;

    let column = match &args.address_column {
        Some(name) => table.column_by_name(name)?,
        None => match table.detect_address_column() {
            Some(idx) => idx,
            None if interactive => table.check_column(prompt::address_column(
                &theme,
                &table.column_names(),
            )?)?,
            None => bail!(
                "No address column detected; pass --address-column (columns: {})",
                table.column_names().join(", ")
            ),
        },
    };
    info!("Using address column: {}", &table.headers[column]);

    // Boundaries first: a bad dataset must fail before any geocoding
    let loader = BoundaryLoader::from_config(&config)?;
    let mut store = BoundaryStore::new(loader, BoundarySource::parse(&config.boundaries.source));
    if let Err(e) = store.ensure_loaded().await {
        report_boundary_failure(&e);
        return Err(e).context("Failed to load tribal boundaries");
    }

    let resolver = CoordinateResolver::new(build_providers(&config.geocoder)?);
    info!("Geocoders: {}", resolver.provider_names().join(" -> "));
    let mut processor = BatchProcessor::new(resolver);

    pb.set_length(table.len() as u64);
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let addresses = table.addresses(column);
    let report = processor.process(&mut store, &addresses, &pb).await?;
    pb.finish_with_message("Processing complete");

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&input));
    table
        .write(&output, &report.outcomes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    print_summary(&report.summary, report.unique_addresses);
    Ok(())
}

fn report_boundary_failure(e: &BoundaryError) {
    error!("Error loading tribal boundaries: {}", e);
    error!("Please download tribal boundaries manually from:");
    for (i, source) in MANUAL_SOURCES.iter().enumerate() {
        error!("{}. {}", i + 1, source);
    }
    error!("then re-run with --boundaries <file.zip|file.shp|file.geojson>");
}

fn print_summary(summary: &ClassificationSummary, unique_addresses: usize) {
    println!();
    println!("{}", style("=== Summary ===").bold());
    println!("Total addresses processed: {}", summary.total());
    for classification in Classification::all() {
        let line = format!(
            "  {:<18} {}",
            classification.label(),
            summary.count(*classification)
        );
        match classification {
            Classification::OnTribalLand => println!("{}", style(line).green()),
            Classification::GeocodeFailed => println!("{}", style(line).yellow()),
            _ => println!("{}", line),
        }
    }
    println!("Unique addresses geocoded: {}", unique_addresses);
}
