//! Magpie main entry point
//!
//! This is the command-line interface for the Magpie job-listing harvester.

use clap::Parser;
use magpie::config::load_config_with_hash;
use magpie::pipeline::{run_pipeline, CancelToken};
use magpie::render::HttpClientFactory;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Magpie: a job-listing harvester
///
/// Magpie walks a paginated job-listing index, renders each detail page
/// through a pool of workers, and persists structured records with
/// deduplication, retry, and rate-limit recovery.
#[derive(Parser, Debug)]
#[command(name = "magpie")]
#[command(version = "1.0.0")]
#[command(about = "A job-listing harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["stats", "export_csv"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "export_csv"])]
    stats: bool,

    /// Export stored records to CSV and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    export_csv: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.export_csv {
        handle_export_csv(&config)?;
    } else {
        handle_harvest(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("magpie=info,warn"),
            1 => EnvFilter::new("magpie=debug,info"),
            2 => EnvFilter::new("magpie=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows the harvest plan
fn handle_dry_run(config: &magpie::Config) {
    println!("=== Magpie Dry Run ===\n");

    println!("Discovery:");
    println!("  Listing URL: {}", config.discovery.listing_url);
    println!("  Page size: {}", config.discovery.page_size);
    println!("  Max pages: {}", config.discovery.max_pages);

    println!("\nPipeline:");
    println!("  Workers: {}", config.pipeline.worker_count);
    println!("  Queue capacity: {}", config.pipeline.queue_capacity);
    println!(
        "  Dequeue timeout: {}ms",
        config.pipeline.dequeue_timeout_ms
    );

    println!("\nWorker:");
    println!("  Parse attempts: {}", config.worker.parse_attempts);
    println!(
        "  Settle window: {}ms - {}ms",
        config.worker.settle_min_ms, config.worker.settle_max_ms
    );

    println!("\nRender:");
    println!("  User agents: {}", config.render.user_agents.len());
    println!(
        "  Request timeout: {}s",
        config.render.request_timeout_secs
    );
    println!(
        "  Blocked resources: {}",
        if config.render.blocked_resources.is_empty() {
            "(none)".to_string()
        } else {
            config.render.blocked_resources.join(", ")
        }
    );

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  CSV: {}", config.output.csv_path);
    println!("  Error pages: {}", config.output.error_page_dir);

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest up to {} listings",
        config.discovery.page_size * config.discovery.max_pages
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &magpie::Config) -> Result<(), Box<dyn std::error::Error>> {
    use magpie::output::{load_statistics, print_statistics};
    use magpie::storage::SqliteStore;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let store = SqliteStore::open(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export-csv mode: writes stored records to the CSV path
fn handle_export_csv(config: &magpie::Config) -> Result<(), Box<dyn std::error::Error>> {
    use magpie::output::export_csv;
    use magpie::storage::SqliteStore;
    use std::path::Path;

    println!("=== Exporting Records ===\n");
    println!("Database: {}", config.output.database_path);
    println!("Output: {}", config.output.csv_path);
    println!();

    let store = SqliteStore::open(Path::new(&config.output.database_path))?;
    let count = export_csv(&store, Path::new(&config.output.csv_path))?;

    println!("✓ Exported {} records to: {}", count, config.output.csv_path);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(
    config: magpie::Config,
    config_hash: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting harvest of {}", config.discovery.listing_url);

    let cancel = CancelToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            signal_token.cancel();
        }
    });

    let factory = Arc::new(HttpClientFactory::new(config.render.clone()));
    match run_pipeline(config, factory, cancel.clone(), config_hash).await {
        Ok(summary) => {
            if cancel.is_cancelled() {
                tracing::warn!("Harvest interrupted; partial results were kept");
            } else {
                tracing::info!("Harvest completed successfully");
            }
            tracing::info!(
                "{} discovered, {} stored, {} duplicates, {} dropped",
                summary.discovered,
                summary.inserted,
                summary.duplicate,
                summary.dropped
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
