//! Law Crawler main entry point
//!
//! This is the command-line interface for harvesting Taiwanese statutes.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use law_crawler::config::{load_config_with_hash, Config};
use law_crawler::crawler::crawl;
use law_crawler::output::print_summary;
use law_crawler::SourceKind;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Law Crawler: statute harvester for Taiwanese legal databases
///
/// Crawls the central government law database and five municipal law
/// databases, and stores every statute in force as a JSON document.
#[derive(Parser, Debug)]
#[command(name = "law-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Harvests Taiwanese statutes into JSON files", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Source to crawl; may be repeated
    #[arg(short, long, value_enum, default_value = "all")]
    source: Vec<SourceArg>,

    /// Crawl at most this many laws per source
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Log file (overrides the configured one)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    All,
    Central,
    Taipei,
    NewTaipei,
    Taichung,
    Taoyuan,
    Kaohsiung,
}

impl SourceArg {
    fn kinds(self) -> Vec<SourceKind> {
        match self {
            SourceArg::All => SourceKind::ALL.to_vec(),
            SourceArg::Central => vec![SourceKind::Central],
            SourceArg::Taipei => vec![SourceKind::Taipei],
            SourceArg::NewTaipei => vec![SourceKind::NewTaipei],
            SourceArg::Taichung => vec![SourceKind::Taichung],
            SourceArg::Taoyuan => vec![SourceKind::Taoyuan],
            SourceArg::Kaohsiung => vec![SourceKind::Kaohsiung],
        }
    }
}

/// Expands the `--source` arguments into distinct sources, in catalog order
fn selected_sources(args: &[SourceArg]) -> Vec<SourceKind> {
    let mut kinds: Vec<SourceKind> = args.iter().flat_map(|arg| arg.kinds()).collect();
    kinds.sort();
    kinds.dedup();
    kinds
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load and validate configuration before logging, which needs the log file
    let (config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.logging.log_file));
    setup_logging(cli.verbose, cli.quiet, &log_file)?;

    match (&cli.config, &config_hash) {
        (Some(path), Some(hash)) => {
            tracing::info!("Configuration loaded from {} (hash: {})", path.display(), hash)
        }
        _ => tracing::info!("Using built-in configuration"),
    }

    let sources = selected_sources(&cli.source);

    if cli.dry_run {
        handle_dry_run(&config, &sources, cli.limit)?;
        return Ok(());
    }

    tracing::info!(
        "Crawling {} source(s): {}",
        sources.len(),
        sources.iter().map(SourceKind::as_str).collect::<Vec<_>>().join(", ")
    );

    match crawl(&config, &sources, cli.limit).await {
        Ok(summary) => {
            tracing::info!("Crawl completed");
            if !cli.quiet {
                print_summary(&summary);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up stdout and log file output based on verbosity level
fn setup_logging(verbose: u8, quiet: bool, log_file: &Path) -> anyhow::Result<()> {
    let filter = || {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("law_crawler=info,warn"),
                1 => EnvFilter::new("law_crawler=debug,info"),
                2 => EnvFilter::new("law_crawler=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_filter(filter()),
        )
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(filter()),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(())
}

/// Handles the --dry-run mode: shows the resolved settings of every source
fn handle_dry_run(config: &Config, sources: &[SourceKind], limit: Option<usize>) -> anyhow::Result<()> {
    println!("=== Law Crawler Dry Run ===\n");

    println!("HTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Accept-Language: {}", config.http.accept_language);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.http.timeout_secs, config.http.connect_timeout_secs
    );

    println!("\nRetry:");
    println!("  Retries: {}", config.retry.total);
    println!("  Backoff factor: {}", config.retry.backoff_factor);
    println!("  Retried statuses: {:?}", config.retry.status_forcelist);

    println!("\nSources ({}):", sources.len());
    for &kind in sources {
        let run = config.run_config(kind, limit)?;
        println!("  - {}", kind);
        println!("    Base URL: {}", run.base_url);
        println!("    Output: {}", run.output_dir.display());
        println!(
            "    Workers: {}, batch size: {}, delay: {:.1}-{:.1}s",
            run.concurrency,
            run.batch_size,
            run.delay_min.as_secs_f64(),
            run.delay_max.as_secs_f64()
        );
    }

    if let Some(limit) = limit {
        println!("\nLimit: {} laws per source", limit);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}
