//! Chandere main entry point
//!
//! This is the command-line interface for the Chandere imageboard poller.

use chandere::config::{load_config_with_hash, validate, Config, OutputFormat, OutputMode};
use chandere::filter::FilterPredicate;
use chandere::output::print_statistics;
use chandere::poller::print_probe_reports;
use chandere::{RunOptions, SiteRegistry};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Chandere: an imageboard poller and archiver
///
/// Chandere polls boards and threads on Futaba-styled imageboards, follows
/// boards into their threads, and downloads the files or archives the posts
/// it has not seen before.
#[derive(Parser, Debug)]
#[command(name = "chandere")]
#[command(version)]
#[command(about = "An imageboard poller and archiver", long_about = None)]
struct Cli {
    /// Boards or threads to poll, e.g. "/g/" or "/g/51971506"
    #[arg(value_name = "TARGET", required_unless_present = "list_imageboards")]
    targets: Vec<String>,

    /// Imageboard to poll
    #[arg(short = 'i', long, visible_alias = "imageboard", default_value = "4chan")]
    site: String,

    /// Download the files attached to new posts
    #[arg(short, long, conflicts_with = "archive")]
    download: bool,

    /// Archive new posts
    #[arg(short, long, conflicts_with = "download")]
    archive: bool,

    /// Keep polling instead of stopping once every thread has been read
    #[arg(short, long)]
    continuous: bool,

    /// Output directory, or archive file in archive mode
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Archive format: plaintext or sqlite
    #[arg(long, default_value = "plaintext", value_parser = parse_format)]
    output_format: OutputFormat,

    /// Suppress posts whose FIELD matches PATTERN (repeatable)
    #[arg(long = "filter", value_name = "FIELD:PATTERN")]
    filters: Vec<String>,

    /// Maximum concurrent fetches (0 = unbounded)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Seconds between cycles in continuous mode
    #[arg(long)]
    interval: Option<u64>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Same as -v
    #[arg(long)]
    debug: bool,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"])]
    quiet: bool,

    /// List the known imageboards and exit
    #[arg(long)]
    list_imageboards: bool,
}

fn parse_format(name: &str) -> Result<OutputFormat, String> {
    OutputFormat::parse(name).ok_or_else(|| format!("unknown output format '{}'", name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let verbose = cli.verbose.max(u8::from(cli.debug));
    setup_logging(verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((config, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    config
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };

    // Command line flags win over the file
    if let Some(concurrency) = cli.concurrency {
        config.poller.concurrency = concurrency;
    }
    if let Some(interval) = cli.interval {
        config.poller.interval = interval;
    }
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    let sites = SiteRegistry::from_config(&config.sites)?;

    if cli.list_imageboards {
        handle_list_imageboards(&sites);
        return Ok(());
    }

    let filters = match cli
        .filters
        .iter()
        .map(|expression| FilterPredicate::parse(expression))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(filters) => filters,
        Err(e) => {
            tracing::error!("Invalid filter: {}", e);
            return Err(e.into());
        }
    };

    let mode = if cli.download {
        OutputMode::Download
    } else if cli.archive {
        OutputMode::Archive
    } else {
        OutputMode::Probe
    };

    let options = RunOptions {
        targets: cli.targets,
        site: cli.site,
        mode,
        continuous: cli.continuous,
        output: cli.output,
        format: cli.output_format,
        filters,
    };

    handle_poll(config, options, &sites).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// WARN and ERROR go to stderr, everything else to stdout.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("chandere=info,warn"),
            1 => EnvFilter::new("chandere=debug,info"),
            2 => EnvFilter::new("chandere=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --list-imageboards: prints every known site
fn handle_list_imageboards(sites: &SiteRegistry) {
    println!("=== Imageboards ===\n");
    for name in sites.names() {
        if let Some(site) = sites.get(name) {
            println!("  {} ({})", name, site.family());
        }
    }
}

/// Handles the poll itself, with SIGINT/SIGTERM ending it cleanly
async fn handle_poll(
    config: Config,
    options: RunOptions,
    sites: &SiteRegistry,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_cancel.cancel();
    });

    match chandere::run(&config, options, sites, cancel).await {
        Ok(report) => {
            if !report.probes.is_empty() {
                print_probe_reports(&report.probes);
            }
            print_statistics(&report.stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("{}", e);
            Err(e.into())
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    // Registration can fail in restricted environments
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
