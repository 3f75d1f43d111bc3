//! Shortreap main entry point
//!
//! This is the command-line interface for the Shortreap URL shortener archiver.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use shortreap::config::{load_config_with_hash, validate, Config};
use shortreap::tester::ServiceTester;
use shortreap::tracker::TrackerClient;
use shortreap::worker::{run_once, run_workers, Step};
use shortreap::{create_service, Generator, Task};
use tracing_subscriber::EnvFilter;

/// Shortreap: an archival crawler for URL shorteners
///
/// Shortreap leases tasks from a tracker, resolves every shortcode a task names
/// against the shortener, and submits the discovered destinations back.
#[derive(Parser, Debug)]
#[command(name = "shortreap")]
#[command(version)]
#[command(about = "An archival crawler for URL shorteners", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lease tasks from the tracker and run them
    Run {
        /// Tracker base URL
        #[arg(short, long)]
        tracker: Option<String>,

        /// Number of concurrent workers
        #[arg(short = 'n', long)]
        threads: Option<u32>,

        /// Username credited with submitted results
        #[arg(short, long)]
        username: Option<String>,

        /// Directory for temporary result files
        #[arg(long, value_name = "DIR")]
        temp_dir: Option<PathBuf>,

        /// Clear all pending tasks on the tracker before starting
        #[arg(long)]
        clear: bool,

        /// Run a single task and exit
        #[arg(long)]
        once: bool,
    },

    /// Clear all pending tasks on the tracker
    Clear {
        /// Tracker base URL
        #[arg(short, long)]
        tracker: Option<String>,
    },

    /// Check a service adapter against a fixture file of `code|expected` lines
    TestService {
        /// Service name (isgd, vgd, bitly, tinyurl)
        service: String,

        /// Fixture file
        fixtures: PathBuf,
    },

    /// Print the codes a task's generator yields
    Generate {
        /// Task JSON file, as served by the tracker
        task: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            tracker,
            threads,
            username,
            temp_dir,
            clear,
            once,
        } => {
            if let Some(url) = tracker {
                config.tracker.url = url;
            }
            if let Some(threads) = threads {
                config.worker.threads = threads;
            }
            if username.is_some() {
                config.tracker.username = username;
            }
            if temp_dir.is_some() {
                config.worker.temp_dir = temp_dir;
            }
            validate(&config)?;
            handle_run(config, clear, once).await
        }
        Command::Clear { tracker } => {
            if let Some(url) = tracker {
                config.tracker.url = url;
            }
            validate(&config)?;
            let client = TrackerClient::new(&config.tracker, &config.http)?;
            client.clear().await?;
            Ok(())
        }
        Command::TestService { service, fixtures } => {
            validate(&config)?;
            handle_test_service(&config, &service, &fixtures).await
        }
        Command::Generate { task } => handle_generate(&task),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shortreap=info,warn"),
            1 => EnvFilter::new("shortreap=debug,info"),
            2 => EnvFilter::new("shortreap=trace,debug"),
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

/// Loads the config file when one was given, otherwise starts from defaults
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    match load_config_with_hash(path) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            Err(e.into())
        }
    }
}

async fn handle_run(config: Config, clear: bool, once: bool) -> anyhow::Result<()> {
    if clear {
        TrackerClient::new(&config.tracker, &config.http)?
            .clear()
            .await?;
    }

    if once {
        let tracker = TrackerClient::new(&config.tracker, &config.http)?;
        if run_once(&config, &tracker).await? == Step::Idle {
            tracing::info!("Tracker had no work");
        }
        return Ok(());
    }

    tracing::info!(
        "Starting {} worker(s) against {}",
        config.worker.threads,
        config.tracker.url
    );
    match run_workers(config).await {
        Ok(()) => {
            tracing::info!("All workers stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}

async fn handle_test_service(config: &Config, name: &str, fixtures: &Path) -> anyhow::Result<()> {
    let service = create_service(name, &config.http, config.service_override(name))?;
    let mut tester = ServiceTester::from_file(service, fixtures)
        .with_context(|| format!("Failed to read fixtures from {}", fixtures.display()))?;

    let report = tester.run().await;
    println!("{} passed, {} failed", report.passed, report.failed);
    if !report.is_success() {
        bail!("{} fixture(s) failed for {}", report.failed, name);
    }
    Ok(())
}

fn handle_generate(path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task from {}", path.display()))?;
    let task: Task = serde_json::from_str(&content).context("Malformed task JSON")?;
    let generator = Generator::new(&task.generator()?)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for code in generator {
        writeln!(out, "{}", code)?;
    }
    out.flush()?;
    Ok(())
}
