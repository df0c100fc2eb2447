//! CLI entry point for the fsearch scan service.
//!
//! This binary drives a [`ScanOrchestrator`] from the command line: it starts
//! one scan, polls it until it finishes, and prints the matches. Ctrl-C (or
//! SIGTERM) kills the scan and prints whatever was found so far.
//!
//! # Usage
//!
//! ```bash
//! fsearch [OPTIONS] <COMMAND>
//!
//! # All log files under /var/log mentioning "timeout"
//! fsearch scan /var/log --name '*.log' --contains timeout
//!
//! # Large files modified this year, two levels deep, as JSON
//! fsearch scan ~/data --min-size 100mb --from-date 2024-01-01 --depth 2 --format json
//!
//! # Print the effective configuration
//! fsearch --config fsearch.json config
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fsearch_core::{
    ByteSize, Config, Interval, ResultTier, ScanFilter, ScanRequest, ScanResult, ScanToken,
};
use fsearch_scanner::{ScanError, ScanOrchestrator};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Parallel filesystem search with name, size, date, time, and content
/// filters.
#[derive(Parser)]
#[command(name = "fsearch", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON configuration file.
    ///
    /// Built-in defaults are used if not specified.
    #[arg(short, long, global = true, env = "FSEARCH_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Search a directory tree and print the matching files.
    Scan(ScanArgs),

    /// Print the effective configuration as JSON.
    Config,
}

/// Arguments of the `scan` command.
#[derive(Args)]
struct ScanArgs {
    /// Root directory to search.
    directory: Utf8PathBuf,

    /// File name glob; `*` matches any sequence.
    #[arg(short, long)]
    name: Option<String>,

    /// Case-insensitive text the file must contain.
    ///
    /// Requires a `--name` pattern that selects a text file extension.
    #[arg(long)]
    contains: Option<String>,

    /// Minimum file size, inclusive (e.g. `512`, `4kb`, `10mb`).
    #[arg(long)]
    min_size: Option<ByteSize>,

    /// Maximum file size, inclusive.
    #[arg(long)]
    max_size: Option<ByteSize>,

    /// Earliest local modification date, inclusive (`YYYY-MM-DD`).
    #[arg(long)]
    from_date: Option<NaiveDate>,

    /// Latest local modification date, inclusive (`YYYY-MM-DD`).
    #[arg(long)]
    to_date: Option<NaiveDate>,

    /// Earliest local modification time of day, inclusive (`HH:MM:SS`).
    #[arg(long)]
    from_time: Option<NaiveTime>,

    /// Latest local modification time of day, inclusive (`HH:MM:SS`).
    #[arg(long)]
    to_time: Option<NaiveTime>,

    /// Worker threads for this scan (defaults to `scanner.default_threads`).
    #[arg(short, long)]
    threads: Option<usize>,

    /// Directory levels to descend below the root (unlimited if omitted).
    #[arg(short, long)]
    depth: Option<u32>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Milliseconds between progress polls.
    #[arg(long, default_value_t = 100)]
    poll_interval_ms: u64,

    /// Kill the scan after this many seconds and report partial results.
    #[arg(long)]
    timeout_secs: Option<u64>,
}

/// Output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One path per line.
    Text,
    /// The full scan result as JSON.
    Json,
}

impl ScanArgs {
    /// Builds the scan request described by the arguments.
    fn to_request(&self) -> ScanRequest {
        let mut filter = ScanFilter::new();
        if let Some(name) = &self.name {
            filter = filter.with_name_pattern(name.as_str());
        }
        if self.min_size.is_some() || self.max_size.is_some() {
            filter = filter.with_size(Interval::new(
                self.min_size.map(ByteSize::as_u64),
                self.max_size.map(ByteSize::as_u64),
            ));
        }
        if self.from_date.is_some() || self.to_date.is_some() {
            filter = filter.with_modified_date(Interval::new(self.from_date, self.to_date));
        }
        if self.from_time.is_some() || self.to_time.is_some() {
            filter = filter.with_modified_time(Interval::new(self.from_time, self.to_time));
        }
        if let Some(text) = &self.contains {
            filter = filter.with_text_content(text.as_str());
        }

        let mut request = ScanRequest::new(self.directory.clone()).with_filter(filter);
        request.threads_count = self.threads;
        request.depth_limit = self.depth;
        request
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so stdout carries only results.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(level)
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults if none was given.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    let config = match &cli.config {
        Some(path) => {
            debug!(path = %path, "Loading configuration");
            Config::load(path)
                .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration {path}: {e}"))?
        }
        None => Config::default(),
    };
    Ok(config)
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn termination_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs one scan to completion and prints its result.
///
/// # Errors
///
/// Returns an error if the request is rejected, the scan fails, or output
/// cannot be written.
async fn run_scan(config: &Config, args: &ScanArgs) -> color_eyre::Result<()> {
    let orchestrator = ScanOrchestrator::new(config)?;
    let reclaimer = orchestrator.spawn_reclaimer();
    let started_at = Instant::now();

    let request = args.to_request();
    let started = orchestrator.start_scan(&request)?;

    let result = match started.token {
        Some(token) if !started.completed => {
            let poll = Duration::from_millis(args.poll_interval_ms.max(1));
            let timeout = args.timeout_secs.map(Duration::from_secs);
            wait_for_completion(&orchestrator, token, started, poll, timeout).await?
        }
        Some(token) => orchestrator.get_result(token)?,
        None => {
            info!("Result served from cache");
            started
        }
    };

    info!(
        matched = result.result.len(),
        interrupted = result.is_interrupted(),
        elapsed_ms = started_at.elapsed().as_millis(),
        "Scan complete"
    );

    match args.format {
        OutputFormat::Text => print_paths(&result)?,
        OutputFormat::Json => print_json(&result, started_at.elapsed())?,
    }

    orchestrator.shutdown();
    reclaimer.await?;
    Ok(())
}

/// Polls a scan until it completes, killing it on a termination signal or
/// timeout.
///
/// After a kill, the interrupted result is collected from the cache if the
/// walker stored one; otherwise the last partial snapshot is returned.
async fn wait_for_completion(
    orchestrator: &ScanOrchestrator,
    token: ScanToken,
    initial: ScanResult,
    poll: Duration,
    timeout: Option<Duration>,
) -> color_eyre::Result<ScanResult> {
    let mut last = initial;
    let mut killed = false;
    let mut ticker = tokio::time::interval(poll);

    let signal = termination_signal();
    tokio::pin!(signal);
    let deadline = tokio::time::sleep(timeout.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut signal, if !killed => {
                info!(token = %token, "Received termination signal, killing scan");
                killed = orchestrator.kill(token);
            }
            () = &mut deadline, if timeout.is_some() && !killed => {
                info!(token = %token, "Timeout reached, killing scan");
                killed = orchestrator.kill(token);
            }
            _ = ticker.tick() => {
                match orchestrator.get_result(token) {
                    Ok(result) if result.completed => return Ok(result),
                    Ok(result) => {
                        if let Some(stats) = orchestrator.progress(token) {
                            debug!(
                                matched = result.result.len(),
                                directories = stats.directories_visited,
                                files = stats.files_examined,
                                "Scan in progress"
                            );
                        }
                        last = result;
                    }
                    Err(ScanError::NotFound(_)) if killed => {
                        // The walker had not stored anything by the time we looked.
                        last.completed = true;
                        last.tier = Some(ResultTier::Interrupted);
                        return Ok(last);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
}

/// Prints the effective configuration.
fn run_config(config: &Config) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints one matched path per line.
fn print_paths(result: &ScanResult) -> color_eyre::Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    let mut paths: Vec<&String> = result.result.iter().collect();
    paths.sort_unstable();
    for path in paths {
        writeln!(handle, "{path}")?;
    }

    if result.is_interrupted() {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle, "(scan interrupted; results may be incomplete)")?;
    }
    Ok(())
}

/// Prints the result as a JSON document.
fn print_json(result: &ScanResult, elapsed: Duration) -> color_eyre::Result<()> {
    #[derive(serde::Serialize)]
    struct Report<'a> {
        #[serde(flatten)]
        result: &'a ScanResult,
        elapsed_ms: u128,
    }

    let report = Report {
        result,
        elapsed_ms: elapsed.as_millis(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load configuration
    let config = load_config(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Scan(args) => run_scan(&config, args).await,
        Commands::Config => run_config(&config),
    }
}
