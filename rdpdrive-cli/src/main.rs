//! `rdpdrive` - command-line remote desktop session driver
//!
//! Connects to a single server, runs the session until the server ends it
//! or Ctrl+C is pressed, then prints a run summary.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use clap::{ArgAction, Parser, ValueEnum};
use rdpdrive_core::config::render_settings;
use rdpdrive_core::{
    CancelToken, ClientSettings, ConfigManager, DrawingOrder, RunSummary, SessionConfig,
    SessionDriver, SessionError, SessionHooks, TransportBackend,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// `rdpdrive` connects to a remote desktop server and drives one session
#[derive(Parser)]
#[command(name = "rdpdrive")]
#[command(author, version, about = "Minimal remote desktop session driver")]
pub struct Cli {
    /// Server hostname or IP address
    pub host: String,

    /// Server port (default: 3389)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Username for authentication
    #[arg(short, long)]
    pub user: Option<String>,

    /// Domain for authentication
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Password for authentication
    #[arg(long, env = "RDPDRIVE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Desktop size as WIDTHxHEIGHT
    #[arg(short, long, value_parser = parse_size)]
    pub size: Option<(u16, u16)>,

    /// Color depth in bits per pixel (8, 15, 16, 24, 32)
    #[arg(short, long)]
    pub bpp: Option<u8>,

    /// Connection timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Upper bound for one wait on session events, in milliseconds
    #[arg(long)]
    pub wait_timeout_ms: Option<u64>,

    /// Keepalive period in seconds (0 disables it)
    #[arg(long)]
    pub keepalive: Option<u64>,

    /// Drawing order to stop advertising (repeatable), e.g. `glyph_index`
    #[arg(long = "disable-order", value_name = "NAME")]
    pub disable_orders: Vec<DrawingOrder>,

    /// Path to a settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the merged settings as TOML and exit without connecting
    #[arg(long)]
    pub dump_config: bool,

    /// Output format for the run summary
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Output format for the run summary
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable lines
    Text,
    /// Output as JSON
    Json,
}

/// Parse a `WIDTHxHEIGHT` desktop size
fn parse_size(s: &str) -> Result<(u16, u16), String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size `{s}`: expected WIDTHxHEIGHT"))?;
    let width = width
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid width `{width}`: {e}"))?;
    let height = height
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid height `{height}`: {e}"))?;
    Ok((width, height))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = load_settings(cli)?;

    if cli.dump_config {
        let text = render_settings(&settings)
            .map_err(|e| CliError::Config(format!("Failed to render settings: {e}")))?;
        print!("{text}");
        return Ok(());
    }

    let updates = Arc::new(AtomicU64::new(0));
    let config = SessionConfig::new(settings).with_hooks(logging_hooks(Arc::clone(&updates)));

    let cancel = CancelToken::new();
    watch_interrupt(cancel.clone())?;

    let handle = SessionDriver::with_cancel_token(TransportBackend::new(), cancel).spawn(config)?;
    let summary = handle.join()?;

    let output = SummaryOutput::new(&summary, updates.load(Ordering::Relaxed));
    match cli.format {
        OutputFormat::Text => print!("{}", format_text(&output)),
        OutputFormat::Json => println!("{}", format_json(&output)?),
    }
    Ok(())
}

/// Loads the settings file and applies command-line overrides on top
fn load_settings(cli: &Cli) -> Result<ClientSettings, CliError> {
    let loaded = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => match ConfigManager::new() {
            Ok(manager) => manager.load_or_default(),
            Err(e) => {
                tracing::warn!("No configuration directory, using defaults: {e}");
                Ok(ClientSettings::default())
            }
        },
    };
    let settings =
        loaded.map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))?;

    let settings = apply_overrides(settings, cli);
    settings
        .validate()
        .map_err(|e| CliError::Config(format!("Invalid settings: {e}")))?;
    Ok(settings)
}

fn apply_overrides(mut settings: ClientSettings, cli: &Cli) -> ClientSettings {
    settings.host.clone_from(&cli.host);
    if let Some(port) = cli.port {
        settings = settings.with_port(port);
    }
    if let Some(user) = &cli.user {
        settings = settings.with_username(user.as_str());
    }
    if let Some(domain) = &cli.domain {
        settings = settings.with_domain(domain.as_str());
    }
    if let Some(password) = &cli.password {
        settings = settings.with_password(password.as_str());
    }
    if let Some((width, height)) = cli.size {
        settings = settings.with_resolution(width, height);
    }
    if let Some(bpp) = cli.bpp {
        settings = settings.with_color_depth(bpp);
    }
    if let Some(timeout) = cli.timeout {
        settings = settings.with_timeout_secs(timeout);
    }
    if let Some(wait) = cli.wait_timeout_ms {
        settings = settings.with_wait_timeout_ms(wait);
    }
    if let Some(keepalive) = cli.keepalive {
        settings = settings.with_keepalive_secs(keepalive);
    }
    for order in &cli.disable_orders {
        settings.order_support.disable(*order);
    }
    settings
}

/// Hooks that log connection progress and count screen updates
fn logging_hooks(updates: Arc<AtomicU64>) -> SessionHooks {
    SessionHooks::new()
        .with_pre_connect(|settings| {
            tracing::info!(
                width = settings.width,
                height = settings.height,
                bpp = settings.color_depth,
                orders = settings.order_support.enabled().len(),
                "Negotiating session"
            );
            true
        })
        .with_post_connect(|settings| {
            tracing::info!(client = %settings.client_name, "Session established");
            true
        })
        .with_begin_paint(|update| {
            tracing::trace!(sequence = update.sequence, "Begin paint");
            true
        })
        .with_end_paint(move |update| {
            updates.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                sequence = update.sequence,
                bytes = update.bytes,
                "Screen update"
            );
            true
        })
}

/// Cancels `token` when the process receives Ctrl+C
fn watch_interrupt(token: CancelToken) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("rdpdrive-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Interrupt received, disconnecting");
                        token.cancel();
                    }
                    Err(e) => tracing::warn!("Failed to listen for Ctrl+C: {e}"),
                }
            });
        })?;
    Ok(())
}

// ============================================================================
// Output
// ============================================================================

/// Run summary as printed by the CLI
#[derive(Debug, Serialize)]
struct SummaryOutput<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    duration_ms: i64,
    screen_updates: u64,
}

impl<'a> SummaryOutput<'a> {
    fn new(summary: &'a RunSummary, screen_updates: u64) -> Self {
        Self {
            summary,
            duration_ms: summary.duration().num_milliseconds(),
            screen_updates,
        }
    }
}

fn format_text(output: &SummaryOutput<'_>) -> String {
    let summary = output.summary;
    let mut text = String::new();
    let _ = writeln!(text, "Session {} with {}", summary.session_id, summary.server);
    let _ = writeln!(text, "  State:          {}", summary.final_state());
    let _ = writeln!(text, "  Duration:       {} ms", output.duration_ms);
    let _ = writeln!(text, "  Iterations:     {}", summary.iterations);
    let _ = writeln!(text, "  Dispatches:     {}", summary.dispatches);
    let _ = writeln!(text, "  Timeouts:       {}", summary.timeouts);
    let _ = writeln!(text, "  Screen updates: {}", output.screen_updates);
    text
}

fn format_json(output: &SummaryOutput<'_>) -> Result<String, CliError> {
    serde_json::to_string_pretty(output)
        .map_err(|e| CliError::Config(format!("Failed to serialize to JSON: {e}")))
}

// ============================================================================
// Errors
// ============================================================================

/// Exit codes for CLI operations
pub mod exit_codes {
    /// Success - the session ended gracefully
    pub const SUCCESS: i32 = 0;
    /// General error - settings, context allocation or session faults
    pub const GENERAL_ERROR: i32 = 1;
    /// Connection failure - the server could not be reached in time
    pub const CONNECTION_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 1: General error (configuration, IO, session faults)
    /// - 2: Connection failure (refused, unreachable, timed out)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Session(e) if e.is_connection_error() => exit_codes::CONNECTION_FAILURE,
            Self::Config(_) | Self::Session(_) | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
