//! Sensu handler that triggers automated remediations.
//!
//! Reads one event from stdin. Run `sensu-remediation-handler --help` for
//! the available flags.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sensu_remediation_handler::config::{DEFAULT_ANNOTATION, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use sensu_remediation_handler::{Event, Handler, HandlerConfig, HandlerOutcome, MatchMode};

/// Sensu Go handler for triggering automated remediations.
#[derive(Parser)]
#[command(name = "sensu-remediation-handler")]
#[command(about = "Sensu Go handler for triggering automated remediations (playbooks)")]
#[command(version)]
struct Cli {
    /// Remediation actions annotation
    #[arg(
        short,
        long,
        env = "SENSU_REMEDIATION_ANNOTATION",
        default_value = DEFAULT_ANNOTATION
    )]
    annotation: String,

    /// Sensu API URL
    #[arg(long, env = "SENSU_API_URL", default_value = DEFAULT_API_URL)]
    sensu_api_url: String,

    /// Sensu API key
    #[arg(long, env = "SENSU_API_KEY", default_value = "", hide_env_values = true)]
    sensu_api_key: String,

    /// Sensu API username, used when no API key is set
    #[arg(long, env = "SENSU_API_USER", default_value = "")]
    sensu_api_user: String,

    /// Sensu API password, used when no API key is set
    #[arg(long, env = "SENSU_API_PASSWORD", default_value = "", hide_env_values = true)]
    sensu_api_password: String,

    /// Sensu API trusted certificate authority file
    #[arg(long, env = "SENSU_TRUSTED_CA_FILE")]
    sensu_trusted_ca_file: Option<PathBuf>,

    /// Dispatch only the first matching action, or every matching action
    #[arg(long, env = "SENSU_REMEDIATION_MATCH_MODE", value_enum, default_value_t = MatchMode::First)]
    match_mode: MatchMode,

    /// Timeout in seconds for each API request
    #[arg(long, env = "SENSU_API_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Default, clap::ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            annotation: self.annotation.clone(),
            api_url: self.sensu_api_url.clone(),
            api_key: self.sensu_api_key.clone(),
            api_user: self.sensu_api_user.clone(),
            api_password: self.sensu_api_password.clone(),
            trusted_ca_file: self
                .sensu_trusted_ca_file
                .clone()
                .filter(|p| !p.as_os_str().is_empty()),
            match_mode: self.match_mode,
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn read_event() -> Result<Event> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read event from stdin")?;
    Ok(Event::from_json(&input)?)
}

/// Handle one event with the CLI configuration.
///
/// Configuration is validated by the handler after per-event annotation
/// overrides apply, so credentials may come from the event alone.
async fn handle_event(cli: &Cli, event: &Event) -> Result<HandlerOutcome> {
    info!(
        check = %event.check_name(),
        entity = %event.entity_name(),
        namespace = %event.namespace(),
        status = event.status(),
        occurrences = event.occurrences(),
        "Handling event"
    );

    let handler = Handler::new(cli.handler_config());
    Ok(handler.handle(event).await?)
}

async fn run(cli: &Cli) -> Result<()> {
    let event = read_event().await?;

    if let HandlerOutcome::Dispatched(outcomes) = handle_event(cli, &event).await? {
        for outcome in outcomes {
            println!("{}", outcome.status);
            println!("{}", outcome.body);
        }
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Remediation handler failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
