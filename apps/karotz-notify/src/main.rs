mod config;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crate::config::AppConfig;
use karotz_client::{Action, KarotzClient, LedColor};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Send one notification to a Karotz: open an interactive session, run the command, wait
/// until the device is done with it, then close the session.
#[derive(Debug, Parser)]
#[command(name = "karotz-notify", version)]
struct Cli {
    /// Exit with a failure status when the device could not be notified.
    #[arg(long, global = true)]
    strict: bool,
    /// Close the session right after the command instead of waiting for it to play out.
    #[arg(long, global = true)]
    no_wait: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open and close a session to check the credentials.
    Probe,
    /// Speak a phrase.
    Speak {
        text: String,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Switch the LED to a colour (hex RGB).
    Light { color: String },
    /// Fade the LED to a colour.
    Fade {
        color: String,
        #[arg(long, default_value_t = 3_000)]
        period_ms: u64,
    },
    /// Pulse the LED.
    Pulse {
        color: String,
        #[arg(long, default_value_t = 3_000)]
        period_ms: u64,
        #[arg(long, default_value_t = 500)]
        pulse_ms: u64,
    },
    /// Turn the LED off.
    Off,
    /// Move the ears, or reset them when no position is given.
    Ears {
        #[arg(long, allow_hyphen_values = true)]
        left: Option<i32>,
        #[arg(long, allow_hyphen_values = true)]
        right: Option<i32>,
        #[arg(long)]
        relative: bool,
    },
}

impl Command {
    fn action(&self, default_lang: Option<&str>) -> Option<Action> {
        let action = match self {
            Command::Probe => return None,
            Command::Speak { text, lang } => match lang.as_deref().or(default_lang) {
                Some(lang) => Action::speak_in(text.clone(), lang),
                None => Action::speak(text.clone()),
            },
            Command::Light { color } => Action::light(LedColor::new(color.clone())),
            Command::Fade { color, period_ms } => Action::fade(
                LedColor::new(color.clone()),
                Duration::from_millis(*period_ms),
            ),
            Command::Pulse {
                color,
                period_ms,
                pulse_ms,
            } => Action::pulse(
                LedColor::new(color.clone()),
                Duration::from_millis(*period_ms),
                Duration::from_millis(*pulse_ms),
            ),
            Command::Off => Action::LedOff,
            Command::Ears {
                left: None,
                right: None,
                ..
            } => Action::reset_ears(),
            Command::Ears {
                left,
                right,
                relative,
            } => Action::move_ears(*left, *right, *relative),
        };
        Some(action)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let strict = cli.strict;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "karotz notification failed");
            if strict {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = AppConfig::from_env();
    let client = KarotzClient::with_config(cfg.credentials()?, cfg.client_config())
        .context("invalid karotz client configuration")?;

    client
        .start_session()
        .await
        .context("failed to start interactive session")?;

    let outcome = match cli.command.action(cfg.language.as_deref()) {
        Some(action) => client
            .execute(&action)
            .await
            .map(|_| ())
            .with_context(|| format!("device rejected {} command", action.kind())),
        None => {
            info!("credentials accepted by the device");
            Ok(())
        }
    };

    if outcome.is_ok() && !cli.no_wait {
        let queued = client.snapshot().await.queued;
        if !queued.is_zero() {
            info!(wait_ms = queued.as_millis() as u64, "waiting for device to finish");
            tokio::time::sleep(queued).await;
        }
    }

    let stopped = client
        .stop_session()
        .await
        .context("failed to stop interactive session");
    outcome?;
    stopped
}

fn init_tracing() {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .init();
}

/// `RUST_LOG`-style directives on top of an INFO default, so failures still reach the log
/// when nothing is configured.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}
