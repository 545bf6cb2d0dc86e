//! Onboarding Runner - Terminal Surface for the Guided Onboarding Engine
//!
//! Loads configuration, initialises logging, and runs one onboarding session
//! on the real clock. Updates are printed to stdout (as text or JSON lines);
//! intents come from stdin commands or, with `--autopilot`, from a scripted
//! user that clicks through every screen.
//!
//! # Usage
//!
//! ```bash
//! # Interactive session (type `help` for commands)
//! onboarding-runner
//!
//! # Watch the whole flow play itself
//! onboarding-runner --autopilot
//!
//! # Machine-readable updates, no sound cues, Instagram fails once
//! onboarding-runner --json --mute --fail instagram
//!
//! # Verbose engine logs (written to stderr)
//! RUST_LOG=onboarding_core=debug onboarding-runner --autopilot
//! ```

mod autopilot;
mod commands;
mod surface;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use onboarding_core::{
    driver, load_config, load_config_from_path, ConfigOverrides, OnboardingConfig, SessionEnd,
    Theme, Wizard, WizardAnswers, WizardHooks,
};

use autopilot::Autopilot;
use surface::{OutputFormat, Surface};

/// Default log directives when neither `RUST_LOG` nor the config sets one
const DEFAULT_LOG_FILTER: &str = "onboarding_runner=info,onboarding_core=info";

/// Capacity of the intent and update channels
const CHANNEL_CAPACITY: usize = 1024;

/// Onboarding Runner - play the guided onboarding flow in a terminal
#[derive(Parser, Debug)]
#[command(name = "onboarding-runner")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "ONBOARDING_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Let a scripted user drive the session
    #[arg(short = 'a', long)]
    autopilot: bool,

    /// Print updates as JSON lines
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Disable sound cues
    #[arg(short = 'm', long)]
    mute: bool,

    /// Theme (system, light, dark)
    #[arg(short = 't', long, value_name = "THEME")]
    theme: Option<Theme>,

    /// Channels whose first deploy attempt fails (comma separated)
    #[arg(long, value_name = "CHANNELS", value_delimiter = ',')]
    fail: Option<Vec<String>>,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if self.mute {
            overrides = overrides.with_sound_enabled(false);
        }
        if let Some(theme) = self.theme {
            overrides = overrides.with_theme(theme);
        }
        if let Some(ref targets) = self.fail {
            overrides = overrides.with_fail_targets(targets.clone());
        }
        if self.log_json {
            overrides = overrides.with_log_json(true);
        }
        overrides
    }
}

/// Hooks that log the session's hand-off points
#[derive(Debug, Default)]
struct RunnerHooks;

impl WizardHooks for RunnerHooks {
    fn on_exit(&mut self) {
        info!("User backed out of onboarding");
    }

    fn on_complete(&mut self, answers: &WizardAnswers) {
        info!(answers = %answers.snapshot(), "Onboarding answers handed off");
    }
}

/// Initialize logging on stderr; stdout belongs to the surface
fn init_logging(config: &OnboardingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER),
        )
    });

    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    }
}

/// Resolve configuration from file, environment and CLI flags
fn resolve_config(args: &Args) -> Result<OnboardingConfig> {
    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };
    args.overrides().apply(&mut config);
    Ok(config)
}

async fn run_session(args: Args, config: OnboardingConfig) -> Result<SessionEnd> {
    let (intent_tx, intent_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (update_tx, update_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // In autopilot mode the surface owns the only intent sender; otherwise
    // stdin does, and closing stdin disconnects the session.
    let (surface, commands) = if args.autopilot {
        info!("Autopilot engaged");
        let surface = Surface::new(format, Some(Autopilot::new()));
        (tokio::spawn(surface.run(update_rx, Some(intent_tx))), None)
    } else {
        let surface = Surface::new(format, None);
        (
            tokio::spawn(surface.run(update_rx, None)),
            Some(tokio::spawn(commands::read_commands(intent_tx))),
        )
    };

    let mut wizard = Wizard::new(config.wizard_options(), RunnerHooks);
    info!(session = %wizard.session(), theme = %config.theme, sound = config.sound_enabled, "Session created");

    let end = tokio::select! {
        end = driver::run(&mut wizard, intent_rx, update_tx) => end.context("Session failed")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for ctrl-c")?;
            info!("Interrupted");
            SessionEnd::Disconnected
        }
    };

    if let Some(commands) = commands {
        commands.abort();
    }
    match surface.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Surface stopped with error"),
        Err(e) if e.is_cancelled() => {}
        Err(e) => warn!(error = %e, "Surface task failed"),
    }

    Ok(end)
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration and logging are set up before the runtime starts.
    let config = resolve_config(&args)?;
    init_logging(&config);

    info!("Onboarding runner starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if let Some(ref path) = config.config_file_path {
        info!(path = %path.display(), source = %config.source(), "Config file");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    let result = runtime.block_on(run_session(args, config));
    // A pending stdin read would otherwise hold the runtime open.
    runtime.shutdown_background();

    match result {
        Ok(end) => {
            info!(?end, "Onboarding runner stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Onboarding runner stopped with error");
            Err(e)
        }
    }
}
