//! TOML Configuration File Support
//!
//! Centralized configuration loading for onboarding hosts, backed by an
//! optional TOML file at `~/.config/onboarding/onboarding.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (applied by the caller through [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/onboarding/onboarding.toml` (typically `~/.config/onboarding/onboarding.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [session]
//! sound_enabled = false
//! theme = "dark"
//!
//! [simulation]
//! fail_targets = ["instagram"]
//! failure_probability = 0.0
//! failure_seed = 7
//!
//! [logging]
//! filter = "onboarding_core=debug"
//! json = false
//! ```
//!
//! Simulated delays are deliberately absent: the flow's pacing is fixed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::{AppContext, Theme};
use crate::deploy::{FailureInjection, TargetId};
use crate::timings::Timings;
use crate::wizard::WizardOptions;

/// Environment variable toggling sound cues
pub const ENV_SOUND: &str = "ONBOARDING_SOUND";
/// Environment variable selecting the theme
pub const ENV_THEME: &str = "ONBOARDING_THEME";
/// Environment variable listing channels whose first deploy fails (comma separated)
pub const ENV_FAIL_TARGETS: &str = "ONBOARDING_FAIL_TARGETS";
/// Environment variable switching log output to JSON
pub const ENV_LOG_JSON: &str = "ONBOARDING_LOG_JSON";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// Whether screens emit sound cues
    pub sound_enabled: Option<bool>,

    /// Theme name: system, light or dark
    pub theme: Option<String>,
}

/// Simulation section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationToml {
    /// Channels whose first deploy attempt fails
    pub fail_targets: Option<Vec<String>>,

    /// Per-attempt failure probability (0.0 - 1.0)
    pub failure_probability: Option<f64>,

    /// Seed for random failures
    pub failure_seed: Option<u64>,
}

/// Logging section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingToml {
    /// `tracing-subscriber` filter directives
    pub filter: Option<String>,

    /// Emit JSON log lines
    pub json: Option<bool>,
}

/// Root TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingToml {
    /// Session settings
    pub session: SessionToml,

    /// Deploy simulation settings
    pub simulation: SimulationToml,

    /// Logging settings
    pub logging: LoggingToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Resolved onboarding configuration
#[derive(Clone, Debug, PartialEq)]
pub struct OnboardingConfig {
    /// Whether screens emit sound cues
    pub sound_enabled: bool,

    /// Requested theme
    pub theme: Theme,

    /// Channels whose first deploy attempt fails
    pub fail_targets: Vec<String>,

    /// Per-attempt failure probability
    pub failure_probability: f64,

    /// Seed for random failures
    pub failure_seed: u64,

    /// Log filter directives, if any were configured
    pub log_filter: Option<String>,

    /// Emit JSON log lines
    pub log_json: bool,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        let context = AppContext::default();
        Self {
            sound_enabled: context.sound_enabled,
            theme: context.theme,
            fail_targets: Vec::new(),
            failure_probability: 0.0,
            failure_seed: 0,
            log_filter: None,
            log_json: false,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl OnboardingConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Read-only app context for a session
    #[must_use]
    pub fn app_context(&self) -> AppContext {
        AppContext {
            sound_enabled: self.sound_enabled,
            theme: self.theme,
        }
    }

    /// Failure policy for simulated channel deploys
    ///
    /// Named targets take precedence over a random failure rate.
    #[must_use]
    pub fn failure_injection(&self) -> FailureInjection {
        if !self.fail_targets.is_empty() {
            FailureInjection::FirstAttempt(
                self.fail_targets.iter().map(TargetId::new).collect(),
            )
        } else if self.failure_probability > 0.0 {
            FailureInjection::Random {
                probability: self.failure_probability,
                seed: self.failure_seed,
            }
        } else {
            FailureInjection::Never
        }
    }

    /// Wizard options with production timings
    #[must_use]
    pub fn wizard_options(&self) -> WizardOptions {
        WizardOptions {
            context: self.app_context(),
            timings: Timings::default(),
            failure: self.failure_injection(),
        }
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] when the failure probability
    /// is outside `0.0..=1.0`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(ConfigError::ValidationError(format!(
                "failure_probability must be between 0.0 and 1.0, got {}",
                self.failure_probability
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/onboarding/onboarding.toml` or
/// `~/.config/onboarding/onboarding.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("onboarding").join("onboarding.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if a
/// value is out of range. A missing config file is not an error.
pub fn load_config() -> Result<OnboardingConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if a resolved value is invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<OnboardingConfig, ConfigError> {
    load_with_env(path, |key| std::env::var(key).ok())
}

fn load_with_env<F>(path: Option<PathBuf>, env: F) -> Result<OnboardingConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = OnboardingConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: OnboardingToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env)?;
    config.validate()?;

    Ok(config)
}

fn parse_theme(value: &str) -> Result<Theme, ConfigError> {
    value.parse().map_err(ConfigError::ValidationError)
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "0" && value != "false" && value != "off" && value != "no"
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(
    config: &mut OnboardingConfig,
    toml: &OnboardingToml,
) -> Result<(), ConfigError> {
    if let Some(enabled) = toml.session.sound_enabled {
        config.sound_enabled = enabled;
    }
    if let Some(ref theme) = toml.session.theme {
        config.theme = parse_theme(theme)?;
    }

    if let Some(ref targets) = toml.simulation.fail_targets {
        config.fail_targets.clone_from(targets);
    }
    if let Some(probability) = toml.simulation.failure_probability {
        config.failure_probability = probability;
    }
    if let Some(seed) = toml.simulation.failure_seed {
        config.failure_seed = seed;
    }

    if let Some(ref filter) = toml.logging.filter {
        config.log_filter = Some(filter.clone());
    }
    if let Some(json) = toml.logging.json {
        config.log_json = json;
    }
    Ok(())
}

/// Apply environment variable overrides
fn apply_env_config<F>(config: &mut OnboardingConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(sound) = env(ENV_SOUND) {
        config.sound_enabled = parse_flag(&sound);
        config.source = ConfigSource::Env;
    }
    if let Some(theme) = env(ENV_THEME) {
        config.theme = parse_theme(&theme)?;
        config.source = ConfigSource::Env;
    }
    if let Some(targets) = env(ENV_FAIL_TARGETS) {
        config.fail_targets = parse_list(&targets);
        config.source = ConfigSource::Env;
    }
    if let Some(json) = env(ENV_LOG_JSON) {
        config.log_json = parse_flag(&json);
        config.source = ConfigSource::Env;
    }
    Ok(())
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// CLI argument overrides that take precedence over all other sources
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Sound override
    pub sound_enabled: Option<bool>,

    /// Theme override
    pub theme: Option<Theme>,

    /// Failing targets override
    pub fail_targets: Option<Vec<String>>,

    /// JSON logging override
    pub log_json: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sound override
    #[must_use]
    pub fn with_sound_enabled(mut self, enabled: bool) -> Self {
        self.sound_enabled = Some(enabled);
        self
    }

    /// Set theme override
    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Set failing targets override
    #[must_use]
    pub fn with_fail_targets(mut self, targets: Vec<String>) -> Self {
        self.fail_targets = Some(targets);
        self
    }

    /// Set JSON logging override
    #[must_use]
    pub fn with_log_json(mut self, json: bool) -> Self {
        self.log_json = Some(json);
        self
    }

    /// Whether any override is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sound_enabled.is_none()
            && self.theme.is_none()
            && self.fail_targets.is_none()
            && self.log_json.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut OnboardingConfig) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }
        if let Some(enabled) = self.sound_enabled {
            config.sound_enabled = enabled;
        }
        if let Some(theme) = self.theme {
            config.theme = theme;
        }
        if let Some(ref targets) = self.fail_targets {
            config.fail_targets.clone_from(targets);
        }
        if let Some(json) = self.log_json {
            config.log_json = json;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
