//! Onboarding Core - Headless Guided Onboarding Conversation Engine
//!
//! This crate provides the logic behind a guided, multi-screen onboarding
//! flow: scripted host/user dialogue revealed character by character,
//! question screens with conditional visibility, simulated channel and
//! module deployments, and a wizard that walks the screens in a fixed order.
//! It is completely independent of any UI framework; a surface renders the
//! [`ViewUpdate`]s it publishes and feeds [`Intent`]s back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          UI Surfaces                             │
//! │   ┌──────────┐   ┌──────────────┐   ┌────────────────────────┐   │
//! │   │ Terminal │   │   Autopilot  │   │   Tests / Headless     │   │
//! │   └────┬─────┘   └──────┬───────┘   └───────────┬────────────┘   │
//! │        └────────────────┴───────────────────────┘                │
//! │                 Intent (up)   ViewUpdate (down)                  │
//! └────────────────────────────┼─────────────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼─────────────────────────────────────┐
//! │                     ONBOARDING CORE                              │
//! │  ┌─────────────────────────┴──────────────────────────────────┐  │
//! │  │                        Wizard                              │  │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌───────────┐  │  │
//! │  │   │ Screens  │  │ Answers  │  │  Phases  │  │  Deploy   │  │  │
//! │  │   └────┬─────┘  └──────────┘  └──────────┘  │ Simulator │  │  │
//! │  │        │                                    └───────────┘  │  │
//! │  │   ┌────┴────────────────────────────────┐                  │  │
//! │  │   │ TimerRegistry ◄── ScriptPlayer ◄── Typewriter          │  │
//! │  │   └─────────────────────────────────────┘                  │  │
//! │  └────────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Time
//!
//! The engine never reads a clock. Every timer is scheduled on a virtual
//! session clock and fires when the host calls [`Wizard::advance_to`].
//! [`driver::run`] maps that clock onto tokio time; tests drive it directly.
//!
//! # Key Types
//!
//! - [`Wizard`]: owns the active screen and the session's answers
//! - [`TimerRegistry`]: per-screen timers, all cancelled on teardown
//! - [`Typewriter`] / [`ScriptPlayer`]: progressive text reveal
//! - [`PhaseController`]: forward-only phase machines
//! - [`DeploymentSimulator`]: staged, timed target activation
//!
//! # Quick Start
//!
//! ```ignore
//! use onboarding_core::{driver, Intent, Wizard, WizardOptions};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (intent_tx, intent_rx) = mpsc::channel(64);
//!     let (update_tx, mut update_rx) = mpsc::channel(1024);
//!
//!     tokio::spawn(async move {
//!         while let Some(update) = update_rx.recv().await {
//!             // Render the update
//!         }
//!     });
//!
//!     let mut wizard = Wizard::with_options(WizardOptions::default());
//!     intent_tx.send(Intent::Continue).await.ok();
//!     let end = driver::run(&mut wizard, intent_rx, update_tx).await;
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`timers`]: virtual-clock timer registry
//! - [`typewriter`]: character-by-character text reveal
//! - [`script`] / [`scripts`]: conversation scripts and their player
//! - [`phase`]: phase trait and controller
//! - [`deploy`]: deployment simulator
//! - [`screens`]: the seven onboarding screens
//! - [`wizard`]: navigation, answers, continue state
//! - [`messages`]: intents, outcomes and view updates
//! - [`driver`]: tokio runtime driver
//! - [`config`]: TOML/env configuration
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any terminal or GUI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod answers;
pub mod config;
pub mod context;
pub mod deploy;
pub mod driver;
pub mod messages;
pub mod phase;
pub mod screens;
pub mod script;
pub mod scripts;
pub mod timers;
pub mod timings;
pub mod typewriter;
pub mod wizard;

// Re-exports for convenience
pub use answers::{SelectionMode, WizardAnswers};
pub use context::{AppContext, Theme};
pub use deploy::{
    DeployEvent, DeployOutcome, DeployPhase, DeployableTarget, DeploymentSimulator,
    FailureInjection, TargetId,
};
pub use driver::{DriverError, SessionEnd};
pub use messages::{IgnoreReason, Intent, Outcome, SessionId, SoundCue, ViewUpdate};
pub use phase::{Phase, PhaseController, PhaseError, Trigger};
pub use screens::{Entry, Screen, ScreenKind, ScreenSetup, Step};
pub use script::{ConversationScript, ConversationTurn, ScriptEvent, ScriptPlayer, Speaker};
pub use timers::{TimerHandle, TimerRegistry};
pub use timings::Timings;
pub use typewriter::Typewriter;
pub use wizard::{NoopHooks, Wizard, WizardError, WizardHooks, WizardOptions, WizardStatus};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, OnboardingConfig, OnboardingToml,
};
