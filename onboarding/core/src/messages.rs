//! Wizard Messages
//!
//! The two directions of traffic between the engine and whatever renders it.
//! Surfaces send [`Intent`]s; the engine answers every intent with an
//! [`Outcome`] and publishes [`ViewUpdate`]s describing what changed.
//!
//! # Design Philosophy
//!
//! The engine owns all state and timing. Surfaces are pure renderers that show
//! what they are told, so the same engine can sit behind a terminal, a web
//! page, or a test harness:
//!
//! - Inputs the flow prevents (empty text, nothing selected, a second click on
//!   a deploying card) are reported as [`Outcome::Ignored`], never as errors
//! - Updates are ordered exactly as the engine produced them
//! - Nothing in a `ViewUpdate` requires the surface to keep its own state

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::SelectionMode;
use crate::deploy::{DeployEvent, DeployPhase, TargetId};
use crate::screens::{CommunityPreview, Entry, PollBar, ScreenKind};
use crate::script::{ScriptEvent, Speaker};

/// Wizard session identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new unique session ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User input delivered by a surface
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Intent {
    /// Submit free text (poll question)
    SubmitText(String),
    /// Pick one of the suggested prompts by index
    PickSuggestion(usize),
    /// Select or deselect an option of the current question
    ToggleOption(String),
    /// Press the screen's primary button (e.g. the mic)
    Activate,
    /// Start deploying a target (channel card)
    ActivateTarget(TargetId),
    /// Retry a target whose deploy failed
    RetryTarget(TargetId),
    /// Continue to the next step
    Continue,
    /// Go back one step
    Back,
    /// Skip the current screen
    Skip,
}

/// Why an intent changed nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Submitted text was empty or whitespace
    EmptyText,
    /// The current question has no selected option
    NothingSelected,
    /// The screen is not in a phase that accepts this intent
    WrongPhase,
    /// The target is already deploying
    AlreadyInFlight,
    /// No target with that id on this screen
    UnknownTarget,
    /// No option or suggestion with that id
    UnknownOption,
    /// The screen cannot be skipped
    NotSkippable,
    /// Continue is disabled in the current phase
    ContinueDisabled,
    /// The screen has no use for this intent
    NotApplicable,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IgnoreReason::EmptyText => "text is empty",
            IgnoreReason::NothingSelected => "nothing selected",
            IgnoreReason::WrongPhase => "not accepted in this phase",
            IgnoreReason::AlreadyInFlight => "already in flight",
            IgnoreReason::UnknownTarget => "unknown target",
            IgnoreReason::UnknownOption => "unknown option",
            IgnoreReason::NotSkippable => "screen cannot be skipped",
            IgnoreReason::ContinueDisabled => "continue is disabled",
            IgnoreReason::NotApplicable => "not applicable on this screen",
        };
        f.write_str(text)
    }
}

/// Result of handling one intent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State changed on the current screen
    Accepted,
    /// Nothing changed
    Ignored(IgnoreReason),
    /// A different screen is now active
    Navigated(ScreenKind),
    /// The exit handler ran (back from the first screen)
    Exited,
    /// The wizard finished
    Completed,
}

/// Sound the surface may play
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    /// The mic opened
    MicOpen,
    /// The voice answer was captured
    Captured,
    /// A target went live
    Chime,
}

/// Something the surface should render
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewUpdate {
    // ============================================
    // Navigation
    // ============================================
    /// A screen became active
    ScreenMounted {
        /// The screen
        screen: ScreenKind,
        /// Position in the wizard
        index: usize,
        /// Direction it was entered from
        entry: Entry,
    },

    /// The active screen was replaced; its timers were cancelled
    ScreenTornDown {
        /// The screen
        screen: ScreenKind,
        /// Timers still pending at teardown
        cancelled_timers: usize,
    },

    /// The screen entered a new phase
    PhaseChanged {
        /// The screen
        screen: ScreenKind,
        /// Phase name
        phase: &'static str,
    },

    /// Primary button label changed
    ContinueLabel {
        /// The screen
        screen: ScreenKind,
        /// New label
        label: String,
    },

    /// Continue became enabled or disabled
    ContinueEnabled {
        /// The screen
        screen: ScreenKind,
        /// Whether continue is enabled
        enabled: bool,
    },

    // ============================================
    // Scripted dialogue
    // ============================================
    /// A turn started typing
    TurnStarted {
        /// The screen
        screen: ScreenKind,
        /// Turn index
        turn: usize,
        /// Who speaks
        speaker: Speaker,
    },

    /// More of the current line is visible
    TextRevealed {
        /// The screen
        screen: ScreenKind,
        /// Turn (or question) index
        turn: usize,
        /// Visible prefix
        prefix: String,
    },

    /// The current line is fully visible
    TurnCompleted {
        /// The screen
        screen: ScreenKind,
        /// Turn index
        turn: usize,
    },

    /// All lines were revealed
    ScriptCompleted {
        /// The screen
        screen: ScreenKind,
    },

    // ============================================
    // Questions
    // ============================================
    /// A question is now current
    QuestionShown {
        /// Question id
        question: &'static str,
        /// Position among visible questions
        position: usize,
        /// Number of visible questions
        total: usize,
        /// Selection mode
        mode: SelectionMode,
        /// Option ids
        options: Vec<&'static str>,
        /// Options already selected (restored answers)
        selected: Vec<String>,
    },

    /// The selection for a question changed
    AnswerChanged {
        /// Question id
        question: String,
        /// Current selection
        selected: Vec<String>,
    },

    // ============================================
    // Deployments
    // ============================================
    /// A deployable target changed phase
    TargetPhase {
        /// The screen
        screen: ScreenKind,
        /// Target
        target: TargetId,
        /// New phase
        phase: DeployPhase,
    },

    /// Start the "just went live" effect
    Celebrate {
        /// The screen
        screen: ScreenKind,
        /// Target
        target: TargetId,
    },

    /// Stop the "just went live" effect
    CelebrationEnded {
        /// The screen
        screen: ScreenKind,
        /// Target
        target: TargetId,
    },

    /// Build-out progress
    Progress {
        /// Modules live
        completed: usize,
        /// Modules total
        total: usize,
        /// Percentage (0-100)
        percent: u8,
    },

    // ============================================
    // Poll
    // ============================================
    /// A mock poll response arrived
    ResponseCollected {
        /// Response number (1-based)
        index: usize,
        /// Who answered
        author: &'static str,
        /// What they said
        text: &'static str,
        /// Running "responses collected" counter
        collected: u32,
    },

    /// Poll results chart
    PollResults {
        /// One bar per category
        bars: Vec<PollBar>,
    },

    // ============================================
    // Misc
    // ============================================
    /// Play a sound
    SoundCue {
        /// Which sound
        cue: SoundCue,
    },

    /// Summary of the community that was set up
    Preview {
        /// The summary
        preview: CommunityPreview,
    },

    /// The exit handler ran
    WizardExited,

    /// The wizard finished and its answers were handed off
    WizardCompleted {
        /// Session that finished
        session: SessionId,
    },
}

/// Ordered buffer of updates waiting for the surface
#[derive(Clone, Debug, Default)]
pub struct Outbox {
    updates: Vec<ViewUpdate>,
}

impl Outbox {
    /// Empty outbox
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an update
    pub fn push(&mut self, update: ViewUpdate) {
        self.updates.push(update);
    }

    /// Queue the updates for a batch of script events
    ///
    /// Returns true if the batch completed the script.
    pub fn script(&mut self, screen: ScreenKind, events: Vec<ScriptEvent>) -> bool {
        let mut completed = false;
        for event in events {
            self.push(match event {
                ScriptEvent::TurnStarted { turn, speaker } => ViewUpdate::TurnStarted {
                    screen,
                    turn,
                    speaker,
                },
                ScriptEvent::Revealed { turn, prefix, .. } => ViewUpdate::TextRevealed {
                    screen,
                    turn,
                    prefix,
                },
                ScriptEvent::TurnCompleted { turn } => ViewUpdate::TurnCompleted { screen, turn },
                ScriptEvent::Completed => {
                    completed = true;
                    ViewUpdate::ScriptCompleted { screen }
                }
            });
        }
        completed
    }

    /// Queue the updates for a batch of deploy events
    pub fn deploy(&mut self, screen: ScreenKind, events: &[DeployEvent]) {
        for event in events {
            self.push(match event {
                DeployEvent::PhaseChanged { target, phase } => ViewUpdate::TargetPhase {
                    screen,
                    target: target.clone(),
                    phase: *phase,
                },
                DeployEvent::PulseStarted { target } => ViewUpdate::Celebrate {
                    screen,
                    target: target.clone(),
                },
                DeployEvent::PulseEnded { target } => ViewUpdate::CelebrationEnded {
                    screen,
                    target: target.clone(),
                },
            });
        }
    }

    /// Take everything queued so far
    pub fn drain(&mut self) -> Vec<ViewUpdate> {
        std::mem::take(&mut self.updates)
    }

    /// Queued updates
    #[must_use]
    pub fn updates(&self) -> &[ViewUpdate] {
        &self.updates
    }

    /// Number of queued updates
    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_intent_json_shape() {
        let intent: Intent =
            serde_json::from_value(json!({ "type": "activate_target", "value": "discord" }))
                .unwrap();
        assert_eq!(intent, Intent::ActivateTarget(TargetId::from("discord")));

        let intent: Intent = serde_json::from_value(json!({ "type": "continue" })).unwrap();
        assert_eq!(intent, Intent::Continue);
    }

    #[test]
    fn test_view_update_json_shape() {
        let update = ViewUpdate::ContinueLabel {
            screen: ScreenKind::Connect,
            label: "Continue with 2 integrations".into(),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "type": "continue_label",
                "screen": "screen-connect",
                "label": "Continue with 2 integrations",
            })
        );
    }

    #[test]
    fn test_script_events_map_in_order() {
        let mut out = Outbox::new();
        let completed = out.script(
            ScreenKind::Transcript,
            vec![
                ScriptEvent::TurnCompleted { turn: 3 },
                ScriptEvent::Completed,
            ],
        );
        assert!(completed);
        assert_eq!(
            out.drain(),
            vec![
                ViewUpdate::TurnCompleted {
                    screen: ScreenKind::Transcript,
                    turn: 3
                },
                ViewUpdate::ScriptCompleted {
                    screen: ScreenKind::Transcript
                },
            ]
        );
        assert!(out.is_empty());
    }
}
