//! Screens
//!
//! One module per wizard step. Every screen owns its phase machine and a
//! [`TimerRegistry`] that lives exactly as long as the screen instance does.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────── Wizard ───────────────────────┐
//!   Intent ──────►│ dispatch ──► Screen (tagged union) ──► ScreenLogic    │
//!   now ─────────►│ advance_to ──► run_due ──► on_timer(Message)          │
//!                 │                      │                                │
//!                 │                      └──► Outbox ──► ViewUpdate ──────┼──► surface
//!                 └───────────────────────────────────────────────────────┘
//! ```
//!
//! [`ScreenLogic`] is the per-screen contract; [`Screen`] closes the set of
//! screens into one enum so the wizard can hold "the active screen" without
//! boxing and every match over screens is exhaustive.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::answers::WizardAnswers;
use crate::context::AppContext;
use crate::deploy::FailureInjection;
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::timers::TimerRegistry;
use crate::timings::Timings;

pub mod build_out;
pub mod connect;
pub mod followup;
pub mod poll;
pub mod preview;
pub mod transcript;
pub mod voice_intro;

pub use build_out::{BuildModule, BuildOut, BuildPhase};
pub use connect::{Connect, CHANNELS, CONNECTED_KEY};
pub use followup::{Followup, Question, QuestionOption, QuestionPhase, Visibility, QUESTIONS};
pub use poll::{Poll, PollBar, PollPhase, MOCK_RESPONSES, POLL_RESULTS, SUGGESTED_PROMPTS};
pub use preview::{CommunityPreview, Preview, PreviewPhase};
pub use transcript::{Transcript, TranscriptPhase};
pub use voice_intro::{VoiceIntro, VoicePhase};

// ============================================================================
// Screen identity
// ============================================================================

/// The wizard steps, in their fixed order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScreenKind {
    /// Voice greeting and mic capture
    VoiceIntro,
    /// Transcript playback
    Transcript,
    /// Branching follow-up questions
    Followup,
    /// Channel connection
    Connect,
    /// Live poll demo
    Poll,
    /// Module build-out
    BuildOut,
    /// Final preview
    Preview,
}

impl ScreenKind {
    /// Every screen in wizard order
    pub const ALL: [ScreenKind; 7] = [
        ScreenKind::VoiceIntro,
        ScreenKind::Transcript,
        ScreenKind::Followup,
        ScreenKind::Connect,
        ScreenKind::Poll,
        ScreenKind::BuildOut,
        ScreenKind::Preview,
    ];

    /// Screen at wizard position `index`
    #[must_use]
    pub fn at(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Wizard position of this screen
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable id
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            ScreenKind::VoiceIntro => "screen-voice",
            ScreenKind::Transcript => "screen-transcript",
            ScreenKind::Followup => "screen-followup",
            ScreenKind::Connect => "screen-connect",
            ScreenKind::Poll => "screen-poll",
            ScreenKind::BuildOut => "screen-build",
            ScreenKind::Preview => "screen-preview",
        }
    }

    /// Whether the screen offers skip
    #[must_use]
    pub fn skippable(self) -> bool {
        matches!(
            self,
            ScreenKind::Transcript | ScreenKind::Followup | ScreenKind::Connect
        )
    }
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for ScreenKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// Direction a screen was entered from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    /// From the previous screen (or the start)
    Forward,
    /// From the next screen via back
    Backward,
}

/// Everything a screen needs at construction
#[derive(Clone, Debug)]
pub struct ScreenSetup {
    /// Read-only app settings
    pub context: AppContext,
    /// Fixed delays
    pub timings: Timings,
    /// Failure policy for channel deploys
    pub failure: FailureInjection,
    /// Session time at mount
    pub now: Duration,
}

/// What the wizard should do after a continue or back
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Handled inside the screen (e.g. next question)
    Stay,
    /// Leave the screen in the requested direction
    Leave,
    /// Not allowed right now
    Blocked(IgnoreReason),
}

// ============================================================================
// Screen contract
// ============================================================================

/// Behaviour every screen provides
pub trait ScreenLogic {
    /// Timer message type of this screen
    type Message: Clone + fmt::Debug;

    /// Which screen this is
    const KIND: ScreenKind;

    /// The screen's timers
    fn timers(&self) -> &TimerRegistry<Self::Message>;

    /// The screen's timers, mutably
    fn timers_mut(&mut self) -> &mut TimerRegistry<Self::Message>;

    /// Name of the screen's current phase
    fn phase_name(&self) -> &'static str;

    /// Called once, right after the screen becomes active
    fn on_mount(&mut self, answers: &WizardAnswers, out: &mut Outbox);

    /// Apply a fired timer
    fn on_timer(&mut self, msg: Self::Message, answers: &mut WizardAnswers, out: &mut Outbox);

    /// Apply a screen-level intent (never continue, back or skip)
    fn on_intent(
        &mut self,
        intent: &Intent,
        answers: &mut WizardAnswers,
        out: &mut Outbox,
    ) -> Outcome;

    /// Whether continue is enabled
    fn can_continue(&self, answers: &WizardAnswers) -> bool;

    /// Primary button label
    fn continue_label(&self, answers: &WizardAnswers) -> String {
        let _ = answers;
        "Continue".to_string()
    }

    /// Handle continue
    fn on_continue(&mut self, answers: &mut WizardAnswers, out: &mut Outbox) -> Step {
        let _ = out;
        if self.can_continue(answers) {
            Step::Leave
        } else {
            Step::Blocked(IgnoreReason::ContinueDisabled)
        }
    }

    /// Handle back
    fn on_back(&mut self, answers: &mut WizardAnswers, out: &mut Outbox) -> Step {
        let _ = (answers, out);
        Step::Leave
    }

    /// Write default answers before a skip
    fn apply_defaults(&mut self, answers: &mut WizardAnswers) {
        let _ = answers;
    }

    /// Deliver every timer due at or before `now`, in order
    fn run_due(&mut self, now: Duration, answers: &mut WizardAnswers, out: &mut Outbox) -> usize {
        let mut delivered = 0;
        while let Some(fired) = self.timers_mut().pop_due(now) {
            self.on_timer(fired.message, answers, out);
            delivered += 1;
        }
        delivered
    }

    /// Cancel everything the screen scheduled; safe to call repeatedly
    fn teardown(&mut self) -> usize {
        self.timers_mut().cancel_all()
    }
}

/// Advance `controller` and publish the new phase
///
/// Returns false (and logs) if the phase machine rejected the move.
pub(crate) fn advance_phase<P: Phase>(
    controller: &mut PhaseController<P>,
    screen: ScreenKind,
    cause: Trigger,
    now: Duration,
    out: &mut Outbox,
) -> bool {
    match controller.advance(cause, now) {
        Ok(phase) => {
            out.push(ViewUpdate::PhaseChanged {
                screen,
                phase: phase.name(),
            });
            true
        }
        Err(err) => {
            tracing::warn!(screen = %screen, error = %err, "phase advance rejected");
            false
        }
    }
}

// ============================================================================
// Active screen
// ============================================================================

/// The active screen
#[derive(Debug)]
pub enum Screen {
    /// See [`VoiceIntro`]
    VoiceIntro(VoiceIntro),
    /// See [`Transcript`]
    Transcript(Transcript),
    /// See [`Followup`]
    Followup(Followup),
    /// See [`Connect`]
    Connect(Connect),
    /// See [`Poll`]
    Poll(Poll),
    /// See [`BuildOut`]
    BuildOut(BuildOut),
    /// See [`Preview`]
    Preview(Preview),
}

macro_rules! each_screen {
    ($screen:expr, $inner:ident => $body:expr) => {
        match $screen {
            Screen::VoiceIntro($inner) => $body,
            Screen::Transcript($inner) => $body,
            Screen::Followup($inner) => $body,
            Screen::Connect($inner) => $body,
            Screen::Poll($inner) => $body,
            Screen::BuildOut($inner) => $body,
            Screen::Preview($inner) => $body,
        }
    };
}

impl Screen {
    /// Construct the screen for `kind`
    ///
    /// Construction schedules nothing; timers start in [`Screen::on_mount`].
    #[must_use]
    pub fn create(kind: ScreenKind, setup: &ScreenSetup, entry: Entry) -> Self {
        match kind {
            ScreenKind::VoiceIntro => Screen::VoiceIntro(VoiceIntro::new(setup)),
            ScreenKind::Transcript => Screen::Transcript(Transcript::new(setup)),
            ScreenKind::Followup => Screen::Followup(Followup::new(setup, entry)),
            ScreenKind::Connect => Screen::Connect(Connect::new(setup)),
            ScreenKind::Poll => Screen::Poll(Poll::new(setup)),
            ScreenKind::BuildOut => Screen::BuildOut(BuildOut::new(setup)),
            ScreenKind::Preview => Screen::Preview(Preview::new(setup)),
        }
    }

    /// Which screen this is
    #[must_use]
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::VoiceIntro(_) => VoiceIntro::KIND,
            Screen::Transcript(_) => Transcript::KIND,
            Screen::Followup(_) => Followup::KIND,
            Screen::Connect(_) => Connect::KIND,
            Screen::Poll(_) => Poll::KIND,
            Screen::BuildOut(_) => BuildOut::KIND,
            Screen::Preview(_) => Preview::KIND,
        }
    }

    /// Name of the current phase
    #[must_use]
    pub fn phase_name(&self) -> &'static str {
        each_screen!(self, s => s.phase_name())
    }

    /// Start the screen
    pub fn on_mount(&mut self, answers: &WizardAnswers, out: &mut Outbox) {
        each_screen!(self, s => s.on_mount(answers, out));
    }

    /// Deliver due timers
    pub fn run_due(&mut self, now: Duration, answers: &mut WizardAnswers, out: &mut Outbox) -> usize {
        each_screen!(self, s => s.run_due(now, answers, out))
    }

    /// Apply a screen-level intent
    pub fn on_intent(
        &mut self,
        intent: &Intent,
        answers: &mut WizardAnswers,
        out: &mut Outbox,
    ) -> Outcome {
        each_screen!(self, s => s.on_intent(intent, answers, out))
    }

    /// Whether continue is enabled
    #[must_use]
    pub fn can_continue(&self, answers: &WizardAnswers) -> bool {
        each_screen!(self, s => s.can_continue(answers))
    }

    /// Primary button label
    #[must_use]
    pub fn continue_label(&self, answers: &WizardAnswers) -> String {
        each_screen!(self, s => s.continue_label(answers))
    }

    /// Handle continue
    pub fn on_continue(&mut self, answers: &mut WizardAnswers, out: &mut Outbox) -> Step {
        each_screen!(self, s => s.on_continue(answers, out))
    }

    /// Handle back
    pub fn on_back(&mut self, answers: &mut WizardAnswers, out: &mut Outbox) -> Step {
        each_screen!(self, s => s.on_back(answers, out))
    }

    /// Write default answers before a skip
    pub fn apply_defaults(&mut self, answers: &mut WizardAnswers) {
        each_screen!(self, s => s.apply_defaults(answers));
    }

    /// Cancel all timers
    pub fn teardown(&mut self) -> usize {
        each_screen!(self, s => s.teardown())
    }

    /// Earliest pending timer
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        each_screen!(self, s => s.timers().next_deadline())
    }

    /// Number of pending timers
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        each_screen!(self, s => s.timers().pending())
    }

    /// The voice intro screen, if active
    #[must_use]
    pub fn as_voice_intro(&self) -> Option<&VoiceIntro> {
        match self {
            Screen::VoiceIntro(s) => Some(s),
            _ => None,
        }
    }

    /// The transcript screen, if active
    #[must_use]
    pub fn as_transcript(&self) -> Option<&Transcript> {
        match self {
            Screen::Transcript(s) => Some(s),
            _ => None,
        }
    }

    /// The follow-up screen, if active
    #[must_use]
    pub fn as_followup(&self) -> Option<&Followup> {
        match self {
            Screen::Followup(s) => Some(s),
            _ => None,
        }
    }

    /// The connect screen, if active
    #[must_use]
    pub fn as_connect(&self) -> Option<&Connect> {
        match self {
            Screen::Connect(s) => Some(s),
            _ => None,
        }
    }

    /// The poll screen, if active
    #[must_use]
    pub fn as_poll(&self) -> Option<&Poll> {
        match self {
            Screen::Poll(s) => Some(s),
            _ => None,
        }
    }

    /// The build-out screen, if active
    #[must_use]
    pub fn as_build_out(&self) -> Option<&BuildOut> {
        match self {
            Screen::BuildOut(s) => Some(s),
            _ => None,
        }
    }

    /// The preview screen, if active
    #[must_use]
    pub fn as_preview(&self) -> Option<&Preview> {
        match self {
            Screen::Preview(s) => Some(s),
            _ => None,
        }
    }
}
