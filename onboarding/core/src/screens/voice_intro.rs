//! Voice intro screen
//!
//! The host greeting types out, then the mic button becomes available.
//! Opening the mic listens for a fixed time and captures the answer.
//!
//! ```text
//!   greeting ──script done──► awaiting-mic ──activate()──► listening ──T──► captured
//! ```

use tracing::debug;

use crate::answers::WizardAnswers;
use crate::context::AppContext;
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, SoundCue, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::screens::{advance_phase, ScreenKind, ScreenLogic, ScreenSetup};
use crate::script::{ScriptMsg, ScriptPlayer};
use crate::scripts;
use crate::timers::TimerRegistry;
use crate::timings::Timings;

/// Answer key set once the mic capture finished
pub const CAPTURED_KEY: &str = "voice.captured";

/// Phases of the voice intro
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoicePhase {
    /// Host greeting is typing
    Greeting,
    /// Waiting for the user to open the mic
    AwaitingMic,
    /// Mic open
    Listening,
    /// Answer captured
    Captured,
}

impl Phase for VoicePhase {
    const INITIAL: Self = VoicePhase::Greeting;

    fn successor(self) -> Option<Self> {
        match self {
            VoicePhase::Greeting => Some(VoicePhase::AwaitingMic),
            VoicePhase::AwaitingMic => Some(VoicePhase::Listening),
            VoicePhase::Listening => Some(VoicePhase::Captured),
            VoicePhase::Captured => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            VoicePhase::Greeting | VoicePhase::Listening => Some(Trigger::Timer),
            VoicePhase::AwaitingMic => Some(Trigger::User),
            VoicePhase::Captured => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            VoicePhase::Greeting => "greeting",
            VoicePhase::AwaitingMic => "awaiting-mic",
            VoicePhase::Listening => "listening",
            VoicePhase::Captured => "captured",
        }
    }
}

/// Timer messages of the voice intro
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceMsg {
    /// Greeting playback
    Script(ScriptMsg),
    /// The listening window elapsed
    ListenDone,
}

/// Voice intro screen state
#[derive(Debug)]
pub struct VoiceIntro {
    context: AppContext,
    timings: Timings,
    phase: PhaseController<VoicePhase>,
    greeting: ScriptPlayer,
    timers: TimerRegistry<VoiceMsg>,
}

impl VoiceIntro {
    /// Create the screen
    #[must_use]
    pub fn new(setup: &ScreenSetup) -> Self {
        let timings = setup.timings;
        Self {
            context: setup.context,
            timings,
            phase: PhaseController::new("voice", setup.now),
            greeting: ScriptPlayer::new(
                scripts::VOICE_GREETING,
                timings.char_interval,
                timings.turn_gap,
            ),
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> VoicePhase {
        self.phase.current()
    }

    /// The greeting player
    #[must_use]
    pub fn greeting(&self) -> &ScriptPlayer {
        &self.greeting
    }

    fn cue(&self, cue: SoundCue, out: &mut Outbox) {
        if self.context.sound_enabled {
            out.push(ViewUpdate::SoundCue { cue });
        }
    }
}

impl ScreenLogic for VoiceIntro {
    type Message = VoiceMsg;

    const KIND: ScreenKind = ScreenKind::VoiceIntro;

    fn timers(&self) -> &TimerRegistry<VoiceMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<VoiceMsg> {
        &mut self.timers
    }

    fn phase_name(&self) -> &'static str {
        self.phase.current().name()
    }

    fn on_mount(&mut self, _answers: &WizardAnswers, out: &mut Outbox) {
        out.push(ViewUpdate::PhaseChanged {
            screen: Self::KIND,
            phase: self.phase_name(),
        });
        let events = self.greeting.start(&mut self.timers, VoiceMsg::Script);
        out.script(Self::KIND, events);
    }

    fn on_timer(&mut self, msg: VoiceMsg, answers: &mut WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        match msg {
            VoiceMsg::Script(step) => {
                let events = self
                    .greeting
                    .on_message(step, &mut self.timers, VoiceMsg::Script);
                if out.script(Self::KIND, events) && self.phase.is(VoicePhase::Greeting) {
                    advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out);
                }
            }
            VoiceMsg::ListenDone => {
                if !self.phase.is(VoicePhase::Listening) {
                    debug!(phase = self.phase_name(), "listen timer outside listening");
                    return;
                }
                if advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out) {
                    answers.set_text(CAPTURED_KEY, "yes");
                    self.cue(SoundCue::Captured, out);
                }
            }
        }
    }

    fn on_intent(
        &mut self,
        intent: &Intent,
        _answers: &mut WizardAnswers,
        out: &mut Outbox,
    ) -> Outcome {
        if *intent != Intent::Activate {
            return Outcome::Ignored(IgnoreReason::NotApplicable);
        }
        if !self.phase.is(VoicePhase::AwaitingMic) {
            return Outcome::Ignored(IgnoreReason::WrongPhase);
        }
        let now = self.timers.now();
        advance_phase(&mut self.phase, Self::KIND, Trigger::User, now, out);
        self.timers
            .schedule(self.timings.voice_listen, VoiceMsg::ListenDone);
        self.cue(SoundCue::MicOpen, out);
        Outcome::Accepted
    }

    fn can_continue(&self, _answers: &WizardAnswers) -> bool {
        self.phase.is(VoicePhase::Captured)
    }
}
