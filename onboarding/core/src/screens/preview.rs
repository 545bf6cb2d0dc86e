//! Preview screen
//!
//! Summarises the community built from the session's answers while the host
//! plays the closing lines. Continuing from here completes the wizard.

use serde::Serialize;

use crate::answers::WizardAnswers;
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::screens::build_out::{modules_for, MODULES_KEY};
use crate::screens::poll::QUESTION_KEY;
use crate::screens::{advance_phase, ScreenKind, ScreenLogic, ScreenSetup, CONNECTED_KEY};
use crate::script::{ScriptMsg, ScriptPlayer};
use crate::scripts;
use crate::timers::TimerRegistry;

/// What the generated community looks like
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommunityPreview {
    /// Main goal
    pub goal: Option<String>,
    /// Event kinds offered
    pub event_kinds: Vec<String>,
    /// How the community earns, when monetising
    pub monetization: Option<String>,
    /// Where members talk today
    pub channels: Vec<String>,
    /// Channels connected during onboarding
    pub connected: Vec<String>,
    /// The poll question asked in the demo
    pub poll_question: Option<String>,
    /// Modules built
    pub modules: Vec<String>,
}

impl CommunityPreview {
    /// Build the summary from the session's answers
    #[must_use]
    pub fn from_answers(answers: &WizardAnswers) -> Self {
        let all = |key: &str| -> Vec<String> {
            answers
                .selection(key)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        };
        let first = |key: &str| -> Option<String> {
            answers
                .selection(key)
                .and_then(|set| set.iter().next().cloned())
        };

        let mut modules = all(MODULES_KEY);
        if modules.is_empty() {
            modules = modules_for(answers)
                .into_iter()
                .map(|module| module.id.to_string())
                .collect();
        }

        Self {
            goal: first("goal"),
            event_kinds: all("events"),
            monetization: first("monetize_model"),
            channels: all("channels"),
            connected: all(CONNECTED_KEY),
            poll_question: answers.text(QUESTION_KEY).map(str::to_string),
            modules,
        }
    }
}

/// Phases of the preview
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PreviewPhase {
    /// Closing lines typing
    Revealing,
    /// Ready to finish
    Ready,
}

impl Phase for PreviewPhase {
    const INITIAL: Self = PreviewPhase::Revealing;

    fn successor(self) -> Option<Self> {
        match self {
            PreviewPhase::Revealing => Some(PreviewPhase::Ready),
            PreviewPhase::Ready => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            PreviewPhase::Revealing => Some(Trigger::Timer),
            PreviewPhase::Ready => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PreviewPhase::Revealing => "revealing",
            PreviewPhase::Ready => "ready",
        }
    }
}

/// Preview screen state
#[derive(Debug)]
pub struct Preview {
    phase: PhaseController<PreviewPhase>,
    outro: ScriptPlayer,
    summary: CommunityPreview,
    timers: TimerRegistry<ScriptMsg>,
}

impl Preview {
    /// Create the screen
    #[must_use]
    pub fn new(setup: &ScreenSetup) -> Self {
        Self {
            phase: PhaseController::new("preview", setup.now),
            outro: ScriptPlayer::new(
                scripts::PREVIEW_OUTRO,
                setup.timings.char_interval,
                setup.timings.turn_gap,
            ),
            summary: CommunityPreview::default(),
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> PreviewPhase {
        self.phase.current()
    }

    /// The summary shown
    #[must_use]
    pub fn summary(&self) -> &CommunityPreview {
        &self.summary
    }
}

fn wrap(msg: ScriptMsg) -> ScriptMsg {
    msg
}

impl ScreenLogic for Preview {
    type Message = ScriptMsg;

    const KIND: ScreenKind = ScreenKind::Preview;

    fn timers(&self) -> &TimerRegistry<ScriptMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<ScriptMsg> {
        &mut self.timers
    }

    fn phase_name(&self) -> &'static str {
        self.phase.current().name()
    }

    fn on_mount(&mut self, answers: &WizardAnswers, out: &mut Outbox) {
        self.summary = CommunityPreview::from_answers(answers);
        out.push(ViewUpdate::PhaseChanged {
            screen: Self::KIND,
            phase: self.phase_name(),
        });
        out.push(ViewUpdate::Preview {
            preview: self.summary.clone(),
        });
        let events = self.outro.start(&mut self.timers, wrap);
        out.script(Self::KIND, events);
    }

    fn on_timer(&mut self, msg: ScriptMsg, _answers: &mut WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        let events = self.outro.on_message(msg, &mut self.timers, wrap);
        if out.script(Self::KIND, events) {
            advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out);
        }
    }

    fn on_intent(
        &mut self,
        _intent: &Intent,
        _answers: &mut WizardAnswers,
        _out: &mut Outbox,
    ) -> Outcome {
        Outcome::Ignored(IgnoreReason::NotApplicable)
    }

    fn can_continue(&self, _answers: &WizardAnswers) -> bool {
        self.phase.is(PreviewPhase::Ready)
    }

    fn continue_label(&self, _answers: &WizardAnswers) -> String {
        "Launch my community".to_string()
    }
}
