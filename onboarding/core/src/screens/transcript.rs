//! Transcript playback screen
//!
//! Replays a sample host/user conversation turn by turn. Continue unlocks
//! once the last turn is fully visible; the screen can be skipped at any time.

use crate::answers::WizardAnswers;
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::screens::{advance_phase, ScreenKind, ScreenLogic, ScreenSetup};
use crate::script::{ScriptMsg, ScriptPlayer};
use crate::scripts;
use crate::timers::TimerRegistry;

/// Phases of the transcript screen
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptPhase {
    /// Turns are being revealed
    Playing,
    /// Every turn is visible
    Finished,
}

impl Phase for TranscriptPhase {
    const INITIAL: Self = TranscriptPhase::Playing;

    fn successor(self) -> Option<Self> {
        match self {
            TranscriptPhase::Playing => Some(TranscriptPhase::Finished),
            TranscriptPhase::Finished => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            TranscriptPhase::Playing => Some(Trigger::Timer),
            TranscriptPhase::Finished => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TranscriptPhase::Playing => "playing",
            TranscriptPhase::Finished => "finished",
        }
    }
}

/// Transcript screen state
#[derive(Debug)]
pub struct Transcript {
    phase: PhaseController<TranscriptPhase>,
    player: ScriptPlayer,
    timers: TimerRegistry<ScriptMsg>,
}

impl Transcript {
    /// Create the screen
    #[must_use]
    pub fn new(setup: &ScreenSetup) -> Self {
        Self {
            phase: PhaseController::new("transcript", setup.now),
            player: ScriptPlayer::new(
                scripts::TRANSCRIPT,
                setup.timings.char_interval,
                setup.timings.turn_gap,
            ),
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> TranscriptPhase {
        self.phase.current()
    }

    /// The transcript player
    #[must_use]
    pub fn player(&self) -> &ScriptPlayer {
        &self.player
    }
}

fn wrap(msg: ScriptMsg) -> ScriptMsg {
    msg
}

impl ScreenLogic for Transcript {
    type Message = ScriptMsg;

    const KIND: ScreenKind = ScreenKind::Transcript;

    fn timers(&self) -> &TimerRegistry<ScriptMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<ScriptMsg> {
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
        let events = self.player.start(&mut self.timers, wrap);
        out.script(Self::KIND, events);
    }

    fn on_timer(&mut self, msg: ScriptMsg, _answers: &mut WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        let events = self.player.on_message(msg, &mut self.timers, wrap);
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
        self.phase.is(TranscriptPhase::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::test_support::{ms, phases, run, setup};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plays_every_turn_then_finishes() {
        let mut screen = Transcript::new(&setup());
        let mut answers = WizardAnswers::new();
        let mut out = Outbox::new();
        screen.on_mount(&answers, &mut out);
        assert!(!screen.can_continue(&answers));

        let updates = run(&mut screen, ms(60_000), &mut answers);
        let turns: Vec<usize> = updates
            .iter()
            .filter_map(|u| match u {
                ViewUpdate::TurnCompleted { turn, .. } => Some(*turn),
                _ => None,
            })
            .collect();
        assert_eq!(turns, vec![0, 1, 2, 3]);
        assert_eq!(phases(&updates), vec!["finished"]);
        assert!(screen.can_continue(&answers));
        assert_eq!(screen.timers().pending(), 0);
    }

    #[test]
    fn test_teardown_mid_playback_freezes_state() {
        let mut screen = Transcript::new(&setup());
        let mut answers = WizardAnswers::new();
        let mut out = Outbox::new();
        screen.on_mount(&answers, &mut out);
        run(&mut screen, ms(5), &mut answers);
        let visible = screen.player().visible().to_string();

        assert!(screen.teardown() > 0);
        assert_eq!(screen.teardown(), 0);
        assert!(run(&mut screen, ms(60_000), &mut answers).is_empty());
        assert_eq!(screen.player().visible(), visible);
        assert_eq!(screen.phase(), TranscriptPhase::Playing);
    }
}
