//! Channel connect screen
//!
//! Shows one card per channel. Activating a card runs that channel through
//! the [`DeploymentSimulator`]; cards progress independently of each other.
//! The continue button is always available and its label tracks how many
//! channels are live.
//!
//! Live channels are recorded under [`CONNECTED_KEY`] and come back as live
//! when the screen is entered again.

use crate::answers::WizardAnswers;
use crate::deploy::{DeployEvent, DeployMsg, DeployOutcome, DeployPhase, DeploymentSimulator, TargetId};
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, SoundCue, ViewUpdate};
use crate::screens::{ScreenKind, ScreenLogic, ScreenSetup};
use crate::timers::TimerRegistry;

/// Answer key listing live channel ids
pub const CONNECTED_KEY: &str = "connect.channels";

/// Channel cards as `(id, label)`, in display order
pub const CHANNELS: &[(&str, &str)] = &[
    ("whatsapp", "WhatsApp"),
    ("instagram", "Instagram"),
    ("discord", "Discord"),
];

/// Connect screen state
#[derive(Debug)]
pub struct Connect {
    sound_enabled: bool,
    simulator: DeploymentSimulator,
    timers: TimerRegistry<DeployMsg>,
}

impl Connect {
    /// Create the screen with every channel idle
    #[must_use]
    pub fn new(setup: &ScreenSetup) -> Self {
        let targets = CHANNELS
            .iter()
            .map(|(id, label)| (TargetId::from(*id), *label));
        Self {
            sound_enabled: setup.context.sound_enabled,
            simulator: DeploymentSimulator::new(
                "connect",
                targets,
                &setup.timings,
                setup.failure.clone(),
                setup.now,
            ),
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// The channel simulator
    #[must_use]
    pub fn simulator(&self) -> &DeploymentSimulator {
        &self.simulator
    }

    /// Number of live channels
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.simulator.live_count()
    }
}

/// Label for the continue button given `live` connected channels
#[must_use]
pub fn continue_label(live: usize) -> String {
    match live {
        0 => "Skip for now".to_string(),
        1 => "Continue with 1 integration".to_string(),
        n => format!("Continue with {n} integrations"),
    }
}

fn wrap(msg: DeployMsg) -> DeployMsg {
    msg
}

fn outcome_of(outcome: DeployOutcome) -> Outcome {
    match outcome {
        DeployOutcome::Started => Outcome::Accepted,
        DeployOutcome::UnknownTarget => Outcome::Ignored(IgnoreReason::UnknownTarget),
        DeployOutcome::Ignored(DeployPhase::Connecting | DeployPhase::Deploying) => {
            Outcome::Ignored(IgnoreReason::AlreadyInFlight)
        }
        DeployOutcome::Ignored(_) => Outcome::Ignored(IgnoreReason::WrongPhase),
    }
}

impl ScreenLogic for Connect {
    type Message = DeployMsg;

    const KIND: ScreenKind = ScreenKind::Connect;

    fn timers(&self) -> &TimerRegistry<DeployMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<DeployMsg> {
        &mut self.timers
    }

    fn phase_name(&self) -> &'static str {
        if self.simulator.in_flight() {
            "connecting"
        } else {
            "choosing"
        }
    }

    fn on_mount(&mut self, answers: &WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        if let Some(live) = answers.selection(CONNECTED_KEY) {
            for id in live {
                self.simulator.restore_live(&TargetId::new(id.as_str()), now);
            }
        }
        for target in self.simulator.targets() {
            out.push(ViewUpdate::TargetPhase {
                screen: Self::KIND,
                target: target.id().clone(),
                phase: target.phase(),
            });
        }
    }

    fn on_timer(&mut self, msg: DeployMsg, answers: &mut WizardAnswers, out: &mut Outbox) {
        let events = self.simulator.on_message(msg, &mut self.timers, wrap);
        for event in &events {
            if let DeployEvent::PhaseChanged {
                target,
                phase: DeployPhase::Live,
            } = event
            {
                answers.insert(CONNECTED_KEY, target.as_str());
                if self.sound_enabled {
                    out.push(ViewUpdate::SoundCue {
                        cue: SoundCue::Chime,
                    });
                }
            }
        }
        out.deploy(Self::KIND, &events);
    }

    fn on_intent(
        &mut self,
        intent: &Intent,
        _answers: &mut WizardAnswers,
        out: &mut Outbox,
    ) -> Outcome {
        let now = self.timers.now();
        let mut events = Vec::new();
        let outcome = match intent {
            Intent::ActivateTarget(id) => {
                self.simulator
                    .deploy(id, now, &mut self.timers, wrap, &mut events)
            }
            Intent::RetryTarget(id) => {
                self.simulator
                    .retry(id, now, &mut self.timers, wrap, &mut events)
            }
            _ => return Outcome::Ignored(IgnoreReason::NotApplicable),
        };
        out.deploy(Self::KIND, &events);
        outcome_of(outcome)
    }

    fn can_continue(&self, _answers: &WizardAnswers) -> bool {
        true
    }

    fn continue_label(&self, _answers: &WizardAnswers) -> String {
        continue_label(self.simulator.live_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::FailureInjection;
    use crate::screens::test_support::{ms, run, setup};
    use pretty_assertions::assert_eq;

    fn activate(screen: &mut Connect, answers: &mut WizardAnswers, id: &str) -> Outcome {
        let mut out = Outbox::new();
        screen.on_intent(&Intent::ActivateTarget(id.into()), answers, &mut out)
    }

    #[test]
    fn test_labels() {
        assert_eq!(continue_label(0), "Skip for now");
        assert_eq!(continue_label(1), "Continue with 1 integration");
        assert_eq!(continue_label(3), "Continue with 3 integrations");
    }

    #[test]
    fn test_live_channels_are_recorded() {
        let mut screen = Connect::new(&setup());
        let mut answers = WizardAnswers::new();

        assert_eq!(activate(&mut screen, &mut answers, "discord"), Outcome::Accepted);
        assert_eq!(
            activate(&mut screen, &mut answers, "discord"),
            Outcome::Ignored(IgnoreReason::AlreadyInFlight)
        );
        assert_eq!(
            activate(&mut screen, &mut answers, "myspace"),
            Outcome::Ignored(IgnoreReason::UnknownTarget)
        );
        assert_eq!(screen.phase_name(), "connecting");

        let updates = run(&mut screen, ms(1_000), &mut answers);
        assert!(answers.contains(CONNECTED_KEY, "discord"));
        assert!(updates.contains(&ViewUpdate::Celebrate {
            screen: ScreenKind::Connect,
            target: "discord".into(),
        }));
        assert_eq!(screen.continue_label(&answers), "Continue with 1 integration");
        assert_eq!(
            activate(&mut screen, &mut answers, "discord"),
            Outcome::Ignored(IgnoreReason::WrongPhase)
        );
    }

    #[test]
    fn test_remount_restores_live_channels() {
        let mut answers = WizardAnswers::new();
        answers.insert(CONNECTED_KEY, "instagram");

        let mut screen = Connect::new(&setup());
        let mut out = Outbox::new();
        screen.on_mount(&answers, &mut out);

        assert_eq!(
            screen.simulator().phase(&"instagram".into()),
            Some(DeployPhase::Live)
        );
        assert_eq!(screen.live_count(), 1);
        assert_eq!(out.len(), CHANNELS.len());
        assert_eq!(screen.timers().pending(), 0);
    }

    #[test]
    fn test_failed_channel_retries() {
        let mut failing = setup();
        failing.failure = FailureInjection::FirstAttempt(vec!["whatsapp".into()]);
        let mut screen = Connect::new(&failing);
        let mut answers = WizardAnswers::new();

        activate(&mut screen, &mut answers, "whatsapp");
        run(&mut screen, ms(1_000), &mut answers);
        assert_eq!(
            screen.simulator().phase(&"whatsapp".into()),
            Some(DeployPhase::Failed)
        );
        assert!(!answers.has_selection(CONNECTED_KEY));

        let mut out = Outbox::new();
        assert_eq!(
            screen.on_intent(&Intent::RetryTarget("whatsapp".into()), &mut answers, &mut out),
            Outcome::Accepted
        );
        run(&mut screen, ms(2_000), &mut answers);
        assert!(answers.contains(CONNECTED_KEY, "whatsapp"));
    }

    #[test]
    fn test_muted_context_has_no_chime() {
        let mut muted = setup();
        muted.context = muted.context.muted();
        let mut screen = Connect::new(&muted);
        let mut answers = WizardAnswers::new();
        activate(&mut screen, &mut answers, "instagram");
        let updates = run(&mut screen, ms(1_000), &mut answers);
        assert!(!updates
            .iter()
            .any(|u| matches!(u, ViewUpdate::SoundCue { .. })));
    }
}
