//! Autopilot
//!
//! A scripted user for demos and smoke runs. It watches the update stream and
//! answers with the intent a patient user would send next: open the mic once
//! the greeting ends, pick the first option of every question, connect the
//! first channel, send the first suggested poll question, and press continue
//! whenever it lights up.

use tracing::debug;

use onboarding_core::screens::CHANNELS;
use onboarding_core::{DeployPhase, Intent, ScreenKind, TargetId, ViewUpdate};

/// Scripted user
#[derive(Debug, Default)]
pub struct Autopilot {
    screen: Option<ScreenKind>,
    first_option: Option<&'static str>,
    already_answered: bool,
}

impl Autopilot {
    /// Create an autopilot that has seen nothing yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The intent to send in response to `update`, if any
    pub fn react(&mut self, update: &ViewUpdate) -> Option<Intent> {
        let intent = match update {
            ViewUpdate::ScreenMounted { screen, .. } => {
                self.screen = Some(*screen);
                match screen {
                    ScreenKind::Connect => CHANNELS
                        .first()
                        .map(|(id, _)| Intent::ActivateTarget(TargetId::from(*id))),
                    ScreenKind::Poll => Some(Intent::PickSuggestion(0)),
                    _ => None,
                }
            }
            ViewUpdate::PhaseChanged {
                screen: ScreenKind::VoiceIntro,
                phase: "awaiting-mic",
            } => Some(Intent::Activate),
            ViewUpdate::QuestionShown {
                options, selected, ..
            } => {
                self.first_option = options.first().copied();
                self.already_answered = !selected.is_empty();
                None
            }
            ViewUpdate::PhaseChanged {
                screen: ScreenKind::Followup,
                phase: "answering",
            } if !self.already_answered => self.first_option.map(|o| Intent::ToggleOption(o.into())),
            ViewUpdate::TargetPhase {
                screen: ScreenKind::Connect,
                target,
                phase: DeployPhase::Failed,
            } => Some(Intent::RetryTarget(target.clone())),
            ViewUpdate::CelebrationEnded {
                screen: ScreenKind::Connect,
                ..
            } => Some(Intent::Continue),
            // Continue is always enabled on the connect screen; wait for a channel instead.
            ViewUpdate::ContinueEnabled {
                screen,
                enabled: true,
            } if *screen != ScreenKind::Connect => Some(Intent::Continue),
            _ => None,
        };
        if let Some(ref intent) = intent {
            debug!(screen = ?self.screen, ?intent, "autopilot");
        }
        intent
    }
}
