//! Wizard Navigator
//!
//! Sequences the screens in their fixed order, owns the session's answers and
//! clock, and is the single entry point surfaces talk to.
//!
//! # Architecture
//!
//! ```text
//!   dispatch(intent, now)
//!        │
//!        ├─ advance_to(now) ── active screen's due timers
//!        │
//!        ├─ Continue / Back ──► screen decides: Stay | Leave | Blocked
//!        │                              │
//!        │                              └─ Leave ──► next() / back()
//!        ├─ Skip ──► skippable? ──► apply_defaults ──► next()
//!        └─ anything else ──► screen.on_intent
//! ```
//!
//! Only one screen exists at a time. Leaving a screen tears it down first,
//! which cancels every timer it scheduled, so nothing it started can touch
//! the next screen's state. Back from the first screen calls the exit hook
//! and stays put; continuing from the last screen completes the wizard,
//! hands the answers to the completion hook, and discards them.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::answers::WizardAnswers;
use crate::context::AppContext;
use crate::deploy::FailureInjection;
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, SessionId, ViewUpdate};
use crate::screens::{Entry, Screen, ScreenKind, ScreenSetup, Step};
use crate::timings::Timings;

/// Wizard navigation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// The wizard already completed
    #[error("wizard session already completed")]
    Completed,

    /// `go_to` past the last screen
    #[error("screen index {index} out of range (wizard has {len} screens)")]
    ScreenOutOfRange {
        /// Requested index
        index: usize,
        /// Number of screens
        len: usize,
    },
}

/// Callbacks into the host application
pub trait WizardHooks {
    /// Back was pressed on the first screen
    fn on_exit(&mut self) {}

    /// The wizard finished; `answers` are discarded afterwards
    fn on_complete(&mut self, answers: &WizardAnswers) {
        let _ = answers;
    }
}

/// Hooks that do nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

impl WizardHooks for NoopHooks {}

/// Session-wide settings
#[derive(Clone, Debug, Default)]
pub struct WizardOptions {
    /// Read-only app settings
    pub context: AppContext,
    /// Fixed delays
    pub timings: Timings,
    /// Failure policy for channel deploys
    pub failure: FailureInjection,
}

/// Lifecycle of a wizard session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardStatus {
    /// A screen is active
    Active,
    /// The last screen was completed
    Completed,
}

/// The onboarding wizard
#[derive(Debug)]
pub struct Wizard<H: WizardHooks = NoopHooks> {
    session: SessionId,
    options: WizardOptions,
    hooks: H,
    answers: WizardAnswers,
    index: usize,
    screen: Option<Screen>,
    now: Duration,
    status: WizardStatus,
    outbox: Outbox,
    last_enabled: Option<bool>,
    last_label: Option<String>,
}

impl<H: WizardHooks> Wizard<H> {
    /// Start a session on the first screen at time zero
    pub fn new(options: WizardOptions, hooks: H) -> Self {
        let mut wizard = Self {
            session: SessionId::new(),
            options,
            hooks,
            answers: WizardAnswers::new(),
            index: 0,
            screen: None,
            now: Duration::ZERO,
            status: WizardStatus::Active,
            outbox: Outbox::new(),
            last_enabled: None,
            last_label: None,
        };
        info!(session = %wizard.session, "onboarding session started");
        wizard.mount(0, Entry::Forward);
        wizard
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Session id
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Session clock
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Session lifecycle
    #[must_use]
    pub fn status(&self) -> WizardStatus {
        self.status
    }

    /// Whether the wizard has completed
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == WizardStatus::Completed
    }

    /// The current (or, once completed, the last) screen
    #[must_use]
    pub fn current_screen(&self) -> ScreenKind {
        ScreenKind::ALL[self.index]
    }

    /// Wizard position of the current screen
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The active screen
    #[must_use]
    pub fn screen(&self) -> Option<&Screen> {
        self.screen.as_ref()
    }

    /// Answers given so far (empty once completed)
    #[must_use]
    pub fn answers(&self) -> &WizardAnswers {
        &self.answers
    }

    /// The host hooks
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Whether continue is enabled on the active screen
    #[must_use]
    pub fn can_continue(&self) -> bool {
        self.screen
            .as_ref()
            .is_some_and(|screen| screen.can_continue(&self.answers))
    }

    /// When the active screen's next timer is due
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.screen.as_ref().and_then(Screen::next_deadline)
    }

    /// Take the updates published since the last drain
    pub fn drain_updates(&mut self) -> Vec<ViewUpdate> {
        self.outbox.drain()
    }

    // ========================================================================
    // Time
    // ========================================================================

    /// Move the session clock to `now` and deliver every timer due by then
    ///
    /// The clock never goes backwards. Returns the number of timers delivered.
    pub fn advance_to(&mut self, now: Duration) -> Result<usize, WizardError> {
        self.ensure_active()?;
        self.now = self.now.max(now);
        let delivered = match self.screen.as_mut() {
            Some(screen) => screen.run_due(self.now, &mut self.answers, &mut self.outbox),
            None => 0,
        };
        self.sync_continue();
        Ok(delivered)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Handle one intent at session time `now`
    pub fn dispatch(&mut self, intent: Intent, now: Duration) -> Result<Outcome, WizardError> {
        self.advance_to(now)?;
        debug!(screen = %self.current_screen(), ?intent, "dispatch");

        let outcome = match intent {
            Intent::Continue => match self.screen_step(Screen::on_continue) {
                Step::Stay => Outcome::Accepted,
                Step::Leave => self.next()?,
                Step::Blocked(reason) => Outcome::Ignored(reason),
            },
            Intent::Back => match self.screen_step(Screen::on_back) {
                Step::Stay => Outcome::Accepted,
                Step::Leave => self.back()?,
                Step::Blocked(reason) => Outcome::Ignored(reason),
            },
            Intent::Skip => self.skip()?,
            other => match self.screen.as_mut() {
                Some(screen) => screen.on_intent(&other, &mut self.answers, &mut self.outbox),
                None => Outcome::Ignored(IgnoreReason::NotApplicable),
            },
        };

        self.sync_continue();
        if let Outcome::Ignored(reason) = outcome {
            debug!(screen = %self.current_screen(), %reason, "intent ignored");
        }
        Ok(outcome)
    }

    /// Activate the screen at `index`
    pub fn go_to(&mut self, index: usize) -> Result<Outcome, WizardError> {
        self.ensure_active()?;
        let len = ScreenKind::ALL.len();
        if index >= len {
            return Err(WizardError::ScreenOutOfRange { index, len });
        }
        let entry = if index < self.index {
            Entry::Backward
        } else {
            Entry::Forward
        };
        Ok(self.transition(index, entry))
    }

    /// Move to the next screen, completing the wizard after the last one
    pub fn next(&mut self) -> Result<Outcome, WizardError> {
        self.ensure_active()?;
        if self.index + 1 >= ScreenKind::ALL.len() {
            return Ok(self.complete());
        }
        Ok(self.transition(self.index + 1, Entry::Forward))
    }

    /// Move to the previous screen; on the first screen call the exit hook
    pub fn back(&mut self) -> Result<Outcome, WizardError> {
        self.ensure_active()?;
        if self.index == 0 {
            info!(session = %self.session, "exit requested from first screen");
            self.hooks.on_exit();
            self.outbox.push(ViewUpdate::WizardExited);
            return Ok(Outcome::Exited);
        }
        Ok(self.transition(self.index - 1, Entry::Backward))
    }

    /// Complete the current screen with default answers, if it is skippable
    pub fn skip(&mut self) -> Result<Outcome, WizardError> {
        self.ensure_active()?;
        let kind = self.current_screen();
        if !kind.skippable() {
            return Ok(Outcome::Ignored(IgnoreReason::NotSkippable));
        }
        if let Some(screen) = self.screen.as_mut() {
            screen.apply_defaults(&mut self.answers);
        }
        info!(screen = %kind, "screen skipped");
        self.next()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn ensure_active(&self) -> Result<(), WizardError> {
        match self.status {
            WizardStatus::Active => Ok(()),
            WizardStatus::Completed => Err(WizardError::Completed),
        }
    }

    fn screen_step(
        &mut self,
        step: fn(&mut Screen, &mut WizardAnswers, &mut Outbox) -> Step,
    ) -> Step {
        match self.screen.as_mut() {
            Some(screen) => step(screen, &mut self.answers, &mut self.outbox),
            None => Step::Blocked(IgnoreReason::NotApplicable),
        }
    }

    fn transition(&mut self, index: usize, entry: Entry) -> Outcome {
        let from = self.current_screen();
        self.unmount();
        self.mount(index, entry);
        let to = self.current_screen();
        info!(from = %from, to = %to, ?entry, "navigated");
        Outcome::Navigated(to)
    }

    fn unmount(&mut self) {
        if let Some(mut screen) = self.screen.take() {
            let cancelled = screen.teardown();
            self.outbox.push(ViewUpdate::ScreenTornDown {
                screen: screen.kind(),
                cancelled_timers: cancelled,
            });
        }
    }

    fn mount(&mut self, index: usize, entry: Entry) {
        self.index = index;
        let kind = ScreenKind::ALL[index];
        let setup = ScreenSetup {
            context: self.options.context,
            timings: self.options.timings,
            failure: self.options.failure.clone(),
            now: self.now,
        };
        let mut screen = Screen::create(kind, &setup, entry);
        self.outbox.push(ViewUpdate::ScreenMounted {
            screen: kind,
            index,
            entry,
        });
        screen.on_mount(&self.answers, &mut self.outbox);
        self.screen = Some(screen);
        self.last_enabled = None;
        self.last_label = None;
        self.sync_continue();
    }

    fn complete(&mut self) -> Outcome {
        self.unmount();
        self.status = WizardStatus::Completed;
        self.hooks.on_complete(&self.answers);
        self.answers = WizardAnswers::new();
        self.outbox.push(ViewUpdate::WizardCompleted {
            session: self.session,
        });
        info!(session = %self.session, "onboarding completed");
        Outcome::Completed
    }

    /// Publish continue state and label when they changed
    fn sync_continue(&mut self) {
        let Some(screen) = self.screen.as_ref() else {
            return;
        };
        let kind = screen.kind();

        let label = screen.continue_label(&self.answers);
        if self.last_label.as_deref() != Some(label.as_str()) {
            self.outbox.push(ViewUpdate::ContinueLabel {
                screen: kind,
                label: label.clone(),
            });
            self.last_label = Some(label);
        }

        let enabled = screen.can_continue(&self.answers);
        if self.last_enabled != Some(enabled) {
            self.outbox
                .push(ViewUpdate::ContinueEnabled { screen: kind, enabled });
            self.last_enabled = Some(enabled);
        }
    }
}

impl Wizard<NoopHooks> {
    /// Start a session without host hooks
    #[must_use]
    pub fn with_options(options: WizardOptions) -> Self {
        Self::new(options, NoopHooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn quick() -> Wizard {
        Wizard::with_options(WizardOptions {
            timings: Timings::quick(),
            ..WizardOptions::default()
        })
    }

    #[derive(Debug, Default)]
    struct Recorder {
        exits: u32,
        completed: Vec<serde_json::Value>,
    }

    impl WizardHooks for Recorder {
        fn on_exit(&mut self) {
            self.exits += 1;
        }

        fn on_complete(&mut self, answers: &WizardAnswers) {
            self.completed.push(answers.snapshot());
        }
    }

    #[test]
    fn test_starts_on_first_screen() {
        let mut wizard = quick();
        assert_eq!(wizard.current_screen(), ScreenKind::VoiceIntro);
        let updates = wizard.drain_updates();
        assert_eq!(
            updates.first(),
            Some(&ViewUpdate::ScreenMounted {
                screen: ScreenKind::VoiceIntro,
                index: 0,
                entry: Entry::Forward,
            })
        );
        assert!(updates.contains(&ViewUpdate::ContinueEnabled {
            screen: ScreenKind::VoiceIntro,
            enabled: false,
        }));
    }

    #[test]
    fn test_back_on_first_screen_exits_every_time() {
        let mut wizard = Wizard::new(
            WizardOptions {
                timings: Timings::quick(),
                ..WizardOptions::default()
            },
            Recorder::default(),
        );
        for n in 1..=3 {
            assert_eq!(wizard.dispatch(Intent::Back, ms(n)), Ok(Outcome::Exited));
            assert_eq!(wizard.hooks().exits, u32::try_from(n).unwrap_or(0));
            assert_eq!(wizard.current_screen(), ScreenKind::VoiceIntro);
        }
    }

    #[test]
    fn test_go_to_bounds() {
        let mut wizard = quick();
        assert_eq!(
            wizard.go_to(7),
            Err(WizardError::ScreenOutOfRange { index: 7, len: 7 })
        );
        assert_eq!(wizard.go_to(4), Ok(Outcome::Navigated(ScreenKind::Poll)));
        assert_eq!(wizard.go_to(2), Ok(Outcome::Navigated(ScreenKind::Followup)));
        assert!(wizard.drain_updates().contains(&ViewUpdate::ScreenMounted {
            screen: ScreenKind::Followup,
            index: 2,
            entry: Entry::Backward,
        }));
    }

    #[test]
    fn test_skip_only_where_allowed() {
        let mut wizard = quick();
        assert_eq!(
            wizard.dispatch(Intent::Skip, ms(1)),
            Ok(Outcome::Ignored(IgnoreReason::NotSkippable))
        );
        wizard.go_to(1).ok();
        assert_eq!(
            wizard.dispatch(Intent::Skip, ms(2)),
            Ok(Outcome::Navigated(ScreenKind::Followup))
        );
    }

    #[test]
    fn test_continue_gated_by_screen() {
        let mut wizard = quick();
        assert_eq!(
            wizard.dispatch(Intent::Continue, ms(1)),
            Ok(Outcome::Ignored(IgnoreReason::ContinueDisabled))
        );
        assert_eq!(wizard.current_screen(), ScreenKind::VoiceIntro);
    }

    #[test]
    fn test_navigation_tears_down_previous_screen() {
        let mut wizard = quick();
        wizard.advance_to(ms(5)).ok();
        wizard.drain_updates();

        wizard.next().ok();
        let updates = wizard.drain_updates();
        assert!(matches!(
            updates.first(),
            Some(ViewUpdate::ScreenTornDown {
                screen: ScreenKind::VoiceIntro,
                cancelled_timers,
            }) if *cancelled_timers > 0
        ));

        // Nothing from the voice intro leaks into the transcript.
        wizard.advance_to(ms(60_000)).ok();
        assert!(!wizard.drain_updates().iter().any(|u| matches!(
            u,
            ViewUpdate::PhaseChanged {
                screen: ScreenKind::VoiceIntro,
                ..
            } | ViewUpdate::TextRevealed {
                screen: ScreenKind::VoiceIntro,
                ..
            }
        )));
    }

    #[test]
    fn test_completion_hands_off_and_discards_answers() {
        let mut wizard = Wizard::new(
            WizardOptions {
                timings: Timings::quick(),
                ..WizardOptions::default()
            },
            Recorder::default(),
        );
        wizard.go_to(6).ok();
        wizard.advance_to(ms(60_000)).ok();
        assert_eq!(wizard.dispatch(Intent::Continue, ms(60_000)), Ok(Outcome::Completed));

        assert!(wizard.is_completed());
        assert!(wizard.answers().is_empty());
        assert_eq!(wizard.hooks().completed.len(), 1);
        assert!(wizard.screen().is_none());
        assert_eq!(wizard.next_deadline(), None);
        assert_eq!(
            wizard.dispatch(Intent::Continue, ms(60_001)),
            Err(WizardError::Completed)
        );
        assert!(matches!(
            wizard.drain_updates().last(),
            Some(ViewUpdate::WizardCompleted { .. })
        ));
    }

    #[test]
    fn test_clock_never_goes_backwards() {
        let mut wizard = quick();
        wizard.advance_to(ms(100)).ok();
        wizard.advance_to(ms(50)).ok();
        assert_eq!(wizard.now(), ms(100));
    }
}
