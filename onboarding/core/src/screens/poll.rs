//! Live poll demo screen
//!
//! The user asks their community a question; the screen simulates sending
//! it, collecting a handful of responses, and charting the results.
//!
//! ```text
//!   ask ──submit──► deploying ──T──► responses ──(N bubbles, then T)──► analyze
//! ```
//!
//! Continue is enabled in `analyze` only. No input is accepted while the poll
//! is deploying or collecting.

use serde::Serialize;
use tracing::debug;

use crate::answers::WizardAnswers;
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::screens::{advance_phase, ScreenKind, ScreenLogic, ScreenSetup};
use crate::timers::{TimerHandle, TimerRegistry};
use crate::timings::Timings;

/// Answer key holding the submitted question
pub const QUESTION_KEY: &str = "poll.question";

/// Counter increment per collected response
pub const RESPONSE_INCREMENT: u32 = 12;

/// Prompts the user can pick instead of typing
pub const SUGGESTED_PROMPTS: &[&str] = &[
    "What events do you want?",
    "When should we meet next?",
    "What topic should our next workshop cover?",
];

/// Scripted responses as `(author, text)`, in arrival order
pub const MOCK_RESPONSES: &[(&str, &str)] = &[
    ("Ana", "Hands-on workshops, please!"),
    ("Marco", "More meetups downtown."),
    ("Priya", "A monthly livestream would be great."),
    ("Tom", "Weekend hackathons!"),
];

/// One bar of the results chart
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PollBar {
    /// Category
    pub label: &'static str,
    /// Share of responses in percent
    pub percent: u8,
}

/// The results chart shown in `analyze`
pub const POLL_RESULTS: &[PollBar] = &[
    PollBar {
        label: "Workshops",
        percent: 40,
    },
    PollBar {
        label: "Meetups",
        percent: 25,
    },
    PollBar {
        label: "Livestreams",
        percent: 20,
    },
    PollBar {
        label: "Hackathons",
        percent: 15,
    },
];

/// Phases of the poll demo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PollPhase {
    /// Waiting for a question
    Ask,
    /// Sending the poll
    Deploying,
    /// Responses arriving
    Responses,
    /// Results charted
    Analyze,
}

impl Phase for PollPhase {
    const INITIAL: Self = PollPhase::Ask;

    fn successor(self) -> Option<Self> {
        match self {
            PollPhase::Ask => Some(PollPhase::Deploying),
            PollPhase::Deploying => Some(PollPhase::Responses),
            PollPhase::Responses => Some(PollPhase::Analyze),
            PollPhase::Analyze => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            PollPhase::Ask => Some(Trigger::User),
            PollPhase::Deploying | PollPhase::Responses => Some(Trigger::Timer),
            PollPhase::Analyze => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            PollPhase::Ask => "ask",
            PollPhase::Deploying => "deploying",
            PollPhase::Responses => "responses",
            PollPhase::Analyze => "analyze",
        }
    }
}

/// Timer messages of the poll demo
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMsg {
    /// The poll finished deploying
    Deployed,
    /// The next mock response arrives
    Response,
    /// Show the results
    Analyze,
}

/// Poll screen state
#[derive(Debug)]
pub struct Poll {
    timings: Timings,
    phase: PhaseController<PollPhase>,
    question: Option<String>,
    revealed: usize,
    collected: u32,
    response_timer: Option<TimerHandle>,
    timers: TimerRegistry<PollMsg>,
}

impl Poll {
    /// Create the screen
    #[must_use]
    pub fn new(setup: &ScreenSetup) -> Self {
        Self {
            timings: setup.timings,
            phase: PhaseController::new("poll", setup.now),
            question: None,
            revealed: 0,
            collected: 0,
            response_timer: None,
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> PollPhase {
        self.phase.current()
    }

    /// The submitted question
    #[must_use]
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// Responses shown so far
    #[must_use]
    pub fn revealed(&self) -> usize {
        self.revealed
    }

    /// The "responses collected" counter
    #[must_use]
    pub fn collected(&self) -> u32 {
        self.collected
    }

    fn submit(&mut self, text: &str, answers: &mut WizardAnswers, out: &mut Outbox) -> Outcome {
        if !self.phase.is(PollPhase::Ask) {
            return Outcome::Ignored(IgnoreReason::WrongPhase);
        }
        let text = text.trim();
        if text.is_empty() {
            return Outcome::Ignored(IgnoreReason::EmptyText);
        }

        let now = self.timers.now();
        advance_phase(&mut self.phase, Self::KIND, Trigger::User, now, out);
        answers.set_text(QUESTION_KEY, text);
        self.question = Some(text.to_string());
        self.timers
            .schedule(self.timings.poll_deploying, PollMsg::Deployed);
        debug!(question = text, "poll submitted");
        Outcome::Accepted
    }
}

impl ScreenLogic for Poll {
    type Message = PollMsg;

    const KIND: ScreenKind = ScreenKind::Poll;

    fn timers(&self) -> &TimerRegistry<PollMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<PollMsg> {
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
    }

    fn on_timer(&mut self, msg: PollMsg, _answers: &mut WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        match (msg, self.phase.current()) {
            (PollMsg::Deployed, PollPhase::Deploying) => {
                advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out);
                let handle = self
                    .timers
                    .schedule_repeating(self.timings.poll_response_interval, PollMsg::Response);
                self.response_timer = Some(handle);
            }
            (PollMsg::Response, PollPhase::Responses) => {
                let Some(&(author, text)) = MOCK_RESPONSES.get(self.revealed) else {
                    return;
                };
                self.revealed += 1;
                self.collected += RESPONSE_INCREMENT;
                out.push(ViewUpdate::ResponseCollected {
                    index: self.revealed,
                    author,
                    text,
                    collected: self.collected,
                });
                if self.revealed == MOCK_RESPONSES.len() {
                    if let Some(handle) = self.response_timer.take() {
                        self.timers.cancel(handle);
                    }
                    self.timers
                        .schedule(self.timings.poll_analyze_delay, PollMsg::Analyze);
                }
            }
            (PollMsg::Analyze, PollPhase::Responses) => {
                if advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out) {
                    out.push(ViewUpdate::PollResults {
                        bars: POLL_RESULTS.to_vec(),
                    });
                }
            }
            (msg, phase) => {
                tracing::warn!(?msg, phase = phase.name(), "poll timer does not match phase");
            }
        }
    }

    fn on_intent(
        &mut self,
        intent: &Intent,
        answers: &mut WizardAnswers,
        out: &mut Outbox,
    ) -> Outcome {
        match intent {
            Intent::SubmitText(text) => self.submit(text, answers, out),
            Intent::PickSuggestion(index) => match SUGGESTED_PROMPTS.get(*index) {
                Some(prompt) => self.submit(prompt, answers, out),
                None => Outcome::Ignored(IgnoreReason::UnknownOption),
            },
            _ => Outcome::Ignored(IgnoreReason::NotApplicable),
        }
    }

    fn can_continue(&self, _answers: &WizardAnswers) -> bool {
        self.phase.is(PollPhase::Analyze)
    }
}
