//! Follow-up questions screen
//!
//! Asks a short list of questions one at a time. Each question's prompt is
//! typed by the host first (`asking`); options accept toggles only once the
//! prompt is fully visible (`answering`).
//!
//! # Branching
//!
//! A question may only be shown when an earlier answer contains a given
//! option. Continue prunes answers of questions that are no longer visible,
//! so a changed goal never leaves stale branch answers behind.
//!
//! # Pagination
//!
//! Continue and back move between visible questions inside the screen and
//! only leave the screen past the last / before the first one. Entering the
//! screen backwards resumes on its last visible question.

use tracing::debug;

use crate::answers::{SelectionMode, WizardAnswers};
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::screens::{advance_phase, Entry, ScreenKind, ScreenLogic, ScreenSetup, Step};
use crate::timers::TimerRegistry;
use crate::timings::Timings;
use crate::typewriter::{Typewriter, TypewriterTick};

/// One selectable option
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuestionOption {
    /// Stable id stored in answers
    pub id: &'static str,
    /// Display label
    pub label: &'static str,
}

/// Condition for showing a question
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visibility {
    /// Earlier question the condition reads
    pub question: &'static str,
    /// Option that must be selected there
    pub option: &'static str,
}

/// One follow-up question
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Question {
    /// Stable id, used as the answer key
    pub id: &'static str,
    /// Prompt typed by the host
    pub prompt: &'static str,
    /// Single or multi select
    pub mode: SelectionMode,
    /// Options in display order
    pub options: &'static [QuestionOption],
    /// Show only when this holds
    pub show_if: Option<Visibility>,
}

impl Question {
    /// Whether the question is visible under `answers`
    #[must_use]
    pub fn is_visible(&self, answers: &WizardAnswers) -> bool {
        self.show_if
            .map_or(true, |cond| answers.contains(cond.question, cond.option))
    }

    /// Whether `option` belongs to this question
    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o.id == option)
    }
}

const fn option(id: &'static str, label: &'static str) -> QuestionOption {
    QuestionOption { id, label }
}

/// The follow-up questions, in order
pub const QUESTIONS: &[Question] = &[
    Question {
        id: "goal",
        prompt: "What's the main goal for your community?",
        mode: SelectionMode::Single,
        options: &[
            option("grow", "Grow membership"),
            option("engage", "Boost engagement"),
            option("monetize", "Earn from it"),
            option("organize", "Get organized"),
        ],
        show_if: None,
    },
    Question {
        id: "events",
        prompt: "Which kinds of events do you run?",
        mode: SelectionMode::Multi,
        options: &[
            option("meetups", "Meetups"),
            option("workshops", "Workshops"),
            option("livestreams", "Livestreams"),
            option("hackathons", "Hackathons"),
        ],
        show_if: None,
    },
    Question {
        id: "monetize_model",
        prompt: "How would you like to earn?",
        mode: SelectionMode::Single,
        options: &[
            option("memberships", "Paid memberships"),
            option("tickets", "Event tickets"),
            option("sponsors", "Sponsorships"),
        ],
        show_if: Some(Visibility {
            question: "goal",
            option: "monetize",
        }),
    },
    Question {
        id: "channels",
        prompt: "Where does your community talk today?",
        mode: SelectionMode::Multi,
        options: &[
            option("whatsapp", "WhatsApp"),
            option("instagram", "Instagram"),
            option("discord", "Discord"),
            option("email", "Email"),
        ],
        show_if: None,
    },
];

/// Phase of the current question
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuestionPhase {
    /// The host is typing the prompt
    Asking,
    /// Options accept toggles
    Answering,
}

impl Phase for QuestionPhase {
    const INITIAL: Self = QuestionPhase::Asking;

    fn successor(self) -> Option<Self> {
        match self {
            QuestionPhase::Asking => Some(QuestionPhase::Answering),
            QuestionPhase::Answering => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            QuestionPhase::Asking => Some(Trigger::Timer),
            QuestionPhase::Answering => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            QuestionPhase::Asking => "asking",
            QuestionPhase::Answering => "answering",
        }
    }
}

/// Timer messages of the follow-up screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowupMsg {
    /// Prompt reveal
    Prompt(TypewriterTick),
}

/// Follow-up screen state
#[derive(Debug)]
pub struct Followup {
    timings: Timings,
    entry: Entry,
    cursor: usize,
    phase: PhaseController<QuestionPhase>,
    prompt: Typewriter,
    timers: TimerRegistry<FollowupMsg>,
}

impl Followup {
    /// Create the screen
    #[must_use]
    pub fn new(setup: &ScreenSetup, entry: Entry) -> Self {
        Self {
            timings: setup.timings,
            entry,
            cursor: 0,
            phase: PhaseController::new("followup", setup.now),
            prompt: Typewriter::new(),
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// The question being asked
    #[must_use]
    pub fn current(&self) -> &'static Question {
        &QUESTIONS[self.cursor]
    }

    /// Index of the current question in [`QUESTIONS`]
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Phase of the current question
    #[must_use]
    pub fn phase(&self) -> QuestionPhase {
        self.phase.current()
    }

    /// Visible prefix of the prompt
    #[must_use]
    pub fn prompt(&self) -> &str {
        self.prompt.visible()
    }

    fn show(&mut self, cursor: usize, answers: &WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        self.cursor = cursor;
        self.phase = PhaseController::new("followup", now);

        let question = self.current();
        let visible: Vec<usize> = visible_indices(answers);
        let position = visible.iter().position(|&i| i == cursor).unwrap_or(0);
        debug!(question = question.id, position, "question shown");
        out.push(ViewUpdate::QuestionShown {
            question: question.id,
            position,
            total: visible.len(),
            mode: question.mode,
            options: question.options.iter().map(|o| o.id).collect(),
            selected: answers
                .selection(question.id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
        });
        out.push(ViewUpdate::PhaseChanged {
            screen: Self::KIND,
            phase: self.phase_name(),
        });
        self.prompt.play(
            &mut self.timers,
            question.prompt,
            self.timings.char_interval,
            FollowupMsg::Prompt,
        );
    }
}

fn visible_indices(answers: &WizardAnswers) -> Vec<usize> {
    QUESTIONS
        .iter()
        .enumerate()
        .filter(|(_, q)| q.is_visible(answers))
        .map(|(i, _)| i)
        .collect()
}

/// Drop answers of questions that are hidden under the current answers
///
/// Conditions only read earlier questions, so one pass in order settles.
fn prune_hidden(answers: &mut WizardAnswers) {
    for question in QUESTIONS {
        if !question.is_visible(answers) && answers.has_selection(question.id) {
            debug!(question = question.id, "pruned hidden answer");
            answers.clear(question.id);
        }
    }
}

impl ScreenLogic for Followup {
    type Message = FollowupMsg;

    const KIND: ScreenKind = ScreenKind::Followup;

    fn timers(&self) -> &TimerRegistry<FollowupMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<FollowupMsg> {
        &mut self.timers
    }

    fn phase_name(&self) -> &'static str {
        self.phase.current().name()
    }

    fn on_mount(&mut self, answers: &WizardAnswers, out: &mut Outbox) {
        let visible = visible_indices(answers);
        let start = match self.entry {
            Entry::Forward => visible.first(),
            Entry::Backward => visible.last(),
        };
        self.show(start.copied().unwrap_or(0), answers, out);
    }

    fn on_timer(&mut self, msg: FollowupMsg, _answers: &mut WizardAnswers, out: &mut Outbox) {
        let FollowupMsg::Prompt(tick) = msg;
        let Some(step) = self.prompt.on_tick(tick, &mut self.timers) else {
            return;
        };
        if step.advanced {
            out.push(ViewUpdate::TextRevealed {
                screen: Self::KIND,
                turn: self.cursor,
                prefix: self.prompt.visible().to_string(),
            });
        }
        if step.complete {
            let now = self.timers.now();
            advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out);
        }
    }

    fn on_intent(
        &mut self,
        intent: &Intent,
        answers: &mut WizardAnswers,
        out: &mut Outbox,
    ) -> Outcome {
        let Intent::ToggleOption(option) = intent else {
            return Outcome::Ignored(IgnoreReason::NotApplicable);
        };
        if !self.phase.is(QuestionPhase::Answering) {
            return Outcome::Ignored(IgnoreReason::WrongPhase);
        }
        let question = self.current();
        if !question.has_option(option) {
            return Outcome::Ignored(IgnoreReason::UnknownOption);
        }
        answers.toggle(question.id, option, question.mode);
        out.push(ViewUpdate::AnswerChanged {
            question: question.id.to_string(),
            selected: answers
                .selection(question.id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default(),
        });
        Outcome::Accepted
    }

    fn can_continue(&self, answers: &WizardAnswers) -> bool {
        answers.has_selection(self.current().id)
    }

    fn on_continue(&mut self, answers: &mut WizardAnswers, out: &mut Outbox) -> Step {
        if !self.can_continue(answers) {
            return Step::Blocked(IgnoreReason::NothingSelected);
        }
        prune_hidden(answers);
        let next = visible_indices(answers)
            .into_iter()
            .find(|&i| i > self.cursor);
        match next {
            Some(index) => {
                self.show(index, answers, out);
                Step::Stay
            }
            None => Step::Leave,
        }
    }

    fn on_back(&mut self, answers: &mut WizardAnswers, out: &mut Outbox) -> Step {
        let previous = visible_indices(answers)
            .into_iter()
            .rev()
            .find(|&i| i < self.cursor);
        match previous {
            Some(index) => {
                self.show(index, answers, out);
                Step::Stay
            }
            None => Step::Leave,
        }
    }

    fn apply_defaults(&mut self, answers: &mut WizardAnswers) {
        for question in QUESTIONS {
            answers.clear(question.id);
        }
    }
}
