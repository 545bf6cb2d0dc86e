//! Conversation Scripts
//!
//! A [`ConversationScript`] is a fixed, statically authored list of turns. A
//! [`ScriptPlayer`] consumes one turn at a time through a [`Typewriter`],
//! pausing for a fixed gap between turns.
//!
//! # Playback
//!
//! ```text
//!   start ──► turn 0 ──reveal ticks──► turn complete ──gap──► turn 1 ──► ...
//!                                                                   │
//!                                                last turn done ────┴──► Completed
//! ```
//!
//! Turn order is fixed once playback starts. Every scheduled step carries the
//! player's epoch; restarting or stopping bumps the epoch so leftovers from an
//! earlier run are inert even if the registry still delivers them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::timers::{TimerHandle, TimerRegistry};
use crate::typewriter::{Typewriter, TypewriterTick};

/// Who is speaking a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The onboarding host
    Host,
    /// The person being onboarded
    User,
}

/// One line of scripted dialogue
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Who says it
    pub speaker: Speaker,
    /// The full line
    pub text: &'static str,
}

impl ConversationTurn {
    /// A host line
    #[must_use]
    pub const fn host(text: &'static str) -> Self {
        Self {
            speaker: Speaker::Host,
            text,
        }
    }

    /// A user line
    #[must_use]
    pub const fn user(text: &'static str) -> Self {
        Self {
            speaker: Speaker::User,
            text,
        }
    }
}

/// Ordered, immutable list of turns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversationScript {
    name: &'static str,
    turns: &'static [ConversationTurn],
}

impl ConversationScript {
    /// Define a script
    #[must_use]
    pub const fn new(name: &'static str, turns: &'static [ConversationTurn]) -> Self {
        Self { name, turns }
    }

    /// Script name (for logs)
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All turns in order
    #[must_use]
    pub fn turns(&self) -> &'static [ConversationTurn] {
        self.turns
    }

    /// Turn at `index`
    #[must_use]
    pub fn turn(&self, index: usize) -> Option<&'static ConversationTurn> {
        self.turns.get(index)
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the script has no turns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Timer message driving a [`ScriptPlayer`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptMsg {
    /// Reveal the next character of the current turn
    Reveal(TypewriterTick),
    /// Start the next turn after the inter-turn gap
    NextTurn {
        /// Run the step belongs to
        epoch: u64,
    },
}

/// What a playback step did, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptEvent {
    /// A turn began revealing
    TurnStarted {
        /// Turn index
        turn: usize,
        /// Speaker of the turn
        speaker: Speaker,
    },
    /// One more character is visible
    Revealed {
        /// Turn index
        turn: usize,
        /// Characters revealed in this turn
        char_index: usize,
        /// Visible prefix of the turn
        prefix: String,
    },
    /// The current turn is fully visible
    TurnCompleted {
        /// Turn index
        turn: usize,
    },
    /// Every turn has been revealed
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PlayerState {
    Idle,
    Revealing,
    BetweenTurns,
    Finished,
}

/// Plays a script turn by turn on a timer registry
#[derive(Debug)]
pub struct ScriptPlayer {
    script: ConversationScript,
    typewriter: Typewriter,
    char_interval: Duration,
    turn_gap: Duration,
    turn_index: usize,
    epoch: u64,
    gap_timer: Option<TimerHandle>,
    state: PlayerState,
}

impl ScriptPlayer {
    /// Create an idle player
    #[must_use]
    pub fn new(script: ConversationScript, char_interval: Duration, turn_gap: Duration) -> Self {
        Self {
            script,
            typewriter: Typewriter::new(),
            char_interval,
            turn_gap,
            turn_index: 0,
            epoch: 0,
            gap_timer: None,
            state: PlayerState::Idle,
        }
    }

    /// Start (or restart) playback from the first turn
    pub fn start<M: Clone>(
        &mut self,
        timers: &mut TimerRegistry<M>,
        wrap: fn(ScriptMsg) -> M,
    ) -> Vec<ScriptEvent> {
        self.stop(timers);
        self.epoch += 1;
        self.turn_index = 0;
        debug!(
            script = self.script.name(),
            turns = self.script.len(),
            epoch = self.epoch,
            "script started"
        );

        if self.script.is_empty() {
            // Completion of an empty script is still delivered on a later tick.
            self.state = PlayerState::BetweenTurns;
            let next = wrap(ScriptMsg::NextTurn { epoch: self.epoch });
            self.gap_timer = Some(timers.schedule(Duration::ZERO, next));
            return Vec::new();
        }

        self.begin_turn(timers, wrap)
    }

    /// Stop playback and invalidate every step already scheduled
    pub fn stop<M>(&mut self, timers: &mut TimerRegistry<M>) {
        self.typewriter.stop(timers);
        if let Some(handle) = self.gap_timer.take() {
            timers.cancel(handle);
        }
        if self.state != PlayerState::Finished {
            self.state = PlayerState::Idle;
        }
        self.epoch += 1;
    }

    /// Apply a delivered step
    pub fn on_message<M: Clone>(
        &mut self,
        msg: ScriptMsg,
        timers: &mut TimerRegistry<M>,
        wrap: fn(ScriptMsg) -> M,
    ) -> Vec<ScriptEvent> {
        match msg {
            ScriptMsg::Reveal(tick) => self.on_reveal(tick, timers, wrap),
            ScriptMsg::NextTurn { epoch } => {
                if epoch != self.epoch || self.state != PlayerState::BetweenTurns {
                    trace!(script = self.script.name(), epoch, "ignored stale turn step");
                    return Vec::new();
                }
                self.gap_timer = None;
                if self.script.is_empty() {
                    self.state = PlayerState::Finished;
                    return vec![ScriptEvent::Completed];
                }
                self.turn_index += 1;
                self.begin_turn(timers, wrap)
            }
        }
    }

    fn on_reveal<M: Clone>(
        &mut self,
        tick: TypewriterTick,
        timers: &mut TimerRegistry<M>,
        wrap: fn(ScriptMsg) -> M,
    ) -> Vec<ScriptEvent> {
        if self.state != PlayerState::Revealing {
            return Vec::new();
        }
        let Some(step) = self.typewriter.on_tick(tick, timers) else {
            return Vec::new();
        };

        let mut events = Vec::with_capacity(2);
        if step.advanced {
            events.push(ScriptEvent::Revealed {
                turn: self.turn_index,
                char_index: step.char_index,
                prefix: self.typewriter.visible().to_string(),
            });
        }
        if step.complete {
            events.push(ScriptEvent::TurnCompleted {
                turn: self.turn_index,
            });
            if self.turn_index + 1 < self.script.len() {
                self.state = PlayerState::BetweenTurns;
                let next = wrap(ScriptMsg::NextTurn { epoch: self.epoch });
                self.gap_timer = Some(timers.schedule(self.turn_gap, next));
            } else {
                self.state = PlayerState::Finished;
                debug!(script = self.script.name(), "script completed");
                events.push(ScriptEvent::Completed);
            }
        }
        events
    }

    fn begin_turn<M: Clone>(
        &mut self,
        timers: &mut TimerRegistry<M>,
        wrap: fn(ScriptMsg) -> M,
    ) -> Vec<ScriptEvent> {
        let Some(turn) = self.script.turn(self.turn_index) else {
            self.state = PlayerState::Finished;
            return vec![ScriptEvent::Completed];
        };
        self.state = PlayerState::Revealing;
        self.typewriter
            .play(timers, turn.text, self.char_interval, |tick| {
                wrap(ScriptMsg::Reveal(tick))
            });
        vec![ScriptEvent::TurnStarted {
            turn: self.turn_index,
            speaker: turn.speaker,
        }]
    }

    /// The script being played
    #[must_use]
    pub fn script(&self) -> &ConversationScript {
        &self.script
    }

    /// Index of the current turn
    #[must_use]
    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// Characters revealed in the current turn
    #[must_use]
    pub fn char_index(&self) -> usize {
        self.typewriter.char_index()
    }

    /// Visible prefix of the current turn
    #[must_use]
    pub fn visible(&self) -> &str {
        self.typewriter.visible()
    }

    /// Whether playback is running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            PlayerState::Revealing | PlayerState::BetweenTurns
        )
    }

    /// Whether every turn has been revealed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == PlayerState::Finished
    }
}
