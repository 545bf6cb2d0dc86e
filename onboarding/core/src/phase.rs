//! Phase Controller
//!
//! Every screen (and every deployable target) runs a small finite-state
//! machine over a closed phase enum. The enum itself declares the machine:
//! which phase comes next and what is allowed to trigger the move.
//!
//! # Design Philosophy
//!
//! Phases are tagged unions matched exhaustively, so adding a phase is a
//! compile-time-checked change. The forward path is linear and total: each
//! non-terminal phase has exactly one successor, reached either when a timer
//! fires or when the user acts, never both. The only way off that path is an
//! explicit detour the phase enum opts into (e.g. a failed deploy returning to
//! idle for a retry).
//!
//! ```text
//!   INITIAL ──trigger──► successor ──trigger──► ... ──► terminal
//!                  └──── detour (opt-in) ────┘
//! ```

use std::fmt::Debug;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// What moves a phase to its successor
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Elapsed time (a timer owned by the screen fired)
    Timer,
    /// An explicit user intent
    User,
}

/// A closed, screen-specific phase enumeration
pub trait Phase: Copy + Eq + Debug + 'static {
    /// Phase every controller starts in
    const INITIAL: Self;

    /// The designated next phase, `None` if terminal
    fn successor(self) -> Option<Self>;

    /// What leaves this phase, `None` if terminal
    fn trigger(self) -> Option<Trigger>;

    /// Stable name exposed to the view
    fn name(self) -> &'static str;

    /// Whether a jump from `self` to `to` off the forward path is allowed
    fn allows_detour(self, to: Self) -> bool {
        let _ = to;
        false
    }

    /// Whether this phase has no successor
    fn is_terminal(self) -> bool {
        self.successor().is_none()
    }
}

/// Rejected transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaseError {
    /// Terminal phases never advance
    #[error("phase '{phase}' is terminal")]
    Terminal {
        /// Current phase
        phase: &'static str,
    },

    /// The phase is left by a different trigger
    #[error("phase '{phase}' advances on {expected:?}, not {actual:?}")]
    WrongTrigger {
        /// Current phase
        phase: &'static str,
        /// Trigger the phase waits for
        expected: Trigger,
        /// Trigger that was offered
        actual: Trigger,
    },

    /// The phase enum does not allow this jump
    #[error("no detour from '{from}' to '{to}'")]
    IllegalDetour {
        /// Current phase
        from: &'static str,
        /// Requested phase
        to: &'static str,
    },
}

/// Drives one instance of a phase machine
#[derive(Clone, Debug)]
pub struct PhaseController<P: Phase> {
    label: &'static str,
    current: P,
    entered_at: Duration,
    transitions: u32,
}

impl<P: Phase> PhaseController<P> {
    /// Start in `P::INITIAL` at `now`
    #[must_use]
    pub fn new(label: &'static str, now: Duration) -> Self {
        Self::restored(label, P::INITIAL, now)
    }

    /// Start in a previously reached phase (used when remounting a screen)
    #[must_use]
    pub fn restored(label: &'static str, phase: P, now: Duration) -> Self {
        Self {
            label,
            current: phase,
            entered_at: now,
            transitions: 0,
        }
    }

    /// Current phase
    #[must_use]
    pub fn current(&self) -> P {
        self.current
    }

    /// Whether the controller is in `phase`
    #[must_use]
    pub fn is(&self, phase: P) -> bool {
        self.current == phase
    }

    /// Session time the current phase was entered
    #[must_use]
    pub fn entered_at(&self) -> Duration {
        self.entered_at
    }

    /// Time spent in the current phase
    #[must_use]
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.entered_at)
    }

    /// Number of transitions taken so far
    #[must_use]
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Label used in logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Move to the successor, if `cause` is what the current phase waits for
    pub fn advance(&mut self, cause: Trigger, now: Duration) -> Result<P, PhaseError> {
        let from = self.current;
        let (Some(next), Some(expected)) = (from.successor(), from.trigger()) else {
            return Err(PhaseError::Terminal { phase: from.name() });
        };
        if expected != cause {
            return Err(PhaseError::WrongTrigger {
                phase: from.name(),
                expected,
                actual: cause,
            });
        }
        self.enter(next, now);
        Ok(next)
    }

    /// Jump off the forward path to `to`, if the phase enum allows it
    pub fn detour(&mut self, to: P, now: Duration) -> Result<P, PhaseError> {
        let from = self.current;
        if !from.allows_detour(to) {
            return Err(PhaseError::IllegalDetour {
                from: from.name(),
                to: to.name(),
            });
        }
        self.enter(to, now);
        Ok(to)
    }

    fn enter(&mut self, next: P, now: Duration) {
        debug!(
            controller = self.label,
            from = self.current.name(),
            to = next.name(),
            at_ms = now.as_millis() as u64,
            "phase transition"
        );
        self.current = next;
        self.entered_at = now;
        self.transitions += 1;
    }
}

/// The forward path from `P::INITIAL` to its terminal phase
///
/// Stops early if the successor chain loops back on itself.
#[must_use]
pub fn walk<P: Phase>() -> Vec<P> {
    let mut path = vec![P::INITIAL];
    let mut current = P::INITIAL;
    while let Some(next) = current.successor() {
        if path.contains(&next) {
            break;
        }
        path.push(next);
        current = next;
    }
    path
}
