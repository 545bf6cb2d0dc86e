//! Typewriter Renderer
//!
//! Reveals one line of text a character at a time on a fixed cadence. The
//! typewriter owns its reveal state; the ticks that drive it live in the
//! owning screen's [`TimerRegistry`].
//!
//! Only one reveal is ever in progress per typewriter. Calling
//! [`Typewriter::play`] again cancels the previous tick timer and bumps the
//! play id, so a tick from the old reveal that is still in flight is ignored.

use std::time::Duration;

use tracing::trace;

use crate::timers::{TimerHandle, TimerRegistry};

/// Timer message driving a typewriter reveal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypewriterTick {
    play: u64,
}

/// Result of one accepted tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealStep {
    /// Characters revealed so far
    pub char_index: usize,
    /// Whether this tick revealed a new character
    pub advanced: bool,
    /// Whether the full text is now visible (reported exactly once)
    pub complete: bool,
}

/// Character-by-character text reveal
#[derive(Debug, Default)]
pub struct Typewriter {
    text: String,
    total_chars: usize,
    char_index: usize,
    byte_end: usize,
    play: u64,
    handle: Option<TimerHandle>,
    playing: bool,
    complete: bool,
}

impl Typewriter {
    /// Create an idle typewriter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start revealing `text`, replacing any reveal in progress
    ///
    /// `wrap` turns the typewriter's tick into the owner's timer message.
    /// Empty text completes on the next drain of `timers`, not synchronously.
    pub fn play<M, F>(
        &mut self,
        timers: &mut TimerRegistry<M>,
        text: impl Into<String>,
        interval: Duration,
        wrap: F,
    ) -> TimerHandle
    where
        M: Clone,
        F: FnOnce(TypewriterTick) -> M,
    {
        self.stop(timers);
        self.play += 1;
        self.text = text.into();
        self.total_chars = self.text.chars().count();
        self.char_index = 0;
        self.byte_end = 0;
        self.complete = false;
        self.playing = true;

        let tick = wrap(TypewriterTick { play: self.play });
        let handle = if self.total_chars == 0 {
            timers.schedule(Duration::ZERO, tick)
        } else {
            timers.schedule_repeating(interval, tick)
        };
        self.handle = Some(handle);
        trace!(
            owner = timers.owner(),
            play = self.play,
            chars = self.total_chars,
            "typewriter started"
        );
        handle
    }

    /// Stop the current reveal, leaving the visible prefix as is
    ///
    /// Returns true if a tick timer was cancelled.
    pub fn stop<M>(&mut self, timers: &mut TimerRegistry<M>) -> bool {
        self.playing = false;
        self.handle
            .take()
            .is_some_and(|handle| timers.cancel(handle))
    }

    /// Apply a tick, returning `None` for ticks of a replaced or finished reveal
    pub fn on_tick<M>(
        &mut self,
        tick: TypewriterTick,
        timers: &mut TimerRegistry<M>,
    ) -> Option<RevealStep> {
        if !self.playing || tick.play != self.play {
            trace!(play = tick.play, current = self.play, "ignored stale typewriter tick");
            return None;
        }

        let advanced = if self.char_index < self.total_chars {
            let width = self.text[self.byte_end..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            self.byte_end += width;
            self.char_index += 1;
            true
        } else {
            false
        };

        if self.char_index >= self.total_chars {
            self.complete = true;
            self.stop(timers);
        }

        Some(RevealStep {
            char_index: self.char_index,
            advanced,
            complete: self.complete,
        })
    }

    /// The revealed prefix
    #[must_use]
    pub fn visible(&self) -> &str {
        &self.text[..self.byte_end]
    }

    /// The full text being revealed
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Characters revealed so far
    #[must_use]
    pub fn char_index(&self) -> usize {
        self.char_index
    }

    /// Character length of the full text
    #[must_use]
    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    /// Whether a reveal is currently running
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether the last reveal finished
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(30);

    fn run(
        typewriter: &mut Typewriter,
        timers: &mut TimerRegistry<TypewriterTick>,
        now: Duration,
    ) -> Vec<RevealStep> {
        let mut steps = Vec::new();
        while let Some(fired) = timers.pop_due(now) {
            if let Some(step) = typewriter.on_tick(fired.message, timers) {
                steps.push(step);
            }
        }
        steps
    }

    #[test]
    fn test_reveals_one_char_per_tick() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut typewriter = Typewriter::new();
        typewriter.play(&mut timers, "hey", TICK, |tick| tick);

        let steps = run(&mut typewriter, &mut timers, TICK);
        assert_eq!(steps.len(), 1);
        assert_eq!(typewriter.visible(), "h");

        let steps = run(&mut typewriter, &mut timers, TICK * 3);
        assert_eq!(
            steps.iter().map(|s| s.char_index).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert_eq!(typewriter.visible(), "hey");
        assert!(typewriter.is_complete());
        assert_eq!(steps.iter().filter(|s| s.complete).count(), 1);

        // Completion cancels the repeating tick.
        assert_eq!(timers.pending(), 0);
        assert!(run(&mut typewriter, &mut timers, TICK * 10).is_empty());
    }

    #[test]
    fn test_restart_cancels_previous_reveal() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut typewriter = Typewriter::new();
        let first = typewriter.play(&mut timers, "first line", TICK, |tick| tick);
        run(&mut typewriter, &mut timers, TICK * 2);
        assert_eq!(typewriter.visible(), "fi");

        let second = typewriter.play(&mut timers, "next", TICK, |tick| tick);
        assert!(!timers.is_live(first));
        assert!(timers.is_live(second));
        assert_eq!(timers.pending(), 1);
        assert_eq!(typewriter.visible(), "");

        run(&mut typewriter, &mut timers, TICK * 10);
        assert_eq!(typewriter.visible(), "next");
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut typewriter = Typewriter::new();
        typewriter.play(&mut timers, "old", TICK, |tick| tick);
        let stale = timers.pop_due(TICK).map(|fired| fired.message);

        typewriter.play(&mut timers, "new", TICK, |tick| tick);
        let stale = stale.and_then(|tick| typewriter.on_tick(tick, &mut timers));
        assert!(stale.is_none());
        assert_eq!(typewriter.visible(), "");
    }

    #[test]
    fn test_empty_text_completes_on_next_tick() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut typewriter = Typewriter::new();
        typewriter.play(&mut timers, "", TICK, |tick| tick);

        assert!(!typewriter.is_complete());
        let steps = run(&mut typewriter, &mut timers, Duration::ZERO);
        assert_eq!(
            steps,
            vec![RevealStep {
                char_index: 0,
                advanced: false,
                complete: true,
            }]
        );
    }

    #[test]
    fn test_multibyte_characters() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut typewriter = Typewriter::new();
        typewriter.play(&mut timers, "héllo ✨", TICK, |tick| tick);
        assert_eq!(typewriter.total_chars(), 7);

        run(&mut typewriter, &mut timers, TICK * 2);
        assert_eq!(typewriter.visible(), "hé");
        run(&mut typewriter, &mut timers, TICK * 7);
        assert_eq!(typewriter.visible(), "héllo ✨");
    }

    #[test]
    fn test_stop_freezes_prefix() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut typewriter = Typewriter::new();
        typewriter.play(&mut timers, "abcdef", TICK, |tick| tick);
        run(&mut typewriter, &mut timers, TICK * 2);

        assert!(typewriter.stop(&mut timers));
        assert!(run(&mut typewriter, &mut timers, TICK * 20).is_empty());
        assert_eq!(typewriter.visible(), "ab");
        assert!(!typewriter.is_complete());
    }
}
