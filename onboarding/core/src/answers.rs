//! Wizard Answers
//!
//! The only state shared across screens. The active screen mutates it; every
//! other part of the wizard reads it. Answers live for one wizard session and
//! are discarded when the wizard completes or is abandoned.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How a question accepts options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// At most one option; picking another replaces it
    Single,
    /// Any subset of options
    Multi,
}

/// Question id → selected options, plus free-text answers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardAnswers {
    selections: BTreeMap<String, BTreeSet<String>>,
    texts: BTreeMap<String, String>,
}

impl WizardAnswers {
    /// Empty answers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip `option` for `question`
    ///
    /// Toggling the same option twice restores the previous state. In
    /// [`SelectionMode::Single`] selecting a new option replaces the old one;
    /// selecting the current one clears it. Returns whether `option` is now
    /// selected.
    pub fn toggle(&mut self, question: &str, option: &str, mode: SelectionMode) -> bool {
        let set = self.selections.entry(question.to_string()).or_default();
        let selected = if set.remove(option) {
            false
        } else {
            if mode == SelectionMode::Single {
                set.clear();
            }
            set.insert(option.to_string());
            true
        };
        if set.is_empty() {
            self.selections.remove(question);
        }
        selected
    }

    /// Select `option` for `question` without toggling
    pub fn insert(&mut self, question: &str, option: &str) {
        self.selections
            .entry(question.to_string())
            .or_default()
            .insert(option.to_string());
    }

    /// Replace all options for `question` (empty clears it)
    pub fn set_selection<I, S>(&mut self, question: &str, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = options.into_iter().map(Into::into).collect();
        if set.is_empty() {
            self.selections.remove(question);
        } else {
            self.selections.insert(question.to_string(), set);
        }
    }

    /// Selected options for `question`
    #[must_use]
    pub fn selection(&self, question: &str) -> Option<&BTreeSet<String>> {
        self.selections.get(question)
    }

    /// Whether `option` is selected for `question`
    #[must_use]
    pub fn contains(&self, question: &str, option: &str) -> bool {
        self.selections
            .get(question)
            .is_some_and(|set| set.contains(option))
    }

    /// Whether `question` has at least one option selected
    #[must_use]
    pub fn has_selection(&self, question: &str) -> bool {
        self.selections.get(question).is_some_and(|set| !set.is_empty())
    }

    /// Number of options selected for `question`
    #[must_use]
    pub fn count(&self, question: &str) -> usize {
        self.selections.get(question).map_or(0, BTreeSet::len)
    }

    /// Remove everything recorded for `key` (selection and text)
    pub fn clear(&mut self, key: &str) {
        self.selections.remove(key);
        self.texts.remove(key);
    }

    /// Record a free-text answer
    pub fn set_text(&mut self, key: &str, text: impl Into<String>) {
        self.texts.insert(key.to_string(), text.into());
    }

    /// Free-text answer for `key`
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.texts.get(key).map(String::as_str)
    }

    /// Whether nothing has been answered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selections.is_empty() && self.texts.is_empty()
    }

    /// JSON view for surfaces and completion hooks
    #[must_use]
    pub fn snapshot(&self) -> Value {
        json!({
            "selections": self.selections,
            "texts": self.texts,
        })
    }
}
