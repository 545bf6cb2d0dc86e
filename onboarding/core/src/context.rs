//! App Context
//!
//! Settings that used to be ambient globals (sound on/off, theme) are carried
//! in one value created by the host application and handed down by value.
//! Screens read it; nothing below the wizard can change it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Colour theme requested by the host
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Follow the OS setting
    #[default]
    System,
    /// Light theme
    Light,
    /// Dark theme
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::System => write!(f, "system"),
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" | "auto" => Ok(Theme::System),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}' (expected system, light or dark)")),
        }
    }
}

/// Read-only settings for one wizard session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppContext {
    /// Whether screens may emit sound cues
    pub sound_enabled: bool,
    /// Requested theme
    pub theme: Theme,
}

impl Default for AppContext {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            theme: Theme::System,
        }
    }
}

impl AppContext {
    /// Context with sound turned off
    #[must_use]
    pub fn muted(self) -> Self {
        Self {
            sound_enabled: false,
            ..self
        }
    }

    /// Context with a specific theme
    #[must_use]
    pub fn with_theme(self, theme: Theme) -> Self {
        Self { theme, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!(" light ".parse::<Theme>(), Ok(Theme::Light));
        assert_eq!("auto".parse::<Theme>(), Ok(Theme::System));
        assert!("neon".parse::<Theme>().is_err());
    }

    #[test]
    fn test_theme_display_round_trips() {
        for theme in [Theme::System, Theme::Light, Theme::Dark] {
            assert_eq!(theme.to_string().parse::<Theme>(), Ok(theme));
        }
    }

    #[test]
    fn test_builders_leave_other_fields() {
        let context = AppContext::default().with_theme(Theme::Dark).muted();
        assert!(!context.sound_enabled);
        assert_eq!(context.theme, Theme::Dark);
    }
}
