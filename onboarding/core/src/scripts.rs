//! Scripted dialogue for the screens that play one

use crate::script::{ConversationScript, ConversationTurn};

/// Host greeting typed out on the voice intro screen
pub const VOICE_GREETING: ConversationScript = ConversationScript::new(
    "voice-greeting",
    &[
        ConversationTurn::host("Hey there! I'm your community copilot."),
        ConversationTurn::host("Tell me what you're building and I'll set it up with you."),
        ConversationTurn::host("Tap the mic whenever you're ready."),
    ],
);

/// The sample conversation replayed on the transcript screen
pub const TRANSCRIPT: ConversationScript = ConversationScript::new(
    "transcript",
    &[
        ConversationTurn::user("I run a group of indie game devs in Lisbon."),
        ConversationTurn::host("Love it. How do people find each other today?"),
        ConversationTurn::user("Mostly a WhatsApp group and the occasional meetup."),
        ConversationTurn::host("Got it. Let's turn that into a real home for your community."),
    ],
);

/// Closing lines on the preview screen
pub const PREVIEW_OUTRO: ConversationScript = ConversationScript::new(
    "preview-outro",
    &[
        ConversationTurn::host("Here's your community, ready to go."),
        ConversationTurn::host("You can change anything later from settings."),
    ],
);

/// Every script, for checks that should hold across all of them
pub const ALL: &[ConversationScript] = &[VOICE_GREETING, TRANSCRIPT, PREVIEW_OUTRO];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Speaker;

    #[test]
    fn test_scripts_are_non_empty() {
        for script in ALL {
            assert!(!script.is_empty(), "{} has no turns", script.name());
            for turn in script.turns() {
                assert!(!turn.text.trim().is_empty(), "{} has a blank turn", script.name());
            }
        }
    }

    #[test]
    fn test_transcript_alternates_speakers() {
        let speakers: Vec<Speaker> = TRANSCRIPT.turns().iter().map(|t| t.speaker).collect();
        for pair in speakers.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
