//! Terminal surface
//!
//! Prints [`ViewUpdate`]s to stdout, either as readable text or as one JSON
//! object per line, and optionally lets an [`Autopilot`] answer them.
//!
//! The text renderer collapses the character-by-character reveal: a line of
//! dialogue is printed once, when its turn completes.

use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::mpsc;
use tracing::debug;

use onboarding_core::screens::QUESTIONS;
use onboarding_core::{
    Intent, Phase, ScreenKind, SelectionMode, SoundCue, Speaker, ViewUpdate,
};

use crate::autopilot::Autopilot;

/// How updates are written
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per update
    Json,
}

/// Screen title for headings
fn title(screen: ScreenKind) -> &'static str {
    match screen {
        ScreenKind::VoiceIntro => "Say hello",
        ScreenKind::Transcript => "What we heard",
        ScreenKind::Followup => "A few questions",
        ScreenKind::Connect => "Connect your channels",
        ScreenKind::Poll => "Try a live poll",
        ScreenKind::BuildOut => "Building your community",
        ScreenKind::Preview => "Your community",
    }
}

/// Stateful text renderer
#[derive(Debug, Default)]
pub struct TextRenderer {
    speaker: Option<Speaker>,
    line: String,
}

impl TextRenderer {
    /// Render `update`; `None` when it has no visible text of its own
    pub fn render(&mut self, update: &ViewUpdate) -> Option<String> {
        match update {
            ViewUpdate::ScreenMounted { screen, index, .. } => Some(format!(
                "\n== {} ({}/{}) ==",
                title(*screen),
                index + 1,
                ScreenKind::ALL.len()
            )),
            ViewUpdate::PhaseChanged {
                screen: ScreenKind::VoiceIntro,
                phase: "awaiting-mic",
            } => Some("   (type `mic` to answer)".to_string()),
            ViewUpdate::PhaseChanged {
                screen: ScreenKind::VoiceIntro,
                phase: "listening",
            } => Some("   listening...".to_string()),
            ViewUpdate::ContinueLabel { label, .. } => Some(format!("   [ {label} ]")),
            ViewUpdate::TurnStarted { speaker, .. } => {
                self.speaker = Some(*speaker);
                self.line.clear();
                None
            }
            ViewUpdate::TextRevealed { screen, prefix, .. } if *screen != ScreenKind::Followup => {
                self.line.clone_from(prefix);
                None
            }
            ViewUpdate::TurnCompleted { .. } => {
                let who = match self.speaker.take() {
                    Some(Speaker::User) => "You",
                    _ => "Host",
                };
                Some(format!("{who}: {}", self.line))
            }
            ViewUpdate::QuestionShown {
                question,
                position,
                total,
                mode,
                ..
            } => {
                let question = QUESTIONS.iter().find(|q| q.id == *question)?;
                let hint = match mode {
                    SelectionMode::Single => "pick one",
                    SelectionMode::Multi => "pick any",
                };
                let options: Vec<String> = question
                    .options
                    .iter()
                    .map(|o| format!("{} ({})", o.label, o.id))
                    .collect();
                Some(format!(
                    "Q{}/{}: {} [{hint}]\n   {}",
                    position + 1,
                    total,
                    question.prompt,
                    options.join(", ")
                ))
            }
            ViewUpdate::AnswerChanged { selected, .. } => {
                Some(format!("   selected: {}", selected.join(", ")))
            }
            ViewUpdate::TargetPhase { target, phase, .. } => {
                Some(format!("   {target}: {}", phase.name()))
            }
            ViewUpdate::Celebrate { target, .. } => Some(format!("   * {target} is live *")),
            ViewUpdate::Progress {
                completed,
                total,
                percent,
            } => Some(format!("   {completed}/{total} modules ({percent}%)")),
            ViewUpdate::ResponseCollected {
                author,
                text,
                collected,
                ..
            } => Some(format!("   {author}: {text}  ({collected} responses)")),
            ViewUpdate::PollResults { bars } => Some(
                bars.iter()
                    .map(|bar| {
                        format!(
                            "   {:<12} {:<50} {}%",
                            bar.label,
                            "#".repeat(usize::from(bar.percent / 2)),
                            bar.percent
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            ViewUpdate::SoundCue { cue } => Some(
                match cue {
                    SoundCue::MicOpen => "   ~ mic on ~",
                    SoundCue::Captured => "   ~ got it ~",
                    SoundCue::Chime => "   ~ ding ~",
                }
                .to_string(),
            ),
            ViewUpdate::Preview { preview } => {
                let mut lines = vec![format!(
                    "   goal: {}",
                    preview.goal.as_deref().unwrap_or("-")
                )];
                if !preview.event_kinds.is_empty() {
                    lines.push(format!("   events: {}", preview.event_kinds.join(", ")));
                }
                if let Some(ref model) = preview.monetization {
                    lines.push(format!("   earning: {model}"));
                }
                if !preview.connected.is_empty() {
                    lines.push(format!("   connected: {}", preview.connected.join(", ")));
                }
                lines.push(format!("   modules: {}", preview.modules.join(", ")));
                Some(lines.join("\n"))
            }
            ViewUpdate::WizardExited => Some("Leaving onboarding.".to_string()),
            ViewUpdate::WizardCompleted { .. } => {
                Some("\nAll set! Your community is ready.".to_string())
            }
            _ => None,
        }
    }
}

/// The terminal surface
#[derive(Debug)]
pub struct Surface {
    format: OutputFormat,
    renderer: TextRenderer,
    pilot: Option<Autopilot>,
}

impl Surface {
    /// Create a surface; with a pilot it answers updates itself
    #[must_use]
    pub fn new(format: OutputFormat, pilot: Option<Autopilot>) -> Self {
        Self {
            format,
            renderer: TextRenderer::default(),
            pilot,
        }
    }

    /// Format one update for output
    pub fn format(&mut self, update: &ViewUpdate) -> anyhow::Result<Option<String>> {
        Ok(match self.format {
            OutputFormat::Json => Some(serde_json::to_string(update)?),
            OutputFormat::Text => self.renderer.render(update),
        })
    }

    /// Print updates until the engine closes the channel
    pub async fn run(
        mut self,
        mut updates: mpsc::Receiver<ViewUpdate>,
        intents: Option<mpsc::Sender<Intent>>,
    ) -> anyhow::Result<()> {
        let mut stdout = tokio::io::stdout();
        while let Some(update) = updates.recv().await {
            if let Some(line) = self.format(&update)? {
                write_line(&mut stdout, &line).await?;
            }

            let reaction = self.pilot.as_mut().and_then(|pilot| pilot.react(&update));
            if let (Some(intent), Some(tx)) = (reaction, intents.as_ref()) {
                if tx.send(intent).await.is_err() {
                    debug!("Engine stopped accepting intents");
                }
            }
        }
        Ok(())
    }
}

async fn write_line(stdout: &mut Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
