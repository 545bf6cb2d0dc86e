//! Stdin command reader
//!
//! Turns typed lines into [`Intent`]s for the interactive surface.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use onboarding_core::{Intent, TargetId};

/// Printed for `help`
pub const HELP: &str = "\
Commands:
  continue | c          press the continue button
  back | b              go back
  skip | s              skip this screen
  mic | a               press the microphone
  toggle <option> | t   select or deselect an option
  connect <channel>     connect a channel
  retry <channel>       retry a failed channel
  ask <question>        send a poll question
  pick <n>              send suggested poll question n (1-based)
  help | h              show this help
  quit | q              leave
";

/// A parsed input line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Forward to the wizard
    Intent(Intent),
    /// Print the command list
    Help,
    /// Stop reading input
    Quit,
}

/// Why a line could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The first word is not a command
    #[error("unknown command '{0}' (type `help`)")]
    Unknown(String),

    /// The command needs an argument
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),

    /// `pick` was given something other than a positive number
    #[error("'{0}' is not a suggestion number")]
    BadNumber(String),
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let argument = |name: &'static str| {
        if rest.is_empty() {
            Err(CommandError::MissingArgument(name))
        } else {
            Ok(rest.to_string())
        }
    };

    let intent = match word.to_lowercase().as_str() {
        "continue" | "c" | "next" => Intent::Continue,
        "back" | "b" => Intent::Back,
        "skip" | "s" => Intent::Skip,
        "mic" | "a" | "activate" => Intent::Activate,
        "toggle" | "t" => Intent::ToggleOption(argument("toggle")?),
        "connect" => Intent::ActivateTarget(TargetId::new(argument("connect")?)),
        "retry" => Intent::RetryTarget(TargetId::new(argument("retry")?)),
        "ask" => Intent::SubmitText(argument("ask")?),
        "pick" => {
            let raw = argument("pick")?;
            match raw.parse::<usize>() {
                Ok(n) if n >= 1 => Intent::PickSuggestion(n - 1),
                _ => return Err(CommandError::BadNumber(raw)),
            }
        }
        "help" | "h" | "?" => return Ok(Some(Command::Help)),
        "quit" | "q" | "exit" => return Ok(Some(Command::Quit)),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(Command::Intent(intent)))
}

/// Read stdin until EOF or `quit`, forwarding intents
///
/// Returning drops `intents`, which disconnects the session.
pub async fn read_commands(intents: mpsc::Sender<Intent>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stderr = tokio::io::stderr();

    while let Some(line) = lines.next_line().await? {
        match parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Intent(intent))) => {
                debug!(?intent, "command");
                if intents.send(intent).await.is_err() {
                    break;
                }
            }
            Ok(Some(Command::Help)) => {
                stderr.write_all(HELP.as_bytes()).await?;
                stderr.flush().await?;
            }
            Ok(Some(Command::Quit)) => break,
            Err(e) => {
                warn!(error = %e, "Unrecognised input");
                stderr.write_all(format!("{e}\n").as_bytes()).await?;
                stderr.flush().await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn intent(line: &str) -> Intent {
        match parse(line) {
            Ok(Some(Command::Intent(intent))) => intent,
            other => panic!("expected an intent for {line:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_navigation_words() {
        assert_eq!(intent("continue"), Intent::Continue);
        assert_eq!(intent("  C "), Intent::Continue);
        assert_eq!(intent("back"), Intent::Back);
        assert_eq!(intent("skip"), Intent::Skip);
        assert_eq!(intent("mic"), Intent::Activate);
    }

    #[test]
    fn test_arguments() {
        assert_eq!(intent("toggle meetups"), Intent::ToggleOption("meetups".into()));
        assert_eq!(
            intent("connect whatsapp"),
            Intent::ActivateTarget("whatsapp".into())
        );
        assert_eq!(intent("retry discord"), Intent::RetryTarget("discord".into()));
        assert_eq!(
            intent("ask   What should we do next?  "),
            Intent::SubmitText("What should we do next?".into())
        );
        assert_eq!(intent("pick 1"), Intent::PickSuggestion(0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Ok(None));
        assert_eq!(parse("help"), Ok(Some(Command::Help)));
        assert_eq!(parse("q"), Ok(Some(Command::Quit)));
        assert_eq!(parse("dance"), Err(CommandError::Unknown("dance".into())));
        assert_eq!(parse("toggle"), Err(CommandError::MissingArgument("toggle")));
        assert_eq!(parse("pick 0"), Err(CommandError::BadNumber("0".into())));
        assert_eq!(parse("pick two"), Err(CommandError::BadNumber("two".into())));
    }
}
