//! Runtime Driver
//!
//! Runs a [`Wizard`] on the tokio clock. The wizard itself never reads a
//! clock; the driver maps tokio time onto the session clock, waits for
//! whichever comes first (the next intent or the active screen's next timer),
//! and forwards every published update to the surface.
//!
//! # Design Philosophy
//!
//! The loop only ever waits on I/O or on a known deadline. There is no
//! polling interval: when no timer is pending the driver parks on the intent
//! channel alone.
//!
//! ```text
//!   intents (mpsc) ──┐
//!                    ├─ select! ──► wizard.dispatch / advance_to ──► updates (mpsc)
//!   next deadline ───┘
//! ```

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::messages::{Intent, Outcome, ViewUpdate};
use crate::wizard::{Wizard, WizardError, WizardHooks};

/// How a driven session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// The wizard completed
    Completed,
    /// The user backed out of the first screen
    Exited,
    /// The intent channel closed
    Disconnected,
}

/// Driver errors
#[derive(Debug, Error)]
pub enum DriverError {
    /// The surface dropped its update receiver
    #[error("surface closed the update channel")]
    SurfaceClosed,

    /// The wizard rejected an operation
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// Drive `wizard` until it completes, exits, or the surface disconnects
///
/// Session time zero is mapped to the moment this is called, minus whatever
/// time the wizard has already seen.
pub async fn run<H: WizardHooks>(
    wizard: &mut Wizard<H>,
    mut intents: mpsc::Receiver<Intent>,
    updates: mpsc::Sender<ViewUpdate>,
) -> Result<SessionEnd, DriverError> {
    let started = Instant::now();
    let epoch = started.checked_sub(wizard.now()).unwrap_or(started);
    info!(session = %wizard.session(), "driver started");

    flush(wizard, &updates).await?;

    loop {
        let deadline = wizard.next_deadline();

        tokio::select! {
            intent = intents.recv() => {
                let Some(intent) = intent else {
                    info!(session = %wizard.session(), "intent channel closed");
                    return Ok(SessionEnd::Disconnected);
                };
                let outcome = wizard.dispatch(intent, epoch.elapsed())?;
                flush(wizard, &updates).await?;
                match outcome {
                    Outcome::Completed => return Ok(SessionEnd::Completed),
                    Outcome::Exited => return Ok(SessionEnd::Exited),
                    _ => {}
                }
            }
            () = sleep_until(epoch + deadline.unwrap_or_default()), if deadline.is_some() => {
                let now = epoch.elapsed().max(deadline.unwrap_or_default());
                let delivered = wizard.advance_to(now)?;
                debug!(delivered, now_ms = now.as_millis() as u64, "timers delivered");
                flush(wizard, &updates).await?;
            }
        }
    }
}

async fn flush<H: WizardHooks>(
    wizard: &mut Wizard<H>,
    updates: &mpsc::Sender<ViewUpdate>,
) -> Result<(), DriverError> {
    for update in wizard.drain_updates() {
        updates
            .send(update)
            .await
            .map_err(|_| DriverError::SurfaceClosed)?;
    }
    Ok(())
}
