//! Deployment Simulator
//!
//! Models "connect this channel" / "activate this module" as a staged,
//! timer-driven sequence per target. Each target runs its own
//! [`PhaseController`] over [`DeployPhase`]; targets never affect each other.
//!
//! # Sequence
//!
//! ```text
//!   idle ──deploy()──► connecting ──T1──► deploying ──T2──► live (+ pulse)
//!     ▲                                       │
//!     └──────────── retry() ◄── failed ◄──────┘  (only with failure injection)
//! ```
//!
//! # Guarantees
//!
//! - `deploy` on a target that is not idle is a no-op, so repeated clicks
//!   produce exactly one phase sequence.
//! - Every scheduled step carries the target's attempt epoch. A step from an
//!   earlier attempt is ignored even if it is still delivered.
//! - Nothing fails unless a [`FailureInjection`] policy says so.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::phase::{Phase, PhaseController, Trigger};
use crate::timers::TimerRegistry;
use crate::timings::Timings;

/// Identifier of a deployable target (a channel, a module)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl TargetId {
    /// Create an id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Phase of one deployable target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    /// Not started
    Idle,
    /// Connection requested
    Connecting,
    /// Connected, activating
    Deploying,
    /// Done
    Live,
    /// Simulated failure; can be retried
    Failed,
}

impl Phase for DeployPhase {
    const INITIAL: Self = DeployPhase::Idle;

    fn successor(self) -> Option<Self> {
        match self {
            DeployPhase::Idle => Some(DeployPhase::Connecting),
            DeployPhase::Connecting => Some(DeployPhase::Deploying),
            DeployPhase::Deploying => Some(DeployPhase::Live),
            DeployPhase::Live | DeployPhase::Failed => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            DeployPhase::Idle => Some(Trigger::User),
            DeployPhase::Connecting | DeployPhase::Deploying => Some(Trigger::Timer),
            DeployPhase::Live | DeployPhase::Failed => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            DeployPhase::Idle => "idle",
            DeployPhase::Connecting => "connecting",
            DeployPhase::Deploying => "deploying",
            DeployPhase::Live => "live",
            DeployPhase::Failed => "failed",
        }
    }

    fn allows_detour(self, to: Self) -> bool {
        matches!(
            (self, to),
            (DeployPhase::Deploying, DeployPhase::Failed) | (DeployPhase::Failed, DeployPhase::Idle)
        )
    }
}

/// When simulated deploys fail
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FailureInjection {
    /// Every deploy succeeds
    #[default]
    Never,
    /// The listed targets fail their first attempt, then succeed
    FirstAttempt(Vec<TargetId>),
    /// Each attempt fails with `probability`, reproducibly from `seed`
    Random {
        /// Chance of failure per attempt, 0.0..=1.0
        probability: f64,
        /// RNG seed
        seed: u64,
    },
}

/// Timer message for one deploy step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeployMsg {
    slot: usize,
    epoch: u64,
    step: DeployStep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeployStep {
    Activate,
    Finish,
    ClearPulse,
}

/// Result of a deploy or retry request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployOutcome {
    /// A fresh phase sequence started
    Started,
    /// The target was not in a phase that accepts the request
    Ignored(DeployPhase),
    /// No target with that id
    UnknownTarget,
}

/// Observable change produced by the simulator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeployEvent {
    /// A target entered a new phase
    PhaseChanged {
        /// Target
        target: TargetId,
        /// New phase
        phase: DeployPhase,
    },
    /// The "just went live" pulse began
    PulseStarted {
        /// Target
        target: TargetId,
    },
    /// The pulse window closed
    PulseEnded {
        /// Target
        target: TargetId,
    },
}

/// One channel card or module toggle
#[derive(Clone, Debug)]
pub struct DeployableTarget {
    id: TargetId,
    label: String,
    controller: PhaseController<DeployPhase>,
    started_at: Option<Duration>,
    completed_at: Option<Duration>,
    pulsing: bool,
    attempts: u32,
    epoch: u64,
}

impl DeployableTarget {
    /// Target id
    #[must_use]
    pub fn id(&self) -> &TargetId {
        &self.id
    }

    /// Display label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> DeployPhase {
        self.controller.current()
    }

    /// When the current attempt started
    #[must_use]
    pub fn started_at(&self) -> Option<Duration> {
        self.started_at
    }

    /// When the target went live
    #[must_use]
    pub fn completed_at(&self) -> Option<Duration> {
        self.completed_at
    }

    /// Whether the completion pulse is showing
    #[must_use]
    pub fn is_pulsing(&self) -> bool {
        self.pulsing
    }

    /// Number of deploy attempts
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Runs independent deploy sequences for a fixed set of targets
#[derive(Debug)]
pub struct DeploymentSimulator {
    label: &'static str,
    targets: Vec<DeployableTarget>,
    failure: FailureInjection,
    rng: Option<StdRng>,
    connecting: Duration,
    activating: Duration,
    pulse: Duration,
}

impl DeploymentSimulator {
    /// Create a simulator with every target idle
    pub fn new<I, S>(
        label: &'static str,
        targets: I,
        timings: &Timings,
        failure: FailureInjection,
        now: Duration,
    ) -> Self
    where
        I: IntoIterator<Item = (TargetId, S)>,
        S: Into<String>,
    {
        let rng = match &failure {
            FailureInjection::Random { seed, .. } => Some(StdRng::seed_from_u64(*seed)),
            _ => None,
        };
        let targets = targets
            .into_iter()
            .map(|(id, target_label)| DeployableTarget {
                id,
                label: target_label.into(),
                controller: PhaseController::new(label, now),
                started_at: None,
                completed_at: None,
                pulsing: false,
                attempts: 0,
                epoch: 0,
            })
            .collect();
        Self {
            label,
            targets,
            failure,
            rng,
            connecting: timings.deploy_connecting,
            activating: timings.deploy_activating,
            pulse: timings.deploy_pulse,
        }
    }

    /// Start the phase sequence for `id`; a no-op unless the target is idle
    pub fn deploy<M: Clone>(
        &mut self,
        id: &TargetId,
        now: Duration,
        timers: &mut TimerRegistry<M>,
        wrap: fn(DeployMsg) -> M,
        events: &mut Vec<DeployEvent>,
    ) -> DeployOutcome {
        let Some(slot) = self.slot(id) else {
            return DeployOutcome::UnknownTarget;
        };
        let target = &mut self.targets[slot];
        let phase = target.phase();
        if phase != DeployPhase::Idle {
            debug!(simulator = self.label, target = %id, phase = phase.name(), "deploy ignored");
            return DeployOutcome::Ignored(phase);
        }
        if let Err(err) = target.controller.advance(Trigger::User, now) {
            warn!(simulator = self.label, target = %id, error = %err, "deploy rejected");
            return DeployOutcome::Ignored(phase);
        }

        target.attempts += 1;
        target.epoch += 1;
        target.started_at = Some(now);
        target.completed_at = None;
        target.pulsing = false;
        timers.schedule(
            self.connecting,
            wrap(DeployMsg {
                slot,
                epoch: target.epoch,
                step: DeployStep::Activate,
            }),
        );
        info!(
            simulator = self.label,
            target = %id,
            attempt = target.attempts,
            "deploy started"
        );
        events.push(DeployEvent::PhaseChanged {
            target: target.id.clone(),
            phase: DeployPhase::Connecting,
        });
        DeployOutcome::Started
    }

    /// Return a failed target to idle and deploy it again
    pub fn retry<M: Clone>(
        &mut self,
        id: &TargetId,
        now: Duration,
        timers: &mut TimerRegistry<M>,
        wrap: fn(DeployMsg) -> M,
        events: &mut Vec<DeployEvent>,
    ) -> DeployOutcome {
        let Some(slot) = self.slot(id) else {
            return DeployOutcome::UnknownTarget;
        };
        let target = &mut self.targets[slot];
        let phase = target.phase();
        if target.controller.detour(DeployPhase::Idle, now).is_err() {
            debug!(simulator = self.label, target = %id, phase = phase.name(), "retry ignored");
            return DeployOutcome::Ignored(phase);
        }
        events.push(DeployEvent::PhaseChanged {
            target: target.id.clone(),
            phase: DeployPhase::Idle,
        });
        self.deploy(id, now, timers, wrap, events)
    }

    /// Apply a delivered step; stale steps produce no events
    pub fn on_message<M: Clone>(
        &mut self,
        msg: DeployMsg,
        timers: &mut TimerRegistry<M>,
        wrap: fn(DeployMsg) -> M,
    ) -> Vec<DeployEvent> {
        let now = timers.now();
        let Self {
            label,
            targets,
            failure,
            rng,
            activating,
            pulse,
            ..
        } = self;
        let Some(target) = targets.get_mut(msg.slot) else {
            warn!(simulator = *label, slot = msg.slot, "deploy step for unknown slot");
            return Vec::new();
        };
        if msg.epoch != target.epoch {
            debug!(simulator = *label, target = %target.id, "ignored stale deploy step");
            return Vec::new();
        }

        let mut events = Vec::new();
        match (msg.step, target.phase()) {
            (DeployStep::Activate, DeployPhase::Connecting) => {
                if target.controller.advance(Trigger::Timer, now).is_ok() {
                    timers.schedule(
                        *activating,
                        wrap(DeployMsg {
                            step: DeployStep::Finish,
                            ..msg
                        }),
                    );
                    events.push(DeployEvent::PhaseChanged {
                        target: target.id.clone(),
                        phase: DeployPhase::Deploying,
                    });
                }
            }
            (DeployStep::Finish, DeployPhase::Deploying) => {
                if should_fail(failure, rng.as_mut(), target) {
                    if target.controller.detour(DeployPhase::Failed, now).is_ok() {
                        info!(simulator = *label, target = %target.id, "deploy failed");
                        events.push(DeployEvent::PhaseChanged {
                            target: target.id.clone(),
                            phase: DeployPhase::Failed,
                        });
                    }
                } else if target.controller.advance(Trigger::Timer, now).is_ok() {
                    target.completed_at = Some(now);
                    target.pulsing = true;
                    timers.schedule(
                        *pulse,
                        wrap(DeployMsg {
                            step: DeployStep::ClearPulse,
                            ..msg
                        }),
                    );
                    info!(simulator = *label, target = %target.id, "target live");
                    events.push(DeployEvent::PhaseChanged {
                        target: target.id.clone(),
                        phase: DeployPhase::Live,
                    });
                    events.push(DeployEvent::PulseStarted {
                        target: target.id.clone(),
                    });
                }
            }
            (DeployStep::ClearPulse, _) if target.pulsing => {
                target.pulsing = false;
                events.push(DeployEvent::PulseEnded {
                    target: target.id.clone(),
                });
            }
            (step, phase) => {
                warn!(
                    simulator = *label,
                    target = %target.id,
                    ?step,
                    phase = phase.name(),
                    "deploy step does not match phase"
                );
            }
        }
        events
    }

    /// Mark `id` live without running the sequence (remounting a screen)
    pub fn restore_live(&mut self, id: &TargetId, now: Duration) -> bool {
        let Some(slot) = self.slot(id) else {
            return false;
        };
        let target = &mut self.targets[slot];
        target.controller = PhaseController::restored(self.label, DeployPhase::Live, now);
        target.completed_at = Some(now);
        true
    }

    /// All targets in declaration order
    #[must_use]
    pub fn targets(&self) -> &[DeployableTarget] {
        &self.targets
    }

    /// Look up a target
    #[must_use]
    pub fn target(&self, id: &TargetId) -> Option<&DeployableTarget> {
        self.targets.iter().find(|target| &target.id == id)
    }

    /// Phase of `id`
    #[must_use]
    pub fn phase(&self, id: &TargetId) -> Option<DeployPhase> {
        self.target(id).map(DeployableTarget::phase)
    }

    /// Number of live targets
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.targets
            .iter()
            .filter(|target| target.phase() == DeployPhase::Live)
            .count()
    }

    /// Whether every target is live
    #[must_use]
    pub fn all_live(&self) -> bool {
        self.targets
            .iter()
            .all(|target| target.phase() == DeployPhase::Live)
    }

    /// Whether any target is mid-sequence
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.targets.iter().any(|target| {
            matches!(
                target.phase(),
                DeployPhase::Connecting | DeployPhase::Deploying
            )
        })
    }

    fn slot(&self, id: &TargetId) -> Option<usize> {
        self.targets.iter().position(|target| &target.id == id)
    }
}

fn should_fail(
    failure: &FailureInjection,
    rng: Option<&mut StdRng>,
    target: &DeployableTarget,
) -> bool {
    match failure {
        FailureInjection::Never => false,
        FailureInjection::FirstAttempt(ids) => target.attempts == 1 && ids.contains(&target.id),
        // A non-finite rate never fails; gen_bool panics on NaN.
        FailureInjection::Random { probability, .. } if !probability.is_finite() => false,
        FailureInjection::Random { probability, .. } => {
            rng.is_some_and(|rng| rng.gen_bool(probability.clamp(0.0, 1.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn identity(msg: DeployMsg) -> DeployMsg {
        msg
    }

    fn simulator(failure: FailureInjection) -> DeploymentSimulator {
        DeploymentSimulator::new(
            "test",
            [
                (TargetId::from("whatsapp"), "WhatsApp"),
                (TargetId::from("instagram"), "Instagram"),
            ],
            &Timings::quick(),
            failure,
            Duration::ZERO,
        )
    }

    fn run(
        sim: &mut DeploymentSimulator,
        timers: &mut TimerRegistry<DeployMsg>,
        now: Duration,
    ) -> Vec<DeployEvent> {
        let mut events = Vec::new();
        while let Some(fired) = timers.pop_due(now) {
            events.extend(sim.on_message(fired.message, timers, identity));
        }
        events
    }

    fn phases_of(events: &[DeployEvent], id: &str) -> Vec<DeployPhase> {
        events
            .iter()
            .filter_map(|e| match e {
                DeployEvent::PhaseChanged { target, phase } if target.as_str() == id => Some(*phase),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_sequence_with_fixed_delays() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::Never);
        let id = TargetId::from("whatsapp");
        let mut events = Vec::new();

        assert_eq!(
            sim.deploy(&id, Duration::ZERO, &mut timers, identity, &mut events),
            DeployOutcome::Started
        );
        events.extend(run(&mut sim, &mut timers, ms(99)));
        assert_eq!(sim.phase(&id), Some(DeployPhase::Connecting));

        events.extend(run(&mut sim, &mut timers, ms(100)));
        assert_eq!(sim.phase(&id), Some(DeployPhase::Deploying));

        events.extend(run(&mut sim, &mut timers, ms(300)));
        assert_eq!(sim.phase(&id), Some(DeployPhase::Live));
        assert_eq!(sim.target(&id).and_then(DeployableTarget::completed_at), Some(ms(300)));
        assert!(sim.target(&id).is_some_and(DeployableTarget::is_pulsing));

        events.extend(run(&mut sim, &mut timers, ms(450)));
        assert!(!sim.target(&id).is_some_and(DeployableTarget::is_pulsing));
        assert_eq!(
            phases_of(&events, "whatsapp"),
            vec![DeployPhase::Connecting, DeployPhase::Deploying, DeployPhase::Live]
        );
        assert!(events.contains(&DeployEvent::PulseEnded { target: id }));
    }

    #[test]
    fn test_double_deploy_runs_one_sequence() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::Never);
        let id = TargetId::from("whatsapp");
        let mut events = Vec::new();

        sim.deploy(&id, Duration::ZERO, &mut timers, identity, &mut events);
        assert_eq!(
            sim.deploy(&id, Duration::ZERO, &mut timers, identity, &mut events),
            DeployOutcome::Ignored(DeployPhase::Connecting)
        );
        events.extend(run(&mut sim, &mut timers, ms(1_000)));

        assert_eq!(
            phases_of(&events, "whatsapp"),
            vec![DeployPhase::Connecting, DeployPhase::Deploying, DeployPhase::Live]
        );
        assert_eq!(sim.target(&id).map(DeployableTarget::attempts), Some(1));

        // Live targets stay live.
        assert_eq!(
            sim.deploy(&id, ms(1_000), &mut timers, identity, &mut events),
            DeployOutcome::Ignored(DeployPhase::Live)
        );
    }

    #[test]
    fn test_targets_are_independent() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::Never);
        let mut events = Vec::new();

        sim.deploy(&"whatsapp".into(), Duration::ZERO, &mut timers, identity, &mut events);
        run(&mut sim, &mut timers, ms(50));
        sim.deploy(&"instagram".into(), ms(50), &mut timers, identity, &mut events);

        run(&mut sim, &mut timers, ms(300));
        assert_eq!(sim.phase(&"whatsapp".into()), Some(DeployPhase::Live));
        assert_eq!(sim.phase(&"instagram".into()), Some(DeployPhase::Deploying));
        assert_eq!(sim.live_count(), 1);

        run(&mut sim, &mut timers, ms(350));
        assert_eq!(sim.live_count(), 2);
        assert!(sim.all_live());
    }

    #[test]
    fn test_unknown_target() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::Never);
        let mut events = Vec::new();
        assert_eq!(
            sim.deploy(&"fax".into(), Duration::ZERO, &mut timers, identity, &mut events),
            DeployOutcome::UnknownTarget
        );
        assert!(events.is_empty());
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_first_attempt_failure_then_retry() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::FirstAttempt(vec!["whatsapp".into()]));
        let id = TargetId::from("whatsapp");
        let mut events = Vec::new();

        // Retrying a target that has not failed does nothing.
        assert_eq!(
            sim.retry(&id, Duration::ZERO, &mut timers, identity, &mut events),
            DeployOutcome::Ignored(DeployPhase::Idle)
        );

        sim.deploy(&id, Duration::ZERO, &mut timers, identity, &mut events);
        run(&mut sim, &mut timers, ms(300));
        assert_eq!(sim.phase(&id), Some(DeployPhase::Failed));

        // A failed target does not redeploy without an explicit retry.
        assert_eq!(
            sim.deploy(&id, ms(300), &mut timers, identity, &mut events),
            DeployOutcome::Ignored(DeployPhase::Failed)
        );
        assert_eq!(
            sim.retry(&id, ms(300), &mut timers, identity, &mut events),
            DeployOutcome::Started
        );
        run(&mut sim, &mut timers, ms(600));
        assert_eq!(sim.phase(&id), Some(DeployPhase::Live));
        assert_eq!(sim.target(&id).map(DeployableTarget::attempts), Some(2));
    }

    #[test]
    fn test_random_failure_is_reproducible() {
        let outcome = |seed| {
            let mut timers = TimerRegistry::new("test", Duration::ZERO);
            let mut sim = simulator(FailureInjection::Random {
                probability: 0.5,
                seed,
            });
            let mut events = Vec::new();
            for id in ["whatsapp", "instagram"] {
                sim.deploy(&id.into(), Duration::ZERO, &mut timers, identity, &mut events);
            }
            run(&mut sim, &mut timers, ms(1_000));
            sim.targets().iter().map(DeployableTarget::phase).collect::<Vec<_>>()
        };
        assert_eq!(outcome(7), outcome(7));

        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::Random {
            probability: 1.0,
            seed: 1,
        });
        let mut events = Vec::new();
        sim.deploy(&"whatsapp".into(), Duration::ZERO, &mut timers, identity, &mut events);
        run(&mut sim, &mut timers, ms(1_000));
        assert_eq!(sim.phase(&"whatsapp".into()), Some(DeployPhase::Failed));
    }

    #[test]
    fn test_non_finite_failure_rate_never_fails() {
        for probability in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut timers = TimerRegistry::new("test", Duration::ZERO);
            let mut sim = simulator(FailureInjection::Random {
                probability,
                seed: 3,
            });
            let mut events = Vec::new();
            sim.deploy(&"whatsapp".into(), Duration::ZERO, &mut timers, identity, &mut events);
            run(&mut sim, &mut timers, ms(1_000));
            assert_eq!(sim.phase(&"whatsapp".into()), Some(DeployPhase::Live));
        }
    }

    #[test]
    fn test_teardown_drops_pending_steps() {
        let mut timers = TimerRegistry::new("test", Duration::ZERO);
        let mut sim = simulator(FailureInjection::Never);
        let id = TargetId::from("whatsapp");
        let mut events = Vec::new();
        sim.deploy(&id, Duration::ZERO, &mut timers, identity, &mut events);

        timers.cancel_all();
        assert!(run(&mut sim, &mut timers, ms(1_000)).is_empty());
        assert_eq!(sim.phase(&id), Some(DeployPhase::Connecting));
    }

    #[test]
    fn test_restore_live() {
        let mut sim = simulator(FailureInjection::Never);
        assert!(sim.restore_live(&"instagram".into(), ms(5)));
        assert!(!sim.restore_live(&"fax".into(), ms(5)));
        assert_eq!(sim.live_count(), 1);
        assert!(!sim.in_flight());
    }
}
