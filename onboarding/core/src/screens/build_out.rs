//! Build-out screen
//!
//! Activates the community's modules one after another and reports progress.
//! Which modules get built depends on the answers given earlier; each one runs
//! through the [`DeploymentSimulator`] (never failing) and the next starts a
//! short gap after the previous one went live.

use tracing::info;

use crate::answers::WizardAnswers;
use crate::deploy::{
    DeployEvent, DeployMsg, DeployPhase, DeploymentSimulator, FailureInjection, TargetId,
};
use crate::messages::{IgnoreReason, Intent, Outbox, Outcome, ViewUpdate};
use crate::phase::{Phase, PhaseController, Trigger};
use crate::screens::{advance_phase, ScreenKind, ScreenLogic, ScreenSetup, CONNECTED_KEY};
use crate::timers::TimerRegistry;
use crate::timings::Timings;

/// Answer key listing the modules that were built
pub const MODULES_KEY: &str = "build.modules";

/// A module of the generated community
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildModule {
    /// Stable id
    pub id: &'static str,
    /// Display label
    pub label: &'static str,
}

const HUB: BuildModule = BuildModule {
    id: "hub",
    label: "Community hub",
};
const DIRECTORY: BuildModule = BuildModule {
    id: "directory",
    label: "Member directory",
};
const EVENTS: BuildModule = BuildModule {
    id: "events",
    label: "Events calendar",
};
const PAYMENTS: BuildModule = BuildModule {
    id: "payments",
    label: "Memberships & payments",
};
const BROADCAST: BuildModule = BuildModule {
    id: "broadcast",
    label: "Channel broadcasts",
};

/// Modules to build for `answers`, in build order
#[must_use]
pub fn modules_for(answers: &WizardAnswers) -> Vec<BuildModule> {
    let mut modules = vec![HUB, DIRECTORY];
    if answers.has_selection("events") {
        modules.push(EVENTS);
    }
    if answers.contains("goal", "monetize") {
        modules.push(PAYMENTS);
    }
    if answers.has_selection(CONNECTED_KEY) {
        modules.push(BROADCAST);
    }
    modules
}

/// Phases of the build-out
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildPhase {
    /// Modules activating
    Building,
    /// Everything live
    Ready,
}

impl Phase for BuildPhase {
    const INITIAL: Self = BuildPhase::Building;

    fn successor(self) -> Option<Self> {
        match self {
            BuildPhase::Building => Some(BuildPhase::Ready),
            BuildPhase::Ready => None,
        }
    }

    fn trigger(self) -> Option<Trigger> {
        match self {
            BuildPhase::Building => Some(Trigger::Timer),
            BuildPhase::Ready => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BuildPhase::Building => "building",
            BuildPhase::Ready => "ready",
        }
    }
}

/// Timer messages of the build-out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMsg {
    /// A module deploy step
    Deploy(DeployMsg),
    /// Start the module at this position
    Start(usize),
}

/// Build-out screen state
#[derive(Debug)]
pub struct BuildOut {
    timings: Timings,
    phase: PhaseController<BuildPhase>,
    modules: Vec<BuildModule>,
    simulator: Option<DeploymentSimulator>,
    completed: usize,
    timers: TimerRegistry<BuildMsg>,
}

impl BuildOut {
    /// Create the screen; modules are chosen at mount
    #[must_use]
    pub fn new(setup: &ScreenSetup) -> Self {
        Self {
            timings: setup.timings,
            phase: PhaseController::new("build", setup.now),
            modules: Vec::new(),
            simulator: None,
            completed: 0,
            timers: TimerRegistry::new(Self::KIND.id(), setup.now),
        }
    }

    /// Current phase
    #[must_use]
    pub fn phase(&self) -> BuildPhase {
        self.phase.current()
    }

    /// Modules being built
    #[must_use]
    pub fn modules(&self) -> &[BuildModule] {
        &self.modules
    }

    /// Modules live so far
    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Progress in percent
    #[must_use]
    pub fn percent(&self) -> u8 {
        percent(self.completed, self.modules.len())
    }

    fn start(&mut self, position: usize, out: &mut Outbox) {
        let now = self.timers.now();
        let (Some(module), Some(simulator)) = (self.modules.get(position), self.simulator.as_mut())
        else {
            return;
        };
        let mut events = Vec::new();
        simulator.deploy(
            &TargetId::from(module.id),
            now,
            &mut self.timers,
            BuildMsg::Deploy,
            &mut events,
        );
        out.deploy(Self::KIND, &events);
    }

    fn on_deploy(&mut self, msg: DeployMsg, answers: &mut WizardAnswers, out: &mut Outbox) {
        let Some(simulator) = self.simulator.as_mut() else {
            return;
        };
        let events = simulator.on_message(msg, &mut self.timers, BuildMsg::Deploy);
        out.deploy(Self::KIND, &events);

        let went_live = events.iter().any(|event| {
            matches!(
                event,
                DeployEvent::PhaseChanged {
                    phase: DeployPhase::Live,
                    ..
                }
            )
        });
        if !went_live {
            return;
        }

        self.completed += 1;
        out.push(ViewUpdate::Progress {
            completed: self.completed,
            total: self.modules.len(),
            percent: self.percent(),
        });
        if self.completed < self.modules.len() {
            self.timers
                .schedule(self.timings.build_step_gap, BuildMsg::Start(self.completed));
        } else {
            let now = self.timers.now();
            if advance_phase(&mut self.phase, Self::KIND, Trigger::Timer, now, out) {
                answers.set_selection(MODULES_KEY, self.modules.iter().map(|m| m.id));
                info!(modules = self.modules.len(), "build-out ready");
            }
        }
    }
}

fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    u8::try_from(completed.min(total) * 100 / total).unwrap_or(100)
}

impl ScreenLogic for BuildOut {
    type Message = BuildMsg;

    const KIND: ScreenKind = ScreenKind::BuildOut;

    fn timers(&self) -> &TimerRegistry<BuildMsg> {
        &self.timers
    }

    fn timers_mut(&mut self) -> &mut TimerRegistry<BuildMsg> {
        &mut self.timers
    }

    fn phase_name(&self) -> &'static str {
        self.phase.current().name()
    }

    fn on_mount(&mut self, answers: &WizardAnswers, out: &mut Outbox) {
        let now = self.timers.now();
        self.modules = modules_for(answers);
        self.simulator = Some(DeploymentSimulator::new(
            "build",
            self.modules
                .iter()
                .map(|module| (TargetId::from(module.id), module.label)),
            &self.timings,
            FailureInjection::Never,
            now,
        ));
        out.push(ViewUpdate::PhaseChanged {
            screen: Self::KIND,
            phase: self.phase_name(),
        });
        out.push(ViewUpdate::Progress {
            completed: 0,
            total: self.modules.len(),
            percent: 0,
        });
        self.timers.schedule(std::time::Duration::ZERO, BuildMsg::Start(0));
    }

    fn on_timer(&mut self, msg: BuildMsg, answers: &mut WizardAnswers, out: &mut Outbox) {
        match msg {
            BuildMsg::Start(position) => self.start(position, out),
            BuildMsg::Deploy(step) => self.on_deploy(step, answers, out),
        }
    }

    fn on_intent(
        &mut self,
        _intent: &Intent,
        _answers: &mut WizardAnswers,
        _out: &mut Outbox,
    ) -> Outcome {
        Outcome::Ignored(IgnoreReason::NotApplicable)
    }

    fn can_continue(&self, _answers: &WizardAnswers) -> bool {
        self.phase.is(BuildPhase::Ready)
    }
}
