//! Fixed delays used by the simulated flows
//!
//! These are product constants, not user settings. Tests construct custom
//! values to keep scenarios short.

use std::time::Duration;

/// Every delay the engine schedules
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timings {
    /// Typewriter cadence per character
    pub char_interval: Duration,
    /// Pause between two script turns
    pub turn_gap: Duration,
    /// How long the voice intro listens after the mic opens
    pub voice_listen: Duration,
    /// Poll `deploying` duration
    pub poll_deploying: Duration,
    /// Interval between mock poll responses
    pub poll_response_interval: Duration,
    /// Delay from the last poll response to `analyze`
    pub poll_analyze_delay: Duration,
    /// Deploy `connecting → deploying` delay (T1)
    pub deploy_connecting: Duration,
    /// Deploy `deploying → live` delay (T2)
    pub deploy_activating: Duration,
    /// How long the "just went live" pulse lasts
    pub deploy_pulse: Duration,
    /// Pause between two build-out module activations
    pub build_step_gap: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            char_interval: Duration::from_millis(28),
            turn_gap: Duration::from_millis(650),
            voice_listen: Duration::from_millis(2_400),
            poll_deploying: Duration::from_millis(2_000),
            poll_response_interval: Duration::from_millis(900),
            poll_analyze_delay: Duration::from_millis(1_200),
            deploy_connecting: Duration::from_millis(1_200),
            deploy_activating: Duration::from_millis(1_600),
            deploy_pulse: Duration::from_millis(1_500),
            build_step_gap: Duration::from_millis(400),
        }
    }
}

impl Timings {
    /// Round, small delays for tests and scenario walkthroughs
    #[must_use]
    pub fn quick() -> Self {
        Self {
            char_interval: Duration::from_millis(1),
            turn_gap: Duration::from_millis(10),
            voice_listen: Duration::from_millis(100),
            poll_deploying: Duration::from_millis(100),
            poll_response_interval: Duration::from_millis(50),
            poll_analyze_delay: Duration::from_millis(80),
            deploy_connecting: Duration::from_millis(100),
            deploy_activating: Duration::from_millis(200),
            deploy_pulse: Duration::from_millis(150),
            build_step_gap: Duration::from_millis(20),
        }
    }
}
