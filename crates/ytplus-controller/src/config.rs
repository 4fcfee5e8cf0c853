//! Controller tunables.

use std::time::Duration;

/// Delay before the first poll and after every successful poll.
pub const POLL_BASE_DELAY: Duration = Duration::from_millis(1_000);
/// Amount added to the delay after each failed poll.
pub const POLL_BACKOFF_STEP: Duration = Duration::from_millis(500);
/// Upper bound for the poll delay.
pub const POLL_MAX_DELAY: Duration = Duration::from_millis(5_000);
/// Stall age after which the current action is annotated.
pub const STALL_THRESHOLD_SECS: u64 = 20;
/// Budget for a single status request.
pub const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(10);
/// Video count used for "recent" channel downloads when none is given.
pub const DEFAULT_VIDEO_COUNT: u32 = 10;

/// Poll delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay after a success.
    pub base_delay: Duration,
    /// Increment per consecutive failure.
    pub backoff_step: Duration,
    /// Ceiling for the delay.
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_delay: POLL_BASE_DELAY,
            backoff_step: POLL_BACKOFF_STEP,
            max_delay: POLL_MAX_DELAY,
        }
    }
}

impl PollConfig {
    /// Same schedule with the ceiling raised to at least the base delay.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            max_delay: self.max_delay.max(self.base_delay),
            ..self
        }
    }
}

/// Everything the controller needs besides its collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Poll delay schedule.
    pub poll: PollConfig,
    /// Budget for each status request; expiry counts as a failed poll.
    pub status_timeout: Duration,
    /// Stall age (seconds) above which the action text is annotated.
    pub stall_threshold_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            status_timeout: DEFAULT_STATUS_TIMEOUT,
            stall_threshold_secs: STALL_THRESHOLD_SECS,
        }
    }
}

impl ControllerConfig {
    /// Override the status request budget.
    #[must_use]
    pub const fn with_status_timeout(mut self, timeout: Duration) -> Self {
        self.status_timeout = timeout;
        self
    }
}
