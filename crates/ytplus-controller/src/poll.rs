//! Adaptive poll delay state machine.
//!
//! # Design
//! - Pure state; the controller owns timers and I/O.
//! - At most one status request may be outstanding; a tick that finds one in
//!   flight is skipped and rescheduled at the current delay.
//! - Restarting a loop resets the schedule only; the outstanding request, if
//!   any, keeps the guard until it is finished or abandoned.
//! - Failures add a fixed step up to a ceiling; the first success snaps back to
//!   the base delay.

use std::time::Duration;

use crate::config::PollConfig;

/// What a timer tick should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    /// Issue a status request; the state is now in flight.
    Fetch,
    /// A request is already outstanding; try again after the current delay.
    Skip,
}

/// How a status request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A snapshot was received and decoded.
    Success,
    /// Transport, HTTP, decode or timeout failure.
    Failure,
}

/// Delay and in-flight bookkeeping for one poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    config: PollConfig,
    delay: Duration,
    in_flight: bool,
    consecutive_failures: u32,
}

impl PollState {
    /// Fresh state at the base delay with nothing in flight.
    #[must_use]
    pub fn new(config: PollConfig) -> Self {
        let config = config.normalized();
        Self {
            config,
            delay: config.base_delay,
            in_flight: false,
            consecutive_failures: 0,
        }
    }

    /// Delay before the next tick.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a status request is outstanding.
    #[must_use]
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Failures since the last success.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Decide whether this tick may issue a request, marking it in flight if so.
    pub const fn begin_tick(&mut self) -> TickDecision {
        if self.in_flight {
            TickDecision::Skip
        } else {
            self.in_flight = true;
            TickDecision::Fetch
        }
    }

    /// Return to the base delay for a resumed loop.
    ///
    /// A request that is still outstanding stays marked in flight until its
    /// caller finishes or abandons it.
    pub const fn restart(&mut self) {
        self.delay = self.config.base_delay;
        self.consecutive_failures = 0;
    }

    /// Release the in-flight marker of a request whose result is dropped,
    /// leaving the delay untouched.
    pub const fn abandon(&mut self) {
        self.in_flight = false;
    }

    /// Record the outcome of the outstanding request and return the delay
    /// before the next tick.
    pub fn finish(&mut self, outcome: PollOutcome) -> Duration {
        self.in_flight = false;
        match outcome {
            PollOutcome::Success => {
                self.consecutive_failures = 0;
                self.delay = self.config.base_delay;
            }
            PollOutcome::Failure => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.delay = backoff_delay(self.delay, &self.config);
            }
        }
        self.delay
    }
}

/// Next delay after a failure: one step longer, never above the ceiling.
#[must_use]
pub fn backoff_delay(current: Duration, config: &PollConfig) -> Duration {
    current
        .saturating_add(config.backoff_step)
        .clamp(config.base_delay, config.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn starts_at_base_delay() {
        let state = PollState::new(PollConfig::default());
        assert_eq!(state.delay(), ms(1_000));
        assert!(!state.in_flight());
    }

    #[test]
    fn outstanding_request_skips_next_tick() {
        let mut state = PollState::new(PollConfig::default());
        assert_eq!(state.begin_tick(), TickDecision::Fetch);
        assert_eq!(state.begin_tick(), TickDecision::Skip);
        assert_eq!(state.begin_tick(), TickDecision::Skip);
        assert_eq!(state.delay(), ms(1_000));

        state.finish(PollOutcome::Success);
        assert_eq!(state.begin_tick(), TickDecision::Fetch);
    }

    #[test]
    fn failures_back_off_in_steps_up_to_ceiling() {
        let mut state = PollState::new(PollConfig::default());
        let mut observed = Vec::new();
        for _ in 0..10 {
            assert_eq!(state.begin_tick(), TickDecision::Fetch);
            observed.push(state.finish(PollOutcome::Failure));
        }
        assert_eq!(
            observed,
            [1_500, 2_000, 2_500, 3_000, 3_500, 4_000, 4_500, 5_000, 5_000, 5_000].map(ms)
        );
        assert_eq!(state.consecutive_failures(), 10);
    }

    #[test]
    fn delay_strictly_increases_until_capped() {
        let mut state = PollState::new(PollConfig::default());
        let mut previous = state.delay();
        loop {
            state.begin_tick();
            let next = state.finish(PollOutcome::Failure);
            if previous == ms(5_000) {
                assert_eq!(next, ms(5_000));
                break;
            }
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn first_success_resets_delay() {
        let mut state = PollState::new(PollConfig::default());
        for _ in 0..4 {
            state.begin_tick();
            state.finish(PollOutcome::Failure);
        }
        assert_eq!(state.delay(), ms(3_000));

        state.begin_tick();
        assert_eq!(state.finish(PollOutcome::Success), ms(1_000));
        assert_eq!(state.consecutive_failures(), 0);
        assert!(!state.in_flight());
    }

    #[test]
    fn restart_resets_delay_but_keeps_outstanding_request() {
        let mut state = PollState::new(PollConfig::default());
        state.begin_tick();
        state.finish(PollOutcome::Failure);
        assert_eq!(state.begin_tick(), TickDecision::Fetch);

        state.restart();
        assert_eq!(state.delay(), ms(1_000));
        assert_eq!(state.consecutive_failures(), 0);
        assert_eq!(state.begin_tick(), TickDecision::Skip);

        state.abandon();
        assert_eq!(state.delay(), ms(1_000));
        assert_eq!(state.begin_tick(), TickDecision::Fetch);
    }

    #[test]
    fn backoff_respects_custom_schedule() {
        let config = PollConfig {
            base_delay: ms(200),
            backoff_step: ms(300),
            max_delay: ms(600),
        };
        assert_eq!(backoff_delay(ms(200), &config), ms(500));
        assert_eq!(backoff_delay(ms(500), &config), ms(600));
        assert_eq!(backoff_delay(ms(50), &config), ms(350));
    }
}
