//! Measurement lifecycle, driven by elapsed time on each poll.
//!
//! This module never touches the bus. [`Lifecycle::poll`] tells the driver
//! what to do next and the driver reports back how the bus operation went.

use crate::hw_def::DELAY_MEASURE_MS;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Where the driver is in its measure, wait, read cycle
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum State {
    /// Nothing in flight
    #[default]
    Idle,
    /// Measure command sent, waiting for the first poll
    Triggered,
    /// Conversion running
    WaitingForData,
    /// The last bus operation failed, waiting to recover
    ErrorDetected,
}

/// Bus work requested by a poll
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Action {
    None,
    Trigger,
    Read,
}

#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: State,
    /// when the current state was entered
    last_action_ms: u32,
    /// when the last measurement was delivered
    last_cycle_ms: u32,
    trigger_delay_ms: u32,
    retry_delay_ms: u32,
    measurement_delay_ms: u32,
    /// when ErrorDetected last returned to Idle
    last_recovery_ms: Option<u32>,
}

impl Lifecycle {
    pub(crate) fn new(trigger_delay_ms: u32, retry_delay_ms: u32) -> Self {
        Self {
            state: State::Idle,
            last_action_ms: 0,
            last_cycle_ms: 0,
            trigger_delay_ms,
            retry_delay_ms,
            measurement_delay_ms: DELAY_MEASURE_MS,
            last_recovery_ms: None,
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.state != State::Idle
    }

    pub(crate) fn trigger_delay_ms(&self) -> u32 {
        self.trigger_delay_ms
    }

    pub(crate) fn retry_delay_ms(&self) -> u32 {
        self.retry_delay_ms
    }

    pub(crate) fn set_trigger_delay(&mut self, ms: u32) {
        self.trigger_delay_ms = ms;
    }

    pub(crate) fn set_retry_delay(&mut self, ms: u32) {
        self.retry_delay_ms = ms;
    }

    /// Stop periodic triggering. A measurement already in flight still completes.
    pub(crate) fn disable_auto_trigger(&mut self) {
        self.trigger_delay_ms = 0;
        if self.state == State::ErrorDetected {
            self.enter(State::Idle, self.last_action_ms);
        }
    }

    fn enter(&mut self, state: State, now_ms: u32) {
        if state != self.state {
            trace!("ahtx0: {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.last_action_ms = now_ms;
    }

    /// Advance on elapsed time and report which bus operation is due.
    pub(crate) fn poll(&mut self, now_ms: u32) -> Action {
        let elapsed = now_ms.wrapping_sub(self.last_action_ms);
        match self.state {
            State::ErrorDetected => {
                let due = match self.last_recovery_ms {
                    None => true,
                    Some(at) => now_ms.wrapping_sub(at) >= self.retry_delay_ms,
                };
                if due {
                    self.last_recovery_ms = Some(now_ms);
                    self.enter(State::Idle, now_ms);
                }
                Action::None
            }
            State::Triggered => {
                self.enter(State::WaitingForData, now_ms);
                Action::None
            }
            State::WaitingForData if elapsed >= self.measurement_delay_ms => Action::Read,
            State::WaitingForData => Action::None,
            State::Idle => {
                let since_cycle = now_ms.wrapping_sub(self.last_cycle_ms);
                if self.trigger_delay_ms > 0 && since_cycle >= self.trigger_delay_ms {
                    Action::Trigger
                } else {
                    Action::None
                }
            }
        }
    }

    /// Record the outcome of a measure command.
    pub(crate) fn trigger_sent(&mut self, now_ms: u32, ok: bool) {
        self.enter(if ok { State::Triggered } else { State::ErrorDetected }, now_ms);
    }

    /// Record the outcome of the payload read.
    pub(crate) fn read_done(&mut self, now_ms: u32, ok: bool) {
        if ok {
            self.last_cycle_ms = now_ms;
            self.enter(State::Idle, now_ms);
        } else {
            self.enter(State::ErrorDetected, now_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggered_at(now_ms: u32) -> Lifecycle {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(now_ms, true);
        lifecycle
    }

    #[test]
    fn starts_idle() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        assert_eq!(lifecycle.state(), State::Idle);
        assert!(!lifecycle.is_busy());
        assert_eq!(lifecycle.poll(5000), Action::None);
        assert_eq!(lifecycle.state(), State::Idle);
    }

    #[test]
    fn trigger_outcome_selects_state() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(10, true);
        assert_eq!(lifecycle.state(), State::Triggered);
        assert!(lifecycle.is_busy());

        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(10, false);
        assert_eq!(lifecycle.state(), State::ErrorDetected);
    }

    #[test]
    fn waits_for_conversion() {
        let mut lifecycle = triggered_at(0);
        assert_eq!(lifecycle.poll(5), Action::None);
        assert_eq!(lifecycle.state(), State::WaitingForData);

        // conversion time counts from the poll that left Triggered
        assert_eq!(lifecycle.poll(5 + DELAY_MEASURE_MS - 1), Action::None);
        assert_eq!(lifecycle.state(), State::WaitingForData);
        assert_eq!(lifecycle.poll(5 + DELAY_MEASURE_MS), Action::Read);
    }

    #[test]
    fn failed_read_enters_error() {
        let mut lifecycle = triggered_at(0);
        lifecycle.poll(0);
        lifecycle.read_done(100, false);
        assert_eq!(lifecycle.state(), State::ErrorDetected);
    }

    #[test]
    fn first_error_recovers_immediately() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(100, false);
        assert_eq!(lifecycle.poll(101), Action::None);
        assert_eq!(lifecycle.state(), State::Idle);
    }

    #[test]
    fn repeated_error_waits_retry_delay() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(100, false);
        lifecycle.poll(101);
        lifecycle.trigger_sent(102, false);

        assert_eq!(lifecycle.poll(103), Action::None);
        assert_eq!(lifecycle.state(), State::ErrorDetected);
        // spacing counts from the previous recovery at 101
        lifecycle.poll(101 + 1999);
        assert_eq!(lifecycle.state(), State::ErrorDetected);
        lifecycle.poll(101 + 2000);
        assert_eq!(lifecycle.state(), State::Idle);
    }

    #[test]
    fn success_does_not_shorten_retry_spacing() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(0, false);
        lifecycle.poll(1);
        assert_eq!(lifecycle.state(), State::Idle);

        lifecycle.trigger_sent(2, true);
        lifecycle.poll(3);
        lifecycle.read_done(83, true);
        assert_eq!(lifecycle.state(), State::Idle);

        lifecycle.trigger_sent(100, false);
        lifecycle.poll(101);
        assert_eq!(lifecycle.state(), State::ErrorDetected);
        lifecycle.poll(1 + 1999);
        assert_eq!(lifecycle.state(), State::ErrorDetected);
        lifecycle.poll(1 + 2000);
        assert_eq!(lifecycle.state(), State::Idle);
    }

    #[test]
    fn late_error_recovers_immediately() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.trigger_sent(0, false);
        lifecycle.poll(1);

        // last recovery is long past, no wait
        lifecycle.trigger_sent(10_000, false);
        lifecycle.poll(10_001);
        assert_eq!(lifecycle.state(), State::Idle);
    }

    #[test]
    fn auto_trigger_after_delay() {
        let mut lifecycle = Lifecycle::new(1000, 2000);
        lifecycle.trigger_sent(0, true);
        lifecycle.poll(0);
        lifecycle.read_done(80, true);

        assert_eq!(lifecycle.poll(80 + 999), Action::None);
        assert_eq!(lifecycle.state(), State::Idle);
        assert_eq!(lifecycle.poll(80 + 1000), Action::Trigger);
    }

    #[test]
    fn zero_trigger_delay_never_triggers() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        assert_eq!(lifecycle.poll(u32::MAX), Action::None);
    }

    #[test]
    fn elapsed_survives_clock_wrap() {
        let mut lifecycle = triggered_at(u32::MAX - 10);
        lifecycle.poll(u32::MAX - 10);
        assert_eq!(lifecycle.poll(DELAY_MEASURE_MS - 20), Action::None);
        assert_eq!(lifecycle.poll(DELAY_MEASURE_MS - 11), Action::Read);
    }

    #[test]
    fn disable_auto_trigger_keeps_inflight_read() {
        let mut lifecycle = Lifecycle::new(1000, 2000);
        lifecycle.trigger_sent(0, true);
        lifecycle.poll(1);
        lifecycle.disable_auto_trigger();
        assert_eq!(lifecycle.trigger_delay_ms(), 0);
        assert_eq!(lifecycle.state(), State::WaitingForData);
        assert_eq!(lifecycle.poll(1 + DELAY_MEASURE_MS), Action::Read);
    }

    #[test]
    fn disable_auto_trigger_clears_error() {
        let mut lifecycle = Lifecycle::new(1000, 2000);
        lifecycle.trigger_sent(0, false);
        lifecycle.disable_auto_trigger();
        assert_eq!(lifecycle.state(), State::Idle);
        assert_eq!(lifecycle.poll(10_000), Action::None);
    }

    #[test]
    fn setters_apply_on_next_poll() {
        let mut lifecycle = Lifecycle::new(0, 2000);
        lifecycle.set_retry_delay(50);
        lifecycle.set_trigger_delay(300);
        assert_eq!(lifecycle.retry_delay_ms(), 50);
        assert_eq!(lifecycle.poll(299), Action::None);
        assert_eq!(lifecycle.poll(300), Action::Trigger);
    }
}
