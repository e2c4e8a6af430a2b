//! Interval timers driven by the UI loop.
//!
//! A [`Timer`] is just a deadline.  The loop calls [`Timer::poll`] with the
//! current instant; a due timer reports one tick and reschedules itself one
//! interval after `now`, so a stalled loop never produces a burst of
//! catch-up ticks.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Timer {
    name: &'static str,
    interval: Duration,
    next_due: Option<Instant>,
}

impl Timer {
    /// A stopped timer.
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            next_due: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// When the next tick is due, if running.
    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Start the timer.  Starting a running timer keeps its schedule.
    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.interval);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    /// Change the interval.  A running timer is rescheduled from `now`.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        if self.next_due.is_some() {
            self.next_due = Some(now + interval);
        }
    }

    /// Report whether a tick is due at `now`, rescheduling if so.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}
