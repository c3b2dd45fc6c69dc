//! Per-connection inbound event rate ceiling (sliding window).

use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

pub struct EventRateLimiter {
    max_events: usize,
    window: Duration,
    accepted: VecDeque<Instant>,
}

impl EventRateLimiter {
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            max_events,
            window,
            accepted: VecDeque::with_capacity(max_events),
        }
    }

    /// Record an event at `now`; `false` if the window is already full
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.accepted.front() {
            if now.duration_since(*oldest) >= self.window {
                self.accepted.pop_front();
            } else {
                break;
            }
        }
        if self.accepted.len() >= self.max_events {
            return false;
        }
        self.accepted.push_back(now);
        true
    }
}
