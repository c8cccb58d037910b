//! Frame-driven send-rate limiter for outbound move commands

use std::time::{Duration, Instant};

use super::constants::MOVE_SEND_TIMESTEP;

/// Fires at most once per `timestep`, checked on every frame
#[derive(Debug, Clone)]
pub struct SendRateLimiter {
    timestep: Duration,
    last: Instant,
}

impl SendRateLimiter {
    pub fn new(now: Instant) -> Self {
        Self::with_timestep(MOVE_SEND_TIMESTEP, now)
    }

    pub fn with_timestep(timestep: Duration, now: Instant) -> Self {
        Self {
            timestep,
            last: now,
        }
    }

    /// True when strictly more than one timestep elapsed since the last fire
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) > self.timestep {
            self.last = now;
            true
        } else {
            false
        }
    }
}
