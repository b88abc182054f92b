//! Simulation clock.
//!
//! [`GameTiming`] is the only time source the patch engine reads. It is
//! queried once per sweep and never moves backwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fixed::Ticks;

/// Current simulation time plus the prediction flag of the running tick.
///
/// In a client/server replay model the same tick can be simulated more than
/// once. Only the first prediction of a tick is authoritative; the patch
/// scheduler skips every other pass so a cycle is never applied twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTiming {
    cur_time: Duration,
    tick: Ticks,
    first_time_predicted: bool,
}

impl GameTiming {
    /// A clock at time zero, tick zero, authoritative.
    pub fn new() -> Self {
        Self {
            cur_time: Duration::ZERO,
            tick: 0,
            first_time_predicted: true,
        }
    }

    /// Current simulation time.
    pub fn cur_time(&self) -> Duration {
        self.cur_time
    }

    /// Number of ticks advanced so far.
    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Whether the running tick is authoritative.
    pub fn is_first_time_predicted(&self) -> bool {
        self.first_time_predicted
    }

    /// Mark the running tick as a first prediction (`true`) or a replay.
    pub fn set_first_time_predicted(&mut self, value: bool) {
        self.first_time_predicted = value;
    }

    /// Advance one tick of length `dt`. Time saturates instead of wrapping.
    pub fn advance(&mut self, dt: Duration) {
        self.cur_time = self.cur_time.saturating_add(dt);
        self.tick += 1;
    }
}

impl Default for GameTiming {
    fn default() -> Self {
        Self::new()
    }
}
