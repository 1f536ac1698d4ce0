//! Animation Driver - Stopped / Running with a fixed-period tick
//!
//! Stopping only cancels future ticks; fetches already in flight complete.

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

enum DriverState {
    Stopped,
    Running(Interval),
}

pub struct AnimationDriver {
    period: Duration,
    state: DriverState,
}

impl AnimationDriver {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            state: DriverState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DriverState::Running(_))
    }

    /// Start ticking; returns false (and keeps the existing timer) when already running
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.state = DriverState::Running(interval);
        tracing::debug!("Animation started ({:?} period)", self.period);
        true
    }

    /// Stop ticking; returns false when already stopped
    pub fn stop(&mut self) -> bool {
        match std::mem::replace(&mut self.state, DriverState::Stopped) {
            DriverState::Running(_) => {
                tracing::debug!("Animation stopped");
                true
            }
            DriverState::Stopped => false,
        }
    }

    /// Resolves on the next tick; never resolves while stopped
    pub async fn tick(&mut self) {
        match &mut self.state {
            DriverState::Running(interval) => {
                interval.tick().await;
            }
            DriverState::Stopped => std::future::pending::<()>().await,
        }
    }
}
