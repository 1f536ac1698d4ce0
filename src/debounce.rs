//! Year slider debounce
//!
//! Idle ──input──▶ PendingDebounce ──deadline──▶ Fetching ──completed──▶ Idle
//!                   ▲    │ input (reschedule)        │ input
//!                   └────┴───────────────────────────┘
//!
//! An in-flight fetch is never cancelled; new input only reschedules the timer.

use std::time::Duration;
use tokio::time::Instant;

use crate::model::Year;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderPhase {
    Idle,
    PendingDebounce { year: Year, deadline: Instant },
    Fetching { year: Year, token: u64 },
}

#[derive(Debug)]
pub struct SliderDebounce {
    delay: Duration,
    phase: SliderPhase,
}

impl SliderDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            phase: SliderPhase::Idle,
        }
    }

    pub fn phase(&self) -> SliderPhase {
        self.phase
    }

    /// Slider moved: (re)arm the timer for `year`
    pub fn input(&mut self, year: Year, now: Instant) {
        if let SliderPhase::PendingDebounce { year: previous, .. } = self.phase {
            tracing::trace!("Debounce rescheduled: {} -> {}", previous, year);
        }
        self.phase = SliderPhase::PendingDebounce {
            year,
            deadline: now + self.delay,
        };
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.phase {
            SliderPhase::PendingDebounce { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    /// Timer elapsed at `now`: the year to fetch, if the deadline really passed
    pub fn fire(&mut self, now: Instant) -> Option<Year> {
        match self.phase {
            SliderPhase::PendingDebounce { year, deadline } if now >= deadline => Some(year),
            _ => None,
        }
    }

    /// The fetch for the debounced year went out under `token`
    pub fn fetching(&mut self, year: Year, token: u64) {
        self.phase = SliderPhase::Fetching { year, token };
    }

    /// A map fetch completed; only the slider's own fetch settles the phase
    pub fn settle(&mut self, token: u64) {
        if let SliderPhase::Fetching { token: pending, .. } = self.phase {
            if pending == token {
                self.phase = SliderPhase::Idle;
            }
        }
    }
}
