//! Acquisition timing and the fixed render/timer cadences.

use std::time::{Duration, Instant};

/// Default render cadence (10 Hz).
pub const RENDER_INTERVAL: Duration = Duration::from_millis(100);
/// Default elapsed-time readout cadence (1 Hz).
pub const TIMER_INTERVAL: Duration = Duration::from_secs(1);

/// Start of acquisition and, for frozen sessions, its end. Seconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionTiming {
    pub since: f64,
    pub finished: Option<f64>,
}

impl SessionTiming {
    pub fn live(since: f64) -> Self {
        Self {
            since,
            finished: None,
        }
    }

    pub fn frozen(since: f64, finished: f64) -> Self {
        Self {
            since,
            finished: Some(finished),
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.finished.is_some()
    }

    /// `finished` when frozen, otherwise the supplied wall-clock time.
    pub fn end_time(&self, now: f64) -> f64 {
        self.finished.unwrap_or(now)
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        self.end_time(now) - self.since
    }
}

/// Current wall-clock time in seconds since the UNIX epoch.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1e6
}

/// `HH:MM:SS` readout of an elapsed duration, rounded to whole seconds and floored at zero.
/// Hours keep growing past 99.
pub fn format_elapsed(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.round() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}

/// Fires at most once per `interval`. Missed ticks are not replayed.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` if a tick is due at `now`; the first call always fires.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next {
            Some(next) if now < next => false,
            _ => {
                self.next = Some(now + self.interval);
                true
            }
        }
    }

    /// Time left until the next tick.
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next
            .map(|next| next.saturating_duration_since(now))
            .unwrap_or_default()
    }
}
