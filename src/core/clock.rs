//! Time sources: a wrapping millisecond tick counter and a fixed-offset wall clock.
//!
//! The render loop measures every interval with [`ticks_diff`], so a counter
//! that rolls over past `u32::MAX` still yields correct elapsed times.

#![allow(missing_docs)]

use std::time::Instant;

use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};

/// Epoch seconds below this mean the real-time clock was never set.
const MIN_VALID_EPOCH_SECS: i64 = 1_000_000_000;

pub const SECONDS_PER_DAY: u32 = 86_400;

/// Time collaborator used by the controller.
pub trait Clock: Send + Sync {
    /// Monotonic milliseconds; wraps at `u32::MAX`.
    fn ticks_ms(&self) -> u32;

    /// Local seconds past midnight, or `None` while wall time is unavailable.
    fn seconds_past_midnight(&self) -> Option<u32>;

    /// Re-synchronize wall time after connectivity returns. Returns success.
    fn resync(&self) -> bool;
}

/// Wraparound-safe elapsed milliseconds between two tick readings.
#[must_use]
pub const fn ticks_diff(now: u32, earlier: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// Render seconds past midnight as `HH:MM:SS`, or `--:--:--` when unknown.
#[must_use]
pub fn format_clock(secs: Option<u32>) -> String {
    match secs {
        Some(s) => {
            let s = s % SECONDS_PER_DAY;
            format!("{:02}:{:02}:{:02}", s / 3600, (s / 60) % 60, s % 60)
        }
        None => "--:--:--".to_string(),
    }
}

// ──────────────────── system clock ────────────────────

/// Host clock: `Instant` ticks plus `chrono::Utc` shifted by a fixed offset.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
    offset: FixedOffset,
}

impl SystemClock {
    #[must_use]
    pub fn new(utc_offset_hours: i32) -> Self {
        let offset =
            FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600)).unwrap_or(Utc.fix());
        Self {
            origin: Instant::now(),
            offset,
        }
    }

    /// Seconds past midnight for an arbitrary instant under this clock's offset.
    #[must_use]
    pub fn seconds_at(&self, at: DateTime<Utc>) -> Option<u32> {
        if at.timestamp() < MIN_VALID_EPOCH_SECS {
            return None;
        }
        let local = at.with_timezone(&self.offset);
        Some(local.num_seconds_from_midnight())
    }
}

impl Clock for SystemClock {
    #[allow(clippy::cast_possible_truncation)]
    fn ticks_ms(&self) -> u32 {
        // Truncation is the point: the counter wraps like a firmware tick.
        self.origin.elapsed().as_millis() as u32
    }

    fn seconds_past_midnight(&self) -> Option<u32> {
        self.seconds_at(Utc::now())
    }

    fn resync(&self) -> bool {
        // The host OS disciplines wall time; succeed whenever it looks set.
        Utc::now().timestamp() >= MIN_VALID_EPOCH_SECS
    }
}
