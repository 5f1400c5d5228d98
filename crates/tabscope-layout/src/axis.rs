#![forbid(unsafe_code)]

//! Time ↔ pixel projection and the padded display axis.
//!
//! The projection is linear about an origin instant. Zooming changes only the
//! pixels-per-second factor, so any instant held as a time (rather than as a
//! pixel) keeps its meaning across zoom levels.

use serde::Serialize;
use tabscope_core::config::{DEFAULT_PIXELS_PER_SECOND, clamp_pixels_per_second};
use tabscope_core::event::Timestamp;

/// Target number of tick intervals across the axis.
const TARGET_TICK_INTERVALS: u64 = 8;

/// Linear projection between time and horizontal pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeScale {
    origin: Timestamp,
    pixels_per_second: f64,
}

impl TimeScale {
    /// Scale anchored at `origin`; `pixels_per_second` is clamped to the
    /// supported zoom range.
    #[must_use]
    pub fn new(origin: Timestamp, pixels_per_second: f64) -> Self {
        Self {
            origin,
            pixels_per_second: clamp_pixels_per_second(pixels_per_second),
        }
    }

    /// Same origin, different zoom.
    #[must_use]
    pub fn with_pixels_per_second(self, pixels_per_second: f64) -> Self {
        Self::new(self.origin, pixels_per_second)
    }

    #[must_use]
    pub const fn origin(&self) -> Timestamp {
        self.origin
    }

    #[must_use]
    pub const fn pixels_per_second(&self) -> f64 {
        self.pixels_per_second
    }

    /// Horizontal offset of `t` from the origin.
    #[must_use]
    pub fn time_to_x(&self, t: Timestamp) -> f64 {
        let delta_ms = t.as_millis() as f64 - self.origin.as_millis() as f64;
        delta_ms / 1000.0 * self.pixels_per_second
    }

    /// Instant under pixel `x`, rounded to the nearest millisecond.
    /// Non-finite input maps to the origin.
    #[must_use]
    pub fn x_to_time(&self, x: f64) -> Timestamp {
        if !x.is_finite() {
            return self.origin;
        }
        let delta_ms = (x * 1000.0 / self.pixels_per_second).round();
        // Float-to-int `as` saturates, so extreme pixels pin to the i64 range.
        self.origin.saturating_add_millis(delta_ms as i64)
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self::new(Timestamp::EPOCH, DEFAULT_PIXELS_PER_SECOND)
    }
}

/// Labelled axis tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tick {
    pub time: Timestamp,
    pub label: String,
}

/// Continuous display range with epoch-aligned ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeAxis {
    start: Timestamp,
    end: Timestamp,
    interval_ms: u64,
    ticks: Vec<Tick>,
}

impl TimeAxis {
    /// Axis covering `[min − padding, max + padding]`.
    ///
    /// The tick interval is a whole number of seconds, `max(1, ⌈span / 8⌉)`,
    /// and ticks sit on multiples of it measured from the epoch.
    #[must_use]
    pub fn new(min: Timestamp, max: Timestamp, padding_ms: u64) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let padding = i64::try_from(padding_ms).unwrap_or(i64::MAX);
        let start = min.saturating_add_millis(padding.saturating_neg());
        let end = max.saturating_add_millis(padding);
        let span_secs = start.abs_diff(end).div_ceil(1000);
        let interval_ms = span_secs.div_ceil(TARGET_TICK_INTERVALS).max(1) * 1000;
        Self {
            start,
            end,
            interval_ms,
            ticks: ticks_between(start, end, interval_ms),
        }
    }

    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Timestamp {
        self.end
    }

    #[must_use]
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    #[must_use]
    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    /// Duration covered, in milliseconds.
    #[must_use]
    pub fn span_ms(&self) -> u64 {
        self.start.abs_diff(self.end)
    }

    /// Projection anchored at the axis start.
    #[must_use]
    pub fn scale(&self, pixels_per_second: f64) -> TimeScale {
        TimeScale::new(self.start, pixels_per_second)
    }

    /// Pixel width of the whole axis under `scale`.
    #[must_use]
    pub fn width(&self, scale: &TimeScale) -> f64 {
        scale.time_to_x(self.end) - scale.time_to_x(self.start)
    }
}

fn ticks_between(start: Timestamp, end: Timestamp, interval_ms: u64) -> Vec<Tick> {
    let Ok(step) = i64::try_from(interval_ms) else {
        return Vec::new();
    };
    let first = start.as_millis().div_euclid(step);
    let first = if first.saturating_mul(step) < start.as_millis() {
        first.saturating_add(1)
    } else {
        first
    };
    let mut ticks = Vec::new();
    let mut k = first;
    loop {
        let at = k.saturating_mul(step);
        if at > end.as_millis() || (k != first && at == i64::MAX) {
            break;
        }
        let time = Timestamp::from_millis(at);
        ticks.push(Tick {
            time,
            label: time.format_hms(),
        });
        k = k.saturating_add(1);
    }
    ticks
}
