#![forbid(unsafe_code)]

//! Engine configuration with documented defaults and clamped ranges.
//!
//! Out-of-range values never fail: each accessor clamps to the nearest valid
//! bound, so no configuration can yield a zero-width window, a NaN position,
//! or an empty tolerance band. [`EngineConfig::sanitized`] additionally
//! reports every adjustment it made.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default window size in seconds.
pub const DEFAULT_WINDOW_SIZE_SECS: f64 = 5.0;
/// Smallest window the partitioner accepts, in milliseconds.
pub const MIN_WINDOW_SIZE_MS: u64 = 1;
/// Largest window the partitioner accepts, in milliseconds (one day).
pub const MAX_WINDOW_SIZE_MS: u64 = 86_400_000;

/// Default overlap threshold for lane stacking.
pub const DEFAULT_OVERLAP_THRESHOLD_MS: i64 = 2_000;
/// Upper bound for the overlap threshold.
pub const MAX_OVERLAP_THRESHOLD_MS: u64 = 600_000;

/// Default cursor tolerance.
pub const DEFAULT_TOLERANCE_MS: i64 = 500;
/// Tolerance bounds, inclusive.
pub const MIN_TOLERANCE_MS: u64 = 1;
pub const MAX_TOLERANCE_MS: u64 = 10_000;

/// Default zoom level.
pub const DEFAULT_PIXELS_PER_SECOND: f64 = 40.0;
/// Zoom bounds, inclusive.
pub const MIN_PIXELS_PER_SECOND: f64 = 10.0;
pub const MAX_PIXELS_PER_SECOND: f64 = 1000.0;

/// Default padding either side of the display axis.
pub const DEFAULT_AXIS_PADDING_MS: i64 = 10_000;
/// Upper bound for axis padding (one hour).
pub const MAX_AXIS_PADDING_MS: u64 = 3_600_000;

/// Fixed-duration, strictly positive window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct WindowSize(u64);

impl WindowSize {
    /// Build from seconds, clamping into `[1 ms, 1 day]`. Non-finite input
    /// falls back to the default.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() {
            return Self::default();
        }
        let ms = (secs * 1000.0).round();
        if ms <= MIN_WINDOW_SIZE_MS as f64 {
            Self(MIN_WINDOW_SIZE_MS)
        } else if ms >= MAX_WINDOW_SIZE_MS as f64 {
            Self(MAX_WINDOW_SIZE_MS)
        } else {
            Self(ms as u64)
        }
    }

    /// Build from milliseconds, clamping into `[1 ms, 1 day]`.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        if ms < MIN_WINDOW_SIZE_MS {
            Self(MIN_WINDOW_SIZE_MS)
        } else if ms > MAX_WINDOW_SIZE_MS {
            Self(MAX_WINDOW_SIZE_MS)
        } else {
            Self(ms)
        }
    }

    /// Length in milliseconds (always > 0).
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Length as signed milliseconds, for timestamp arithmetic.
    #[must_use]
    pub const fn as_millis_i64(self) -> i64 {
        // Bounded by MAX_WINDOW_SIZE_MS, so the cast is lossless.
        self.0 as i64
    }

    /// Length in seconds.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self(5_000)
    }
}

impl From<u64> for WindowSize {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<WindowSize> for u64 {
    fn from(size: WindowSize) -> Self {
        size.0
    }
}

impl fmt::Display for WindowSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 1000 == 0 {
            write!(f, "{} seconds", self.0 / 1000)
        } else {
            write!(f, "{} seconds", self.as_secs_f64())
        }
    }
}

/// One clamp applied by [`EngineConfig::sanitized`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigAdjustment {
    pub field: &'static str,
    pub requested: f64,
    pub applied: f64,
}

impl fmt::Display for ConfigAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} out of range: requested {}, using {}",
            self.field, self.requested, self.applied
        )
    }
}

/// Configuration consumed by the partitioner, layout, resolver, and
/// interaction machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window length in seconds. Default: 5.
    pub window_size_secs: f64,
    /// Lane events closer than this are stacked. Default: 2000 ms.
    pub overlap_threshold_ms: i64,
    /// Cursor snap tolerance. Default: 500 ms, range [1, 10000].
    pub tolerance_ms: i64,
    /// Zoom level for the presentation layer. Default: 40, range [10, 1000].
    pub pixels_per_second: f64,
    /// Padding either side of the display axis. Default: 10 s.
    pub axis_padding_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size_secs: DEFAULT_WINDOW_SIZE_SECS,
            overlap_threshold_ms: DEFAULT_OVERLAP_THRESHOLD_MS,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            pixels_per_second: DEFAULT_PIXELS_PER_SECOND,
            axis_padding_ms: DEFAULT_AXIS_PADDING_MS,
        }
    }
}

impl EngineConfig {
    /// Effective window size.
    #[must_use]
    pub fn window_size(&self) -> WindowSize {
        WindowSize::from_secs_f64(self.window_size_secs)
    }

    /// Effective overlap threshold in milliseconds.
    #[must_use]
    pub fn overlap_threshold(&self) -> u64 {
        clamp_ms(self.overlap_threshold_ms, 0, MAX_OVERLAP_THRESHOLD_MS)
    }

    /// Effective cursor tolerance in milliseconds.
    #[must_use]
    pub fn tolerance(&self) -> u64 {
        clamp_tolerance(self.tolerance_ms)
    }

    /// Effective zoom level in pixels per second.
    #[must_use]
    pub fn scale(&self) -> f64 {
        clamp_pixels_per_second(self.pixels_per_second)
    }

    /// Effective axis padding in milliseconds.
    #[must_use]
    pub fn axis_padding(&self) -> u64 {
        clamp_ms(self.axis_padding_ms, 0, MAX_AXIS_PADDING_MS)
    }

    /// Every field whose effective value differs from the requested one.
    #[must_use]
    pub fn adjustments(&self) -> Vec<ConfigAdjustment> {
        let candidates = [
            (
                "window_size_secs",
                self.window_size_secs,
                self.window_size().as_secs_f64(),
            ),
            (
                "overlap_threshold_ms",
                self.overlap_threshold_ms as f64,
                self.overlap_threshold() as f64,
            ),
            (
                "tolerance_ms",
                self.tolerance_ms as f64,
                self.tolerance() as f64,
            ),
            ("pixels_per_second", self.pixels_per_second, self.scale()),
            (
                "axis_padding_ms",
                self.axis_padding_ms as f64,
                self.axis_padding() as f64,
            ),
        ];
        candidates
            .into_iter()
            .filter(|(_, requested, applied)| requested != applied)
            .map(|(field, requested, applied)| ConfigAdjustment {
                field,
                requested,
                applied,
            })
            .collect()
    }

    /// Copy with every field clamped into its valid range.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        for adjustment in self.adjustments() {
            crate::warn!(
                field = adjustment.field,
                requested = adjustment.requested,
                applied = adjustment.applied,
                "config value clamped"
            );
        }
        Self {
            window_size_secs: self.window_size().as_secs_f64(),
            overlap_threshold_ms: self.overlap_threshold() as i64,
            tolerance_ms: self.tolerance() as i64,
            pixels_per_second: self.scale(),
            axis_padding_ms: self.axis_padding() as i64,
        }
    }
}

/// Clamp a signed millisecond value into `[min, max]`.
fn clamp_ms(value: i64, min: u64, max: u64) -> u64 {
    if value < 0 {
        min
    } else {
        (value as u64).clamp(min, max)
    }
}

/// Clamp a tolerance into `[1, 10000]` ms.
#[must_use]
pub fn clamp_tolerance(ms: i64) -> u64 {
    clamp_ms(ms, MIN_TOLERANCE_MS, MAX_TOLERANCE_MS)
}

/// Clamp a zoom level into `[10, 1000]` px/s. NaN reads as the default.
#[must_use]
pub fn clamp_pixels_per_second(pps: f64) -> f64 {
    if pps.is_nan() {
        DEFAULT_PIXELS_PER_SECOND
    } else {
        pps.clamp(MIN_PIXELS_PER_SECOND, MAX_PIXELS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.window_size().as_millis(), 5_000);
        assert_eq!(config.overlap_threshold(), 2_000);
        assert_eq!(config.tolerance(), 500);
        assert_eq!(config.scale(), 40.0);
        assert_eq!(config.axis_padding(), 10_000);
        assert!(config.adjustments().is_empty());
    }

    #[test]
    fn non_positive_window_clamps_to_minimum() {
        assert_eq!(WindowSize::from_secs_f64(0.0).as_millis(), MIN_WINDOW_SIZE_MS);
        assert_eq!(WindowSize::from_secs_f64(-3.0).as_millis(), MIN_WINDOW_SIZE_MS);
        assert_eq!(WindowSize::from_millis(0).as_millis(), MIN_WINDOW_SIZE_MS);
    }

    #[test]
    fn non_finite_window_uses_default() {
        assert_eq!(WindowSize::from_secs_f64(f64::NAN), WindowSize::default());
        assert_eq!(WindowSize::from_secs_f64(f64::INFINITY), WindowSize::default());
    }

    #[test]
    fn huge_window_clamps_to_one_day() {
        assert_eq!(
            WindowSize::from_secs_f64(1e12).as_millis(),
            MAX_WINDOW_SIZE_MS
        );
    }

    #[test]
    fn fractional_window_rounds_to_millis() {
        assert_eq!(WindowSize::from_secs_f64(0.25).as_millis(), 250);
        assert_eq!(WindowSize::from_secs_f64(0.25).to_string(), "0.25 seconds");
        assert_eq!(WindowSize::default().to_string(), "5 seconds");
    }

    #[test]
    fn tolerance_clamps_both_ends() {
        assert_eq!(clamp_tolerance(0), 1);
        assert_eq!(clamp_tolerance(-50), 1);
        assert_eq!(clamp_tolerance(250), 250);
        assert_eq!(clamp_tolerance(50_000), 10_000);
    }

    #[test]
    fn zoom_clamps_and_rejects_nan() {
        assert_eq!(clamp_pixels_per_second(1.0), 10.0);
        assert_eq!(clamp_pixels_per_second(5000.0), 1000.0);
        assert_eq!(clamp_pixels_per_second(f64::NAN), 40.0);
        assert_eq!(clamp_pixels_per_second(f64::NEG_INFINITY), 10.0);
    }

    #[test]
    fn sanitized_reports_and_applies_adjustments() {
        let config = EngineConfig {
            window_size_secs: -1.0,
            overlap_threshold_ms: -10,
            tolerance_ms: 0,
            pixels_per_second: 2.0,
            axis_padding_ms: 10_000,
        };
        let fields: Vec<_> = config.adjustments().iter().map(|a| a.field).collect();
        assert_eq!(
            fields,
            vec![
                "window_size_secs",
                "overlap_threshold_ms",
                "tolerance_ms",
                "pixels_per_second"
            ]
        );

        let clean = config.sanitized();
        assert_eq!(clean.window_size_secs, 0.001);
        assert_eq!(clean.overlap_threshold_ms, 0);
        assert_eq!(clean.tolerance_ms, 1);
        assert_eq!(clean.pixels_per_second, 10.0);
        assert!(clean.adjustments().is_empty());
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"tolerance_ms": 250}"#).expect("json");
        assert_eq!(config.tolerance(), 250);
        assert_eq!(config.window_size(), WindowSize::default());
    }

    #[test]
    fn window_size_deserializes_clamped() {
        let size: WindowSize = serde_json::from_str("0").expect("json");
        assert_eq!(size.as_millis(), MIN_WINDOW_SIZE_MS);
        assert_eq!(serde_json::to_string(&WindowSize::default()).expect("json"), "5000");
    }

    #[test]
    fn adjustment_display() {
        let adj = ConfigAdjustment {
            field: "tolerance_ms",
            requested: 0.0,
            applied: 1.0,
        };
        assert_eq!(
            adj.to_string(),
            "tolerance_ms out of range: requested 0, using 1"
        );
    }
}
