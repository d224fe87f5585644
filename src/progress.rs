//! Conversion of raw engine time reports into display-ready progress.

use std::fmt;

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;
pub const NANOS_PER_MILLISECOND: u64 = 1_000_000;
/// Full-scale value of the position slider and of engine jump requests.
pub const PERMILLE_SCALE: u32 = 1000;

/// Formatted playback position for one time-changed report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    pub elapsed_minutes: u64,
    pub elapsed_seconds: u64,
    pub total_minutes: u32,
    pub total_seconds: u32,
    /// Position within the track, in [0, 1].
    pub position_fraction: f64,
    elapsed_nanos: u64,
    total_seconds_raw: u32,
}

/// Formats an engine time report. A zero-length track reports position 0.
pub fn format(elapsed_nanos: u64, total_seconds: u32) -> Progress {
    let elapsed_total_seconds = elapsed_nanos / NANOS_PER_SECOND;
    let position_fraction = if total_seconds == 0 {
        0.0
    } else {
        let total_nanos = u64::from(total_seconds) * NANOS_PER_SECOND;
        (elapsed_nanos as f64 / total_nanos as f64).clamp(0.0, 1.0)
    };

    Progress {
        elapsed_minutes: elapsed_total_seconds / 60,
        elapsed_seconds: elapsed_total_seconds % 60,
        total_minutes: total_seconds / 60,
        total_seconds: total_seconds % 60,
        position_fraction,
        elapsed_nanos,
        total_seconds_raw: total_seconds,
    }
}

impl Progress {
    /// Slider position in permille, computed in integer milliseconds.
    pub fn position_permille(&self) -> u32 {
        if self.total_seconds_raw == 0 {
            return 0;
        }
        let permille =
            self.elapsed_nanos / NANOS_PER_MILLISECOND / u64::from(self.total_seconds_raw);
        permille.min(u64::from(PERMILLE_SCALE)) as u32
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02} / {:02}:{:02}",
            self.elapsed_minutes, self.elapsed_seconds, self.total_minutes, self.total_seconds
        )
    }
}

/// Converts a scrub fraction into the engine's permille jump unit.
pub fn fraction_to_permille(position_fraction: f64) -> u32 {
    if position_fraction.is_nan() {
        return 0;
    }
    (position_fraction.clamp(0.0, 1.0) * f64::from(PERMILLE_SCALE)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_total_reports_zero_position() {
        let progress = format(0, 0);
        assert_eq!(progress.position_fraction, 0.0);
        assert_eq!(progress.position_permille(), 0);

        let progress = format(5 * NANOS_PER_SECOND, 0);
        assert_eq!(progress.position_fraction, 0.0);
        assert_eq!(progress.elapsed_seconds, 5);
    }

    #[test]
    fn test_halfway_through_three_minute_track() {
        let progress = format(90_000_000_000, 180);
        assert_eq!((progress.elapsed_minutes, progress.elapsed_seconds), (1, 30));
        assert_eq!((progress.total_minutes, progress.total_seconds), (3, 0));
        assert_eq!(progress.position_fraction, 0.5);
        assert_eq!(progress.position_permille(), 500);
        assert_eq!(progress.to_string(), "01:30 / 03:00");
    }

    #[test]
    fn test_fields_truncate_partial_seconds() {
        let progress = format(61 * NANOS_PER_SECOND + 999_999_999, 3599);
        assert_eq!((progress.elapsed_minutes, progress.elapsed_seconds), (1, 1));
        assert_eq!((progress.total_minutes, progress.total_seconds), (59, 59));
    }

    #[test]
    fn test_overrun_is_clamped() {
        let progress = format(200 * NANOS_PER_SECOND, 100);
        assert_eq!(progress.position_fraction, 1.0);
        assert_eq!(progress.position_permille(), 1000);
    }

    #[test]
    fn test_fraction_to_permille_clamps() {
        assert_eq!(fraction_to_permille(0.25), 250);
        assert_eq!(fraction_to_permille(-1.0), 0);
        assert_eq!(fraction_to_permille(3.0), 1000);
        assert_eq!(fraction_to_permille(f64::NAN), 0);
    }
}
