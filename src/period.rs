//! Period engine: classify a moment of the day and measure how far into the
//! day/night blend it is.
//!
//! Everything here is a pure function of the scheme and either a clock
//! offset or a solar elevation. The control loop calls [`evaluate`] once per
//! tick.

use chrono::{DateTime, Local, Timelike, Utc};

use crate::geo::solar::solar_elevation;
use crate::location::Location;
use crate::scheme::{Schedule, TimeRange, TransitionScheme};

/// Discrete day phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Unknown, or adjustment disabled.
    None,
    Daytime,
    Night,
    Transition,
}

impl Period {
    pub fn name(&self) -> &'static str {
        match self {
            Period::None => "None",
            Period::Daytime => "Daytime",
            Period::Night => "Night",
            Period::Transition => "Transition",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Human readable period line, with the day share while transitioning.
pub fn describe_period(period: Period, progress: f64) -> String {
    match period {
        Period::Transition => format!("Period: {} ({:.2}% day)", period, progress * 100.0),
        _ => format!("Period: {}", period),
    }
}

// ═══ Time-based scheduling ═══

pub fn period_from_time(dawn: &TimeRange, dusk: &TimeRange, offset: i32) -> Period {
    if offset < dawn.start || offset >= dusk.end {
        Period::Night
    } else if offset >= dawn.end && offset < dusk.start {
        Period::Daytime
    } else {
        Period::Transition
    }
}

/// Blend factor for a clock offset: 0 at night, 1 by day, linear ramps in
/// between across the dawn and dusk windows.
pub fn progress_from_time(dawn: &TimeRange, dusk: &TimeRange, offset: i32) -> f64 {
    if offset < dawn.start || offset >= dusk.end {
        0.0
    } else if offset < dawn.end {
        (dawn.start - offset) as f64 / (dawn.start - dawn.end) as f64
    } else if offset > dusk.start {
        (dusk.end - offset) as f64 / (dusk.end - dusk.start) as f64
    } else {
        1.0
    }
}

// ═══ Elevation-based scheduling ═══

pub fn period_from_elevation(high: f64, low: f64, elevation: f64) -> Period {
    if elevation < low {
        Period::Night
    } else if elevation < high {
        Period::Transition
    } else {
        Period::Daytime
    }
}

/// Blend factor for a solar elevation, linear between `low` and `high`.
pub fn progress_from_elevation(high: f64, low: f64, elevation: f64) -> f64 {
    if elevation < low {
        0.0
    } else if elevation < high {
        (low - elevation) / (low - high)
    } else {
        1.0
    }
}

/// Seconds elapsed since local midnight.
pub fn seconds_since_midnight(now: DateTime<Utc>) -> i32 {
    now.with_timezone(&Local).num_seconds_from_midnight() as i32
}

/// Period and blend factor for `now`.
///
/// `location` is only consulted for elevation-based schemes. Also returns
/// the elevation that was used, for diagnostics.
pub fn evaluate(
    scheme: &TransitionScheme,
    now: DateTime<Utc>,
    location: Option<&Location>,
) -> (Period, f64, Option<f64>) {
    match scheme.schedule {
        Schedule::Time { dawn, dusk } => {
            let offset = seconds_since_midnight(now);
            (
                period_from_time(&dawn, &dusk, offset),
                progress_from_time(&dawn, &dusk, offset),
                None,
            )
        }
        Schedule::Elevation { high, low } => match location {
            Some(loc) => {
                let elevation = solar_elevation(now, loc.latitude, loc.longitude);
                (
                    period_from_elevation(high, low, elevation),
                    progress_from_elevation(high, low, elevation),
                    Some(elevation),
                )
            }
            None => (Period::None, 1.0, None),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;

    fn ranges() -> (TimeRange, TimeRange) {
        (
            TimeRange::new(TEST_DAWN.0, TEST_DAWN.1),
            TimeRange::new(TEST_DUSK.0, TEST_DUSK.1),
        )
    }

    #[test]
    fn test_period_from_time_boundaries() {
        let (dawn, dusk) = ranges();
        assert_eq!(period_from_time(&dawn, &dusk, 0), Period::Night);
        assert_eq!(period_from_time(&dawn, &dusk, dawn.start - 1), Period::Night);
        assert_eq!(period_from_time(&dawn, &dusk, dawn.start), Period::Transition);
        assert_eq!(period_from_time(&dawn, &dusk, dawn.end), Period::Daytime);
        assert_eq!(period_from_time(&dawn, &dusk, dusk.start - 1), Period::Daytime);
        assert_eq!(period_from_time(&dawn, &dusk, dusk.start), Period::Transition);
        assert_eq!(period_from_time(&dawn, &dusk, dusk.end), Period::Night);
    }

    #[test]
    fn test_progress_from_time_ramps() {
        let (dawn, dusk) = ranges();
        assert_eq!(progress_from_time(&dawn, &dusk, 3 * 3600), 0.0);
        assert_eq!(progress_from_time(&dawn, &dusk, dawn.start), 0.0);
        assert!((progress_from_time(&dawn, &dusk, dawn.start + 1800) - 0.5).abs() < 1e-9);
        assert_eq!(progress_from_time(&dawn, &dusk, 12 * 3600), 1.0);
        assert!((progress_from_time(&dawn, &dusk, dusk.start + 900) - 0.75).abs() < 1e-9);
        assert_eq!(progress_from_time(&dawn, &dusk, 23 * 3600), 0.0);
    }

    #[test]
    fn test_progress_from_time_zero_width_windows() {
        let dawn = TimeRange::new(21600, 21600);
        let dusk = TimeRange::new(64800, 64800);
        assert_eq!(period_from_time(&dawn, &dusk, 21600), Period::Daytime);
        assert_eq!(progress_from_time(&dawn, &dusk, 21600), 1.0);
        assert_eq!(progress_from_time(&dawn, &dusk, 64800), 0.0);
    }

    #[test]
    fn test_elevation_scenario() {
        let (high, low) = (TEST_ELEVATION_HIGH, TEST_ELEVATION_LOW);

        assert_eq!(period_from_elevation(high, low, -10.0), Period::Night);
        assert_eq!(progress_from_elevation(high, low, -10.0), 0.0);

        assert_eq!(period_from_elevation(high, low, 0.0), Period::Transition);
        assert!((progress_from_elevation(high, low, 0.0) - 0.6667).abs() < 1e-3);

        assert_eq!(period_from_elevation(high, low, 5.0), Period::Daytime);
        assert_eq!(progress_from_elevation(high, low, 5.0), 1.0);
    }

    #[test]
    fn test_elevation_threshold_edges() {
        assert_eq!(period_from_elevation(3.0, -6.0, -6.0), Period::Transition);
        assert_eq!(progress_from_elevation(3.0, -6.0, -6.0), 0.0);
        assert_eq!(period_from_elevation(3.0, -6.0, 3.0), Period::Daytime);
    }

    #[test]
    fn test_describe_period() {
        assert_eq!(describe_period(Period::Night, 0.0), "Period: Night");
        assert_eq!(
            describe_period(Period::Transition, 0.4213),
            "Period: Transition (42.13% day)"
        );
    }

    #[test]
    fn test_evaluate_without_location_is_none() {
        let day = crate::color::ColorSetting::neutral();
        let scheme = TransitionScheme::with_elevation(day, day, 3.0, -6.0).unwrap();
        let (period, progress, elevation) = evaluate(&scheme, Utc::now(), None);
        assert_eq!(period, Period::None);
        assert_eq!(progress, 1.0);
        assert!(elevation.is_none());
    }
}
