//! Transition scheme: what the display should look like by day, by night,
//! and how to blend between the two.
//!
//! A scheme is built once at startup from configuration and then owned by
//! the control loop. At runtime only the override fields change, and only
//! through the command parser.

use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};

use crate::color::ColorSetting;
use crate::constants::*;

/// A window of the day expressed in seconds since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: i32,
    pub end: i32,
}

impl TimeRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// Parse `HH:MM` (a zero width range) or `HH:MM-HH:MM`.
    ///
    /// # Examples
    /// ```
    /// use shiftr::scheme::TimeRange;
    /// let dawn = TimeRange::parse("06:00-07:45").unwrap();
    /// assert_eq!(dawn.start, 6 * 3600);
    /// assert_eq!(dawn.end, 7 * 3600 + 45 * 60);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let (start, end) = match text.split_once('-') {
            Some((start, end)) => (start.trim(), end.trim()),
            None => (text.trim(), text.trim()),
        };
        let start = parse_clock_time(start)
            .with_context(|| format!("Invalid time range '{}'", text))?;
        let end = parse_clock_time(end)
            .with_context(|| format!("Invalid time range '{}'", text))?;
        if start > end {
            anyhow::bail!("Time range '{}' ends before it starts", text);
        }
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 3600,
            (self.start / 60) % 60,
            self.end / 3600,
            (self.end / 60) % 60
        )
    }
}

fn parse_clock_time(text: &str) -> Result<i32> {
    let time = NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .context("Use HH:MM format")?;
    Ok(time.num_seconds_from_midnight() as i32)
}

/// How the current period is decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Schedule {
    /// Solar elevation thresholds in degrees, `high >= low`.
    Elevation { high: f64, low: f64 },
    /// Fixed clock windows, `dawn.start <= dawn.end <= dusk.start <= dusk.end`.
    Time { dawn: TimeRange, dusk: TimeRange },
}

/// Day/night settings plus the runtime overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionScheme {
    pub schedule: Schedule,
    pub day: ColorSetting,
    pub night: ColorSetting,
    /// Values set by `temp`/`brightness` commands.
    pub override_setting: ColorSetting,
    /// Which fields of `override_setting` are live (USE_OVERRIDE_* bits).
    pub use_override: u8,
}

impl TransitionScheme {
    /// Elevation-based scheme; thresholds are validated.
    pub fn with_elevation(day: ColorSetting, night: ColorSetting, high: f64, low: f64) -> Result<Self> {
        if high < low {
            anyhow::bail!(
                "High transition elevation ({}) cannot be lower than the low transition elevation ({})",
                high,
                low
            );
        }
        Ok(Self::build(Schedule::Elevation { high, low }, day, night))
    }

    /// Time-based scheme; the four boundaries must be in order.
    pub fn with_times(day: ColorSetting, night: ColorSetting, dawn: TimeRange, dusk: TimeRange) -> Result<Self> {
        if dawn.start > dawn.end || dawn.end > dusk.start || dusk.start > dusk.end {
            anyhow::bail!(
                "Invalid dawn/dusk time configuration: dawn {} must end before dusk {} starts",
                dawn,
                dusk
            );
        }
        Ok(Self::build(Schedule::Time { dawn, dusk }, day, night))
    }

    fn build(schedule: Schedule, day: ColorSetting, night: ColorSetting) -> Self {
        Self {
            schedule,
            day: day.clamped(),
            night: night.clamped(),
            override_setting: ColorSetting::neutral(),
            use_override: 0,
        }
    }

    pub fn use_time(&self) -> bool {
        matches!(self.schedule, Schedule::Time { .. })
    }

    pub fn has_override(&self, flag: u8) -> bool {
        self.use_override & flag != 0
    }

    pub fn set_override_temperature(&mut self, temperature: i32) {
        self.override_setting.temperature = temperature;
        self.use_override |= USE_OVERRIDE_TEMP;
    }

    pub fn set_override_brightness(&mut self, brightness: f32) {
        self.override_setting.brightness = brightness;
        self.use_override |= USE_OVERRIDE_BRIGHTNESS;
    }

    pub fn clear_override(&mut self, flag: u8) {
        self.use_override &= !flag;
    }

    /// Target setting for the given blend factor (0 = night, 1 = day),
    /// with active overrides applied on top.
    pub fn interpolate(&self, progress: f64) -> ColorSetting {
        let mut target = self.night.interpolate(&self.day, progress);
        if self.has_override(USE_OVERRIDE_TEMP) {
            target.temperature = self.override_setting.temperature;
        }
        if self.has_override(USE_OVERRIDE_BRIGHTNESS) {
            target.brightness = self.override_setting.brightness;
        }
        target.clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::test_constants::*;

    fn day_night() -> (ColorSetting, ColorSetting) {
        (
            ColorSetting::new(TEST_DAY_TEMP, [1.0; 3], 1.0),
            ColorSetting::new(TEST_NIGHT_TEMP, [1.0; 3], 0.7),
        )
    }

    #[test]
    fn test_time_range_parse_forms() {
        assert_eq!(TimeRange::parse("06:00").unwrap(), TimeRange::new(21600, 21600));
        assert_eq!(TimeRange::parse("18:35 - 20:15").unwrap(), TimeRange::new(66900, 72900));
        assert_eq!(TimeRange::parse("05:30:30-06:00").unwrap(), TimeRange::new(19830, 21600));
    }

    #[test]
    fn test_time_range_parse_rejects_garbage() {
        assert!(TimeRange::parse("sixish").is_err());
        assert!(TimeRange::parse("25:00").is_err());
        assert!(TimeRange::parse("08:00-07:00").is_err());
    }

    #[test]
    fn test_time_range_display() {
        assert_eq!(TimeRange::new(21600, 27900).to_string(), "06:00-07:45");
    }

    #[test]
    fn test_elevation_thresholds_validated() {
        let (day, night) = day_night();
        assert!(TransitionScheme::with_elevation(day, night, TEST_ELEVATION_HIGH, TEST_ELEVATION_LOW).is_ok());
        assert!(TransitionScheme::with_elevation(day, night, -10.0, 3.0).is_err());
        assert!(TransitionScheme::with_elevation(day, night, 2.0, 2.0).is_ok());
    }

    #[test]
    fn test_time_ranges_validated() {
        let (day, night) = day_night();
        let dawn = TimeRange::new(TEST_DAWN.0, TEST_DAWN.1);
        let dusk = TimeRange::new(TEST_DUSK.0, TEST_DUSK.1);
        assert!(TransitionScheme::with_times(day, night, dawn, dusk).is_ok());
        assert!(TransitionScheme::with_times(day, night, dusk, dawn).is_err());
    }

    #[test]
    fn test_interpolate_without_overrides() {
        let (day, night) = day_night();
        let scheme = TransitionScheme::with_elevation(day, night, 3.0, -6.0).unwrap();
        assert_eq!(scheme.interpolate(0.0), night);
        assert_eq!(scheme.interpolate(1.0), day);
        assert_eq!(scheme.interpolate(0.5).temperature, 5000);
    }

    #[test]
    fn test_overrides_replace_fields() {
        let (day, night) = day_night();
        let mut scheme = TransitionScheme::with_elevation(day, night, 3.0, -6.0).unwrap();

        scheme.set_override_temperature(2000);
        let target = scheme.interpolate(1.0);
        assert_eq!(target.temperature, 2000);
        assert_eq!(target.brightness, 1.0);

        scheme.set_override_brightness(0.4);
        assert_eq!(scheme.interpolate(1.0).brightness, 0.4);

        scheme.clear_override(USE_OVERRIDE_TEMP);
        let target = scheme.interpolate(1.0);
        assert_eq!(target.temperature, TEST_DAY_TEMP);
        assert_eq!(target.brightness, 0.4);
        assert!(!scheme.has_override(USE_OVERRIDE_TEMP));
        assert!(scheme.has_override(USE_OVERRIDE_BRIGHTNESS));
    }
}
