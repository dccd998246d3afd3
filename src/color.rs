//! Color setting value type.
//!
//! A [`ColorSetting`] is what ends up on the display: a white point
//! temperature, per-channel gamma and a brightness multiplier. All fields are
//! kept inside their bounds after every operation in this module.

use crate::constants::*;
use crate::utils::{interpolate_f32, interpolate_i32};

/// Display color setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSetting {
    /// White point in Kelvin, within [MIN_TEMP, MAX_TEMP].
    pub temperature: i32,
    /// Gamma per channel (red, green, blue), within [MIN_GAMMA, MAX_GAMMA].
    pub gamma: [f32; 3],
    /// Brightness multiplier, within [MIN_BRIGHTNESS, MAX_BRIGHTNESS].
    pub brightness: f32,
}

impl Default for ColorSetting {
    fn default() -> Self {
        Self::neutral()
    }
}

impl ColorSetting {
    /// The setting that leaves the display unchanged.
    pub const fn neutral() -> Self {
        Self {
            temperature: NEUTRAL_TEMP,
            gamma: [1.0; 3],
            brightness: 1.0,
        }
    }

    pub fn new(temperature: i32, gamma: [f32; 3], brightness: f32) -> Self {
        Self {
            temperature,
            gamma,
            brightness,
        }
        .clamped()
    }

    /// Reset to the neutral setting in place.
    pub fn reset(&mut self) {
        *self = Self::neutral();
    }

    /// Copy of this setting with every field forced into bounds.
    pub fn clamped(self) -> Self {
        Self {
            temperature: clamp_temperature(self.temperature as i64),
            gamma: self.gamma.map(clamp_gamma),
            brightness: clamp_brightness(self.brightness),
        }
    }

    /// Blend from `self` towards `other`.
    ///
    /// `alpha` is clamped to [0, 1] first, so callers may pass raw fractions.
    /// `alpha == 0` yields `self` and `alpha == 1` yields `other` exactly.
    pub fn interpolate(&self, other: &ColorSetting, alpha: f64) -> ColorSetting {
        let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        ColorSetting {
            temperature: interpolate_i32(self.temperature, other.temperature, alpha),
            gamma: [0, 1, 2].map(|i| interpolate_f32(self.gamma[i], other.gamma[i], alpha)),
            brightness: interpolate_f32(self.brightness, other.brightness, alpha),
        }
        .clamped()
    }

    /// True if the change from `self` to `other` is large enough to fade.
    pub fn diff_is_major(&self, other: &ColorSetting) -> bool {
        (self.temperature - other.temperature).abs() > MAJOR_TEMP_DIFF
            || (self.brightness - other.brightness).abs() > MAJOR_BRIGHTNESS_DIFF
            || self
                .gamma
                .iter()
                .zip(other.gamma.iter())
                .any(|(a, b)| (a - b).abs() > MAJOR_GAMMA_DIFF)
    }

    /// True if any field differs at all.
    pub fn diff(&self, other: &ColorSetting) -> bool {
        self != other
    }
}

/// Clamp a (possibly out of range) temperature into [MIN_TEMP, MAX_TEMP].
pub fn clamp_temperature(temperature: i64) -> i32 {
    temperature.clamp(MIN_TEMP as i64, MAX_TEMP as i64) as i32
}

/// Clamp a brightness value; NaN maps to the maximum.
pub fn clamp_brightness(brightness: f32) -> f32 {
    if brightness.is_nan() {
        return MAX_BRIGHTNESS;
    }
    brightness.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
}

/// Clamp a gamma value; NaN maps to 1.0.
pub fn clamp_gamma(gamma: f32) -> f32 {
    if gamma.is_nan() {
        return 1.0;
    }
    gamma.clamp(MIN_GAMMA, MAX_GAMMA)
}
