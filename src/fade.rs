//! Fade state machine.
//!
//! Large changes to the applied color setting are spread over
//! [`FADE_LENGTH`] short ticks along an eased curve instead of being applied
//! in one jump. Small changes (see [`ColorSetting::diff_is_major`]) are
//! applied directly.

use crate::color::ColorSetting;
use crate::constants::*;

/// Easing curve for fades: starts slow, accelerates, then settles.
///
/// `ease_fade(0) == 0`, `ease_fade(1) == 1`, non-decreasing in between.
/// Inputs outside [0, 1] saturate.
pub fn ease_fade(t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    EASE_SCALE * (EASE_OUTER * (EASE_INNER * t).exp()).exp()
}

/// Progress of the current fade. `length == 0` means idle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeState {
    pub start: ColorSetting,
    pub elapsed: u32,
    pub length: u32,
}

impl Default for FadeState {
    fn default() -> Self {
        Self {
            start: ColorSetting::neutral(),
            elapsed: 0,
            length: 0,
        }
    }
}

impl FadeState {
    pub fn is_active(&self) -> bool {
        self.length != 0
    }
}

/// Tracks the applied setting across ticks and drives fades.
#[derive(Debug, Clone)]
pub struct Fader {
    use_fade: bool,
    state: FadeState,
    applied: ColorSetting,
    prev_target: ColorSetting,
}

impl Fader {
    /// Start idle with the neutral setting considered applied.
    pub fn new(use_fade: bool) -> Self {
        Self {
            use_fade,
            state: FadeState::default(),
            applied: ColorSetting::neutral(),
            prev_target: ColorSetting::neutral(),
        }
    }

    pub fn is_fading(&self) -> bool {
        self.state.is_active()
    }

    pub fn state(&self) -> &FadeState {
        &self.state
    }

    /// The setting produced by the last [`Fader::step`].
    pub fn applied(&self) -> &ColorSetting {
        &self.applied
    }

    /// Advance one tick towards `target` and return the setting to apply.
    ///
    /// A fade starts when idle and `target` differs majorly from what is
    /// applied, or when already fading and `target` moved majorly since the
    /// previous tick; in both cases the fade restarts from the currently
    /// applied setting. The second value reports whether a fade started.
    pub fn step(&mut self, target: &ColorSetting) -> (ColorSetting, bool) {
        let mut started = false;
        if self.use_fade {
            let idle_jump = !self.state.is_active() && self.applied.diff_is_major(target);
            let moving_target = self.state.is_active() && target.diff_is_major(&self.prev_target);
            if idle_jump || moving_target {
                self.state = FadeState {
                    start: self.applied,
                    elapsed: 0,
                    length: FADE_LENGTH,
                };
                started = true;
            }
        }

        if self.state.is_active() {
            self.state.elapsed += 1;
            let fraction = self.state.elapsed as f64 / self.state.length as f64;
            self.applied = self.state.start.interpolate(target, ease_fade(fraction));

            if self.state.elapsed > self.state.length {
                self.state.elapsed = 0;
                self.state.length = 0;
                self.applied = *target;
            }
        } else {
            self.applied = *target;
        }

        (self.applied, started)
    }

    /// Remember `target` as the previous tick's target.
    pub fn commit_target(&mut self, target: &ColorSetting) {
        self.prev_target = *target;
    }
}
