//! Application constants and default values for shiftr.
//!
//! Color bounds, scheduling defaults, control protocol sizing and loop timing
//! all live here so the engine, the parser and the configuration loader agree
//! on the same limits.

// ═══ Color Setting Bounds ═══
// Every ColorSetting field is clamped into these ranges after any mutation

pub const MIN_TEMP: i32 = 1000; // Kelvin, candlelight
pub const MAX_TEMP: i32 = 25000; // Kelvin, clear blue sky
pub const NEUTRAL_TEMP: i32 = 6500; // Kelvin, no color shift at all
pub const MIN_BRIGHTNESS: f32 = 0.1;
pub const MAX_BRIGHTNESS: f32 = 1.0;
pub const MIN_GAMMA: f32 = 0.1;
pub const MAX_GAMMA: f32 = 10.0;

// Location validity
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

// ═══ Transition Scheme Defaults ═══
// Used when neither the config file nor the command line sets a value

pub const DEFAULT_DAY_TEMP: i32 = 6500;
pub const DEFAULT_NIGHT_TEMP: i32 = 4500;
pub const DEFAULT_BRIGHTNESS: f32 = 1.0;
pub const DEFAULT_GAMMA: f32 = 1.0;
pub const DEFAULT_ELEVATION_HIGH: f64 = 3.0; // degrees, full day above this
pub const DEFAULT_ELEVATION_LOW: f64 = -6.0; // degrees, civil twilight; full night below
pub const DEFAULT_FADE: bool = true;
pub const DEFAULT_PRESERVE_GAMMA: bool = true;
pub const DEFAULT_STDIN_COMMANDS: bool = true;
pub const DEFAULT_MAX_CONNECTIONS: usize = 8;

// ═══ Major Difference Thresholds ═══
// A change larger than any of these is faded in instead of applied at once

pub const MAJOR_TEMP_DIFF: i32 = 25; // Kelvin
pub const MAJOR_BRIGHTNESS_DIFF: f32 = 0.1;
pub const MAJOR_GAMMA_DIFF: f32 = 0.1;

// ═══ Fade and Loop Timing ═══

pub const FADE_LENGTH: u32 = 40; // ticks of SLEEP_DURATION_SHORT (~4 seconds)
pub const SLEEP_DURATION_MS: u64 = 5000; // idle tick
pub const SLEEP_DURATION_SHORT_MS: u64 = 100; // tick while fading
pub const CHECK_INTERVAL_MS: u64 = 1000; // longest single poll() before control flags are rechecked

// Easing curve coefficients (saturating double exponential)
pub const EASE_SCALE: f64 = 1.0042954579734844;
pub const EASE_OUTER: f64 = -6.4041738958415664;
pub const EASE_INNER: f64 = -7.2908241330981340;

// ═══ Control Protocol ═══

pub const COMMAND_BUFFER_SIZE: usize = 256; // longest accepted command line, newline included
pub const BRIGHTNESS_ADJUST: f32 = 0.1; // step for "brightness up/down"
pub const TEMP_ADJUST: i32 = 500; // step for "temp up/down"
pub const RESERVED_POLL_SLOTS: usize = 3; // location wake fd, stdin, listener

// Override bitmask
pub const USE_OVERRIDE_TEMP: u8 = 0b01;
pub const USE_OVERRIDE_BRIGHTNESS: u8 = 0b10;

// ═══ hyprsunset Backend ═══

pub const SOCKET_TIMEOUT_MS: u64 = 1000; // read/write timeout on the hyprsunset socket
pub const SOCKET_BUFFER_SIZE: usize = 1024;
pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY_MS: u64 = 100;
pub const RETRY_BUDGET_MS: u64 = 300; // total back-off per command, spent inside the control loop

// ═══ Exit Codes ═══

pub const EXIT_FAILURE: i32 = 1; // General failure

// ═══ Test Constants ═══
// Common values used in tests for consistency
#[cfg(test)]
pub mod test_constants {
    use super::*;

    pub const TEST_DAY_TEMP: i32 = DEFAULT_DAY_TEMP; // 6500K
    pub const TEST_NIGHT_TEMP: i32 = 3500;
    pub const TEST_ELEVATION_HIGH: f64 = 3.0;
    pub const TEST_ELEVATION_LOW: f64 = -6.0;
    pub const TEST_DAWN: (i32, i32) = (6 * 3600, 7 * 3600); // 06:00-07:00
    pub const TEST_DUSK: (i32, i32) = (18 * 3600, 19 * 3600); // 18:00-19:00
}
