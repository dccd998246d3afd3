//! Control protocol command parser.
//!
//! One line in, at most one state mutation out. Keywords are matched as
//! case-sensitive prefixes in a fixed order; malformed arguments are
//! silently ignored. The grammar:
//!
//! ```text
//! brightness <float> | brightness up | brightness down | brightness reset
//! temp <integer>     | temp up       | temp down       | temp reset
//! enable | disable | toggle | shutdown
//! ```

use crate::color::{ColorSetting, clamp_brightness, clamp_temperature};
use crate::constants::*;
use crate::scheme::TransitionScheme;
use crate::signals::ControlContext;

/// State a command may touch.
pub struct CommandTarget<'a> {
    /// Only the override fields are ever modified.
    pub scheme: &'a mut TransitionScheme,
    /// Last applied setting, the baseline for `up`/`down` without an override.
    pub current: &'a ColorSetting,
    pub disabled: &'a mut bool,
    pub control: &'a ControlContext,
}

/// Parse one command line (without its newline) and apply it.
///
/// Returns true if the line changed state that the next tick must pick up.
/// `brightness reset`, `temp reset` and `shutdown` return false even though
/// they act: resets take effect on the regular tick and shutdown is observed
/// through the control context.
pub fn parse_command(line: &[u8], target: &mut CommandTarget<'_>) -> bool {
    if let Some(rest) = line.strip_prefix(b"brightness") {
        return parse_brightness(rest, target);
    }
    if line.starts_with(b"enable") {
        *target.disabled = false;
        return true;
    }
    if line.starts_with(b"disable") {
        *target.disabled = true;
        return true;
    }
    if line.starts_with(b"toggle") {
        *target.disabled = !*target.disabled;
        return true;
    }
    if let Some(rest) = line.strip_prefix(b"temp") {
        return parse_temperature(rest, target);
    }
    if line.starts_with(b"shutdown") {
        target.control.request_exit();
    }
    false
}

fn parse_brightness(rest: &[u8], target: &mut CommandTarget<'_>) -> bool {
    let arg = skip_blanks(rest);
    let Some(&first) = arg.first() else {
        return false;
    };

    if first.is_ascii_digit() || first == b'.' {
        return match scan_float(arg) {
            Some(value) => {
                target.scheme.set_override_brightness(clamp_brightness(value));
                true
            }
            None => false,
        };
    }

    let delta = if arg.starts_with(b"up") {
        BRIGHTNESS_ADJUST
    } else if arg.starts_with(b"down") {
        -BRIGHTNESS_ADJUST
    } else {
        if arg.starts_with(b"reset") {
            target.scheme.clear_override(USE_OVERRIDE_BRIGHTNESS);
        }
        return false;
    };

    let base = if target.scheme.has_override(USE_OVERRIDE_BRIGHTNESS) {
        target.scheme.override_setting.brightness
    } else {
        target.current.brightness
    };
    target.scheme.set_override_brightness(clamp_brightness(base + delta));
    true
}

fn parse_temperature(rest: &[u8], target: &mut CommandTarget<'_>) -> bool {
    let arg = skip_blanks(rest);
    let Some(&first) = arg.first() else {
        return false;
    };

    if first.is_ascii_digit() {
        return match scan_integer(arg) {
            Some(value) => {
                target.scheme.set_override_temperature(clamp_temperature(value));
                true
            }
            None => false,
        };
    }

    let delta = if arg.starts_with(b"up") {
        TEMP_ADJUST
    } else if arg.starts_with(b"down") {
        -TEMP_ADJUST
    } else {
        if arg.starts_with(b"reset") {
            target.scheme.clear_override(USE_OVERRIDE_TEMP);
        }
        return false;
    };

    let base = if target.scheme.has_override(USE_OVERRIDE_TEMP) {
        target.scheme.override_setting.temperature
    } else {
        target.current.temperature
    };
    target
        .scheme
        .set_override_temperature(clamp_temperature(base as i64 + delta as i64));
    true
}

fn skip_blanks(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Longest decimal floating point prefix (`12`, `0.5`, `.75`, `1e-1`).
///
/// None if no digit could be consumed. Values beyond f32 range become
/// infinite, which the caller clamps.
fn scan_float(bytes: &[u8]) -> Option<f32> {
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let int_len = digits(0);
    let mut end = int_len;
    let mut frac_len = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_len = digits(end + 1);
        end += 1 + frac_len;
    }
    if int_len + frac_len == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_len = digits(exp_end);
        if exp_len > 0 {
            end = exp_end + exp_len;
        }
    }

    let text = std::str::from_utf8(&bytes[..end]).ok()?;
    text.parse::<f64>().ok().map(|v| v as f32)
}

/// Leading run of decimal digits, saturating on overflow.
fn scan_integer(bytes: &[u8]) -> Option<i64> {
    let len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }
    let text = std::str::from_utf8(&bytes[..len]).ok()?;
    Some(text.parse::<i64>().unwrap_or(i64::MAX))
}
