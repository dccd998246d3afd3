//! Utility functions shared across the codebase.
//!
//! Interpolation primitives used by the color model, a thin poll(2) wrapper
//! shared by the command loop and location providers, and small path helpers
//! for the runtime directory and for printing paths relative to `$HOME`.

use nix::errno::Errno;
use nix::poll::{PollFd, PollTimeout, poll};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Interpolate between two integers based on progress (0.0 to 1.0).
///
/// Used for color temperature. The result is rounded to the nearest
/// integer and never leaves the range spanned by `start` and `end`.
///
/// # Arguments
/// * `start` - Value returned when progress = 0.0
/// * `end` - Value returned when progress = 1.0
/// * `progress` - Interpolation progress, automatically clamped to [0.0, 1.0]
///
/// # Examples
/// ```
/// use shiftr::utils::interpolate_i32;
/// assert_eq!(interpolate_i32(1000, 2000, 0.5), 1500);
/// assert_eq!(interpolate_i32(6500, 3500, 0.25), 5750);
/// ```
pub fn interpolate_i32(start: i32, end: i32, progress: f64) -> i32 {
    let p = progress.clamp(0.0, 1.0);
    let result = ((1.0 - p) * start as f64 + p * end as f64).round() as i32;
    result.clamp(start.min(end), start.max(end))
}

/// Interpolate between two floats based on progress (0.0 to 1.0).
///
/// Written as a weighted sum so both endpoints are reproduced exactly,
/// then clamped to the range of the endpoints to absorb rounding.
///
/// # Examples
/// ```
/// use shiftr::utils::interpolate_f32;
/// assert_eq!(interpolate_f32(0.5, 1.0, 0.5), 0.75);
/// assert_eq!(interpolate_f32(1.0, 0.5, 1.0), 0.5);
/// ```
pub fn interpolate_f32(start: f32, end: f32, progress: f64) -> f32 {
    let p = progress.clamp(0.0, 1.0);
    let result = ((1.0 - p) * start as f64 + p * end as f64) as f32;
    result.clamp(start.min(end), start.max(end))
}

/// Convert an optional timeout into a poll(2) timeout (`None` blocks).
///
/// Durations beyond what poll(2) accepts saturate at the maximum.
pub fn poll_timeout(timeout: Option<Duration>) -> PollTimeout {
    match timeout {
        None => PollTimeout::NONE,
        Some(d) => PollTimeout::try_from(d).unwrap_or(PollTimeout::MAX),
    }
}

/// Wait on a set of descriptors with poll(2).
///
/// An interrupted call reports zero ready descriptors instead of an error.
pub fn poll_fds(fds: &mut [PollFd<'_>], timeout: Option<Duration>) -> io::Result<usize> {
    match poll(fds, poll_timeout(timeout)) {
        Ok(ready) => Ok(ready as usize),
        Err(Errno::EINTR) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Per-user runtime directory: `$XDG_RUNTIME_DIR`, else `/run/user/<uid>`.
pub fn runtime_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("/run/user/{}", nix::unistd::getuid())))
}

/// Render a path with the home directory replaced by `~`.
pub fn path_for_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(relative) = path.strip_prefix(&home) {
            return format!("~/{}", relative.display());
        }
    }
    path.display().to_string()
}
