//! Geographic helpers for elevation-based scheduling.

pub mod solar;

use chrono::Local;

use crate::location::Location;
use crate::logger::Log;

/// Log today's sunrise and sunset for `location`.
///
/// Purely informational; failures are logged and otherwise ignored.
pub fn log_sun_times(location: &Location) {
    let today = Local::now().date_naive();
    match solar::sun_times(location.latitude, location.longitude, today) {
        Ok(times) => {
            Log::log_indented(&format!("Sunrise: {}", times.sunrise.format("%H:%M:%S")));
            Log::log_indented(&format!("Sunset: {}", times.sunset.format("%H:%M:%S")));
            Log::log_indented(&format!("Civil dusk: {}", times.civil_dusk.format("%H:%M:%S")));
        }
        Err(e) => Log::log_warning(&format!("Could not calculate sun times: {}", e)),
    }
}
