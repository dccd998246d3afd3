//! Fixed location given by the user.

use anyhow::{Context, Result};

use super::{Location, LocationFix, LocationProvider};
use crate::logger::Log;

/// Provider returning the configured `lat`/`lon` pair.
#[derive(Debug, Clone)]
pub struct ManualProvider {
    location: Location,
}

impl Default for ManualProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualProvider {
    pub fn new() -> Self {
        Self {
            location: Location::unknown(),
        }
    }
}

impl LocationProvider for ManualProvider {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn print_help(&self) {
        Log::log_block_start("Specify location manually.");
        Log::log_indented("lat   Latitude");
        Log::log_indented("lon   Longitude");
        Log::log_pipe();
        Log::log_indented("Both values are expected to be floating point numbers,");
        Log::log_indented("negative values representing west / south, respectively.");
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        let parsed: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("Malformed value `{}' for {}", value, key))?;

        match key.to_ascii_lowercase().as_str() {
            "lat" => {
                if !(-90.0..=90.0).contains(&parsed) {
                    anyhow::bail!("Latitude must be between -90 and 90 degrees (got {})", parsed);
                }
                self.location.latitude = parsed;
            }
            "lon" => {
                if !(-180.0..=180.0).contains(&parsed) {
                    anyhow::bail!("Longitude must be between -180 and 180 degrees (got {})", parsed);
                }
                self.location.longitude = parsed;
            }
            _ => anyhow::bail!("Unknown method parameter: `{}'", key),
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.location.latitude.is_nan() || self.location.longitude.is_nan() {
            anyhow::bail!("Latitude and longitude must be set");
        }
        Ok(())
    }

    fn handle(&mut self) -> Result<LocationFix> {
        Ok(LocationFix {
            location: self.location,
            available: true,
        })
    }
}
