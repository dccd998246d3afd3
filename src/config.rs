//! Configuration file support.
//!
//! Settings are read from `shiftr.toml` in the user's config directory
//! (`$XDG_CONFIG_HOME/shiftr/shiftr.toml`) or from a path given with `-c`.
//! A missing default file simply means "all defaults"; a missing explicit
//! file is an error.
//!
//! ```toml
//! temp_day = 6500
//! temp_night = 4500
//! brightness_night = 0.8
//! gamma_night = [1.0, 0.9, 0.9]     # or a single number for all channels
//!
//! # Elevation-based scheduling (the default)
//! elevation_high = 3.0
//! elevation_low = -6.0
//!
//! # Or fixed times; setting both switches to time-based scheduling
//! dawn_time = "06:00-07:45"
//! dusk_time = "18:35-20:15"
//!
//! fade = true
//! preserve_gamma = true
//! adjustment_method = "hyprsunset"
//! location_provider = "manual"
//! socket = "/run/user/1000/shiftr.sock"
//! max_connections = 8
//! stdin_commands = true
//!
//! # Any other table holds options for the method or provider of that name
//! [manual]
//! lat = 48.1
//! lon = 11.6
//! ```
//!
//! Values are range checked on load so the rest of the program can rely on
//! them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::color::ColorSetting;
use crate::constants::*;
use crate::logger::Log;
use crate::scheme::TimeRange;
use crate::utils::path_for_display;

/// Gamma given either as one value for all channels or per channel.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum GammaValue {
    Uniform(f32),
    Channels([f32; 3]),
}

impl GammaValue {
    pub fn channels(&self) -> [f32; 3] {
        match *self {
            GammaValue::Uniform(g) => [g; 3],
            GammaValue::Channels(c) => c,
        }
    }
}

/// Contents of `shiftr.toml`. Every field is optional.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub temp_day: Option<i32>,
    pub temp_night: Option<i32>,
    pub brightness_day: Option<f32>,
    pub brightness_night: Option<f32>,
    pub gamma_day: Option<GammaValue>,
    pub gamma_night: Option<GammaValue>,
    pub elevation_high: Option<f64>,
    pub elevation_low: Option<f64>,
    pub dawn_time: Option<String>,
    pub dusk_time: Option<String>,
    pub fade: Option<bool>,
    pub preserve_gamma: Option<bool>,
    pub adjustment_method: Option<String>,
    pub location_provider: Option<String>,
    pub socket: Option<PathBuf>,
    pub max_connections: Option<usize>,
    pub stdin_commands: Option<bool>,
    pub verbose: Option<bool>,

    /// Method and provider option tables, keyed by their name.
    #[serde(flatten)]
    pub sections: BTreeMap<String, toml::Value>,

    /// File this configuration was read from.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("shiftr").join("shiftr.toml"))
    }

    /// Load the default configuration file, or defaults if there is none.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if !config_path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load and validate a specific configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Configuration file not found at specified path: {}",
                path_for_display(path)
            );
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path_for_display(path)))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to load configuration from {}", path_for_display(path)))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn day_setting(&self) -> ColorSetting {
        ColorSetting::new(
            self.temp_day.unwrap_or(DEFAULT_DAY_TEMP),
            self.gamma_day.map_or([DEFAULT_GAMMA; 3], |g| g.channels()),
            self.brightness_day.unwrap_or(DEFAULT_BRIGHTNESS),
        )
    }

    pub fn night_setting(&self) -> ColorSetting {
        ColorSetting::new(
            self.temp_night.unwrap_or(DEFAULT_NIGHT_TEMP),
            self.gamma_night.map_or([DEFAULT_GAMMA; 3], |g| g.channels()),
            self.brightness_night.unwrap_or(DEFAULT_BRIGHTNESS),
        )
    }

    /// Dawn and dusk windows when time-based scheduling is configured.
    pub fn time_ranges(&self) -> Result<Option<(TimeRange, TimeRange)>> {
        match (&self.dawn_time, &self.dusk_time) {
            (Some(dawn), Some(dusk)) => Ok(Some((
                TimeRange::parse(dawn).context("Invalid dawn_time")?,
                TimeRange::parse(dusk).context("Invalid dusk_time")?,
            ))),
            (None, None) => Ok(None),
            _ => anyhow::bail!("dawn_time and dusk_time must be set together"),
        }
    }

    /// Options from the `[name]` table as string key/value pairs.
    pub fn section_options(&self, name: &str) -> Vec<(String, String)> {
        let Some(toml::Value::Table(table)) = self.sections.get(name) else {
            return Vec::new();
        };
        table
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    pub fn log_config(&self) {
        match &self.source {
            Some(path) => Log::log_block_start(&format!(
                "Loaded configuration from {}",
                path_for_display(path)
            )),
            None => Log::log_block_start("No configuration file, using defaults"),
        }

        let day = self.day_setting();
        let night = self.night_setting();
        Log::log_indented(&format!(
            "Temperatures: {}K day, {}K night",
            day.temperature, night.temperature
        ));
        Log::log_indented(&format!(
            "Brightness: {:.2} day, {:.2} night",
            day.brightness, night.brightness
        ));
        Log::log_indented(&format!(
            "Gamma day: {:.3}, {:.3}, {:.3}",
            day.gamma[0], day.gamma[1], day.gamma[2]
        ));
        Log::log_indented(&format!(
            "Gamma night: {:.3}, {:.3}, {:.3}",
            night.gamma[0], night.gamma[1], night.gamma[2]
        ));

        match (&self.dawn_time, &self.dusk_time) {
            (Some(dawn), Some(dusk)) => {
                Log::log_indented(&format!("Dawn: {}", dawn));
                Log::log_indented(&format!("Dusk: {}", dusk));
            }
            _ => Log::log_indented(&format!(
                "Solar elevations: day above {:.1}°, night below {:.1}°",
                self.elevation_high.unwrap_or(DEFAULT_ELEVATION_HIGH),
                self.elevation_low.unwrap_or(DEFAULT_ELEVATION_LOW)
            )),
        }

        Log::log_indented(&format!("Fade: {}", self.fade.unwrap_or(DEFAULT_FADE)));
        Log::log_indented(&format!(
            "Preserve gamma: {}",
            self.preserve_gamma.unwrap_or(DEFAULT_PRESERVE_GAMMA)
        ));
        if let Some(method) = &self.adjustment_method {
            Log::log_indented(&format!("Adjustment method: {}", method));
        }
        if let Some(provider) = &self.location_provider {
            Log::log_indented(&format!("Location provider: {}", provider));
        }
        if let Some(socket) = &self.socket {
            Log::log_indented(&format!(
                "Control socket: {} (max {} connections)",
                path_for_display(socket),
                self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
            ));
        }
        Log::log_indented(&format!(
            "Commands on standard input: {}",
            self.stdin_commands.unwrap_or(DEFAULT_STDIN_COMMANDS)
        ));
    }
}

/// Range checks that parsing alone cannot express.
pub fn validate_config(config: &Config) -> Result<()> {
    for (name, temp) in [("temp_day", config.temp_day), ("temp_night", config.temp_night)] {
        if let Some(temp) = temp {
            validate_temperature(name, temp)?;
        }
    }

    for (name, brightness) in [
        ("brightness_day", config.brightness_day),
        ("brightness_night", config.brightness_night),
    ] {
        if let Some(b) = brightness {
            if !(MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&b) {
                anyhow::bail!(
                    "{} ({}) must be between {} and {}",
                    name,
                    b,
                    MIN_BRIGHTNESS,
                    MAX_BRIGHTNESS
                );
            }
        }
    }

    for (name, gamma) in [("gamma_day", config.gamma_day), ("gamma_night", config.gamma_night)] {
        if let Some(gamma) = gamma {
            for g in gamma.channels() {
                if !(MIN_GAMMA..=MAX_GAMMA).contains(&g) {
                    anyhow::bail!("{} ({}) must be between {} and {}", name, g, MIN_GAMMA, MAX_GAMMA);
                }
            }
        }
    }

    let high = config.elevation_high.unwrap_or(DEFAULT_ELEVATION_HIGH);
    let low = config.elevation_low.unwrap_or(DEFAULT_ELEVATION_LOW);
    if high < low {
        anyhow::bail!(
            "elevation_high ({}) cannot be lower than elevation_low ({})",
            high,
            low
        );
    }

    if let Some((dawn, dusk)) = config.time_ranges()? {
        if dawn.end > dusk.start {
            anyhow::bail!("dawn_time ({}) must end before dusk_time ({}) starts", dawn, dusk);
        }
    }

    if config.max_connections == Some(0) {
        anyhow::bail!("max_connections must be at least 1");
    }

    for (name, value) in &config.sections {
        if !value.is_table() {
            anyhow::bail!("Unknown configuration key `{}'", name);
        }
    }

    Ok(())
}

/// Check a color temperature against the supported range.
pub fn validate_temperature(name: &str, temp: i32) -> Result<()> {
    if !(MIN_TEMP..=MAX_TEMP).contains(&temp) {
        anyhow::bail!(
            "{} ({}K) must be between {}K and {}K",
            name,
            temp,
            MIN_TEMP,
            MAX_TEMP
        );
    }
    Ok(())
}
