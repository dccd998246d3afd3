//! Effective runtime options.
//!
//! The configuration file supplies the baseline and anything given on the
//! command line overrides it. The result is a validated [`Options`] value the
//! program modes run from.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::args::{CliOptions, ProgramMode};
use crate::color::ColorSetting;
use crate::config::{Config, validate_temperature};
use crate::constants::*;
use crate::logger::Log;
use crate::scheme::TransitionScheme;
use crate::utils::path_for_display;

#[derive(Debug, Clone)]
pub struct Options {
    pub mode: ProgramMode,
    pub scheme: TransitionScheme,
    pub method: Option<String>,
    pub method_args: Vec<(String, String)>,
    pub provider: Option<String>,
    pub provider_args: Vec<(String, String)>,
    pub use_fade: bool,
    pub preserve_gamma: bool,
    pub socket: Option<PathBuf>,
    pub max_connections: usize,
    pub stdin_commands: bool,
    pub verbose: bool,
    /// Kept for the per-method and per-provider sections.
    pub config: Config,
}

impl Options {
    /// Load the configuration file named on the command line (or the default
    /// one) and merge the command line over it.
    pub fn load(cli: &CliOptions) -> Result<Self> {
        let config = match &cli.config_path {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load()?,
        };
        Self::from_sources(config, cli)
    }

    pub fn from_sources(config: Config, cli: &CliOptions) -> Result<Self> {
        let mut day = config.day_setting();
        let mut night = config.night_setting();

        if let Some((day_temp, night_temp)) = cli.temperatures {
            validate_temperature("Day temperature", day_temp)?;
            validate_temperature("Night temperature", night_temp)?;
            day.temperature = day_temp;
            night.temperature = night_temp;
        }
        if let Some((day_brightness, night_brightness)) = cli.brightness {
            for b in [day_brightness, night_brightness] {
                if !(MIN_BRIGHTNESS..=MAX_BRIGHTNESS).contains(&b) {
                    anyhow::bail!(
                        "Brightness ({}) must be between {} and {}",
                        b,
                        MIN_BRIGHTNESS,
                        MAX_BRIGHTNESS
                    );
                }
            }
            day.brightness = day_brightness;
            night.brightness = night_brightness;
        }
        if let Some(gamma) = cli.gamma {
            if gamma.iter().any(|g| !(MIN_GAMMA..=MAX_GAMMA).contains(g)) {
                anyhow::bail!("Gamma must be between {} and {}", MIN_GAMMA, MAX_GAMMA);
            }
            day.gamma = gamma;
            night.gamma = gamma;
        }

        let scheme = match config.time_ranges()? {
            Some((dawn, dusk)) => TransitionScheme::with_times(day, night, dawn, dusk),
            None => TransitionScheme::with_elevation(
                day,
                night,
                config.elevation_high.unwrap_or(DEFAULT_ELEVATION_HIGH),
                config.elevation_low.unwrap_or(DEFAULT_ELEVATION_LOW),
            ),
        }
        .context("Invalid transition scheme")?;

        if let ProgramMode::Manual { temperature } = cli.mode {
            validate_temperature("Temperature", temperature)?;
        }

        let (method, method_args) = match &cli.method {
            Some(m) => (Some(m.name.clone()), m.options.clone()),
            None => (config.adjustment_method.clone(), Vec::new()),
        };
        let (provider, provider_args) = match &cli.provider {
            Some(p) => (Some(p.name.clone()), p.options.clone()),
            None => (config.location_provider.clone(), Vec::new()),
        };

        Ok(Self {
            mode: cli.mode,
            scheme,
            method,
            method_args,
            provider,
            provider_args,
            use_fade: cli.fade.or(config.fade).unwrap_or(DEFAULT_FADE),
            preserve_gamma: cli
                .preserve_gamma
                .or(config.preserve_gamma)
                .unwrap_or(DEFAULT_PRESERVE_GAMMA),
            socket: cli.socket.clone().or_else(|| config.socket.clone()),
            max_connections: config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            stdin_commands: cli
                .stdin_commands
                .or(config.stdin_commands)
                .unwrap_or(DEFAULT_STDIN_COMMANDS),
            verbose: cli.verbose || config.verbose.unwrap_or(false),
            config,
        })
    }

    /// Options from the config section named after a method or provider.
    pub fn section_options(&self, name: &str) -> Vec<(String, String)> {
        self.config.section_options(name)
    }

    /// Whether this run needs the observer's location.
    pub fn needs_location(&self) -> bool {
        let uses_scheme = matches!(
            self.mode,
            ProgramMode::Continual | ProgramMode::OneShot | ProgramMode::Print
        );
        uses_scheme && !self.scheme.use_time()
    }

    /// The fixed setting applied by manual and reset mode.
    pub fn fixed_setting(&self) -> Option<ColorSetting> {
        match self.mode {
            ProgramMode::Manual { temperature } => {
                let mut setting = self.scheme.day;
                setting.temperature = temperature;
                Some(setting)
            }
            ProgramMode::Reset => Some(ColorSetting::neutral()),
            _ => None,
        }
    }

    /// Preserve flag to use for this mode. Reset always starts from clean ramps.
    pub fn effective_preserve_gamma(&self) -> bool {
        self.preserve_gamma && self.mode != ProgramMode::Reset
    }

    pub fn log_options(&self) {
        self.config.log_config();
        if let Some(method) = &self.method {
            Log::log_indented(&format!("Requested method: {}", method));
        }
        if let Some(provider) = &self.provider {
            Log::log_indented(&format!("Requested location provider: {}", provider));
        }
        if let Some(socket) = &self.socket {
            Log::log_indented(&format!("Listening on {}", path_for_display(socket)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::NamedOptions;
    use crate::scheme::Schedule;

    #[test]
    fn test_defaults_without_config_or_flags() {
        let options = Options::from_sources(Config::default(), &CliOptions::default()).unwrap();
        assert_eq!(options.mode, ProgramMode::Continual);
        assert_eq!(options.scheme.day.temperature, DEFAULT_DAY_TEMP);
        assert_eq!(options.scheme.night.temperature, DEFAULT_NIGHT_TEMP);
        assert_eq!(
            options.scheme.schedule,
            Schedule::Elevation {
                high: DEFAULT_ELEVATION_HIGH,
                low: DEFAULT_ELEVATION_LOW
            }
        );
        assert!(options.use_fade);
        assert!(options.preserve_gamma);
        assert!(options.stdin_commands);
        assert_eq!(options.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert!(options.needs_location());
    }

    #[test]
    fn test_command_line_overrides_config() {
        let config = Config::parse(
            r#"
temp_day = 6000
temp_night = 4000
fade = true
adjustment_method = "hyprsunset"
socket = "/tmp/from-config.sock"
dawn_time = "06:00-07:00"
dusk_time = "18:00-19:00"
"#,
        )
        .unwrap();
        let cli = CliOptions {
            temperatures: Some((5500, 3000)),
            brightness: Some((1.0, 0.6)),
            fade: Some(false),
            method: Some(NamedOptions {
                name: "dummy".to_string(),
                options: Vec::new(),
            }),
            socket: Some(PathBuf::from("/tmp/from-cli.sock")),
            ..CliOptions::default()
        };

        let options = Options::from_sources(config, &cli).unwrap();
        assert_eq!(options.scheme.day, ColorSetting::new(5500, [1.0; 3], 1.0));
        assert_eq!(options.scheme.night, ColorSetting::new(3000, [1.0; 3], 0.6));
        assert!(!options.use_fade);
        assert_eq!(options.method.as_deref(), Some("dummy"));
        assert_eq!(options.socket, Some(PathBuf::from("/tmp/from-cli.sock")));
        assert!(options.scheme.use_time());
        assert!(!options.needs_location());
    }

    #[test]
    fn test_command_line_values_are_validated() {
        let bad_temps = CliOptions {
            temperatures: Some((500, 3000)),
            ..CliOptions::default()
        };
        assert!(Options::from_sources(Config::default(), &bad_temps).is_err());

        let bad_gamma = CliOptions {
            gamma: Some([1.0, 0.0, 1.0]),
            ..CliOptions::default()
        };
        assert!(Options::from_sources(Config::default(), &bad_gamma).is_err());

        let bad_manual = CliOptions {
            mode: ProgramMode::Manual { temperature: 30000 },
            ..CliOptions::default()
        };
        assert!(Options::from_sources(Config::default(), &bad_manual).is_err());
    }

    #[test]
    fn test_fixed_settings() {
        let manual = CliOptions {
            mode: ProgramMode::Manual { temperature: 3300 },
            brightness: Some((0.9, 0.5)),
            ..CliOptions::default()
        };
        let options = Options::from_sources(Config::default(), &manual).unwrap();
        assert_eq!(options.fixed_setting(), Some(ColorSetting::new(3300, [1.0; 3], 0.9)));
        assert!(!options.needs_location());

        let reset = CliOptions {
            mode: ProgramMode::Reset,
            ..CliOptions::default()
        };
        let options = Options::from_sources(Config::default(), &reset).unwrap();
        assert_eq!(options.fixed_setting(), Some(ColorSetting::neutral()));
        assert!(!options.effective_preserve_gamma());
    }

    #[test]
    fn test_provider_options_pass_through() {
        let cli = CliOptions {
            provider: Some(NamedOptions {
                name: "manual".to_string(),
                options: vec![("lat".to_string(), "10".to_string())],
            }),
            ..CliOptions::default()
        };
        let config = Config::parse("[manual]\nlon = 20.0\n").unwrap();
        let options = Options::from_sources(config, &cli).unwrap();
        assert_eq!(options.provider.as_deref(), Some("manual"));
        assert_eq!(options.provider_args, vec![("lat".to_string(), "10".to_string())]);
        assert_eq!(options.section_options("manual"), vec![("lon".to_string(), "20.0".to_string())]);
    }
}
