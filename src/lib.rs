//! # shiftr
//!
//! Color temperature daemon core: adjusts the display's white point and
//! brightness over the day, fades large changes and takes live overrides
//! over a line-based control protocol.
//!
//! ## Architecture
//!
//! - **args**: Command-line parsing into a [`CliAction`]
//! - **backend**: Gamma adjustment methods (hyprsunset, dummy)
//! - **color**: The [`ColorSetting`] value type and its bounds
//! - **commands**: Control protocol parser, line framing and the poll set
//! - **config**: `shiftr.toml` loading and validation
//! - **constants**: Application-wide constants and defaults
//! - **continual**: The continual adjustment loop
//! - **fade**: Eased fade state machine
//! - **geo**: Solar position and sun times
//! - **hooks**: Executables started on period changes
//! - **location**: Location providers
//! - **logger**: Structured logging with visual formatting
//! - **modes**: One-shot, print, manual, reset and daemon startup
//! - **options**: Config and command line merged into runtime [`Options`]
//! - **period**: Period and blend factor from time or solar elevation
//! - **scheme**: Day/night settings, schedule and overrides
//! - **signals**: Signal handling and the shared control flags
//! - **testing**: Recording gamma method for integration tests (`testing-support` feature)
//! - **utils**: Interpolation, poll(2) and path helpers

pub mod args;
pub mod backend;
pub mod color;
pub mod commands;
pub mod config;
pub mod constants;
pub mod continual;
pub mod fade;
pub mod geo;
pub mod hooks;
pub mod location;
pub mod logger;
pub mod modes;
pub mod options;
pub mod period;
pub mod scheme;
pub mod signals;
#[cfg(feature = "testing-support")]
pub mod testing;
pub mod utils;

pub use args::{CliAction, CliOptions, ParsedArgs, ProgramMode};
pub use backend::GammaMethod;
pub use color::ColorSetting;
pub use commands::{CommandBuffer, CommandFds, CommandTarget, ReadOutcome, parse_command, send_commands};
pub use config::Config;
pub use continual::{ContinualMode, LoopTiming, run_continual_mode};
pub use fade::{Fader, ease_fade};
pub use location::{Location, LocationProvider};
pub use logger::{Log, LogLevel};
pub use options::Options;
pub use period::Period;
pub use scheme::{Schedule, TimeRange, TransitionScheme};
pub use signals::ControlContext;
