//! Command-line argument parsing and processing.
//!
//! Arguments are tokenized with clap and then reduced to a single
//! [`CliAction`]. clap's own help and version output are disabled in favor
//! of the logger-styled versions below, and any parse problem turns into
//! [`CliAction::ShowHelpDueToError`] after a warning.

use clap::Parser;
use std::path::PathBuf;

use crate::logger::Log;

/// What the daemon should do once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgramMode {
    /// Keep adjusting until told to stop
    #[default]
    Continual,
    /// Apply the current setting once and exit
    OneShot,
    /// Print the current period and setting, touch nothing
    Print,
    /// Apply a fixed temperature and exit
    Manual { temperature: i32 },
    /// Restore neutral colors and exit
    Reset,
}

/// A method or provider name with its `key=value` options.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedOptions {
    pub name: String,
    pub options: Vec<(String, String)>,
}

/// Everything the command line can override.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOptions {
    pub config_path: Option<PathBuf>,
    pub mode: ProgramMode,
    /// Day and night temperatures
    pub temperatures: Option<(i32, i32)>,
    /// Day and night brightness
    pub brightness: Option<(f32, f32)>,
    /// Same gamma for day and night
    pub gamma: Option<[f32; 3]>,
    pub method: Option<NamedOptions>,
    pub provider: Option<NamedOptions>,
    pub preserve_gamma: Option<bool>,
    pub fade: Option<bool>,
    pub socket: Option<PathBuf>,
    pub stdin_commands: Option<bool>,
    pub verbose: bool,
}

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run in the selected mode
    Run(CliOptions),
    /// Send commands to a running instance and exit
    SendCommands {
        options: CliOptions,
        commands: Vec<String>,
    },
    ListMethods,
    ListProviders,
    MethodHelp(String),
    ProviderHelp(String),
    ShowHelp,
    ShowVersion,
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

#[derive(Parser, Debug)]
#[command(name = "shiftr", disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
    #[arg(short = 'b', long = "brightness")]
    brightness: Option<String>,
    #[arg(short = 'g', long = "gamma")]
    gamma: Option<String>,
    #[arg(short = 'l', long = "location", allow_hyphen_values = true)]
    location: Option<String>,
    #[arg(short = 'm', long = "method")]
    method: Option<String>,
    #[arg(short = 'o', long = "oneshot")]
    oneshot: bool,
    #[arg(short = 'p', long = "print")]
    print: bool,
    #[arg(short = 'O', long = "manual")]
    manual: Option<String>,
    #[arg(short = 'x', long = "reset")]
    reset: bool,
    #[arg(short = 'P', long = "no-preserve")]
    no_preserve: bool,
    #[arg(short = 'r', long = "no-fade")]
    no_fade: bool,
    #[arg(short = 't', long = "temps")]
    temps: Option<String>,
    #[arg(short = 's', long = "socket")]
    socket: Option<PathBuf>,
    #[arg(long = "no-stdin")]
    no_stdin: bool,
    #[arg(long = "send", num_args = 1.., value_name = "COMMAND")]
    send: Option<Vec<String>>,
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
    #[arg(short = 'h', long = "help")]
    help: bool,
    #[arg(short = 'V', long = "version")]
    version: bool,
}

impl ParsedArgs {
    /// Parse command-line arguments (program name first) into an action.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString> + Clone,
    {
        let action = match Cli::try_parse_from(args) {
            Ok(cli) => action_from_cli(cli).unwrap_or_else(|message| {
                Log::log_warning(&message);
                CliAction::ShowHelpDueToError
            }),
            Err(e) => {
                let rendered = e.to_string();
                let first_line = rendered.lines().next().unwrap_or("Invalid arguments");
                Log::log_warning(first_line.trim_start_matches("error: "));
                CliAction::ShowHelpDueToError
            }
        };
        ParsedArgs { action }
    }

    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args_os())
    }
}

fn action_from_cli(cli: Cli) -> Result<CliAction, String> {
    if cli.version {
        return Ok(CliAction::ShowVersion);
    }
    if cli.help {
        return Ok(CliAction::ShowHelp);
    }

    if let Some(option_arg) = cli.method.as_deref() {
        if option_arg == "list" {
            return Ok(CliAction::ListMethods);
        }
        if let Some(name) = help_request(option_arg) {
            return Ok(CliAction::MethodHelp(name));
        }
    }
    if let Some(option_arg) = cli.location.as_deref() {
        if option_arg == "list" {
            return Ok(CliAction::ListProviders);
        }
        if let Some(name) = help_request(option_arg) {
            return Ok(CliAction::ProviderHelp(name));
        }
    }

    let exclusive = [cli.oneshot, cli.print, cli.manual.is_some(), cli.reset];
    if exclusive.iter().filter(|&&set| set).count() > 1 {
        return Err("Options -o, -p, -O and -x cannot be combined".to_string());
    }
    let mode = if cli.oneshot {
        ProgramMode::OneShot
    } else if cli.print {
        ProgramMode::Print
    } else if cli.reset {
        ProgramMode::Reset
    } else if let Some(value) = cli.manual.as_deref() {
        let temperature = value
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("Invalid temperature for -O: {}", value))?;
        ProgramMode::Manual { temperature }
    } else {
        ProgramMode::Continual
    };

    let options = CliOptions {
        config_path: cli.config,
        mode,
        temperatures: cli.temps.as_deref().map(parse_temperatures).transpose()?,
        brightness: cli.brightness.as_deref().map(parse_brightness).transpose()?,
        gamma: cli.gamma.as_deref().map(parse_gamma).transpose()?,
        method: cli.method.as_deref().map(parse_method_arg).transpose()?,
        provider: cli.location.as_deref().map(parse_provider_arg).transpose()?,
        preserve_gamma: cli.no_preserve.then_some(false),
        fade: cli.no_fade.then_some(false),
        socket: cli.socket,
        stdin_commands: cli.no_stdin.then_some(false),
        verbose: cli.verbose,
    };

    match cli.send {
        Some(commands) => Ok(CliAction::SendCommands { options, commands }),
        None => Ok(CliAction::Run(options)),
    }
}

/// `NAME:help` asks for a method's or provider's option list.
fn help_request(option_arg: &str) -> Option<String> {
    let (name, rest) = option_arg.split_once(':')?;
    (rest == "help").then(|| name.to_string())
}

fn parse_pair<T: std::str::FromStr + Copy>(text: &str, what: &str) -> Result<(T, T), String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<T>()
            .map_err(|_| format!("Malformed {} argument: {}", what, text))
    };
    match text.split_once(':') {
        Some((day, night)) => Ok((parse(day)?, parse(night)?)),
        None => {
            let both = parse(text)?;
            Ok((both, both))
        }
    }
}

/// `DAY:NIGHT`.
pub fn parse_temperatures(text: &str) -> Result<(i32, i32), String> {
    if !text.contains(':') {
        return Err(format!("Malformed temperature argument: {}", text));
    }
    parse_pair(text, "temperature")
}

/// `DAY:NIGHT`, or one value for both.
pub fn parse_brightness(text: &str) -> Result<(f32, f32), String> {
    parse_pair(text, "brightness")
}

/// `R:G:B`, or one value for all channels.
pub fn parse_gamma(text: &str) -> Result<[f32; 3], String> {
    let values = text
        .split(':')
        .map(|s| s.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| format!("Malformed gamma argument: {}", text))?;
    match values.as_slice() {
        [g] => Ok([*g; 3]),
        [r, g, b] => Ok([*r, *g, *b]),
        _ => Err(format!("Malformed gamma argument: {}", text)),
    }
}

/// `NAME[:key=value...]`.
pub fn parse_method_arg(option_arg: &str) -> Result<NamedOptions, String> {
    parse_named_options(option_arg, &[])
}

/// `NAME[:key=value...]`, or `LAT:LON` for the manual provider.
///
/// Bare values given to the manual provider are taken as `lat`, then `lon`.
pub fn parse_provider_arg(option_arg: &str) -> Result<NamedOptions, String> {
    let first = option_arg.split(':').next().unwrap_or_default();
    if first.trim().parse::<f64>().is_ok() {
        return parse_named_options(&format!("manual:{}", option_arg), &["lat", "lon"]);
    }
    if first == "manual" {
        return parse_named_options(option_arg, &["lat", "lon"]);
    }
    parse_named_options(option_arg, &[])
}

fn parse_named_options(option_arg: &str, positional: &[&str]) -> Result<NamedOptions, String> {
    let mut parts = option_arg.split(':');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(format!("Missing name in `{}'", option_arg));
    }

    let mut options = Vec::new();
    let mut next_positional = positional.iter();
    for part in parts.filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((key, value)) => options.push((key.trim().to_string(), value.trim().to_string())),
            None => match next_positional.next() {
                Some(key) => options.push((key.to_string(), part.trim().to_string())),
                None => return Err(format!("Malformed option `{}' for {}", part, name)),
            },
        }
    }

    Ok(NamedOptions {
        name: name.to_string(),
        options,
    })
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    Log::log_version();
    Log::log_pipe();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    Log::log_version();
    Log::log_block_start(env!("CARGO_PKG_DESCRIPTION"));
    Log::log_block_start("Usage: shiftr [OPTIONS]");
    Log::log_block_start("Options:");
    Log::log_indented("-c, --config FILE         Load settings from FILE");
    Log::log_indented("-b, --brightness DAY:NIGHT  Screen brightness (0.1-1.0)");
    Log::log_indented("-g, --gamma R:G:B         Additional gamma correction");
    Log::log_indented("-l, --location PROVIDER   Location provider (`list' to see all, LAT:LON for manual)");
    Log::log_indented("-m, --method METHOD       Adjustment method (`list' to see all)");
    Log::log_indented("-o, --oneshot             Apply the current setting once and exit");
    Log::log_indented("-p, --print               Print the current period and setting and exit");
    Log::log_indented("-O, --manual TEMP         Apply TEMP once and exit");
    Log::log_indented("-x, --reset               Reset to neutral colors and exit");
    Log::log_indented("-P, --no-preserve         Do not preserve existing gamma ramps");
    Log::log_indented("-r, --no-fade             Apply changes at once instead of fading");
    Log::log_indented("-t, --temps DAY:NIGHT     Color temperatures in Kelvin");
    Log::log_indented("-s, --socket PATH         Accept commands on a Unix socket at PATH");
    Log::log_indented("    --no-stdin            Ignore commands on standard input");
    Log::log_indented("    --send CMD...         Send commands to a running instance");
    Log::log_indented("-v, --verbose             Print period and setting changes");
    Log::log_indented("-h, --help                Print help information");
    Log::log_indented("-V, --version             Print version information");
    Log::log_block_start("Commands:");
    Log::log_indented("brightness <0.1-1.0|up|down|reset>");
    Log::log_indented("temp <1000-25000|up|down|reset>");
    Log::log_indented("enable | disable | toggle | shutdown");
    Log::log_end();
}
