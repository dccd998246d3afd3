//! Program modes and the startup sequence shared by them.
//!
//! Every mode except print starts a gamma method. Modes that follow the
//! transition scheme need a location when the scheme is elevation-based.
//! The continual mode additionally takes an instance lock, opens the control
//! socket and reads commands from standard input.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, File};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

use crate::args::ProgramMode;
use crate::backend::{GammaMethod, methods_try_start_all};
use crate::color::ColorSetting;
use crate::commands::CommandFds;
use crate::continual::{ContinualMode, LoopTiming, run_continual_mode};
use crate::geo;
use crate::hooks::default_hooks_dir;
use crate::location::{Location, LocationProvider, provider_get_location, providers_try_start_all};
use crate::logger::Log;
use crate::options::Options;
use crate::period::{self, describe_period};
use crate::scheme::{Schedule, TransitionScheme};
use crate::signals::{ControlContext, setup_signal_handler};
use crate::utils::{path_for_display, runtime_dir};

/// Run the mode selected in `options` to completion.
pub fn run(options: &Options, control: &ControlContext) -> Result<()> {
    let (mut provider, location) = if options.needs_location() {
        let (provider, location) = start_location(options)?;
        (Some(provider), Some(location))
    } else {
        (None, None)
    };

    if options.mode == ProgramMode::Print {
        for line in describe_current(&options.scheme, Utc::now(), location.as_ref()) {
            Log::log_decorated(&line);
        }
        if let Some(provider) = provider {
            provider.teardown();
        }
        return Ok(());
    }

    let mut method = methods_try_start_all(options.method.as_deref(), &options.method_args, |name| {
        options.section_options(name)
    })?;

    let result = match options.mode {
        ProgramMode::Continual => run_daemon(options, method.as_mut(), &mut provider, location, control),
        ProgramMode::OneShot => {
            let (_, progress, _) = period::evaluate(&options.scheme, Utc::now(), location.as_ref());
            let target = options.scheme.interpolate(progress);
            apply_once(method.as_mut(), &target, options.preserve_gamma)
        }
        ProgramMode::Manual { .. } | ProgramMode::Reset => match options.fixed_setting() {
            Some(setting) => apply_once(method.as_mut(), &setting, options.effective_preserve_gamma()),
            None => Ok(()),
        },
        ProgramMode::Print => Ok(()),
    };

    method.teardown();
    if let Some(provider) = provider {
        provider.teardown();
    }
    result
}

/// Start the location provider and wait for the first valid fix.
fn start_location(options: &Options) -> Result<(Box<dyn LocationProvider>, Location)> {
    let mut provider = providers_try_start_all(
        options.provider.as_deref(),
        &options.provider_args,
        |name| options.section_options(name),
    )?;

    if provider.is_dynamic() {
        Log::log_decorated("Waiting for initial location to become available...");
    }
    let fix = provider_get_location(provider.as_mut(), None)?;
    if !fix.available {
        anyhow::bail!("Location is not available from provider {}", provider.name());
    }
    if !fix.location.is_valid() {
        anyhow::bail!("Invalid location from provider {}: {}", provider.name(), fix.location);
    }

    Log::log_block_start(&fix.location.to_string());
    geo::log_sun_times(&fix.location);
    if let Schedule::Elevation { high, low } = options.scheme.schedule {
        Log::log_verbose(&format!(
            "Solar elevations: day above {:.1}°, night below {:.1}°",
            high, low
        ));
    }

    Ok((provider, fix.location))
}

/// Period, temperature and brightness at `now`, one line each.
pub fn describe_current(
    scheme: &TransitionScheme,
    now: DateTime<Utc>,
    location: Option<&Location>,
) -> Vec<String> {
    let (period, progress, elevation) = period::evaluate(scheme, now, location);
    let target = scheme.interpolate(progress);

    let mut lines = Vec::new();
    if let Some(elevation) = elevation {
        lines.push(format!("Solar elevation: {:.2}°", elevation));
    }
    lines.push(describe_period(period, progress));
    lines.push(format!("Color temperature: {}K", target.temperature));
    lines.push(format!("Brightness: {:.2}", target.brightness));
    lines
}

/// Apply a single setting and leave it in place.
pub fn apply_once(method: &mut dyn GammaMethod, setting: &ColorSetting, preserve_gamma: bool) -> Result<()> {
    Log::log_decorated(&format!(
        "Color temperature: {}K, brightness: {:.2}",
        setting.temperature, setting.brightness
    ));
    method
        .set_temperature(setting, preserve_gamma)
        .context("Temperature adjustment failed")
}

fn run_daemon(
    options: &Options,
    method: &mut dyn GammaMethod,
    provider: &mut Option<Box<dyn LocationProvider>>,
    location: Option<Location>,
    control: &ControlContext,
) -> Result<()> {
    let lock = InstanceLock::acquire(&runtime_dir())?;
    Log::log_debug(&format!("Instance lock held at {}", path_for_display(lock.path())));
    setup_signal_handler(control)?;

    let mut fds = CommandFds::new(options.max_connections);
    if let Some(path) = &options.socket {
        remove_stale_socket(path)?;
        fds.create_socket(path)?;
        Log::log_decorated(&format!("Accepting commands on {}", path_for_display(path)));
    }
    if options.stdin_commands {
        fds.enable_stdin();
    }

    let mut mode = ContinualMode {
        scheme: options.scheme.clone(),
        location,
        provider: provider.take(),
        use_fade: options.use_fade,
        preserve_gamma: options.preserve_gamma,
        timing: LoopTiming::default(),
        hooks: default_hooks_dir(),
    };
    Log::log_block_start("Starting adjustment loop");
    let result = run_continual_mode(&mut mode, method, &mut fds, control);
    *provider = mode.provider.take();
    result
}

/// Exclusive lock marking the running daemon. Removed on drop.
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn acquire(dir: &Path) -> Result<Self> {
        let path = dir.join("shiftr.lock");
        let file = File::create(&path)
            .with_context(|| format!("Failed to create lock file {}", path_for_display(&path)))?;
        if file.try_lock_exclusive().is_err() {
            anyhow::bail!("Another instance of shiftr is already running");
        }
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        if let Err(e) = fs::remove_file(&self.path) {
            Log::log_warning(&format!("Failed to remove lock file: {}", e));
        }
    }
}

/// Remove a socket file left behind by an instance that did not exit
/// cleanly. Only called while holding the instance lock. Anything that is
/// not a socket is left alone.
fn remove_stale_socket(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            Log::log_verbose(&format!("Removing stale socket {}", path_for_display(path)));
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove stale socket {}", path_for_display(path)))
        }
        _ => Ok(()),
    }
}
