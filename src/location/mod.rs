//! Location providers.
//!
//! Elevation-based scheduling needs the observer's coordinates. They come
//! from a [`LocationProvider`], selected by name at startup and configured
//! through string key/value options (config section first, then command
//! line). A dynamic provider exposes a descriptor that becomes readable when
//! a new fix is ready; the control loop folds it into its poll set.

use anyhow::{Context, Result};
use nix::poll::{PollFd, PollFlags};
use std::os::fd::BorrowedFd;
use std::time::{Duration, Instant};

use crate::constants::*;
use crate::logger::Log;
use crate::utils::poll_fds;

pub mod manual;

pub use manual::ManualProvider;

/// Geographic position in degrees. NaN in either field marks "unknown".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub const fn unknown() -> Self {
        Self {
            latitude: f64::NAN,
            longitude: f64::NAN,
        }
    }

    /// Both coordinates known and within their ranges.
    pub fn is_valid(&self) -> bool {
        (MIN_LAT..=MAX_LAT).contains(&self.latitude) && (MIN_LON..=MAX_LON).contains(&self.longitude)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Location: {:.2} {}, {:.2} {}",
            self.latitude.abs(),
            if self.latitude >= 0.0 { "N" } else { "S" },
            self.longitude.abs(),
            if self.longitude >= 0.0 { "E" } else { "W" }
        )
    }
}

/// Result of asking a provider for its position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub location: Location,
    /// False while the provider has no usable fix yet.
    pub available: bool,
}

/// A source of the observer's location.
pub trait LocationProvider {
    fn name(&self) -> &'static str;

    /// Print the provider's options.
    fn print_help(&self);

    /// Apply one configuration option.
    fn set_option(&mut self, key: &str, value: &str) -> Result<()>;

    /// Finish initialization after all options are set.
    fn start(&mut self) -> Result<()>;

    /// Descriptor that becomes readable when a new fix is ready.
    fn descriptor(&self) -> Option<BorrowedFd<'_>> {
        None
    }

    /// Collect the current fix, consuming any pending wake-up.
    fn handle(&mut self) -> Result<LocationFix>;

    /// Whether the location can change while running.
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Release provider resources.
    fn teardown(self: Box<Self>) {}
}

/// Providers in the order they are tried when none is requested.
pub const PROVIDER_NAMES: &[&str] = &["manual"];

/// Construct a provider by name.
pub fn create_provider(name: &str) -> Result<Box<dyn LocationProvider>> {
    match name {
        "manual" => Ok(Box::new(ManualProvider::new())),
        _ => anyhow::bail!(
            "Unknown location provider `{}'. Available providers: {}",
            name,
            PROVIDER_NAMES.join(", ")
        ),
    }
}

/// Configure and start one provider.
///
/// Options from the provider's config section are applied before the
/// command line options, so the command line wins.
pub fn provider_try_start(
    provider: &mut dyn LocationProvider,
    section: &[(String, String)],
    args: &[(String, String)],
) -> Result<()> {
    for (key, value) in section.iter().chain(args.iter()) {
        provider.set_option(key, value).with_context(|| {
            format!(
                "Failed to set {} option. Try `-l {}:help' for more information",
                provider.name(),
                provider.name()
            )
        })?;
    }
    provider
        .start()
        .with_context(|| format!("Failed to start provider {}", provider.name()))
}

/// Start the requested provider, or the first one that works.
pub fn providers_try_start_all(
    requested: Option<&str>,
    args: &[(String, String)],
    section_for: impl Fn(&str) -> Vec<(String, String)>,
) -> Result<Box<dyn LocationProvider>> {
    if let Some(name) = requested {
        let mut provider = create_provider(name)?;
        provider_try_start(provider.as_mut(), &section_for(name), args)?;
        return Ok(provider);
    }

    for name in PROVIDER_NAMES {
        Log::log_decorated(&format!("Trying location provider `{}'...", name));
        let mut provider = create_provider(name)?;
        match provider_try_start(provider.as_mut(), &section_for(name), &[]) {
            Ok(()) => {
                Log::log_decorated(&format!("Using provider `{}'", name));
                return Ok(provider);
            }
            Err(e) => {
                Log::log_warning(&format!("{:#}", e));
                Log::log_indented("Trying next provider...");
            }
        }
    }

    anyhow::bail!("No more location providers to try")
}

/// Print the names of all providers.
pub fn list_providers() {
    Log::log_block_start("Available location providers:");
    for name in PROVIDER_NAMES {
        Log::log_indented(name);
    }
    Log::log_pipe();
    Log::log_indented("Specify colon-separated options with `-l PROVIDER:OPTIONS'.");
    Log::log_indented("Try `-l PROVIDER:help' for help.");
}

/// Get the provider's location, waiting up to `timeout` for a dynamic one.
///
/// `None` waits until a fix is available. A zero timeout only checks.
/// Providers without a descriptor are asked once and never block.
pub fn provider_get_location(
    provider: &mut dyn LocationProvider,
    timeout: Option<Duration>,
) -> Result<LocationFix> {
    if provider.descriptor().is_none() {
        return provider.handle();
    }

    let mut remaining = timeout;
    loop {
        let started = Instant::now();
        let ready = wait_for_fix(provider, remaining)?;
        if ready == 0 && remaining.is_none() {
            // interrupted while waiting without a deadline
            continue;
        }
        if ready == 0 {
            return Ok(LocationFix {
                location: Location::unknown(),
                available: false,
            });
        }

        if let Some(left) = remaining {
            remaining = Some(left.saturating_sub(started.elapsed()));
        }

        let fix = provider.handle()?;
        if fix.available || remaining == Some(Duration::ZERO) {
            return Ok(fix);
        }
    }
}

/// Poll the provider's descriptor once.
fn wait_for_fix(provider: &dyn LocationProvider, timeout: Option<Duration>) -> Result<usize> {
    let Some(fd) = provider.descriptor() else {
        return Ok(1);
    };
    let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
    poll_fds(&mut fds, timeout).context("Failed to poll location provider")
}
