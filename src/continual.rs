//! The continual adjustment loop.
//!
//! Each tick computes the period and target setting, advances the fade and
//! hands the result to the gamma method. Between ticks the loop waits in
//! poll(2) on the command descriptors, so control traffic, location updates
//! and signals cut the wait short. A shutdown request disables adjustment,
//! lets the fade back to neutral finish and then leaves the loop; the
//! method's `restore` runs exactly once on every way out.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::backend::GammaMethod;
use crate::color::ColorSetting;
use crate::commands::{CommandFds, CommandTarget};
use crate::constants::*;
use crate::fade::Fader;
use crate::hooks::signal_period_change;
use crate::location::{Location, LocationProvider};
use crate::logger::Log;
use crate::period::{self, Period, describe_period};
use crate::scheme::TransitionScheme;
use crate::signals::ControlContext;

/// Tick lengths of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTiming {
    /// Wait between ticks while idle.
    pub idle: Duration,
    /// Wait between ticks while fading.
    pub fade: Duration,
    /// Longest single poll before the control flags are checked again.
    pub check_interval: Duration,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            idle: Duration::from_millis(SLEEP_DURATION_MS),
            fade: Duration::from_millis(SLEEP_DURATION_SHORT_MS),
            check_interval: Duration::from_millis(CHECK_INTERVAL_MS),
        }
    }
}

/// State owned by the loop for its whole run.
pub struct ContinualMode {
    pub scheme: TransitionScheme,
    /// Last known location; required for elevation-based schemes.
    pub location: Option<Location>,
    /// Dynamic provider whose descriptor sits in the poll set.
    pub provider: Option<Box<dyn LocationProvider>>,
    pub use_fade: bool,
    pub preserve_gamma: bool,
    pub timing: LoopTiming,
    /// Directory of period change hooks.
    pub hooks: Option<PathBuf>,
}

/// Run until shutdown, then restore the display.
///
/// A failing `set_temperature` ends the loop with that error after the
/// display was restored.
pub fn run_continual_mode(
    mode: &mut ContinualMode,
    method: &mut dyn GammaMethod,
    fds: &mut CommandFds,
    control: &ControlContext,
) -> Result<()> {
    let result = adjust_until_done(mode, method, fds, control);
    if result.is_err() {
        Log::log_critical("Adjustment loop failed, restoring display");
    }

    if let Err(e) = method.restore() {
        Log::log_warning(&format!("Failed to restore display: {:#}", e));
    }
    result
}

fn adjust_until_done(
    mode: &mut ContinualMode,
    method: &mut dyn GammaMethod,
    fds: &mut CommandFds,
    control: &ControlContext,
) -> Result<()> {
    fds.set_location_fd(mode.provider.as_ref().and_then(|p| p.descriptor()))
        .context("Failed to watch location provider")?;

    let mut fader = Fader::new(mode.use_fade);
    let mut disabled = false;
    let mut done = false;
    let mut first_tick = true;

    let mut prev_disabled = true;
    let mut prev_period = Period::None;
    let mut prev_target = ColorSetting::neutral();
    let mut last_applied = ColorSetting::neutral();

    loop {
        if control.take_toggle() && !done {
            disabled = !disabled;
        }
        if control.take_exit() {
            if done {
                // second request: stop without waiting for the fade
                break;
            }
            done = true;
        }
        if done {
            disabled = true;
        }

        if disabled != prev_disabled {
            Log::log_verbose(&format!(
                "Status: {}",
                if disabled { "Disabled" } else { "Enabled" }
            ));
        }

        let (period, target) = if disabled {
            (Period::None, ColorSetting::neutral())
        } else {
            let (period, progress, elevation) =
                period::evaluate(&mode.scheme, Utc::now(), mode.location.as_ref());
            if let Some(elevation) = elevation {
                Log::log_verbose(&format!("Solar elevation: {:.2}°", elevation));
            }
            if period != prev_period || period == Period::Transition {
                Log::log_verbose(&describe_period(period, progress));
            }
            (period, mode.scheme.interpolate(progress))
        };

        if period != prev_period {
            if let Some(dir) = mode.hooks.as_deref() {
                signal_period_change(dir, prev_period, period);
            }
        }

        if target.temperature != prev_target.temperature {
            Log::log_verbose(&format!("Color temperature: {}K", target.temperature));
        }
        if target.brightness != prev_target.brightness {
            Log::log_verbose(&format!("Brightness: {:.2}", target.brightness));
        }

        let (applied, fade_started) = fader.step(&target);
        if fade_started {
            Log::log_verbose(&format!(
                "Fading to {}K over {} steps",
                target.temperature, FADE_LENGTH
            ));
        }

        if done && !fader.is_fading() {
            break;
        }

        if first_tick || applied.diff(&last_applied) {
            method
                .set_temperature(&applied, mode.preserve_gamma)
                .context("Temperature adjustment failed")?;
            last_applied = applied;
            first_tick = false;
        }

        fader.commit_target(&target);
        prev_target = target;
        prev_disabled = disabled;
        prev_period = period;

        let delay = if fader.is_fading() {
            mode.timing.fade
        } else {
            mode.timing.idle
        };
        let current = *fader.applied();
        wait_for_next_tick(mode, fds, control, delay, &current, &mut disabled)?;
    }

    Ok(())
}

/// Wait up to `delay`, servicing commands and location updates.
///
/// Returns early when a command changed state or a control request is
/// pending, so the next tick picks it up at once.
fn wait_for_next_tick(
    mode: &mut ContinualMode,
    fds: &mut CommandFds,
    control: &ControlContext,
    delay: Duration,
    current: &ColorSetting,
    disabled: &mut bool,
) -> Result<()> {
    let deadline = Instant::now() + delay;

    loop {
        if control.has_pending() {
            return Ok(());
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(());
        }

        let ready = fds
            .poll(Some(remaining.min(mode.timing.check_interval)))
            .context("Failed to poll command descriptors")?;
        if ready == 0 {
            continue;
        }

        if fds.location_ready() {
            update_location(mode)?;
        }

        let mut target = CommandTarget {
            scheme: &mut mode.scheme,
            current,
            disabled: &mut *disabled,
            control,
        };
        if fds.handle_poll_results(&mut target) > 0 {
            return Ok(());
        }
    }
}

/// Take a new fix from the dynamic provider, keeping the last known one when
/// no valid fix is available.
fn update_location(mode: &mut ContinualMode) -> Result<()> {
    let Some(provider) = mode.provider.as_mut() else {
        return Ok(());
    };
    let fix = provider.handle().context("Location provider failed")?;

    if !fix.available {
        Log::log_warning("Location is temporarily unavailable; using previous location until it becomes available...");
        return Ok(());
    }
    if !fix.location.is_valid() {
        Log::log_warning(&format!("Ignoring invalid location update: {}", fix.location));
        return Ok(());
    }
    if mode.location != Some(fix.location) {
        Log::log_decorated(&fix.location.to_string());
        mode.location = Some(fix.location);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockGammaMethod;
    use crate::location::LocationFix;
    use crate::scheme::TimeRange;
    use serial_test::serial;
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::os::fd::{AsFd, BorrowedFd};
    use std::os::unix::fs::PermissionsExt;
    use std::os::unix::net::UnixStream;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scheme whose target is `temperature` at any time of day.
    fn constant_scheme(temperature: i32) -> TransitionScheme {
        let setting = ColorSetting::new(temperature, [1.0; 3], 1.0);
        TransitionScheme::with_times(
            setting,
            setting,
            TimeRange::new(6 * 3600, 7 * 3600),
            TimeRange::new(18 * 3600, 19 * 3600),
        )
        .unwrap()
    }

    fn mode(temperature: i32, use_fade: bool) -> ContinualMode {
        ContinualMode {
            scheme: constant_scheme(temperature),
            location: None,
            provider: None,
            use_fade,
            preserve_gamma: true,
            timing: LoopTiming {
                idle: Duration::from_millis(20),
                fade: Duration::from_millis(1),
                check_interval: Duration::from_millis(10),
            },
            hooks: None,
        }
    }

    /// Mock recording each applied temperature and calling `on_apply`.
    fn recording_method(
        control: &ControlContext,
        on_apply: impl Fn(&ControlContext, i32) + Send + 'static,
    ) -> (MockGammaMethod, Arc<Mutex<Vec<i32>>>) {
        let applied = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&applied);
        let control = control.clone();
        let mut method = MockGammaMethod::new();
        method.expect_set_temperature().returning(move |setting, preserve| {
            assert!(preserve);
            sink.lock().unwrap().push(setting.temperature);
            on_apply(&control, setting.temperature);
            Ok(())
        });
        (method, applied)
    }

    #[test]
    fn test_shutdown_without_fade_applies_once_and_restores() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let (mut method, applied) = recording_method(&control, |c, _| c.request_exit());
        method.expect_restore().times(1).returning(|| Ok(()));

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut mode(4000, false), &mut method, &mut fds, &control).unwrap();
        Log::set_enabled(true);

        assert_eq!(*applied.lock().unwrap(), vec![4000]);
    }

    #[test]
    fn test_fade_in_then_fade_out_on_shutdown() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let (mut method, applied) = recording_method(&control, |c, temp| {
            if temp == 3500 {
                c.request_exit();
            }
        });
        method.expect_restore().times(1).returning(|| Ok(()));

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut mode(3500, true), &mut method, &mut fds, &control).unwrap();
        Log::set_enabled(true);

        let applied = applied.lock().unwrap().clone();
        let bottom = applied.iter().position(|&t| t == 3500).unwrap();
        assert!(bottom > 1, "startup change should fade, got {:?}", applied);
        assert!(applied[0] < NEUTRAL_TEMP);
        assert!(applied[..=bottom].windows(2).all(|w| w[0] >= w[1]));
        assert!(applied[bottom..].windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*applied.last().unwrap(), NEUTRAL_TEMP);
        assert!(applied.len() <= 2 * (FADE_LENGTH as usize + 1));
    }

    #[test]
    fn test_second_exit_request_skips_fade() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let reached = Arc::new(AtomicBool::new(false));
        let (mut method, applied) = recording_method(&control, move |c, temp| {
            if temp == 3500 {
                reached.store(true, Ordering::SeqCst);
                c.request_exit();
            } else if reached.load(Ordering::SeqCst) {
                // first step of the fade back to neutral
                c.request_exit();
            }
        });
        method.expect_restore().times(1).returning(|| Ok(()));

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut mode(3500, true), &mut method, &mut fds, &control).unwrap();
        Log::set_enabled(true);

        let applied = applied.lock().unwrap().clone();
        let last = *applied.last().unwrap();
        assert!(last > 3500 && last < NEUTRAL_TEMP, "got {:?}", applied);
    }

    #[test]
    fn test_backend_failure_restores_and_errors() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let mut method = MockGammaMethod::new();
        method
            .expect_set_temperature()
            .times(1)
            .returning(|_, _| anyhow::bail!("display gone"));
        method.expect_restore().times(1).returning(|| Ok(()));

        let mut fds = CommandFds::new(1);
        let err = run_continual_mode(&mut mode(4000, false), &mut method, &mut fds, &control).unwrap_err();
        Log::set_enabled(true);

        assert!(format!("{:#}", err).contains("display gone"));
    }

    #[test]
    fn test_toggle_request_applies_neutral() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let (mut method, applied) = recording_method(&control, |c, temp| {
            if temp == 4000 {
                c.request_toggle();
            } else {
                c.request_exit();
            }
        });
        method.expect_restore().times(1).returning(|| Ok(()));

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut mode(4000, false), &mut method, &mut fds, &control).unwrap();
        Log::set_enabled(true);

        assert_eq!(*applied.lock().unwrap(), vec![4000, NEUTRAL_TEMP]);
    }

    #[test]
    fn test_command_input_changes_target() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let (mut method, applied) = recording_method(&control, |c, temp| {
            if temp == 3000 {
                c.request_exit();
            }
        });
        method.expect_restore().times(1).returning(|| Ok(()));

        let mut fds = CommandFds::new(1);
        let (mut tx, rx) = UnixStream::pair().unwrap();
        fds.set_input(rx);
        tx.write_all(b"temp 3000\n").unwrap();

        let mut m = mode(5000, false);
        m.timing.idle = Duration::from_secs(30);
        run_continual_mode(&mut m, &mut method, &mut fds, &control).unwrap();
        Log::set_enabled(true);

        assert_eq!(*applied.lock().unwrap(), vec![5000, 3000]);
    }

    #[test]
    fn test_unchanged_setting_not_reapplied() {
        Log::set_enabled(false);
        let control = ControlContext::new();
        let mut method = MockGammaMethod::new();
        method.expect_set_temperature().times(1).returning(|_, _| Ok(()));
        method.expect_restore().times(1).returning(|| Ok(()));

        // several idle ticks pass before the exit request arrives
        let stopper = control.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            stopper.request_exit();
        });

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut mode(4000, false), &mut method, &mut fds, &control).unwrap();
        handle.join().unwrap();
        Log::set_enabled(true);
    }

    /// Dynamic provider handing out one scripted fix per wake-up byte and
    /// requesting exit once the script is used up.
    struct ScriptedProvider {
        wakeups: UnixStream,
        fixes: VecDeque<LocationFix>,
        handled: Arc<AtomicUsize>,
        control: ControlContext,
    }

    impl LocationProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn print_help(&self) {}
        fn set_option(&mut self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }
        fn start(&mut self) -> Result<()> {
            Ok(())
        }
        fn descriptor(&self) -> Option<BorrowedFd<'_>> {
            Some(self.wakeups.as_fd())
        }
        fn handle(&mut self) -> Result<LocationFix> {
            let mut byte = [0u8; 1];
            self.wakeups.read_exact(&mut byte)?;
            self.handled.fetch_add(1, Ordering::SeqCst);
            let fix = self.fixes.pop_front().unwrap();
            if self.fixes.is_empty() {
                self.control.request_exit();
            }
            Ok(fix)
        }
        fn is_dynamic(&self) -> bool {
            true
        }
    }

    /// Run the loop with a provider that delivers `fixes`, starting from
    /// `start` as the known location.
    fn run_with_fixes(start: Location, fixes: &[LocationFix]) -> (ContinualMode, usize, Vec<i32>) {
        let control = ControlContext::new();
        let (mut method, applied) = recording_method(&control, |_, _| {});
        method.expect_restore().times(1).returning(|| Ok(()));

        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(&vec![b'x'; fixes.len()]).unwrap();
        let handled = Arc::new(AtomicUsize::new(0));

        let mut m = mode(4000, false);
        m.location = Some(start);
        m.provider = Some(Box::new(ScriptedProvider {
            wakeups: rx,
            fixes: fixes.iter().copied().collect(),
            handled: Arc::clone(&handled),
            control: control.clone(),
        }));

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut m, &mut method, &mut fds, &control).unwrap();
        let applied = applied.lock().unwrap().clone();
        (m, handled.load(Ordering::SeqCst), applied)
    }

    #[test]
    fn test_unusable_location_updates_keep_last_known() {
        Log::set_enabled(false);
        let munich = Location::new(48.1, 11.6);
        let fixes = [
            LocationFix { location: Location::unknown(), available: false },
            LocationFix { location: Location::new(95.0, 11.6), available: true },
        ];
        let (m, handled, applied) = run_with_fixes(munich, &fixes);
        Log::set_enabled(true);

        assert_eq!(handled, 2);
        assert_eq!(m.location, Some(munich));
        assert_eq!(applied, vec![4000]);
    }

    #[test]
    fn test_valid_location_update_replaces_last_known() {
        Log::set_enabled(false);
        let berlin = Location::new(52.5, 13.4);
        let fixes = [
            LocationFix { location: Location::unknown(), available: false },
            LocationFix { location: berlin, available: true },
        ];
        let (m, handled, _) = run_with_fixes(Location::new(48.1, 11.6), &fixes);
        Log::set_enabled(true);

        assert_eq!(handled, 2);
        assert_eq!(m.location, Some(berlin));
    }

    #[test]
    #[serial]
    fn test_period_changes_start_hooks() {
        Log::set_enabled(false);
        let dir = tempfile::tempdir().unwrap();
        let hooks = dir.path().join("hooks");
        let out = dir.path().join("out");
        std::fs::create_dir(&hooks).unwrap();
        let script = hooks.join("record");
        std::fs::write(&script, format!("#!/bin/sh\necho \"$@\" >> '{}'\n", out.display())).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let control = ControlContext::new();
        let (mut method, _) = recording_method(&control, |c, _| c.request_exit());
        method.expect_restore().times(1).returning(|| Ok(()));
        let mut m = mode(4000, false);
        m.hooks = Some(hooks);

        let mut fds = CommandFds::new(1);
        run_continual_mode(&mut m, &mut method, &mut fds, &control).unwrap();
        Log::set_enabled(true);

        // startup leaves `none`, shutdown returns to it; the hooks run
        // concurrently so their lines may land in either order
        let deadline = Instant::now() + Duration::from_secs(5);
        let lines = loop {
            let content = std::fs::read_to_string(&out).unwrap_or_default();
            if content.lines().count() >= 2 && content.ends_with('\n') {
                break content.lines().map(str::to_string).collect::<Vec<_>>();
            }
            assert!(Instant::now() < deadline, "hook output missing: {:?}", content);
            std::thread::sleep(Duration::from_millis(10));
        };
        assert!(lines.iter().any(|l| l.starts_with("period-changed none ") && !l.ends_with(" none")));
        assert!(lines.iter().any(|l| l.ends_with(" none") && !l.starts_with("period-changed none ")));
    }
}
