//! Signal handling and process-wide control flags.
//!
//! Exit and disable-toggle requests can arrive asynchronously (signals, the
//! `shutdown` command). They are recorded in a [`ControlContext`] and
//! consumed by the control loop once per tick, so no work happens inside a
//! signal handler.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGINT, SIGQUIT, SIGTERM, SIGUSR1},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use crate::logger::Log;

/// Cancellation and control flags shared with the control loop.
///
/// Cloning shares the same flags.
#[derive(Debug, Clone, Default)]
pub struct ControlContext {
    exit_requested: Arc<AtomicBool>,
    toggle_requested: Arc<AtomicBool>,
}

impl ControlContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the daemon to fade out and stop.
    pub fn request_exit(&self) {
        self.exit_requested.store(true, Ordering::SeqCst);
    }

    /// Ask the daemon to flip between enabled and disabled.
    pub fn request_toggle(&self) {
        self.toggle_requested.store(true, Ordering::SeqCst);
    }

    /// Consume a pending exit request.
    pub fn take_exit(&self) -> bool {
        self.exit_requested.swap(false, Ordering::SeqCst)
    }

    /// Consume a pending toggle request.
    pub fn take_toggle(&self) -> bool {
        self.toggle_requested.swap(false, Ordering::SeqCst)
    }

    /// Whether any request is waiting, without consuming it.
    pub fn has_pending(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst) || self.toggle_requested.load(Ordering::SeqCst)
    }
}

/// Install handlers for termination and toggle signals.
///
/// SIGINT, SIGTERM and SIGQUIT request an exit; SIGUSR1 toggles the
/// disabled state. A background thread receives the signals and updates
/// `control`.
pub fn setup_signal_handler(control: &ControlContext) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM, SIGQUIT, SIGUSR1])
        .context("Failed to register signal handlers")?;
    let control = control.clone();

    thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                match signal {
                    SIGUSR1 => {
                        Log::log_verbose("Toggle signal received");
                        control.request_toggle();
                    }
                    _ => {
                        Log::log_pipe();
                        Log::log_info(&format!("Shutdown signal received: {}", signal));
                        control.request_exit();
                    }
                }
            }
        })
        .context("Failed to spawn signal handling thread")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_are_consumed_once() {
        let control = ControlContext::new();
        assert!(!control.has_pending());

        control.request_exit();
        assert!(control.has_pending());
        assert!(control.take_exit());
        assert!(!control.take_exit());

        control.request_toggle();
        assert!(control.take_toggle());
        assert!(!control.take_toggle());
        assert!(!control.has_pending());
    }

    #[test]
    fn test_clones_share_flags() {
        let control = ControlContext::new();
        let handle = control.clone();
        handle.request_exit();
        assert!(control.take_exit());
    }
}
