//! Helpers for integration tests, built with the `testing-support` feature.

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::backend::GammaMethod;
use crate::color::ColorSetting;

/// What a [`RecordingMethod`] saw, shared with the test.
#[derive(Debug, Default)]
pub struct Recording {
    pub applied: Vec<(ColorSetting, bool)>,
    pub restores: usize,
    pub started: bool,
}

/// Gamma method that records every call instead of touching a display.
///
/// `on_apply` runs after each recorded setting, which lets a test drive the
/// loop (for example request an exit once a target is reached).
pub struct RecordingMethod {
    recording: Arc<Mutex<Recording>>,
    on_apply: Box<dyn FnMut(&ColorSetting) -> Result<()> + Send>,
}

impl RecordingMethod {
    pub fn new() -> (Self, Arc<Mutex<Recording>>) {
        Self::with_hook(|_| Ok(()))
    }

    pub fn with_hook(
        on_apply: impl FnMut(&ColorSetting) -> Result<()> + Send + 'static,
    ) -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        (
            Self {
                recording: Arc::clone(&recording),
                on_apply: Box::new(on_apply),
            },
            recording,
        )
    }

    fn record(&self) -> std::sync::MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl GammaMethod for RecordingMethod {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn autostart(&self) -> bool {
        false
    }

    fn print_help(&self) {}

    fn set_option(&mut self, key: &str, _value: &str) -> Result<()> {
        anyhow::bail!("Unknown method parameter: `{}'", key)
    }

    fn start(&mut self) -> Result<()> {
        self.record().started = true;
        Ok(())
    }

    fn set_temperature(&mut self, setting: &ColorSetting, preserve_gamma: bool) -> Result<()> {
        self.record().applied.push((*setting, preserve_gamma));
        (self.on_apply)(setting)
    }

    fn restore(&mut self) -> Result<()> {
        self.record().restores += 1;
        Ok(())
    }
}
