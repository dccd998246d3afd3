//! Method that only reports what it would do.

use anyhow::Result;

use super::GammaMethod;
use crate::color::ColorSetting;
use crate::logger::Log;

#[derive(Debug, Default)]
pub struct DummyMethod {
    /// Last setting passed to `set_temperature`.
    last: Option<ColorSetting>,
}

impl DummyMethod {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_setting(&self) -> Option<ColorSetting> {
        self.last
    }
}

impl GammaMethod for DummyMethod {
    fn name(&self) -> &'static str {
        "dummy"
    }

    fn autostart(&self) -> bool {
        true
    }

    fn print_help(&self) {
        Log::log_block_start("Does not affect the display but prints the color temperature.");
    }

    fn set_option(&mut self, key: &str, _value: &str) -> Result<()> {
        anyhow::bail!("Unknown method parameter: `{}'", key)
    }

    fn start(&mut self) -> Result<()> {
        Log::log_warning("Using dummy gamma method! Display will not be affected by this gamma method.");
        Ok(())
    }

    fn set_temperature(&mut self, setting: &ColorSetting, _preserve_gamma: bool) -> Result<()> {
        Log::log_decorated(&format!("Temperature: {}", setting.temperature));
        self.last = Some(*setting);
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        self.last = None;
        Ok(())
    }
}
