//! Gamma adjustment methods.
//!
//! The daemon never touches display hardware itself. Every color setting it
//! computes is handed to a [`GammaMethod`], chosen by name at startup and
//! configured through string key/value options.
//!
//! ## Available methods
//!
//! - **hyprsunset**: IPC client for a running hyprsunset daemon
//! - **dummy**: logs the settings it would apply, affects nothing
//!
//! ## Selection
//!
//! An explicitly requested method is configured from its config file
//! section, then from the command line, and must start. Without a request
//! every method is tried in [`METHOD_NAMES`] order and the first one that
//! starts is used.

use anyhow::{Context, Result};

use crate::color::ColorSetting;
use crate::logger::Log;

pub mod dummy;
pub mod hyprsunset;

pub use dummy::DummyMethod;
pub use hyprsunset::HyprsunsetMethod;

/// A way of applying color settings to the display.
#[cfg_attr(test, mockall::automock)]
pub trait GammaMethod {
    fn name(&self) -> &'static str;

    /// Whether the method takes part in automatic selection.
    fn autostart(&self) -> bool;

    /// Print the method's options.
    fn print_help(&self);

    /// Apply one configuration option.
    fn set_option(&mut self, key: &str, value: &str) -> Result<()>;

    /// Connect to the display or daemon after all options are set.
    fn start(&mut self) -> Result<()>;

    /// Apply a color setting.
    ///
    /// With `preserve_gamma` the method layers the adjustment on top of the
    /// ramps that were active at startup, where it can.
    fn set_temperature(&mut self, setting: &ColorSetting, preserve_gamma: bool) -> Result<()>;

    /// Put the display back into the state found at startup.
    fn restore(&mut self) -> Result<()>;

    /// Release connections and other resources.
    fn teardown(&mut self) {}
}

/// Methods in the order they are tried when none is requested.
pub const METHOD_NAMES: &[&str] = &["hyprsunset", "dummy"];

/// Construct a method by name.
pub fn create_method(name: &str) -> Result<Box<dyn GammaMethod>> {
    match name {
        "hyprsunset" => Ok(Box::new(HyprsunsetMethod::new())),
        "dummy" => Ok(Box::new(DummyMethod::new())),
        _ => anyhow::bail!(
            "Unknown adjustment method `{}'. Available methods: {}",
            name,
            METHOD_NAMES.join(", ")
        ),
    }
}

/// Configure and start one method.
///
/// Config section options go first so the command line overrides them.
pub fn method_try_start(
    method: &mut dyn GammaMethod,
    section: &[(String, String)],
    args: &[(String, String)],
) -> Result<()> {
    for (key, value) in section.iter().chain(args.iter()) {
        method.set_option(key, value).with_context(|| {
            format!(
                "Failed to set {} option. Try `-m {}:help' for more information",
                method.name(),
                method.name()
            )
        })?;
    }
    method
        .start()
        .with_context(|| format!("Failed to start adjustment method {}", method.name()))
}

/// Start the requested method, or the first automatic one that works.
pub fn methods_try_start_all(
    requested: Option<&str>,
    args: &[(String, String)],
    section_for: impl Fn(&str) -> Vec<(String, String)>,
) -> Result<Box<dyn GammaMethod>> {
    if let Some(name) = requested {
        let mut method = create_method(name)?;
        method_try_start(method.as_mut(), &section_for(name), args)?;
        return Ok(method);
    }

    for name in METHOD_NAMES {
        let mut method = create_method(name)?;
        if !method.autostart() {
            continue;
        }
        match method_try_start(method.as_mut(), &section_for(name), &[]) {
            Ok(()) => {
                Log::log_decorated(&format!("Using method `{}'", name));
                return Ok(method);
            }
            Err(e) => {
                Log::log_warning(&format!("{:#}", e));
                Log::log_indented("Trying next method...");
            }
        }
    }

    anyhow::bail!("No more methods to try")
}

/// Print the names of all methods.
pub fn list_methods() {
    Log::log_block_start("Available adjustment methods:");
    for name in METHOD_NAMES {
        Log::log_indented(name);
    }
    Log::log_pipe();
    Log::log_indented("Specify colon-separated options with `-m METHOD:OPTIONS'.");
    Log::log_indented("Try `-m METHOD:help' for help.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::*;

    #[test]
    fn test_create_method_by_name() {
        assert_eq!(create_method("dummy").unwrap().name(), "dummy");
        assert_eq!(create_method("hyprsunset").unwrap().name(), "hyprsunset");
        let err = create_method("drm").err().unwrap();
        assert!(err.to_string().contains("drm"));
    }

    #[test]
    fn test_method_options_section_before_args() {
        let mut method = MockGammaMethod::new();
        let mut seq = mockall::Sequence::new();
        method
            .expect_set_option()
            .with(eq("crtc"), eq("0"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        method
            .expect_set_option()
            .with(eq("crtc"), eq("1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        method.expect_start().times(1).in_sequence(&mut seq).returning(|| Ok(()));

        let section = vec![("crtc".to_string(), "0".to_string())];
        let args = vec![("crtc".to_string(), "1".to_string())];
        method_try_start(&mut method, &section, &args).unwrap();
    }

    #[test]
    fn test_method_bad_option_stops_before_start() {
        let mut method = MockGammaMethod::new();
        method
            .expect_set_option()
            .returning(|key, _| anyhow::bail!("Unknown method parameter: `{}'", key));
        method.expect_name().return_const("mock");
        method.expect_start().never();

        let args = vec![("bogus".to_string(), "1".to_string())];
        let err = method_try_start(&mut method, &[], &args).unwrap_err();
        assert!(format!("{:#}", err).contains("-m mock:help"));
    }

    #[test]
    fn test_requested_dummy_starts() {
        Log::set_enabled(false);
        let method = methods_try_start_all(Some("dummy"), &[], |_| Vec::new());
        Log::set_enabled(true);
        assert_eq!(method.unwrap().name(), "dummy");
    }
}
