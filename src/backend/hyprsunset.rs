//! hyprsunset IPC method.
//!
//! Talks to a running hyprsunset daemon over its Unix socket. Each command
//! is a short text line on a fresh connection; hyprsunset may answer or just
//! close the connection, both count as success. Brightness maps onto
//! hyprsunset's gamma percentage. hyprsunset has no per-channel gamma, so
//! the gamma part of a setting is not applied.
//!
//! Retries sleep on the control loop's thread, so the back-off for one
//! command is capped at `RETRY_BUDGET_MS`.

use anyhow::{Context, Result};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use super::GammaMethod;
use crate::color::ColorSetting;
use crate::constants::*;
use crate::logger::Log;
use crate::utils::{path_for_display, runtime_dir};

/// Error classification for retry logic.
#[derive(Debug, PartialEq)]
enum ErrorType {
    Temporary,  // retry after RETRY_DELAY_MS
    Permanent,  // don't retry
    SocketGone, // hyprsunset may be restarting, back off longer
}

impl ErrorType {
    /// Pause before the next attempt, `None` when retrying is pointless.
    fn retry_delay(&self) -> Option<Duration> {
        match self {
            ErrorType::Temporary => Some(Duration::from_millis(RETRY_DELAY_MS)),
            ErrorType::Permanent => None,
            ErrorType::SocketGone => Some(Duration::from_millis(RETRY_DELAY_MS * 2)),
        }
    }
}

pub struct HyprsunsetMethod {
    socket_path: PathBuf,
    /// Setting last sent, so unchanged halves are not resent.
    last_sent: Option<(i32, u32)>,
}

impl Default for HyprsunsetMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl HyprsunsetMethod {
    /// Method pointed at hyprsunset's default socket.
    ///
    /// Same lookup as hyprsunset itself:
    /// `{runtime_dir}/hypr/{HYPRLAND_INSTANCE_SIGNATURE}/.hyprsunset.sock`.
    pub fn new() -> Self {
        let mut socket_path = runtime_dir().join("hypr");
        if let Ok(signature) = std::env::var("HYPRLAND_INSTANCE_SIGNATURE") {
            socket_path.push(signature);
        }
        socket_path.push(".hyprsunset.sock");

        Self {
            socket_path,
            last_sent: None,
        }
    }

    pub fn socket_path(&self) -> &std::path::Path {
        &self.socket_path
    }

    fn send_command(&mut self, command: &str) -> Result<()> {
        Log::log_verbose(&format!("Sending command: {}", command));
        self.send_command_with_retry(command, MAX_RETRIES)
    }

    fn send_command_with_retry(&mut self, command: &str, max_retries: u32) -> Result<()> {
        let budget = Duration::from_millis(RETRY_BUDGET_MS);
        let mut backed_off = Duration::ZERO;
        let mut attempts = 0;
        let mut last_error = None;

        for attempt in 0..max_retries {
            attempts = attempt + 1;
            match self.try_send_command(command) {
                Ok(()) => {
                    if attempt > 0 {
                        Log::log_decorated(&format!(
                            "Command succeeded on attempt {}/{}",
                            attempt + 1,
                            max_retries
                        ));
                    }
                    return Ok(());
                }
                Err(e) => {
                    let error_type = classify_error(&e);
                    Log::log_verbose(&format!(
                        "Attempt {}/{} failed ({:?}): {}",
                        attempt + 1,
                        max_retries,
                        error_type,
                        e
                    ));
                    last_error = Some(e);

                    let Some(delay) = error_type.retry_delay() else {
                        break;
                    };
                    if attempts == max_retries || backed_off + delay > budget {
                        break;
                    }
                    thread::sleep(delay);
                    backed_off += delay;
                }
            }
        }

        let error = last_error.unwrap_or_else(|| anyhow::anyhow!("No attempts were made"));
        Err(error.context(format!(
            "Failed to send command '{}' after {} attempts",
            command, attempts
        )))
    }

    fn try_send_command(&self, command: &str) -> Result<()> {
        let mut stream = UnixStream::connect(&self.socket_path).with_context(|| {
            format!("Failed to connect to socket at {}", path_for_display(&self.socket_path))
        })?;

        stream
            .set_read_timeout(Some(Duration::from_millis(SOCKET_TIMEOUT_MS)))
            .ok();
        stream
            .set_write_timeout(Some(Duration::from_millis(SOCKET_TIMEOUT_MS)))
            .ok();

        stream
            .write_all(command.as_bytes())
            .context("Failed to write command to socket")?;

        // hyprsunset may close the connection without answering
        let mut buffer = [0; SOCKET_BUFFER_SIZE];
        if let Ok(bytes_read) = stream.read(&mut buffer) {
            if bytes_read > 0 {
                let response = String::from_utf8_lossy(&buffer[..bytes_read]);
                Log::log_verbose(&format!("Response: {}", response.trim()));
            }
        }
        Ok(())
    }
}

/// hyprsunset's gamma is a percentage of full brightness.
fn brightness_percent(brightness: f32) -> u32 {
    (brightness * 100.0).round() as u32
}

fn classify_error(error: &anyhow::Error) -> ErrorType {
    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return match io_error.kind() {
            ErrorKind::ConnectionRefused
            | ErrorKind::NotFound
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset => ErrorType::SocketGone,
            ErrorKind::PermissionDenied | ErrorKind::InvalidInput => ErrorType::Permanent,
            _ => ErrorType::Temporary,
        };
    }

    let error_string = error.to_string().to_lowercase();
    if error_string.contains("permission denied") || error_string.contains("invalid command") {
        ErrorType::Permanent
    } else {
        ErrorType::Temporary
    }
}

impl GammaMethod for HyprsunsetMethod {
    fn name(&self) -> &'static str {
        "hyprsunset"
    }

    fn autostart(&self) -> bool {
        true
    }

    fn print_help(&self) {
        Log::log_block_start("Adjust gamma through a running hyprsunset daemon.");
        Log::log_indented("socket   Path of the hyprsunset IPC socket");
        Log::log_pipe();
        Log::log_indented("Brightness is sent as hyprsunset gamma (10-100%).");
        Log::log_indented("Per-channel gamma is not supported and ignored.");
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "socket" => {
                if value.is_empty() {
                    anyhow::bail!("Socket path must not be empty");
                }
                self.socket_path = PathBuf::from(value);
                Ok(())
            }
            _ => anyhow::bail!("Unknown method parameter: `{}'", key),
        }
    }

    fn start(&mut self) -> Result<()> {
        if !self.socket_path.exists() {
            anyhow::bail!(
                "hyprsunset socket not found at {}. Is hyprsunset running?",
                path_for_display(&self.socket_path)
            );
        }
        UnixStream::connect(&self.socket_path).with_context(|| {
            format!("Failed to connect to hyprsunset at {}", path_for_display(&self.socket_path))
        })?;
        self.last_sent = None;
        Ok(())
    }

    fn set_temperature(&mut self, setting: &ColorSetting, _preserve_gamma: bool) -> Result<()> {
        let temperature = setting.temperature;
        let percent = brightness_percent(setting.brightness);
        let previous = self.last_sent;

        if previous.map(|(t, _)| t) != Some(temperature) {
            self.send_command(&format!("temperature {}", temperature))?;
        }
        if previous.map(|(_, p)| p) != Some(percent) {
            self.send_command(&format!("gamma {}", percent))?;
        }
        self.last_sent = Some((temperature, percent));
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        self.last_sent = None;
        let identity = self.send_command("identity");
        let gamma = self.send_command("gamma 100");
        identity.and(gamma)
    }
}
