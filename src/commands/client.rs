//! Sending commands to a running instance.

use anyhow::{Context, Result};
use std::io::Write;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::Path;

use crate::utils::path_for_display;

/// Connect to the control socket and write each command as one line.
///
/// Fire and forget: nothing is read back, so a command the daemon does not
/// understand is dropped silently on its side.
pub fn send_commands(socket: &Path, commands: &[String]) -> Result<()> {
    if commands.is_empty() {
        anyhow::bail!("No commands to send");
    }

    let mut stream = UnixStream::connect(socket)
        .with_context(|| format!("Failed to connect to {}", path_for_display(socket)))?;

    for command in commands {
        let mut line = Vec::with_capacity(command.len() + 1);
        line.extend_from_slice(command.as_bytes());
        line.push(b'\n');
        stream
            .write_all(&line)
            .with_context(|| format!("Failed to send command `{}'", command))?;
    }

    stream.flush().context("Failed to flush control socket")?;
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}
