//! Period change hooks.
//!
//! Every executable file in the hooks directory is started with the
//! arguments `period-changed <previous> <current>` whenever the period
//! changes, using lower-case period names (`none`, `daytime`, `night`,
//! `transition`). Hooks run detached: the loop never waits for them, and a
//! background thread reaps each one and logs a failing exit status.

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::logger::Log;
use crate::period::Period;
use crate::utils::path_for_display;

/// Default hooks directory, `$XDG_CONFIG_HOME/shiftr/hooks`.
pub fn default_hooks_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("shiftr").join("hooks"))
}

/// Start every hook in `dir` for a change from `prev` to `period`.
///
/// Returns the number of hooks started. A missing directory means there
/// are no hooks; other failures are logged and skipped.
pub fn signal_period_change(dir: &Path, prev: Period, period: Period) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            Log::log_warning(&format!("Failed to read hooks directory {}: {}", path_for_display(dir), e));
            return 0;
        }
    };

    let mut hooks: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_executable(path))
        .collect();
    hooks.sort();

    let mut started = 0;
    for hook in &hooks {
        match spawn_hook(hook, prev, period) {
            Ok(()) => started += 1,
            Err(e) => Log::log_warning(&format!("{:#}", e)),
        }
    }
    started
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn spawn_hook(hook: &Path, prev: Period, period: Period) -> Result<()> {
    let mut child = Command::new(hook)
        .arg("period-changed")
        .arg(prev.name().to_lowercase())
        .arg(period.name().to_lowercase())
        .stdin(Stdio::null())
        .spawn()
        .with_context(|| format!("Failed to run hook {}", path_for_display(hook)))?;

    let name = path_for_display(hook);
    thread::spawn(move || match child.wait() {
        Ok(status) if !status.success() => {
            Log::log_warning(&format!("Hook {} exited with {}", name, status));
        }
        Ok(_) => {}
        Err(e) => Log::log_warning(&format!("Failed to wait for hook {}: {}", name, e)),
    });
    Ok(())
}
