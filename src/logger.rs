//! Structured logging with box-drawing output.
//!
//! Status lines are grouped into blocks (`┣`) with indented details (`┃`),
//! level-tagged lines carry a `[LEVEL]` prefix. Warnings and errors go to
//! stderr so that piping the daemon's stdout only captures status output.
//!
//! Two global switches exist: logging as a whole (tests run quiet) and
//! verbose diagnostics, which the daemon only emits when `-v` is given.

use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static VERBOSE_ENABLED: AtomicBool = AtomicBool::new(false);

/// Log level enumeration for categorizing message importance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Log,  // Normal operational logs
    Warn, // Non-fatal issues
    Err,  // Recoverable failures
    Crit, // Failures that end the daemon
    Info, // Status updates
}

impl LogLevel {
    fn prefix(self) -> &'static str {
        match self {
            LogLevel::Log => "[LOG]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Err => "[ERR]",
            LogLevel::Crit => "[CRIT]",
            LogLevel::Info => "[INFO]",
        }
    }

    fn to_stderr(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Err | LogLevel::Crit)
    }
}

/// Main logging interface providing structured output formatting.
pub struct Log;

impl Log {
    /// Enable or disable all output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable or disable verbose diagnostics (`-v`).
    pub fn set_verbose(verbose: bool) {
        VERBOSE_ENABLED.store(verbose, Ordering::SeqCst);
    }

    pub fn is_verbose() -> bool {
        Self::is_enabled() && VERBOSE_ENABLED.load(Ordering::SeqCst)
    }

    /// Print a message with its level prefix.
    ///
    /// # Arguments
    /// * `level` - LogLevel deciding the prefix and the output stream
    /// * `message` - Text content to log
    pub fn log(level: LogLevel, message: &str) {
        if !Self::is_enabled() {
            return;
        }

        if level.to_stderr() {
            eprintln!("{} {}", level.prefix(), message);
        } else {
            println!("{} {}", level.prefix(), message);
        }
    }

    // ═══ Convenience Methods for Common Log Levels ═══

    pub fn log_error(message: &str) {
        Self::log(LogLevel::Err, message);
    }

    pub fn log_warning(message: &str) {
        Self::log(LogLevel::Warn, message);
    }

    pub fn log_info(message: &str) {
        Self::log(LogLevel::Info, message);
    }

    pub fn log_debug(message: &str) {
        Self::log(LogLevel::Log, message);
    }

    pub fn log_critical(message: &str) {
        Self::log(LogLevel::Crit, message);
    }

    /// Log a decorated status line, only when verbose output is on.
    pub fn log_verbose(message: &str) {
        if Self::is_verbose() {
            println!("┣ {}", message);
        }
    }

    // ═══ Visual Formatting Functions ═══

    /// Main status line with a branching indicator.
    pub fn log_decorated(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┣ {}", message);
    }

    /// Detail line under the preceding status line.
    pub fn log_indented(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┃   {}", message);
    }

    pub fn log_pipe() {
        if !Self::is_enabled() {
            return;
        }
        println!("┃");
    }

    /// Start a new block of related output.
    pub fn log_block_start(message: &str) {
        if !Self::is_enabled() {
            return;
        }
        println!("┃");
        println!("┣ {}", message);
    }

    /// Header printed once at startup.
    pub fn log_version() {
        if !Self::is_enabled() {
            return;
        }
        println!("┏ shiftr v{} ━━╸", env!("CARGO_PKG_VERSION"));
        println!("┃");
    }

    /// Closes the visual structure when the daemon ends.
    pub fn log_end() {
        if !Self::is_enabled() {
            return;
        }
        println!("╹");
    }
}
