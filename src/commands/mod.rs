//! Runtime control protocol.
//!
//! Line-oriented commands arrive on standard input and on a Unix socket.
//! [`poll::CommandFds`] owns the descriptors, [`buffer`] frames lines per
//! source and [`parser`] applies each line to the running scheme.
//! [`client::send_commands`] is the sending side used by `--send`.

pub mod buffer;
pub mod client;
pub mod parser;
pub mod poll;

pub use buffer::{CommandBuffer, ReadOutcome};
pub use client::send_commands;
pub use parser::{CommandTarget, parse_command};
pub use poll::CommandFds;
