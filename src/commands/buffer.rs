//! Line framing for command input sources.
//!
//! Every source (standard input and each client connection) owns a
//! [`CommandBuffer`] of fixed capacity. Bytes are appended as they arrive,
//! complete lines are handed to the parser, and a line that does not fit the
//! buffer is dropped in full: the buffer is cleared and the source skips
//! everything up to the next newline.

use nix::errno::Errno;
use nix::sys::socket::{MsgFlags, recv};
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;

use super::parser::{CommandTarget, parse_command};
use crate::constants::COMMAND_BUFFER_SIZE;
use crate::logger::Log;

/// Result of servicing one readable input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// End of stream or a read error; the source must be deregistered.
    Closed,
    /// Data may have been buffered but no state changed.
    NoChange,
    /// At least one command changed state.
    Changed,
}

/// Capacity-bounded byte buffer with an overlong-line skip flag.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    data: Vec<u8>,
    capacity: usize,
    skipping: bool,
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            skipping: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free space left before the buffer is exhausted.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Whether the rest of an overlong line is being discarded.
    pub fn is_skipping(&self) -> bool {
        self.skipping
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append as much of `bytes` as fits, returning the number taken.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let taken = bytes.len().min(self.remaining());
        self.data.extend_from_slice(&bytes[..taken]);
        taken
    }

    pub fn find(&self, byte: u8) -> Option<usize> {
        self.data.iter().position(|&b| b == byte)
    }

    /// Remove and return the first `n` bytes.
    pub fn consume(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.data.len());
        self.data.drain(..n).collect()
    }

    /// Drop buffered data and leave skip mode.
    pub fn reset(&mut self) {
        self.data.clear();
        self.skipping = false;
    }

    /// Drop buffered data and discard input until the next newline.
    fn start_skipping(&mut self) {
        self.data.clear();
        self.skipping = true;
    }
}

/// Hand every complete buffered line to the parser.
///
/// A line that was being skipped is discarded when its newline shows up. If
/// the buffer is full and still holds no newline, its contents are dropped
/// and the source enters skip mode.
pub fn frame_lines(buffer: &mut CommandBuffer, target: &mut CommandTarget<'_>) -> bool {
    let mut changed = false;

    while let Some(pos) = buffer.find(b'\n') {
        let mut line = buffer.consume(pos + 1);
        line.pop();
        if buffer.skipping {
            buffer.skipping = false;
            continue;
        }
        changed |= parse_command(&line, target);
    }

    if buffer.is_full() {
        Log::log_verbose("Command line too long, discarding");
        buffer.start_skipping();
    }

    changed
}

/// Service a readable stream source such as standard input.
///
/// Reads what is available into the free part of the buffer and frames all
/// complete lines. Zero bytes or a read error mean the stream is closed.
pub fn handle_stream_input<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut CommandBuffer,
    target: &mut CommandTarget<'_>,
) -> ReadOutcome {
    let mut chunk = [0u8; COMMAND_BUFFER_SIZE];
    let room = buffer.remaining().min(chunk.len());

    let read = match reader.read(&mut chunk[..room]) {
        Ok(0) => return ReadOutcome::Closed,
        Ok(n) => n,
        Err(e) if matches!(e.kind(), io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock) => {
            return ReadOutcome::NoChange;
        }
        Err(_) => return ReadOutcome::Closed,
    };

    buffer.append(&chunk[..read]);
    outcome(frame_lines(buffer, target))
}

/// Service a readable client connection.
///
/// The pending data is peeked first and only bytes up to and including the
/// first newline are consumed, so a following command stays in the socket
/// for the next cycle. Without a newline the peeked bytes are consumed into
/// the buffer to wait for the rest of the line.
pub fn handle_socket_input(
    stream: &UnixStream,
    buffer: &mut CommandBuffer,
    target: &mut CommandTarget<'_>,
) -> ReadOutcome {
    let fd = stream.as_raw_fd();
    let mut chunk = [0u8; COMMAND_BUFFER_SIZE];
    let room = buffer.remaining().min(chunk.len());

    let peeked = match recv(fd, &mut chunk[..room], MsgFlags::MSG_PEEK | MsgFlags::MSG_DONTWAIT) {
        Ok(0) => return ReadOutcome::Closed,
        Ok(n) => n,
        Err(Errno::EINTR | Errno::EAGAIN) => return ReadOutcome::NoChange,
        Err(_) => return ReadOutcome::Closed,
    };

    let wanted = chunk[..peeked]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(peeked, |pos| pos + 1);

    match recv(fd, &mut chunk[..wanted], MsgFlags::MSG_DONTWAIT) {
        Ok(n) if n == wanted => {}
        _ => return ReadOutcome::Closed,
    }

    buffer.append(&chunk[..wanted]);
    outcome(frame_lines(buffer, target))
}

fn outcome(changed: bool) -> ReadOutcome {
    if changed {
        ReadOutcome::Changed
    } else {
        ReadOutcome::NoChange
    }
}

/// Unbuffered reader over a raw descriptor.
///
/// `std::io::Stdin` keeps its own buffer, which would hide pending bytes
/// from poll(2). Reading the descriptor directly keeps the two in sync.
#[derive(Debug)]
pub struct FdReader<F: AsFd>(pub F);

impl<F: AsFd> Read for FdReader<F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        nix::unistd::read(&self.0, buf).map_err(io::Error::from)
    }
}

impl<F: AsFd> AsFd for FdReader<F> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}
