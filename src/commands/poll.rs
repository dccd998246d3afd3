//! Descriptor set for the control loop.
//!
//! All waiting in the daemon happens in one poll(2) call over a fixed
//! layout: slot 0 is the location provider's wake-up descriptor, slot 1 is
//! standard input, slot 2 the listening control socket and the remaining
//! slots hold accepted client connections. Only occupied slots are handed
//! to the kernel; the readiness of each slot is kept for the handlers.

use anyhow::{Context, Result};
use nix::poll::{PollFd, PollFlags};
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::buffer::{CommandBuffer, FdReader, ReadOutcome, handle_socket_input, handle_stream_input};
use super::parser::CommandTarget;
use crate::constants::RESERVED_POLL_SLOTS;
use crate::logger::Log;
use crate::utils::{path_for_display, poll_fds};

const LOCATION_SLOT: usize = 0;
const INPUT_SLOT: usize = 1;
const LISTENER_SLOT: usize = 2;

/// A readable stream that commands can be read from, such as stdin.
pub trait CommandInput: Read + AsFd {}

impl<T: Read + AsFd> CommandInput for T {}

struct Client {
    stream: UnixStream,
    buffer: CommandBuffer,
}

struct Listener {
    socket: UnixListener,
    path: PathBuf,
}

/// Poll set plus the per-source buffers that go with it.
pub struct CommandFds {
    /// Readiness reported by the last poll, indexed by slot.
    revents: Vec<PollFlags>,
    location: Option<OwnedFd>,
    input: Option<Box<dyn CommandInput>>,
    input_buffer: CommandBuffer,
    listener: Option<Listener>,
    clients: Vec<Option<Client>>,
}

/// Readiness that means the descriptor itself is unusable.
fn is_poll_error(revents: PollFlags) -> bool {
    revents.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL)
}

impl CommandFds {
    /// Create an empty set with room for `max_connections` clients.
    pub fn new(max_connections: usize) -> Self {
        Self {
            revents: vec![PollFlags::empty(); RESERVED_POLL_SLOTS + max_connections],
            location: None,
            input: None,
            input_buffer: CommandBuffer::new(),
            listener: None,
            clients: (0..max_connections).map(|_| None).collect(),
        }
    }

    pub fn max_connections(&self) -> usize {
        self.clients.len()
    }

    /// Number of client connections currently open.
    pub fn active_connections(&self) -> usize {
        self.clients.iter().filter(|c| c.is_some()).count()
    }

    /// Bind the control socket at `path` and start listening.
    ///
    /// The path must not exist. The socket file is removed again when the
    /// set is dropped.
    pub fn create_socket(&mut self, path: &Path) -> Result<()> {
        if self.clients.is_empty() {
            anyhow::bail!("Cannot listen on a control socket with zero allowed connections");
        }

        let socket = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind control socket {}", path_for_display(path)))?;
        socket
            .set_nonblocking(true)
            .context("Failed to make control socket non-blocking")?;

        self.listener = Some(Listener {
            socket,
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Path of the listening socket, if one was created.
    pub fn socket_path(&self) -> Option<&Path> {
        self.listener.as_ref().map(|l| l.path.as_path())
    }

    /// Read commands from standard input.
    pub fn enable_stdin(&mut self) {
        self.set_input(FdReader(io::stdin()));
    }

    /// Read commands from an arbitrary stream in the stdin slot.
    pub fn set_input(&mut self, input: impl CommandInput + 'static) {
        self.revents[INPUT_SLOT] = PollFlags::empty();
        self.input = Some(Box::new(input));
        self.input_buffer.reset();
    }

    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    /// Register (or clear) the location provider's wake-up descriptor.
    ///
    /// The set keeps its own duplicate of the descriptor.
    pub fn set_location_fd(&mut self, fd: Option<BorrowedFd<'_>>) -> io::Result<()> {
        self.location = fd.map(|fd| fd.try_clone_to_owned()).transpose()?;
        self.revents[LOCATION_SLOT] = PollFlags::empty();
        Ok(())
    }

    /// Whether the last poll reported the location descriptor readable.
    pub fn location_ready(&self) -> bool {
        self.location.is_some()
            && self.revents[LOCATION_SLOT]
                .intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
    }

    /// Wait for activity on any registered descriptor.
    pub fn poll(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        self.revents.fill(PollFlags::empty());

        let sources = self
            .location
            .as_ref()
            .map(|fd| (LOCATION_SLOT, fd.as_fd()))
            .into_iter()
            .chain(self.input.as_ref().map(|input| (INPUT_SLOT, input.as_fd())))
            .chain(self.listener.as_ref().map(|l| (LISTENER_SLOT, l.socket.as_fd())))
            .chain(self.clients.iter().enumerate().filter_map(|(index, client)| {
                client
                    .as_ref()
                    .map(|c| (RESERVED_POLL_SLOTS + index, c.stream.as_fd()))
            }));
        let (slots, mut pollfds): (Vec<usize>, Vec<PollFd<'_>>) = sources
            .map(|(slot, fd)| (slot, PollFd::new(fd, PollFlags::POLLIN)))
            .unzip();

        let ready = poll_fds(&mut pollfds, timeout)?;
        for (slot, pollfd) in slots.into_iter().zip(&pollfds) {
            self.revents[slot] = pollfd.revents().unwrap_or(PollFlags::empty());
        }
        Ok(ready)
    }

    /// Service everything the last poll reported.
    ///
    /// Returns the number of sources that delivered a state-changing
    /// command. Failing sources are deregistered; nothing here is fatal.
    pub fn handle_poll_results(&mut self, target: &mut CommandTarget<'_>) -> usize {
        let mut changed = 0;

        if self.handle_input(target) {
            changed += 1;
        }
        self.accept_connection();
        for index in 0..self.clients.len() {
            if self.handle_client(index, target) {
                changed += 1;
            }
        }

        changed
    }

    fn handle_input(&mut self, target: &mut CommandTarget<'_>) -> bool {
        let revents = self.revents[INPUT_SLOT];
        if revents.is_empty() {
            return false;
        }
        let Some(input) = self.input.as_mut() else {
            return false;
        };

        if is_poll_error(revents) {
            Log::log_verbose("Error reading from standard input");
            self.close_input();
            return false;
        }

        // POLLHUP alone still gets a read: it drains what is left and then
        // reports end of stream.
        if !revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP) {
            return false;
        }
        match handle_stream_input(input, &mut self.input_buffer, target) {
            ReadOutcome::Closed => {
                Log::log_verbose("Standard input closed");
                self.close_input();
                false
            }
            ReadOutcome::NoChange => false,
            ReadOutcome::Changed => true,
        }
    }

    fn close_input(&mut self) {
        self.input = None;
        self.input_buffer.reset();
        self.revents[INPUT_SLOT] = PollFlags::empty();
    }

    fn accept_connection(&mut self) {
        if !self.revents[LISTENER_SLOT].contains(PollFlags::POLLIN) {
            return;
        }
        let Some(listener) = self.listener.as_ref() else {
            return;
        };

        let stream = match listener.socket.accept() {
            Ok((stream, _)) => stream,
            Err(e) => {
                if e.kind() != io::ErrorKind::WouldBlock {
                    Log::log_verbose(&format!("Failed to accept connection: {}", e));
                }
                return;
            }
        };

        match self.clients.iter().position(|c| c.is_none()) {
            Some(index) => {
                self.revents[RESERVED_POLL_SLOTS + index] = PollFlags::empty();
                self.clients[index] = Some(Client {
                    stream,
                    buffer: CommandBuffer::new(),
                });
            }
            None => {
                Log::log_verbose("Too many connected clients, new connection rejected");
                drop(stream);
            }
        }
    }

    fn handle_client(&mut self, index: usize, target: &mut CommandTarget<'_>) -> bool {
        let revents = self.revents[RESERVED_POLL_SLOTS + index];
        if revents.is_empty() {
            return false;
        }
        let Some(client) = self.clients[index].as_mut() else {
            return false;
        };

        if is_poll_error(revents) {
            Log::log_verbose("Error reading from incoming connection");
            self.close_client(index);
            return false;
        }
        if !revents.intersects(PollFlags::POLLIN | PollFlags::POLLHUP) {
            return false;
        }

        match handle_socket_input(&client.stream, &mut client.buffer, target) {
            ReadOutcome::Closed => {
                self.close_client(index);
                false
            }
            ReadOutcome::NoChange => false,
            ReadOutcome::Changed => true,
        }
    }

    fn close_client(&mut self, index: usize) {
        self.clients[index] = None;
        self.revents[RESERVED_POLL_SLOTS + index] = PollFlags::empty();
    }
}

impl Drop for CommandFds {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            drop(listener.socket);
            if let Err(e) = std::fs::remove_file(&listener.path) {
                Log::log_warning(&format!(
                    "Failed to remove control socket {}: {}",
                    path_for_display(&listener.path),
                    e
                ));
            }
        }
    }
}
