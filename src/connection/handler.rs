//! Connection Handler
//!
//! Per-connection state and the two I/O steps the event loop drives.
//! Each connection owns its socket, its `incoming`/`outgoing` FIFO
//! buffers, and three intent flags that project what readiness the event
//! loop should wait for next.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Accepted (non-blocking, want_read)
//!        │
//!        ▼
//! 2. ┌─────────────────────────────────────────────┐
//!    │ readable → drain socket into `incoming`     │
//!    │          → parse every complete frame       │
//!    │          → execute, frame responses         │
//!    │          → flip to write, try immediately   │
//!    │ writable → drain `outgoing` into the socket │
//!    │          → fully flushed? flip back to read │
//!    └─────────────────────────────────────────────┘
//!        │
//!        ▼
//! 3. EOF / protocol violation / hard I/O error
//!        │
//!        ▼
//! 4. want_close → event loop deregisters and drops
//! ```
//!
//! `WouldBlock` is never an error here — it just means the socket has
//! nothing more to give (or take) until the next readiness event.

use crate::commands::CommandHandler;
use crate::connection::buffer::FifoBuffer;
use crate::protocol::{parse_request, Command};
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use tracing::{debug, trace, warn};

/// Size of the stack scratch each read step drains the socket through.
const READ_SCRATCH: usize = 64 * 1024;

/// State for one client connection.
pub struct Conn {
    stream: TcpStream,
    addr: SocketAddr,
    /// Bytes received but not yet parsed into complete requests.
    incoming: FifoBuffer,
    /// Framed responses not yet written to the socket.
    outgoing: FifoBuffer,
    /// Wait for readability next.
    pub want_read: bool,
    /// Wait for writability next.
    pub want_write: bool,
    /// Tear this connection down at the end of the tick.
    pub want_close: bool,
    /// Interest currently registered with the poller.
    registered: Option<Interest>,
}

impl Conn {
    /// Wraps a freshly accepted non-blocking stream.
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        Self {
            stream,
            addr,
            incoming: FifoBuffer::new(),
            outgoing: FifoBuffer::new(),
            want_read: true,
            want_write: false,
            want_close: false,
            registered: None,
        }
    }

    /// Peer address, for logging.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The readiness interest this connection currently wants, if any.
    fn interest(&self) -> Option<Interest> {
        match (self.want_read, self.want_write) {
            (true, true) => Some(Interest::READABLE | Interest::WRITABLE),
            (true, false) => Some(Interest::READABLE),
            (false, true) => Some(Interest::WRITABLE),
            (false, false) => None,
        }
    }

    /// Brings the poller registration in line with the current intents.
    pub fn sync_interest(&mut self, registry: &Registry, token: Token) -> io::Result<()> {
        let desired = self.interest();
        if desired == self.registered {
            return Ok(());
        }
        match (self.registered, desired) {
            (None, Some(interest)) => registry.register(&mut self.stream, token, interest)?,
            (Some(_), Some(interest)) => registry.reregister(&mut self.stream, token, interest)?,
            (Some(_), None) => registry.deregister(&mut self.stream)?,
            (None, None) => {}
        }
        self.registered = desired;
        Ok(())
    }

    /// Removes this connection from the poller ahead of teardown.
    pub fn deregister(&mut self, registry: &Registry) {
        if self.registered.take().is_some() {
            if let Err(e) = registry.deregister(&mut self.stream) {
                debug!(client = %self.addr, error = %e, "deregister failed");
            }
        }
    }

    /// The read step: drain the socket, execute every complete pipelined
    /// request, queue the responses, and opportunistically flush.
    ///
    /// EOF and protocol violations still let already-parsed requests run
    /// and their responses go out in this step; the teardown happens at
    /// the end of the event-loop tick.
    pub fn handle_read(&mut self, handler: &mut CommandHandler) {
        let mut scratch = [0u8; READ_SCRATCH];
        let mut saw_eof = false;
        loop {
            match self.stream.read(&mut scratch) {
                Ok(0) => {
                    if self.incoming.is_empty() {
                        debug!(client = %self.addr, "client closed");
                    } else {
                        debug!(client = %self.addr, "EOF with buffered data");
                    }
                    saw_eof = true;
                    break;
                }
                Ok(n) => {
                    trace!(client = %self.addr, bytes = n, "read");
                    self.incoming.append(&scratch[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "read error");
                    self.want_close = true;
                    return;
                }
            }
        }

        // Pipelining: execute as many complete requests as the buffer holds.
        loop {
            match parse_request(self.incoming.as_slice()) {
                Ok(Some((args, consumed))) => {
                    let response = handler.execute(Command::from_args(args));
                    let mut frame = Vec::with_capacity(8 + response.payload.len());
                    response.encode_into(&mut frame);
                    self.outgoing.append(&frame);
                    self.incoming.consume(consumed);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "protocol violation");
                    self.want_close = true;
                    break;
                }
            }
        }

        if !self.outgoing.is_empty() {
            self.want_read = false;
            self.want_write = true;
            // The socket is usually writable right after a read; skipping a
            // poll round-trip here is the common case for small responses.
            self.handle_write();
        }

        if saw_eof {
            self.want_close = true;
        }
    }

    /// The write step: drain `outgoing`; on a full flush flip back to
    /// reading, on a partial write keep waiting for writability.
    pub fn handle_write(&mut self) {
        while !self.outgoing.is_empty() {
            match self.stream.write(self.outgoing.as_slice()) {
                Ok(0) => {
                    self.want_close = true;
                    return;
                }
                Ok(n) => {
                    trace!(client = %self.addr, bytes = n, "wrote");
                    self.outgoing.consume(n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(client = %self.addr, error = %e, "write error");
                    self.want_close = true;
                    return;
                }
            }
        }

        if self.outgoing.is_empty() {
            self.want_read = true;
            self.want_write = false;
        } else {
            self.want_read = false;
            self.want_write = true;
        }
    }
}
