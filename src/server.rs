//! Event Loop
//!
//! The single thread that owns everything: the listener, every live
//! connection, and the cache engine (via the command handler). Each
//! iteration:
//!
//! 1. runs the expiration sweep;
//! 2. projects every connection's intents into its poller registration;
//! 3. blocks on readiness — at most until the earliest TTL deadline, so
//!    expired entries are reclaimed even on an idle socket;
//! 4. accepts new connections and dispatches read/write steps;
//! 5. tears down connections that asked to close or errored.
//!
//! Commands never yield mid-way: the poll wait is the loop's only
//! suspension point, which is what makes every multi-index transaction
//! atomic without a single lock.

use crate::commands::CommandHandler;
use crate::connection::Conn;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use slab::Slab;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Token for the listening socket, offset clear of any slab key.
const LISTENER: Token = Token(1 << 30);

/// Poll event batch size.
const EVENT_CAPACITY: usize = 1024;

/// The EmberKV server: one listener, one poller, one cache.
pub struct Server {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    conns: Slab<Conn>,
    handler: CommandHandler,
}

impl Server {
    /// Binds the listening socket and sets up the poller.
    ///
    /// The socket is created through `socket2` so `SO_REUSEADDR` is set
    /// before the bind, then handed to mio in non-blocking mode.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = socket2::Socket::new(
            match addr {
                SocketAddr::V4(_) => socket2::Domain::IPV4,
                SocketAddr::V6(_) => socket2::Domain::IPV6,
            },
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        )?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(libc::SOMAXCONN)?;

        let std_listener: std::net::TcpListener = socket.into();
        let mut listener = TcpListener::from_std(std_listener);

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENT_CAPACITY),
            listener,
            conns: Slab::new(),
            handler: CommandHandler::new(),
        })
    }

    /// The bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the event loop until the process exits.
    pub fn run(&mut self) -> io::Result<()> {
        info!(addr = %self.local_addr()?, "ready to accept connections");
        loop {
            self.tick()?;
        }
    }

    /// One event-loop iteration.
    fn tick(&mut self) -> io::Result<()> {
        self.handler.sweep();

        for (key, conn) in self.conns.iter_mut() {
            conn.sync_interest(self.poll.registry(), Token(key))?;
        }

        // Sleep at most until the next deadline so the sweep fires on time
        // even with no client traffic.
        let timeout = self
            .handler
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));
        if let Err(e) = self.poll.poll(&mut self.events, timeout) {
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(e);
        }

        // Copy the event facts out first; dispatch mutates the slab.
        let ready: Vec<(Token, bool, bool, bool)> = self
            .events
            .iter()
            .map(|event| {
                (
                    event.token(),
                    event.is_readable() || event.is_read_closed(),
                    event.is_writable(),
                    event.is_error(),
                )
            })
            .collect();

        for (token, readable, writable, errored) in ready {
            if token == LISTENER {
                self.accept_all();
                continue;
            }

            let Some(conn) = self.conns.get_mut(token.0) else {
                continue;
            };
            if errored {
                debug!(client = %conn.addr(), "socket error event");
                conn.want_close = true;
            }
            if readable && !conn.want_close {
                conn.handle_read(&mut self.handler);
            }
            if writable && !conn.want_close {
                conn.handle_write();
            }
        }

        // Teardown pass: close the descriptor before releasing the state.
        let closing: Vec<usize> = self
            .conns
            .iter()
            .filter(|(_, conn)| conn.want_close)
            .map(|(key, _)| key)
            .collect();
        for key in closing {
            let mut conn = self.conns.remove(key);
            conn.deregister(self.poll.registry());
            info!(client = %conn.addr(), "connection closed");
        }

        Ok(())
    }

    /// Accepts every pending connection on the listener.
    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    info!(client = %addr, "new incoming connection");
                    let key = self.conns.insert(Conn::new(stream, addr));
                    if let Err(e) = self.conns[key].sync_interest(self.poll.registry(), Token(key))
                    {
                        warn!(client = %addr, error = %e, "failed to register connection");
                        self.conns.remove(key);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "accept error");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_request, parse_response, Status, MAX_MSG};
    use bytes::Bytes;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    fn spawn_server() -> SocketAddr {
        let mut server = Server::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = server.local_addr().unwrap();
        std::thread::spawn(move || {
            let _ = server.run();
        });
        addr
    }

    fn connect(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
    }

    fn request(parts: &[&[u8]]) -> Vec<u8> {
        let args: Vec<Bytes> = parts.iter().map(|p| Bytes::copy_from_slice(p)).collect();
        encode_request(&args)
    }

    /// Reads one framed response, keeping any surplus bytes in `buf`.
    fn read_response(stream: &mut TcpStream, buf: &mut Vec<u8>) -> (Status, Bytes) {
        let mut chunk = [0u8; 4096];
        loop {
            if let Some((status, payload, consumed)) = parse_response(buf).unwrap() {
                buf.drain(..consumed);
                return (status, payload);
            }
            let n = stream.read(&mut chunk).unwrap();
            assert!(n > 0, "server closed the connection");
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn roundtrip(stream: &mut TcpStream, buf: &mut Vec<u8>, parts: &[&[u8]]) -> (Status, Bytes) {
        stream.write_all(&request(parts)).unwrap();
        read_response(stream, buf)
    }

    #[test]
    fn test_set_get_del_over_wire() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"set", b"foo", b"bar"]),
            (Status::Ok, Bytes::new())
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"get", b"foo"]),
            (Status::Ok, Bytes::from("bar"))
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"del", b"foo"]),
            (Status::Ok, Bytes::new())
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"get", b"foo"]),
            (Status::Nx, Bytes::new())
        );
        // Deleting again is still OK.
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"del", b"foo"]),
            (Status::Ok, Bytes::new())
        );
    }

    #[test]
    fn test_pipelined_frames_in_one_write() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        let mut wire = request(&[b"set", b"a", b"1"]);
        wire.extend_from_slice(&request(&[b"get", b"a"]));
        client.write_all(&wire).unwrap();

        assert_eq!(read_response(&mut client, &mut buf), (Status::Ok, Bytes::new()));
        assert_eq!(
            read_response(&mut client, &mut buf),
            (Status::Ok, Bytes::from("1"))
        );
    }

    #[test]
    fn test_ttl_statuses_over_wire() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        roundtrip(&mut client, &mut buf, &[b"set", b"ex", b"timed", b"v", b"60"]);
        roundtrip(&mut client, &mut buf, &[b"set", b"plain", b"v"]);

        let (status, payload) = roundtrip(&mut client, &mut buf, &[b"ttl", b"timed"]);
        assert_eq!(status, Status::Ok);
        let secs: u64 = std::str::from_utf8(&payload).unwrap().parse().unwrap();
        assert!(secs >= 59 && secs <= 60);

        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"ttl", b"plain"]).0,
            Status::Err
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"ttl", b"missing"]).0,
            Status::Nx
        );
    }

    #[test]
    fn test_expired_key_reclaimed_by_sweep() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        roundtrip(&mut client, &mut buf, &[b"set", b"ex", b"tmp", b"v", b"1"]);
        std::thread::sleep(Duration::from_millis(1200));
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"get", b"tmp"]),
            (Status::Nx, Bytes::new())
        );
    }

    #[test]
    fn test_unknown_command_keeps_connection_open() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"flushall"]).0,
            Status::Err
        );
        // The connection must still work afterwards.
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"set", b"k", b"v"]).0,
            Status::Ok
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"get", b"k"]),
            (Status::Ok, Bytes::from("v"))
        );
    }

    #[test]
    fn test_oversized_frame_closes_connection() {
        let addr = spawn_server();
        let mut client = connect(addr);

        let size = (MAX_MSG + 1) as u32;
        client.write_all(&size.to_le_bytes()).unwrap();

        // The server must hang up rather than answer.
        let mut chunk = [0u8; 64];
        loop {
            match client.read(&mut chunk) {
                Ok(0) => break,
                Ok(_) => panic!("server answered an oversized frame"),
                Err(e) => panic!("unexpected read error: {e}"),
            }
        }
    }

    #[test]
    fn test_two_clients_share_the_cache() {
        let addr = spawn_server();
        let mut writer = connect(addr);
        let mut reader = connect(addr);
        let (mut wbuf, mut rbuf) = (Vec::new(), Vec::new());

        roundtrip(&mut writer, &mut wbuf, &[b"set", b"shared", b"42"]);
        assert_eq!(
            roundtrip(&mut reader, &mut rbuf, &[b"get", b"shared"]),
            (Status::Ok, Bytes::from("42"))
        );
    }

    #[test]
    fn test_eviction_over_wire() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"lru_evict"]).0,
            Status::Err
        );
        roundtrip(&mut client, &mut buf, &[b"set", b"a", b"1"]);
        roundtrip(&mut client, &mut buf, &[b"set", b"b", b"2"]);
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"lru_evict"]).0,
            Status::Ok
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"get", b"a"]),
            (Status::Nx, Bytes::new())
        );
        assert_eq!(
            roundtrip(&mut client, &mut buf, &[b"get", b"b"]),
            (Status::Ok, Bytes::from("2"))
        );
    }

    #[test]
    fn test_many_keys_survive_resizes_over_wire() {
        let addr = spawn_server();
        let mut client = connect(addr);
        let mut buf = Vec::new();

        for i in 0..300 {
            let key = format!("key{i}");
            let value = format!("value{i}");
            assert_eq!(
                roundtrip(&mut client, &mut buf, &[b"set", key.as_bytes(), value.as_bytes()]).0,
                Status::Ok
            );
        }
        for i in 0..300 {
            let key = format!("key{i}");
            let (status, payload) = roundtrip(&mut client, &mut buf, &[b"get", key.as_bytes()]);
            assert_eq!(status, Status::Ok);
            assert_eq!(payload, Bytes::from(format!("value{i}")));
        }
    }
}
