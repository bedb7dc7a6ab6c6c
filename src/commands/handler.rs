//! Command Handler
//!
//! Dispatches parsed commands to the cache engine and maps every outcome
//! to a wire response. This is the single place where engine results are
//! translated into status codes, so the response table lives here:
//!
//! | Command     | Hit                    | Miss | Rejection            |
//! |-------------|------------------------|------|----------------------|
//! | `get`       | `OK` + value           | `NX` |                      |
//! | `set`       | `OK`                   |      |                      |
//! | `set ex`    | `OK`                   |      | `ERR` (bad seconds)  |
//! | `del`       | `OK` (present or not)  |      |                      |
//! | `ttl`       | `OK` + seconds (ASCII) | `NX` | `ERR` (no deadline)  |
//! | `lru_evict` | `OK`                   |      | `ERR` (empty cache)  |
//! | `lfu_evict` | `OK`                   |      | `ERR` (empty cache)  |
//!
//! Unknown verbs and wrong arities were already folded into
//! [`Command::Unknown`] by the protocol layer and answer `ERR`.

use crate::protocol::{Command, Response};
use crate::storage::{CacheEngine, TtlOutcome};
use bytes::Bytes;
use tracing::trace;

/// Executes commands against the cache engine.
///
/// The handler owns the engine; the event loop owns the handler. Every
/// command begins with an expiration sweep (inside the engine), so no
/// command ever observes an expired entry.
#[derive(Debug, Default)]
pub struct CommandHandler {
    engine: CacheEngine,
}

impl CommandHandler {
    /// Creates a handler over an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a command and returns the response to send.
    pub fn execute(&mut self, command: Command) -> Response {
        trace!(?command, "executing");
        match command {
            Command::Get { key } => self.cmd_get(&key),
            Command::Set { key, value } => self.cmd_set(key, value),
            Command::SetEx {
                key,
                value,
                ttl_secs,
            } => self.cmd_set_ex(key, value, ttl_secs),
            Command::Del { key } => self.cmd_del(&key),
            Command::Ttl { key } => self.cmd_ttl(&key),
            Command::LruEvict => self.cmd_lru_evict(),
            Command::LfuEvict => self.cmd_lfu_evict(),
            Command::Unknown => Response::err(),
        }
    }

    /// Reclaims due entries outside of command execution. Called once per
    /// event-loop tick.
    pub fn sweep(&mut self) -> usize {
        self.engine.sweep()
    }

    /// Earliest pending deadline; bounds the event loop's poll timeout.
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        self.engine.next_deadline()
    }

    /// Read access to the engine for tests and diagnostics.
    pub fn engine(&self) -> &CacheEngine {
        &self.engine
    }

    fn cmd_get(&mut self, key: &Bytes) -> Response {
        match self.engine.get(key) {
            Some(value) => Response::value(value),
            None => Response::nx(),
        }
    }

    fn cmd_set(&mut self, key: Bytes, value: Bytes) -> Response {
        self.engine.set(key, value);
        Response::ok()
    }

    fn cmd_set_ex(&mut self, key: Bytes, value: Bytes, ttl_secs: u64) -> Response {
        self.engine.set_ex(key, value, ttl_secs);
        Response::ok()
    }

    fn cmd_del(&mut self, key: &Bytes) -> Response {
        self.engine.del(key);
        Response::ok()
    }

    fn cmd_ttl(&mut self, key: &Bytes) -> Response {
        match self.engine.ttl(key) {
            TtlOutcome::Remaining(secs) => Response::value(Bytes::from(secs.to_string())),
            TtlOutcome::NoExpiry => Response::err(),
            TtlOutcome::Missing => Response::nx(),
        }
    }

    fn cmd_lru_evict(&mut self) -> Response {
        match self.engine.evict_lru() {
            Some(_) => Response::ok(),
            None => Response::err(),
        }
    }

    fn cmd_lfu_evict(&mut self) -> Response {
        match self.engine.evict_lfu() {
            Some(_) => Response::ok(),
            None => Response::err(),
        }
    }
}
