//! # EmberKV - An In-Memory Key-Value Cache Server
//!
//! EmberKV is an in-memory cache reachable over a compact binary TCP
//! protocol, with optional per-key expiration and two explicitly commanded
//! eviction policies (least-recently-used and least-frequently-used).
//!
//! ## Features
//!
//! - **Progressive rehashing**: the hash table grows and shrinks in
//!   bounded per-operation increments, never stopping the world
//! - **Multi-index bookkeeping**: every live key is simultaneously
//!   discoverable by key, recency, frequency, and expiration deadline,
//!   maintained in O(1) per access
//! - **Single-threaded event loop**: readiness-multiplexed non-blocking
//!   I/O; no locks anywhere in the hot path
//! - **Pipelined protocol**: length-prefixed frames, answered strictly in
//!   request order
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            EmberKV                              │
//! │                                                                 │
//! │  ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌───────────┐  │
//! │  │  Server  │──>│    Conn    │──>│ Protocol │──>│  Command  │  │
//! │  │ (poll)   │   │ (buffers)  │   │ (frames) │   │  Handler  │  │
//! │  └──────────┘   └────────────┘   └──────────┘   └─────┬─────┘  │
//! │                                                       │        │
//! │                                                       ▼        │
//! │               ┌───────────────────────────────────────────┐    │
//! │               │               CacheEngine                 │    │
//! │               │  ┌──────────────┐  ┌─────┐ ┌─────┐ ┌────┐ │    │
//! │               │  │ Progressive  │  │ LRU │ │ LFU │ │TTL │ │    │
//! │               │  │     Map      │  │     │ │     │ │    │ │    │
//! │               │  └──────────────┘  └─────┘ └─────┘ └────┘ │    │
//! │               └───────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use emberkv::server::Server;
//!
//! let mut server = Server::bind("0.0.0.0:2203".parse().unwrap()).unwrap();
//! server.run().unwrap();
//! ```
//!
//! ## Commands
//!
//! | Form               | Semantics                         |
//! |--------------------|-----------------------------------|
//! | `get k`            | read                              |
//! | `set k v`          | write without TTL                 |
//! | `set ex k v s`     | write with a TTL of `s` seconds   |
//! | `del k`            | delete                            |
//! | `ttl k`            | remaining TTL in whole seconds    |
//! | `lru_evict`        | evict one least-recently-used key |
//! | `lfu_evict`        | evict one least-frequently-used key |
//!
//! ## Module Overview
//!
//! - [`storage`]: progressive map, the three indices, and the engine
//! - [`protocol`]: wire framing, status codes, and command parsing
//! - [`commands`]: dispatch from commands to engine transactions
//! - [`connection`]: per-connection buffers and non-blocking I/O steps
//! - [`server`]: the readiness event loop

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use protocol::{Command, FrameError, Response, Status};
pub use server::Server;
pub use storage::{CacheEngine, ProgressiveMap};

/// The default port EmberKV listens on.
pub const DEFAULT_PORT: u16 = 2203;

/// The default host EmberKV binds to.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of EmberKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
