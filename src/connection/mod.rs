//! Connection Runtime
//!
//! Per-connection buffering and non-blocking I/O. Each accepted socket is
//! wrapped in a [`Conn`] owning two sliding-head FIFO buffers and three
//! readiness intents (`want_read`, `want_write`, `want_close`) that the
//! event loop projects into its poll set every tick.

pub mod buffer;
pub mod handler;

// Re-export commonly used types
pub use buffer::FifoBuffer;
pub use handler::Conn;
