//! Wire Protocol
//!
//! The EmberKV protocol is binary, length-prefixed, and pipelined: a
//! client may send any number of requests back-to-back and the server
//! answers them strictly in order. All integers on the wire are
//! little-endian unsigned 32-bit values.
//!
//! - [`types`]: status codes, response framing, and the command variants
//! - [`parser`]: incremental request/response frame parsing and encoding

pub mod parser;
pub mod types;

// Re-export commonly used types
pub use parser::{encode_request, parse_request, parse_response, FrameError, MAX_ARGS, MAX_MSG};
pub use types::{Command, Response, Status};
