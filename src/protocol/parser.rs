//! Length-Prefixed Frame Parser
//!
//! This module implements the incremental parser for the EmberKV wire
//! format. TCP is a stream: a single read may hold half a frame or a
//! dozen pipelined ones, so the parser reports one of three outcomes:
//!
//! - `Ok(Some((args, consumed)))` — a complete request; `consumed` bytes
//!   of the buffer belong to it
//! - `Ok(None)` — the frame is not complete yet, wait for more bytes
//! - `Err(FrameError)` — the peer violated the protocol; the connection
//!   must be closed
//!
//! The caller appends incoming bytes to its buffer, calls
//! [`parse_request`] in a loop, and consumes the reported lengths. Errors
//! are unrecoverable by design: once framing is lost there is no way to
//! find the next frame boundary.

use bytes::Bytes;
use thiserror::Error;

/// Largest accepted request payload (32 MiB).
pub const MAX_MSG: usize = 32 << 20;

/// Largest accepted argument count per request.
pub const MAX_ARGS: usize = 200_000;

/// Protocol violations. All of them are fatal to the connection.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// The frame length prefix exceeds [`MAX_MSG`].
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },

    /// The argument count exceeds [`MAX_ARGS`].
    #[error("frame declares {count} arguments (max: {max})")]
    TooManyArguments { count: usize, max: usize },

    /// An argument length points past the end of the payload.
    #[error("argument extends past the end of the frame")]
    TruncatedArgument,

    /// Bytes remain in the payload after the declared arguments.
    #[error("{0} trailing bytes after the last argument")]
    TrailingBytes(usize),

    /// A response carried a status code outside the known set.
    #[error("unknown status code {0}")]
    UnknownStatus(u32),
}

/// Reads a little-endian `u32` at `*pos`, advancing it.
#[inline]
fn read_u32(buf: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes = buf.get(*pos..*pos + 4)?;
    *pos += 4;
    // The slice is exactly four bytes; the conversion cannot fail.
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Attempts to parse one request frame from the front of `buf`.
///
/// Returns the argument vector and the total number of bytes consumed
/// (length prefix included), or `Ok(None)` when the buffer does not yet
/// hold a complete frame.
pub fn parse_request(buf: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>, FrameError> {
    let mut pos = 0;
    let Some(payload_len) = read_u32(buf, &mut pos) else {
        return Ok(None);
    };
    let payload_len = payload_len as usize;

    // Oversized frames are rejected before waiting for their bytes, so a
    // hostile peer cannot make us buffer 4 GiB of nothing.
    if payload_len > MAX_MSG {
        return Err(FrameError::FrameTooLarge {
            size: payload_len,
            max: MAX_MSG,
        });
    }

    if buf.len() < 4 + payload_len {
        return Ok(None);
    }
    let payload = &buf[4..4 + payload_len];

    let mut cursor = 0;
    let argc = read_u32(payload, &mut cursor).ok_or(FrameError::TruncatedArgument)? as usize;
    if argc > MAX_ARGS {
        return Err(FrameError::TooManyArguments {
            count: argc,
            max: MAX_ARGS,
        });
    }

    let mut args = Vec::with_capacity(argc.min(16));
    for _ in 0..argc {
        let arg_len =
            read_u32(payload, &mut cursor).ok_or(FrameError::TruncatedArgument)? as usize;
        let arg = payload
            .get(cursor..cursor + arg_len)
            .ok_or(FrameError::TruncatedArgument)?;
        args.push(Bytes::copy_from_slice(arg));
        cursor += arg_len;
    }

    if cursor != payload.len() {
        return Err(FrameError::TrailingBytes(payload.len() - cursor));
    }

    Ok(Some((args, 4 + payload_len)))
}

/// Frames an argument vector as a request. The inverse of
/// [`parse_request`]; used by tests and benchmarks.
pub fn encode_request(args: &[Bytes]) -> Vec<u8> {
    let payload_len: usize = 4 + args.iter().map(|arg| 4 + arg.len()).sum::<usize>();
    let mut out = Vec::with_capacity(4 + payload_len);
    out.extend_from_slice(&(payload_len as u32).to_le_bytes());
    out.extend_from_slice(&(args.len() as u32).to_le_bytes());
    for arg in args {
        out.extend_from_slice(&(arg.len() as u32).to_le_bytes());
        out.extend_from_slice(arg);
    }
    out
}

/// Attempts to parse one response frame from the front of `buf`.
///
/// Returns the status, the payload, and the bytes consumed. The inverse
/// of [`crate::protocol::Response::encode_into`]; used by tests.
pub fn parse_response(buf: &[u8]) -> Result<Option<(crate::protocol::Status, Bytes, usize)>, FrameError> {
    let mut pos = 0;
    let Some(frame_len) = read_u32(buf, &mut pos) else {
        return Ok(None);
    };
    let frame_len = frame_len as usize;
    if buf.len() < 4 + frame_len {
        return Ok(None);
    }

    let payload = &buf[4..4 + frame_len];
    let mut cursor = 0;
    let code = read_u32(payload, &mut cursor).ok_or(FrameError::TruncatedArgument)?;
    let status = crate::protocol::Status::from_u32(code).ok_or(FrameError::UnknownStatus(code))?;
    let body = Bytes::copy_from_slice(&payload[cursor..]);

    Ok(Some((status, body, 4 + frame_len)))
}
