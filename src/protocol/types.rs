//! Wire Protocol Data Types
//!
//! This module defines the request and response shapes of the EmberKV
//! protocol. The wire format is binary and length-prefixed; every integer
//! is a little-endian unsigned 32-bit value.
//!
//! ## Frames
//!
//! Request: `len:u32 | argc:u32 | (arglen:u32 | argbytes)*`
//! Response: `len:u32 | status:u32 | payload`
//!
//! `len` counts the bytes after the prefix itself, so a response frame
//! always carries `len = 4 + payload.len()`.
//!
//! ## Examples
//!
//! `get foo` → `0e 00 00 00 | 02 00 00 00 | 03 00 00 00 "get" | 03 00 00 00 "foo"`
//! `OK` (no payload) → `04 00 00 00 | 00 00 00 00`

use bytes::Bytes;
use std::fmt;

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    /// The command succeeded.
    Ok = 0,
    /// The command was rejected (unknown verb, wrong arity, logical error).
    Err = 1,
    /// The key does not exist (or has expired).
    Nx = 2,
}

impl Status {
    /// Decodes a wire status code.
    pub fn from_u32(code: u32) -> Option<Self> {
        match code {
            0 => Some(Status::Ok),
            1 => Some(Status::Err),
            2 => Some(Status::Nx),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "OK"),
            Status::Err => write!(f, "ERR"),
            Status::Nx => write!(f, "NX"),
        }
    }
}

/// A response frame: a status code plus an optional payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Outcome of the command.
    pub status: Status,
    /// `get` carries the value, `ttl` the remaining seconds as ASCII
    /// decimal; everything else is empty.
    pub payload: Bytes,
}

impl Response {
    /// Success with no payload.
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            payload: Bytes::new(),
        }
    }

    /// Success carrying a payload.
    pub fn value(payload: Bytes) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// Command rejection.
    pub fn err() -> Self {
        Self {
            status: Status::Err,
            payload: Bytes::new(),
        }
    }

    /// Key not found.
    pub fn nx() -> Self {
        Self {
            status: Status::Nx,
            payload: Bytes::new(),
        }
    }

    /// Appends the framed response to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let frame_len = 4 + self.payload.len() as u32;
        out.extend_from_slice(&frame_len.to_le_bytes());
        out.extend_from_slice(&(self.status as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
    }

    /// The framed response as a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.payload.len());
        self.encode_into(&mut out);
        out
    }
}

/// A parsed command, one arm per verb.
///
/// The verb and arity checks happen at construction, so the dispatcher
/// never sees a malformed tuple; anything that does not match a known
/// shape lands in the rejection arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `get k` — read a value.
    Get { key: Bytes },
    /// `set k v` — write without a deadline.
    Set { key: Bytes, value: Bytes },
    /// `set ex k v s` — write with a TTL of `s` seconds.
    SetEx {
        key: Bytes,
        value: Bytes,
        ttl_secs: u64,
    },
    /// `del k` — delete a key.
    Del { key: Bytes },
    /// `ttl k` — remaining time-to-live.
    Ttl { key: Bytes },
    /// `lru_evict` — evict the least recently used key.
    LruEvict,
    /// `lfu_evict` — evict the least frequently used key.
    LfuEvict,
    /// Anything else: unknown verb or wrong arity. Always answered `ERR`.
    Unknown,
}

impl Command {
    /// Builds a command from a request's argument vector.
    pub fn from_args(mut args: Vec<Bytes>) -> Self {
        // Cheap refcount clone; keeps the verb readable while `args` is
        // picked apart below. Verbs are ASCII, so a non-UTF-8 first
        // argument can only be an unknown command.
        let verb = match args.first() {
            Some(verb) => verb.clone(),
            None => return Command::Unknown,
        };
        let verb = std::str::from_utf8(&verb).unwrap_or("");

        match (verb, args.len()) {
            ("get", 2) => Command::Get {
                key: args.swap_remove(1),
            },
            ("set", 3) => {
                let value = args.swap_remove(2);
                let key = args.swap_remove(1);
                Command::Set { key, value }
            }
            ("set", 5) if args[1].as_ref() == b"ex" => {
                let Some(ttl_secs) = parse_seconds(&args[4]) else {
                    return Command::Unknown;
                };
                let value = args.swap_remove(3);
                let key = args.swap_remove(2);
                Command::SetEx {
                    key,
                    value,
                    ttl_secs,
                }
            }
            ("del", 2) => Command::Del {
                key: args.swap_remove(1),
            },
            ("ttl", 2) => Command::Ttl {
                key: args.swap_remove(1),
            },
            ("lru_evict", 1) => Command::LruEvict,
            ("lfu_evict", 1) => Command::LfuEvict,
            _ => Command::Unknown,
        }
    }
}

/// Parses an ASCII decimal TTL argument. Bounded to `u32` seconds, which
/// keeps deadline arithmetic comfortably inside `Instant`'s range.
fn parse_seconds(arg: &Bytes) -> Option<u64> {
    let text = std::str::from_utf8(arg).ok()?;
    text.parse::<u32>().ok().map(u64::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&[u8]]) -> Vec<Bytes> {
        parts.iter().map(|p| Bytes::copy_from_slice(p)).collect()
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [Status::Ok, Status::Err, Status::Nx] {
            assert_eq!(Status::from_u32(status as u32), Some(status));
        }
        assert_eq!(Status::from_u32(3), None);
    }

    #[test]
    fn test_response_encoding() {
        assert_eq!(
            Response::ok().encode(),
            [4, 0, 0, 0, 0, 0, 0, 0],
        );
        assert_eq!(
            Response::nx().encode(),
            [4, 0, 0, 0, 2, 0, 0, 0],
        );
        assert_eq!(
            Response::value(Bytes::from("hi")).encode(),
            [6, 0, 0, 0, 0, 0, 0, 0, b'h', b'i'],
        );
    }

    #[test]
    fn test_parse_get() {
        let cmd = Command::from_args(args(&[b"get", b"foo"]));
        assert_eq!(
            cmd,
            Command::Get {
                key: Bytes::from("foo")
            }
        );
    }

    #[test]
    fn test_parse_set() {
        let cmd = Command::from_args(args(&[b"set", b"k", b"v"]));
        assert_eq!(
            cmd,
            Command::Set {
                key: Bytes::from("k"),
                value: Bytes::from("v")
            }
        );
    }

    #[test]
    fn test_parse_set_ex() {
        let cmd = Command::from_args(args(&[b"set", b"ex", b"k", b"v", b"30"]));
        assert_eq!(
            cmd,
            Command::SetEx {
                key: Bytes::from("k"),
                value: Bytes::from("v"),
                ttl_secs: 30
            }
        );
    }

    #[test]
    fn test_parse_set_ex_bad_seconds() {
        assert_eq!(
            Command::from_args(args(&[b"set", b"ex", b"k", b"v", b"soon"])),
            Command::Unknown
        );
        assert_eq!(
            Command::from_args(args(&[b"set", b"ex", b"k", b"v", b"-1"])),
            Command::Unknown
        );
    }

    #[test]
    fn test_parse_evictions() {
        assert_eq!(
            Command::from_args(args(&[b"lru_evict"])),
            Command::LruEvict
        );
        assert_eq!(
            Command::from_args(args(&[b"lfu_evict"])),
            Command::LfuEvict
        );
    }

    #[test]
    fn test_wrong_arity_is_unknown() {
        assert_eq!(Command::from_args(args(&[b"get"])), Command::Unknown);
        assert_eq!(
            Command::from_args(args(&[b"get", b"a", b"b"])),
            Command::Unknown
        );
        assert_eq!(
            Command::from_args(args(&[b"set", b"k"])),
            Command::Unknown
        );
        assert_eq!(
            Command::from_args(args(&[b"lru_evict", b"x"])),
            Command::Unknown
        );
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(
            Command::from_args(args(&[b"flush", b"k"])),
            Command::Unknown
        );
        assert_eq!(Command::from_args(Vec::new()), Command::Unknown);
    }

    #[test]
    fn test_verbs_are_case_sensitive() {
        assert_eq!(
            Command::from_args(args(&[b"GET", b"k"])),
            Command::Unknown
        );
    }
}
