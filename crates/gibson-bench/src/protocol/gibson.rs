//! Gibson binary protocol framing.
//!
//! All integers are little-endian.
//!
//! ```text
//! request: | size: u32 | opcode: u16 | args: [u8; size - 2] |
//! reply:   | code: u16 | encoding: u8 | size: u32 | data: [u8; size] |
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Length of the fixed reply header (code + encoding + size).
pub const REPLY_HEADER_LEN: usize = 7;

/// Length of the fixed request header (size + opcode).
pub const REQUEST_HEADER_LEN: usize = 6;

/// Replies announcing a bigger payload are treated as a corrupted stream.
pub const MAX_REPLY_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every operation the server understands, keyed by its upper-case name.
static OPCODES: Lazy<HashMap<&'static str, Opcode>> = Lazy::new(|| {
    HashMap::from([
        ("SET", Opcode(1)),
        ("TTL", Opcode(2)),
        ("GET", Opcode(3)),
        ("DEL", Opcode(4)),
        ("INC", Opcode(5)),
        ("DEC", Opcode(6)),
        ("LOCK", Opcode(7)),
        ("UNLOCK", Opcode(8)),
        ("MSET", Opcode(9)),
        ("MTTL", Opcode(10)),
        ("MGET", Opcode(11)),
        ("MDEL", Opcode(12)),
        ("MINC", Opcode(13)),
        ("MDEC", Opcode(14)),
        ("MLOCK", Opcode(15)),
        ("MUNLOCK", Opcode(16)),
        ("COUNT", Opcode(17)),
        ("STATS", Opcode(18)),
        ("PING", Opcode(19)),
        ("SIZEOF", Opcode(20)),
        ("MSIZEOF", Opcode(21)),
        ("ENCOF", Opcode(22)),
        ("KEYS", Opcode(23)),
        ("END", Opcode(255)),
    ])
});

/// Look up an operation name (case-insensitive) in the client's capability set.
pub fn lookup_opcode(name: &str) -> Option<Opcode> {
    OPCODES.get(name.to_ascii_uppercase().as_str()).copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCode {
    Error,
    NotFound,
    NaN,
    OutOfMemory,
    Locked,
    Ok,
    Value,
    KeyValue,
}

impl ReplyCode {
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Error),
            1 => Some(Self::NotFound),
            2 => Some(Self::NaN),
            3 => Some(Self::OutOfMemory),
            4 => Some(Self::Locked),
            5 => Some(Self::Ok),
            6 => Some(Self::Value),
            7 => Some(Self::KeyValue),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::Error => 0,
            Self::NotFound => 1,
            Self::NaN => 2,
            Self::OutOfMemory => 3,
            Self::Locked => 4,
            Self::Ok => 5,
            Self::Value => 6,
            Self::KeyValue => 7,
        }
    }

    /// Whether the server rejected the operation.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Self::Error | Self::NotFound | Self::NaN | Self::OutOfMemory | Self::Locked
        )
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "REPL_ERR",
            Self::NotFound => "REPL_ERR_NOT_FOUND",
            Self::NaN => "REPL_ERR_NAN",
            Self::OutOfMemory => "REPL_ERR_MEM",
            Self::Locked => "REPL_ERR_LOCKED",
            Self::Ok => "REPL_OK",
            Self::Value => "REPL_VAL",
            Self::KeyValue => "REPL_KVAL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    Lzf,
    Number,
}

impl Encoding {
    pub fn from_u8(encoding: u8) -> Option<Self> {
        match encoding {
            0 => Some(Self::Plain),
            1 => Some(Self::Lzf),
            2 => Some(Self::Number),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Plain => 0,
            Self::Lzf => 1,
            Self::Number => 2,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unknown reply code {0}")]
    UnknownReplyCode(u16),
    #[error("unknown encoding {0}")]
    UnknownEncoding(u8),
    #[error("reply of {0} bytes exceeds the reply size limit")]
    TooLarge(usize),
    #[error("request size field {0} is shorter than the opcode")]
    Truncated(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyHeader {
    pub code: ReplyCode,
    pub encoding: Encoding,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub encoding: Encoding,
    pub data: Bytes,
}

/// Append one request frame to `buf`.
pub fn encode_request(buf: &mut BytesMut, opcode: Opcode, args: &str) {
    buf.reserve(REQUEST_HEADER_LEN + args.len());
    buf.put_u32_le((2 + args.len()) as u32);
    buf.put_u16_le(opcode.0);
    buf.put_slice(args.as_bytes());
}

/// Decode the fixed reply header, validating code, encoding and size.
pub fn decode_reply_header(header: &[u8; REPLY_HEADER_LEN]) -> Result<ReplyHeader, FrameError> {
    let mut buf = &header[..];
    let raw_code = buf.get_u16_le();
    let raw_encoding = buf.get_u8();
    let size = buf.get_u32_le() as usize;

    let code = ReplyCode::from_u16(raw_code).ok_or(FrameError::UnknownReplyCode(raw_code))?;
    let encoding =
        Encoding::from_u8(raw_encoding).ok_or(FrameError::UnknownEncoding(raw_encoding))?;
    if size > MAX_REPLY_SIZE {
        return Err(FrameError::TooLarge(size));
    }

    Ok(ReplyHeader {
        code,
        encoding,
        size,
    })
}

/// Append one reply frame to `buf`. Used by server-side tooling and tests.
pub fn encode_reply(buf: &mut BytesMut, code: ReplyCode, encoding: Encoding, data: &[u8]) {
    buf.reserve(REPLY_HEADER_LEN + data.len());
    buf.put_u16_le(code.as_u16());
    buf.put_u8(encoding.as_u8());
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
}

/// Split one complete request frame off the front of `buf`.
///
/// Returns `Ok(None)` while the frame is still incomplete.
pub fn decode_request(buf: &mut BytesMut) -> Result<Option<(Opcode, Bytes)>, FrameError> {
    if buf.len() < REQUEST_HEADER_LEN {
        return Ok(None);
    }

    let size = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if size < 2 {
        return Err(FrameError::Truncated(size));
    }
    let frame_len = 4 + size as usize;
    if buf.len() < frame_len {
        return Ok(None);
    }

    let mut frame = buf.split_to(frame_len);
    frame.advance(4);
    let opcode = Opcode(frame.get_u16_le());
    Ok(Some((opcode, frame.freeze())))
}
