//! # RESP2 Encoding and Parsing
//!
//! Purpose: Frame outgoing commands and parse store replies, including the
//! nested arrays that script executions may return.
//!
//! ## Design Principles
//! 1. **Buffer Reuse**: Callers own the line and write buffers.
//! 2. **Binary-Safe**: Bulk strings are raw bytes; script source goes out as-is.
//! 3. **Disconnect vs. Garbage**: A clean end-of-stream before a reply is
//!    `ClientError::Disconnected`; malformed framing is `ClientError::Protocol`.

use std::io::{self, BufRead, Read};

use crate::error::{ClientError, ClientResult};

/// Upper bound on buffer space reserved from a length header before the
/// bytes actually arrive.
const MAX_PREALLOC: usize = 1024;

/// RESP response value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// +OK style responses.
    Simple(Vec<u8>),
    /// -ERR ... responses, including `NOSCRIPT`.
    Error(Vec<u8>),
    /// :123 responses.
    Integer(i64),
    /// $... bulk strings; `None` for both null bulk and null array.
    Bulk(Option<Vec<u8>>),
    /// *... arrays, e.g. a Lua table returned by a script.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Returns the message of an error reply.
    pub fn error_message(&self) -> Option<&[u8]> {
        match self {
            RespValue::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the payload of a simple or non-null bulk string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::Simple(data) => Some(data),
            RespValue::Bulk(Some(data)) => Some(data),
            _ => None,
        }
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    push_header(out, b'*', args.len());
    for arg in args {
        push_header(out, b'$', arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    if !read_line(reader, line_buf)? {
        return Err(ClientError::Disconnected);
    }
    parse_value(reader, line_buf)
}

fn parse_value<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<RespValue> {
    let (&kind, rest) = line_buf.split_first().ok_or(ClientError::Protocol)?;
    match kind {
        b'+' => Ok(RespValue::Simple(rest.to_vec())),
        b'-' => Ok(RespValue::Error(rest.to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
        b'$' => {
            let len = parse_i64(rest)?;
            read_bulk(reader, len)
        }
        b'*' => {
            let len = parse_i64(rest)?;
            if len < 0 {
                return Ok(RespValue::Bulk(None));
            }
            let mut items = Vec::with_capacity(prealloc(len));
            for _ in 0..len {
                // Nested values never start at a clean message boundary.
                if !read_line(reader, line_buf)? {
                    return Err(ClientError::Protocol);
                }
                items.push(parse_value(reader, line_buf)?);
            }
            Ok(RespValue::Array(items))
        }
        _ => Err(ClientError::Protocol),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: i64) -> ClientResult<RespValue> {
    if len < 0 {
        return Ok(RespValue::Bulk(None));
    }
    let want = len as u64 + 2;
    let mut data = Vec::with_capacity(prealloc(len));
    reader.take(want).read_to_end(&mut data)?;
    if (data.len() as u64) < want {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    if !data.ends_with(b"\r\n") {
        return Err(ClientError::Protocol);
    }
    data.truncate(data.len() - 2);
    Ok(RespValue::Bulk(Some(data)))
}

fn prealloc(len: i64) -> usize {
    usize::try_from(len).map_or(MAX_PREALLOC, |len| len.min(MAX_PREALLOC))
}

/// Reads a CRLF-terminated line; `Ok(false)` means the stream was at EOF.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    if !buf.ends_with(b"\r\n") {
        return Err(ClientError::Protocol);
    }
    buf.truncate(buf.len() - 2);
    Ok(true)
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(ClientError::Protocol)
}

fn push_header(out: &mut Vec<u8>, kind: u8, len: usize) {
    out.push(kind);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}
