//! On-disk cache file format.
//!
//! ```text
//! etime=<unix nanoseconds>\n
//! ctime=<unix seconds>\n
//! <payload bytes>
//! ```
//!
//! `etime` is the absolute expiry instant; `ctime` is informational.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use chrono::Utc;

use crate::error::{CacheError, Result};

const EXPIRE_PREFIX: &str = "etime=";
const CREATE_PREFIX: &str = "ctime=";

/// Longest header line accepted: prefix, sign and an i64.
const MAX_HEADER_LINE: u64 = 32;

/// Parsed header of a cache file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Expiry instant, unix nanoseconds
    pub expire_at: i64,
    /// Creation time, unix seconds
    pub created_at: i64,
}

impl Header {
    /// Header for an entry written now that lives for `ttl_nanos`.
    pub fn new(ttl_nanos: i64) -> Self {
        let now = Utc::now();
        Self {
            expire_at: now
                .timestamp_nanos_opt()
                .unwrap_or(i64::MAX)
                .saturating_add(ttl_nanos),
            created_at: now.timestamp(),
        }
    }

    /// True once `now` (unix nanoseconds) has reached the expiry instant.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expire_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_nanos())
    }

    /// Renders the two header lines.
    pub fn encode(&self) -> Vec<u8> {
        format!(
            "{EXPIRE_PREFIX}{}\n{CREATE_PREFIX}{}\n",
            self.expire_at, self.created_at
        )
        .into_bytes()
    }
}

/// Current time as unix nanoseconds, saturating outside the i64 range.
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Splits a whole cache file into its header and payload.
pub fn decode(path: &Path, bytes: &[u8]) -> Result<(Header, usize)> {
    let (expire_line, rest) = split_line(path, bytes)?;
    let (create_line, _) = split_line(path, rest)?;

    let header = Header {
        expire_at: parse_field(path, expire_line, EXPIRE_PREFIX)?,
        created_at: parse_field(path, create_line, CREATE_PREFIX)?,
    };
    let payload_start = expire_line.len() + create_line.len() + 2;
    Ok((header, payload_start))
}

/// Reads only the expiry line from an open file.
pub fn read_expiry<R: Read>(path: &Path, reader: R) -> Result<i64> {
    let mut line = Vec::new();
    BufReader::new(reader.take(MAX_HEADER_LINE + 1))
        .read_until(b'\n', &mut line)
        .map_err(|e| CacheError::io(path, e))?;

    match line.pop() {
        Some(b'\n') => parse_field(path, &line, EXPIRE_PREFIX),
        _ => Err(corrupt(path, "unterminated expiry line")),
    }
}

fn split_line<'a>(path: &Path, bytes: &'a [u8]) -> Result<(&'a [u8], &'a [u8])> {
    let end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| corrupt(path, "truncated header"))?;
    Ok((&bytes[..end], &bytes[end + 1..]))
}

fn parse_field(path: &Path, line: &[u8], prefix: &str) -> Result<i64> {
    let line = std::str::from_utf8(line).map_err(|_| corrupt(path, "header is not UTF-8"))?;
    let value = line
        .strip_prefix(prefix)
        .ok_or_else(|| corrupt(path, &format!("expected '{prefix}' line, got '{line}'")))?;
    value
        .parse()
        .map_err(|_| corrupt(path, &format!("invalid {prefix} value '{value}'")))
}

fn corrupt(path: &Path, reason: &str) -> CacheError {
    CacheError::Corrupt {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
