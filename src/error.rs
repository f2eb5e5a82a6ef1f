use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every condition here is fatal for the current run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("offset {offset} is out of range for input of {len} bytes")]
    OutOfRange { offset: u64, len: u64 },
    #[error("read of {len} bytes at offset {start} spans more than two segments")]
    UnsupportedSpan { start: u64, len: u32 },
    #[error("malformed measurement in line at offset {offset}")]
    MalformedNumber { offset: u64 },
    #[error("field in line at offset {offset} exceeds {limit} bytes")]
    LineTooLong { offset: u64, limit: usize },
    #[error("line at offset {offset} has no `;` separator")]
    MissingSeparator { offset: u64 },
    #[error("station name in line at offset {offset} is not valid UTF-8")]
    InvalidKey { offset: u64 },
    #[error("segment {index} has {len} bytes, expected {expected}")]
    InvalidSegment {
        index: usize,
        len: usize,
        expected: u64,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
