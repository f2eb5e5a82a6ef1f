//! Byte-at-a-time line splitter.
//!
//! Each line is `name;value\n`. Name bytes are folded into a rolling hash while they are copied
//! into a fixed scratch buffer, so the table can be probed without building a string. Value
//! bytes reuse the same buffer and are decoded when the newline arrives.

use crate::{
    decimal::parse_scaled,
    error::{Error, Result},
    table::AggregateTable,
};

/// Longest name or value accepted, in bytes.
pub const MAX_FIELD_LEN: usize = 100;

const HASH_SEED: u64 = 17;
const HASH_PRIME: u64 = 31;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    ReadingKey,
    ReadingValue,
}

pub struct Tokenizer {
    scratch: [u8; MAX_FIELD_LEN],
    len: usize,
    hash: u64,
    state: State,
    /// slot of the station whose value is being read
    current: usize,
    /// absolute offset of the line being read, for error reports
    line_start: u64,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            scratch: [0; MAX_FIELD_LEN],
            len: 0,
            hash: HASH_SEED,
            state: State::ReadingKey,
            current: 0,
            line_start: 0,
        }
    }

    /// Prepares for a new chunk whose first line begins at `line_start`.
    pub fn reset(&mut self, line_start: u64) {
        self.len = 0;
        self.hash = HASH_SEED;
        self.state = State::ReadingKey;
        self.line_start = line_start;
    }

    /// Consumes `block`, which begins at absolute offset `block_offset`, recording every
    /// completed line into `table`. A line may be split across calls.
    pub fn feed(
        &mut self,
        block: &[u8],
        block_offset: u64,
        table: &mut AggregateTable,
    ) -> Result<()> {
        for (i, &b) in block.iter().enumerate() {
            match self.state {
                State::ReadingKey => match b {
                    b';' => {
                        self.current =
                            table.resolve(self.hash, &self.scratch[..self.len], self.line_start)?;
                        self.len = 0;
                        self.hash = HASH_SEED;
                        self.state = State::ReadingValue;
                    }
                    b'\n' => {
                        if self.len != 0 {
                            return Err(Error::MissingSeparator {
                                offset: self.line_start,
                            });
                        }
                        // empty line
                        self.line_start = block_offset + i as u64 + 1;
                    }
                    _ => {
                        self.push(b)?;
                        self.hash = self
                            .hash
                            .wrapping_mul(HASH_PRIME)
                            .wrapping_add(b as u64);
                    }
                },
                State::ReadingValue => {
                    if b == b'\n' {
                        self.end_line(table)?;
                        self.line_start = block_offset + i as u64 + 1;
                    } else {
                        self.push(b)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Ends the chunk. A trailing line without a newline is still recorded.
    pub fn finish(&mut self, table: &mut AggregateTable) -> Result<()> {
        match self.state {
            State::ReadingKey if self.len != 0 => Err(Error::MissingSeparator {
                offset: self.line_start,
            }),
            State::ReadingKey => Ok(()),
            State::ReadingValue => self.end_line(table),
        }
    }

    #[inline(always)]
    fn push(&mut self, b: u8) -> Result<()> {
        if self.len == MAX_FIELD_LEN {
            return Err(Error::LineTooLong {
                offset: self.line_start,
                limit: MAX_FIELD_LEN,
            });
        }
        self.scratch[self.len] = b;
        self.len += 1;
        Ok(())
    }

    #[inline]
    fn end_line(&mut self, table: &mut AggregateTable) -> Result<()> {
        let measurement =
            parse_scaled(&self.scratch[..self.len]).ok_or(Error::MalformedNumber {
                offset: self.line_start,
            })?;
        table.stats_mut(self.current).record(measurement);
        self.len = 0;
        self.state = State::ReadingKey;
        Ok(())
    }
}
