use log::debug;

use crate::{address::LogicalAddressSpace, error::Result};

/// A newline-aligned byte range of the input, handed to exactly one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub start: u64,
    pub size: u64,
}

impl Chunk {
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// Splits the whole address space into at most `chunk_count` ranges.
/// Every range begins at the start of a line and ends just after a newline, or at the end of
/// the input. Ranges that would be empty after alignment are not emitted, so fewer than
/// `chunk_count` chunks come back when the input has fewer lines than that.
pub fn plan_chunks<S: AsRef<[u8]>>(
    space: &LogicalAddressSpace<S>,
    chunk_count: usize,
) -> Result<Vec<Chunk>> {
    let total = space.total_len();
    let approx_size = (total / chunk_count.max(1) as u64).max(1);

    let mut chunks = Vec::with_capacity(chunk_count);
    let mut previous = 0u64;
    while previous < total {
        let mut cursor = previous + approx_size;
        let next = if cursor >= total {
            total
        } else {
            // scan forward to the next newline; boundary goes right after it
            loop {
                if cursor >= total {
                    break total;
                }
                if space.byte_at(cursor)? == b'\n' {
                    break cursor + 1;
                }
                cursor += 1;
            }
        };
        chunks.push(Chunk {
            start: previous,
            size: (next - previous).min(total - previous),
        });
        previous = next;
    }

    debug_assert!(
        chunks
            .iter()
            .skip(1)
            .all(|c| matches!(space.byte_at(c.start - 1), Ok(b'\n'))),
        "every chunk but the first should start right after a newline"
    );
    debug!(
        "planned {} chunk(s) of ~{approx_size} bytes over {total} bytes",
        chunks.len()
    );
    Ok(chunks)
}
