//! One 64-bit offset space over several bounded, read-only segments.
//!
//! Every segment but the last holds exactly `segment_capacity` bytes, so an
//! absolute offset resolves to `(offset / capacity, offset % capacity)`
//! without searching.

use crate::error::{Error, Result};

pub struct LogicalAddressSpace<S> {
    segments: Vec<S>,
    segment_capacity: u64,
    total_len: u64,
}

impl<S: AsRef<[u8]>> LogicalAddressSpace<S> {
    /// Builds the address space, checking that the segments follow the fixed capacity layout.
    pub fn new(segments: Vec<S>, segment_capacity: u64) -> Result<Self> {
        if segment_capacity == 0 {
            return Err(Error::InvalidConfig(
                "segment capacity must be non-zero".to_string(),
            ));
        }
        let last = segments.len().saturating_sub(1);
        let mut total_len = 0u64;
        for (index, segment) in segments.iter().enumerate() {
            let len = segment.as_ref().len();
            let well_sized = if index == last {
                len > 0 && len as u64 <= segment_capacity
            } else {
                len as u64 == segment_capacity
            };
            if !well_sized {
                return Err(Error::InvalidSegment {
                    index,
                    len,
                    expected: segment_capacity,
                });
            }
            total_len += len as u64;
        }
        Ok(Self {
            segments,
            segment_capacity,
            total_len,
        })
    }

    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    pub fn segment_capacity(&self) -> u64 {
        self.segment_capacity
    }

    #[inline]
    fn resolve(&self, offset: u64) -> (usize, usize) {
        (
            (offset / self.segment_capacity) as usize,
            (offset % self.segment_capacity) as usize,
        )
    }

    pub fn byte_at(&self, offset: u64) -> Result<u8> {
        if offset >= self.total_len {
            return Err(Error::OutOfRange {
                offset,
                len: self.total_len,
            });
        }
        let (segment, local) = self.resolve(offset);
        Ok(self.segments[segment].as_ref()[local])
    }

    /// Fills `dest[..len]` with the bytes starting at `start`.
    /// The range may touch at most two adjacent segments, so callers keep their buffers no
    /// larger than one segment.
    pub fn copy(&self, start: u64, len: u32, dest: &mut [u8]) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let end = start + len as u64;
        if end > self.total_len {
            return Err(Error::OutOfRange {
                offset: end - 1,
                len: self.total_len,
            });
        }
        let (first, local) = self.resolve(start);
        let (last, _) = self.resolve(end - 1);
        let dest = &mut dest[..len as usize];
        match last - first {
            0 => {
                dest.copy_from_slice(&self.segments[first].as_ref()[local..local + len as usize]);
            }
            1 => {
                let head = &self.segments[first].as_ref()[local..];
                let (dest_head, dest_tail) = dest.split_at_mut(head.len());
                dest_head.copy_from_slice(head);
                dest_tail.copy_from_slice(&self.segments[last].as_ref()[..dest_tail.len()]);
            }
            _ => return Err(Error::UnsupportedSpan { start, len }),
        }
        Ok(())
    }
}
