//! Byte source: maps an input file as consecutive read-only segments.

use std::{fs::File, path::Path};

use log::debug;
use memmap2::{Mmap, MmapOptions};

use crate::{
    address::LogicalAddressSpace,
    error::{Error, Result},
};

/// Mapping offsets must be multiples of the allocation granularity, which is at most 64 KiB on
/// the platforms we target.
pub const SEGMENT_ALIGNMENT: u64 = 64 * 1024;

/// Maps `path` into segments of `segment_capacity` bytes (the last one may be shorter).
/// The returned mappings stay valid for as long as the address space is alive.
pub fn map_file(
    path: impl AsRef<Path>,
    segment_capacity: u64,
) -> Result<LogicalAddressSpace<Mmap>> {
    if segment_capacity == 0 || segment_capacity % SEGMENT_ALIGNMENT != 0 {
        return Err(Error::InvalidConfig(format!(
            "segment capacity {segment_capacity} is not a non-zero multiple of {SEGMENT_ALIGNMENT}"
        )));
    }
    if usize::try_from(segment_capacity).is_err() {
        return Err(Error::InvalidConfig(format!(
            "segment capacity {segment_capacity} does not fit this platform's address width"
        )));
    }

    let file = File::open(path.as_ref())?;
    let file_len = file.metadata()?.len();

    let mut segments = Vec::new();
    let mut offset = 0u64;
    while offset < file_len {
        let len = segment_capacity.min(file_len - offset) as usize;
        // SAFETY: the input is treated as immutable for the duration of the run; concurrent
        // modification of the file is outside the engine's contract.
        let segment = unsafe { MmapOptions::new().offset(offset).len(len).map(&file)? };
        segments.push(segment);
        offset += len as u64;
    }
    debug!(
        "mapped {} as {} segment(s) totalling {file_len} bytes",
        path.as_ref().display(),
        segments.len()
    );

    LogicalAddressSpace::new(segments, segment_capacity)
}
