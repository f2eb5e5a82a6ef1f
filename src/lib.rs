//! Min, mean and max per station over a large `name;value` file, in one parallel pass.
//!
//! The input is viewed through a [LogicalAddressSpace] of bounded segments, split into
//! newline-aligned [Chunk]s, and each chunk is tokenized by a worker into its own
//! [AggregateTable]. The tables are merged into an [Aggregation] once every worker is done.

pub mod address;
pub mod chunk;
pub mod decimal;
pub mod error;
pub mod merge;
pub mod source;
pub mod table;
pub mod tokenizer;
pub mod worker;

use std::{path::Path, thread};

use log::{debug, info};

pub use address::LogicalAddressSpace;
pub use chunk::{plan_chunks, Chunk};
pub use error::{Error, Result};
pub use merge::Aggregation;
pub use table::{Aggregate, AggregateTable};

/// Everything the engine needs to know besides the input itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Threads processing chunks.
    pub workers: usize,
    /// Number of chunks the input is planned into.
    pub chunks: usize,
    /// Size of every mapped segment but the last.
    pub segment_capacity: u64,
    /// Bytes each worker copies out of the address space at a time.
    pub read_ahead: usize,
}

impl Default for Config {
    fn default() -> Self {
        let workers = match thread::available_parallelism() {
            // two workers per core
            Ok(n) => n.get() * 2,
            Err(_) => {
                log::warn!("couldn't query the available parallelism, going single-threaded");
                1
            }
        };
        Self {
            workers,
            chunks: workers,
            segment_capacity: 1 << 31,
            read_ahead: 1024 * 1024,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 || self.chunks == 0 {
            return Err(Error::InvalidConfig(
                "worker and chunk counts must be non-zero".to_string(),
            ));
        }
        if self.read_ahead == 0 || self.read_ahead > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "read-ahead of {} bytes is outside 1..={}",
                self.read_ahead,
                u32::MAX
            )));
        }
        if self.read_ahead as u64 > self.segment_capacity {
            return Err(Error::InvalidConfig(format!(
                "read-ahead of {} bytes exceeds the segment capacity of {}",
                self.read_ahead, self.segment_capacity
            )));
        }
        Ok(())
    }
}

/// Plans, processes and merges the whole of `space`.
/// Any invalid line aborts the run; no partial results are returned.
pub fn aggregate<S: AsRef<[u8]> + Sync>(
    space: &LogicalAddressSpace<S>,
    config: &Config,
) -> Result<Aggregation> {
    if config.workers == 0 || config.chunks == 0 || config.read_ahead == 0 {
        return Err(Error::InvalidConfig(
            "worker, chunk and read-ahead sizes must be non-zero".to_string(),
        ));
    }
    // a read must never span more than two segments
    let read_ahead = config
        .read_ahead
        .min(space.segment_capacity().min(u32::MAX as u64) as usize);

    let chunks = plan_chunks(space, config.chunks)?;
    let tables = worker::run_workers(space, &chunks, config.workers, read_ahead)?;
    debug!("merging {} worker table(s)", tables.len());
    let aggregation = Aggregation::merge(tables);
    info!(
        "aggregated {} bytes into {} station(s) using {} chunk(s)",
        space.total_len(),
        aggregation.len(),
        chunks.len()
    );
    Ok(aggregation)
}

/// Maps the file at `path` and renders its aggregation as
/// `{name=min/mean/max, ...}`.
pub fn run(path: impl AsRef<Path>, config: &Config) -> Result<String> {
    config.validate()?;
    let space = source::map_file(path, config.segment_capacity)?;
    Ok(aggregate(&space, config)?.to_string())
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::{aggregate, run, Config, LogicalAddressSpace};
    use crate::error::{Error, Result};

    fn config(chunks: usize, segment_capacity: u64) -> Config {
        Config {
            workers: 4,
            chunks,
            segment_capacity,
            read_ahead: 16,
        }
    }

    fn process(input: &str, chunks: usize, capacity: usize) -> Result<String> {
        let segments: Vec<Vec<u8>> = input
            .as_bytes()
            .chunks(capacity)
            .map(<[u8]>::to_vec)
            .collect();
        let space = LogicalAddressSpace::new(segments, capacity as u64)?;
        Ok(aggregate(&space, &config(chunks, capacity as u64))?.to_string())
    }

    #[test]
    fn process_single_chunk() {
        for (input, exp_out) in [
            ("", "{}"),
            ("a;-1.1", "{a=-1.1/-1.1/-1.1}"),
            ("X;10.0\nX;20.0\nY;-5.5\n", "{X=10.0/15.0/20.0, Y=-5.5/-5.5/-5.5}"),
            (
                "a;1.1\nabc;12.3\na;-2.2\nverylongname12345;-11.0\naaverylongname1234;0.0",
                "{a=-2.2/-0.5/1.1, aaverylongname1234=0.0/0.0/0.0, abc=12.3/12.3/12.3, verylongname12345=-11.0/-11.0/-11.0}",
            ),
            ("z;-0.1\nz;0.0\nz;0.0\n", "{z=-0.1/0.0/0.0}"),
            ("São Paulo;25.1\nZürich;-3.0\n", "{São Paulo=25.1/25.1/25.1, Zürich=-3.0/-3.0/-3.0}"),
        ] {
            match process(input, 1, 1 << 16) {
                Ok(out) => assert_eq!(out, exp_out, "bad output for input: `{input}`"),
                Err(e) => panic!("error `{e}` on valid input: `{input}`"),
            }
        }
    }

    #[test]
    fn chunk_count_does_not_change_output() {
        let mut input = String::new();
        let names = ["Abha", "Accra", "Bergen", "Cape Town", "Dakar", "Oslo"];
        for i in 0..240i32 {
            let name = names[(i * 7 % names.len() as i32) as usize];
            let value = (i * 37 % 1999) - 999;
            let sign = if value < 0 { "-" } else { "" };
            input.push_str(&format!(
                "{name};{sign}{}.{}\n",
                value.abs() / 10,
                value.abs() % 10
            ));
        }
        let expected = match process(&input, 1, 1 << 16) {
            Ok(out) => out,
            Err(e) => panic!("single chunk failed: {e}"),
        };
        for chunks in [2, 3, 5, 16, 64, 240] {
            for capacity in [17, 64, 1 << 16] {
                match process(&input, chunks, capacity) {
                    Ok(out) => assert_eq!(out, expected, "{chunks} chunks, capacity {capacity}"),
                    Err(e) => panic!("{chunks} chunks, capacity {capacity}: {e}"),
                }
            }
        }
        // the same data without the final newline
        let trimmed = input.trim_end_matches('\n');
        for chunks in [1, 2, 7] {
            match process(trimmed, chunks, 64) {
                Ok(out) => assert_eq!(out, expected, "{chunks} chunks, no final newline"),
                Err(e) => panic!("{chunks} chunks, no final newline: {e}"),
            }
        }
    }

    #[test]
    fn malformed_number_aborts() {
        for chunks in [1, 2, 3] {
            assert!(
                matches!(
                    process("A;1.0\nX;abc\nB;2.0\n", chunks, 64),
                    Err(Error::MalformedNumber { offset: 6 })
                ),
                "{chunks} chunks"
            );
        }
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let base = config(4, 1 << 16);
        for bad in [
            Config { workers: 0, ..base },
            Config { chunks: 0, ..base },
            Config { read_ahead: 0, ..base },
            Config {
                read_ahead: 1 << 17,
                ..base
            },
        ] {
            assert!(
                matches!(bad.validate(), Err(Error::InvalidConfig(_))),
                "{bad:?} should be invalid"
            );
        }
        assert!(base.validate().is_ok());
    }

    #[test]
    fn run_maps_file_larger_than_one_segment() {
        let segment = 64 * 1024;
        let mut contents = String::new();
        let mut lines = 0u64;
        while contents.len() < 3 * segment + 100 {
            contents.push_str(if lines % 2 == 0 { "Hanoi;-1.5\n" } else { "Lagos;31.9\n" });
            lines += 1;
        }
        let mut file = match NamedTempFile::new() {
            Ok(f) => f,
            Err(e) => panic!("couldn't create temp file: {e}"),
        };
        if let Err(e) = file.write_all(contents.as_bytes()) {
            panic!("couldn't write temp file: {e}");
        }

        let config = Config {
            workers: 3,
            chunks: 7,
            segment_capacity: segment as u64,
            read_ahead: 4096,
        };
        match run(file.path(), &config) {
            Ok(out) => assert_eq!(out, "{Hanoi=-1.5/-1.5/-1.5, Lagos=31.9/31.9/31.9}"),
            Err(e) => panic!("run failed: {e}"),
        }
    }
}
