use std::{
    panic,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
    thread,
};

use log::debug;

use crate::{
    address::LogicalAddressSpace,
    chunk::Chunk,
    error::{Error, Result},
    table::AggregateTable,
    tokenizer::Tokenizer,
};

/// Reads chunks through a private read-ahead buffer into a private table.
pub struct Worker {
    buffer: Box<[u8]>,
    tokenizer: Tokenizer,
    table: AggregateTable,
}

impl Worker {
    /// `read_ahead` must not exceed one segment of the address space it will read from.
    pub fn new(read_ahead: usize) -> Self {
        debug_assert!(read_ahead > 0 && read_ahead <= u32::MAX as usize);
        Self {
            buffer: vec![0u8; read_ahead].into_boxed_slice(),
            tokenizer: Tokenizer::new(),
            table: AggregateTable::new(),
        }
    }

    /// Records every line of `chunk`. Gives up early, without error, once `abort` is raised by
    /// another worker.
    pub fn process<S: AsRef<[u8]>>(
        &mut self,
        space: &LogicalAddressSpace<S>,
        chunk: Chunk,
        abort: &AtomicBool,
    ) -> Result<()> {
        self.tokenizer.reset(chunk.start);
        let end = chunk.end();
        let mut offset = chunk.start;
        while offset < end {
            if abort.load(Ordering::Relaxed) {
                return Ok(());
            }
            let len = (end - offset).min(self.buffer.len() as u64) as u32;
            space.copy(offset, len, &mut self.buffer)?;
            self.tokenizer
                .feed(&self.buffer[..len as usize], offset, &mut self.table)?;
            offset += len as u64;
        }
        self.tokenizer.finish(&mut self.table)
    }

    pub fn into_table(self) -> AggregateTable {
        self.table
    }
}

/// Runs up to `workers` threads over `chunks`, each claiming the next unprocessed chunk until
/// none remain, and returns one table per thread.
/// The first error stops every worker and is returned instead of any table.
pub fn run_workers<S: AsRef<[u8]> + Sync>(
    space: &LogicalAddressSpace<S>,
    chunks: &[Chunk],
    workers: usize,
    read_ahead: usize,
) -> Result<Vec<AggregateTable>> {
    let workers = workers.min(chunks.len());
    let next_chunk = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let first_error = Mutex::new(None::<Error>);

    let joined = thread::scope(|s| {
        let handles = (0..workers)
            .map(|id| {
                let next_chunk = &next_chunk;
                let abort = &abort;
                let first_error = &first_error;
                s.spawn(move || {
                    let mut worker = Worker::new(read_ahead);
                    let mut processed = 0usize;
                    loop {
                        let idx = next_chunk.fetch_add(1, Ordering::SeqCst);
                        let Some(&chunk) = chunks.get(idx) else {
                            break;
                        };
                        if let Err(e) = worker.process(space, chunk, abort) {
                            abort.store(true, Ordering::Relaxed);
                            first_error
                                .lock()
                                .unwrap_or_else(PoisonError::into_inner)
                                .get_or_insert(e);
                            break;
                        }
                        if abort.load(Ordering::Relaxed) {
                            break;
                        }
                        processed += 1;
                    }
                    debug!(
                        "worker {id} finished {processed} chunk(s), {} station(s)",
                        worker.table.len()
                    );
                    worker.into_table()
                })
            })
            // spawn every worker before joining any of them
            .collect::<Vec<_>>();
        handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
    }); // scope ends, all threads were joined

    if let Some(e) = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(e);
    }
    Ok(joined
        .into_iter()
        .map(|r| r.unwrap_or_else(|payload| panic::resume_unwind(payload)))
        .collect())
}

#[cfg(test)]
mod test {
    use std::sync::atomic::AtomicBool;

    use super::{run_workers, Worker};
    use crate::{
        address::LogicalAddressSpace,
        chunk::{plan_chunks, Chunk},
        error::Error,
    };

    fn space(input: &str, capacity: usize) -> LogicalAddressSpace<Vec<u8>> {
        let segments = input
            .as_bytes()
            .chunks(capacity)
            .map(<[u8]>::to_vec)
            .collect();
        match LogicalAddressSpace::new(segments, capacity as u64) {
            Ok(s) => s,
            Err(e) => panic!("valid segment layout rejected: {e}"),
        }
    }

    #[test]
    fn worker_reads_through_small_buffer_and_segments() {
        let input = "Paris;12.5\nCairo;30.1\nParis;-2.5\n";
        let s = space(input, 5);
        let mut worker = Worker::new(3);
        let chunk = Chunk {
            start: 0,
            size: input.len() as u64,
        };
        if let Err(e) = worker.process(&s, chunk, &AtomicBool::new(false)) {
            panic!("unexpected error: {e}");
        }
        let table = worker.into_table();
        let paris = table.iter().find(|(n, _)| *n == "Paris").map(|(_, a)| a.sum);
        assert_eq!(paris, Some(100));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn one_table_per_worker_covering_every_line() {
        let input = "a;1.0\nb;2.0\nc;3.0\nd;4.0\ne;5.0\nf;6.0\ng;7.0\nh;8.0\n";
        let s = space(input, 8);
        let chunks = match plan_chunks(&s, 8) {
            Ok(c) => c,
            Err(e) => panic!("planning failed: {e}"),
        };
        for workers in 1..=4 {
            let tables = match run_workers(&s, &chunks, workers, 4) {
                Ok(t) => t,
                Err(e) => panic!("unexpected error with {workers} workers: {e}"),
            };
            assert_eq!(tables.len(), workers.min(chunks.len()));
            let lines: u64 = tables
                .iter()
                .flat_map(|t| t.iter().map(|(_, a)| a.count))
                .sum();
            assert_eq!(lines, 8, "{workers} workers lost or duplicated lines");
        }
    }

    #[test]
    fn first_error_aborts_the_run() {
        let input = "a;1.0\nb;2.0\nc;oops\nd;4.0\n";
        let s = space(input, 8);
        let chunks = match plan_chunks(&s, 4) {
            Ok(c) => c,
            Err(e) => panic!("planning failed: {e}"),
        };
        assert!(matches!(
            run_workers(&s, &chunks, 2, 8),
            Err(Error::MalformedNumber { offset: 12 })
        ));
    }
}
