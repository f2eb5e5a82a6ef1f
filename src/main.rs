use std::{
    io::{BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use brc_engine::Config;
use clap::Parser;
use log::{error, info};

/// Prints min/mean/max per station of a One Billion Row Challenge measurements file
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Input file of `name;value` lines
    #[arg(default_value = "./measurements.txt")]
    input: PathBuf,
    /// Worker threads [default: 2 x available parallelism]
    #[arg(long)]
    workers: Option<usize>,
    /// Chunks the input is split into [default: one per worker]
    #[arg(long)]
    chunks: Option<usize>,
    /// Bytes per memory-mapped segment, a multiple of 65536
    #[arg(long)]
    segment_size: Option<u64>,
    /// Bytes each worker reads at a time
    #[arg(long)]
    read_ahead: Option<usize>,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(workers) = self.workers {
            config.workers = workers;
            config.chunks = workers;
        }
        if let Some(chunks) = self.chunks {
            config.chunks = chunks;
        }
        if let Some(segment_size) = self.segment_size {
            config.segment_capacity = segment_size;
        }
        if let Some(read_ahead) = self.read_ahead {
            config.read_ahead = read_ahead;
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let config = args.config();
    info!("processing {} with {config:?}", args.input.display());

    let started = Instant::now();
    let output = match brc_engine::run(&args.input, &config) {
        Ok(output) => output,
        Err(e) => {
            error!("encountered error while processing {}: {e}", args.input.display());
            return ExitCode::FAILURE;
        }
    };
    info!("processed {} in {:?}", args.input.display(), started.elapsed());

    let mut buffered_stdout = BufWriter::with_capacity(2 * 1024 * 1024, std::io::stdout());
    if let Err(e) = writeln!(buffered_stdout, "{output}").and_then(|_| buffered_stdout.flush()) {
        error!("couldn't write output: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
