//! Command-line interface.

use crate::job::KnownPrimesSource;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(about = "Trial-division prime scanner backed by NCC prime lists")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test single numbers and report a divisor for composites.
    Check {
        #[arg(required = true)]
        numbers: Vec<u64>,

        #[command(flatten)]
        known: KnownArgs,
    },
    /// Find every prime in `[from, to]` using parallel workers.
    Scan {
        #[arg(long)]
        from: u64,

        #[arg(long)]
        to: u64,

        /// Number of range tasks, defaults to the available parallelism.
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        workers: Option<u32>,

        #[command(flatten)]
        known: KnownArgs,

        /// Write a JSON report of every batch.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a scan described by a TOML job file.
    Job {
        path: PathBuf,

        /// Write a JSON report of every batch.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the anchor records of an NCC file.
    Index { path: PathBuf },
}

/// Where to load known primes from.
#[derive(clap::Args, Debug, Clone)]
pub struct KnownArgs {
    /// NCC file with known primes.
    #[arg(long = "known")]
    pub path: Option<PathBuf>,

    /// Number of primes to decode from the file.
    #[arg(long = "known-count", default_value_t = 0, requires = "path")]
    pub count: usize,

    /// Byte offset of an anchor record to start decoding from.
    #[arg(long = "known-offset", default_value_t = 0, requires = "path")]
    pub offset: u64,
}

impl KnownArgs {
    pub fn source(&self) -> Option<KnownPrimesSource> {
        self.path.as_ref().map(|path| KnownPrimesSource {
            path: path.clone(),
            count: self.count,
            offset: self.offset,
        })
    }
}
