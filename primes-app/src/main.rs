use anyhow::Context;
use clap::Parser;
use log::*;
use primes_core::{
    primality::{smallest_divisor_with, KnownPrimes},
    task::{self, PartialResult},
    AnchorIndex,
};
use serde::Serialize;
use std::{fs::File, io::BufWriter, path::Path, sync::Arc};

mod cli;
mod job;
mod worker;

use cli::{Args, Command};
use job::{JobConfig, JobFile, KnownPrimesSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    match Args::parse().command {
        Command::Check { numbers, known } => {
            let known = load_known(known.source().as_ref())?;

            for n in numbers {
                match smallest_divisor_with(n, &known) {
                    Some(d) => println!("{n}: composite, divisible by {d}"),
                    None if n < 2 => println!("{n}: neither prime nor composite"),
                    None => println!("{n}: prime"),
                }
            }
        }
        Command::Scan {
            from,
            to,
            workers,
            known,
            output,
        } => {
            let known = load_known(known.source().as_ref())?;
            scan(from, to, workers, known, output.as_deref()).await?;
        }
        Command::Job { path, output } => {
            let job = JobFile::load(&path, &JobConfig::default())?;
            let known = load_known(job.known_primes.as_ref())?;
            scan(job.from, job.to, job.workers, known, output.as_deref()).await?;
        }
        Command::Index { path } => {
            let index = AnchorIndex::scan_file(&path)
                .with_context(|| format!("Failed to index {}", path.display()))?;

            println!("{} values, {} anchors", index.len(), index.entries().len());
            for entry in index.entries() {
                println!(
                    "byte {:>12}  value #{:<10} = {}",
                    entry.offset, entry.position, entry.value
                );
            }
        }
    }

    Ok(())
}

fn load_known(source: Option<&KnownPrimesSource>) -> anyhow::Result<KnownPrimes> {
    match source {
        Some(source) => source.load(),
        None => {
            debug!("No known primes given, using plain trial division");
            Ok(KnownPrimes::default())
        }
    }
}

/// JSON report of a scan.
#[derive(Serialize)]
struct Report<'a> {
    from: u64,
    to: u64,
    count: usize,
    batches: &'a [PartialResult],
}

async fn scan(
    from: u64,
    to: u64,
    workers: Option<u32>,
    known: KnownPrimes,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let workers = match workers {
        Some(w) => w,
        None => std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1),
    };

    info!("Scanning [{from}, {to}] with {workers} workers");

    let mut batches = worker::run_scan(from..=to, workers, Arc::new(known)).await?;
    batches.sort_by_key(|b| b.batch);

    let primes = task::merge(batches.clone());
    info!("Found {} primes in [{from}, {to}]", primes.len());
    println!("{}", primes.len());

    if let Some(path) = output {
        let report = Report {
            from,
            to,
            count: primes.len(),
            batches: &batches,
        };

        let file = File::create(path)
            .with_context(|| format!("Failed to create report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &report)?;

        info!("Wrote report to {}", path.display());
    }

    Ok(())
}
