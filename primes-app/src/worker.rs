//! Runs range tasks on blocking workers and collects their results.

use anyhow::Context;
use log::*;
use primes_core::{
    task::{self, PartialResult},
    KnownPrimes,
};
use rustc_hash::FxHashMap;
use std::{ops::RangeInclusive, sync::Arc};
use tokio::{sync::mpsc::channel, task::JoinHandle};

/// Split `range` into `workers` tasks, run each on its own blocking thread and return the
/// partial results in completion order.
pub async fn run_scan(
    range: RangeInclusive<u64>,
    workers: u32,
    known: Arc<KnownPrimes>,
) -> anyhow::Result<Vec<PartialResult>> {
    let tasks = task::split(range, workers, known);
    let total = tasks.len();

    let (result_sender, mut result_recv) = channel(total.max(1));

    // One handle per batch, so a panicking worker can be named.
    let mut handles: FxHashMap<u32, JoinHandle<()>> = FxHashMap::default();
    handles.reserve(total);

    for task in tasks {
        let batch = task.batch;
        let sender = result_sender.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let result = task.run();

            if sender.blocking_send(result).is_err() {
                warn!("Batch {batch}: collector is gone, dropping result");
            }
        });

        handles.insert(batch, handle);
    }

    // Only the workers hold senders now, so the channel closes once they are all done.
    drop(result_sender);

    let mut results = Vec::with_capacity(total);

    while let Some(result) = result_recv.recv().await {
        info!(
            "Batch {} done: {} primes in [{}, {}] ({}/{total})",
            result.batch,
            result.primes.len(),
            result.start,
            result.end,
            results.len() + 1,
        );
        results.push(result);
    }

    for (batch, handle) in handles {
        handle
            .await
            .with_context(|| format!("Worker for batch {batch} failed"))?;
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use primes_core::is_prime;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn parallel_scan_matches_sequential() {
        let known = Arc::new(KnownPrimes::new(vec![2, 3, 5, 7, 11, 13]).unwrap());

        let results = run_scan(1_000..=60_000, 8, known).await.unwrap();
        assert_eq!(results.len(), 8);

        let expected: Vec<u64> = (1_000..=60_000).filter(|&n| is_prime(n)).collect();
        assert_eq!(task::merge(results), expected);
    }

    #[tokio::test]
    async fn empty_range() {
        let results = run_scan(10..=1, 4, Arc::default()).await.unwrap();
        assert!(results.is_empty());
    }
}
