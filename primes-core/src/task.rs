//! Range tasks: test every number in a range against a shared list of known primes.
//!
//! A task owns nothing mutable that another task can see, so tasks can be handed to
//! any number of independent workers and merged afterwards in range order.

use crate::primality::{is_prime_with, KnownPrimes};
use log::*;
use std::{ops::RangeInclusive, sync::Arc};

/// One unit of work.
#[derive(Clone, Debug)]
pub struct RangeTask {
    /// Identifier assigned by the scheduler, used for ordering and logs.
    pub batch: u32,
    pub range: RangeInclusive<u64>,
    pub known: Arc<KnownPrimes>,
}

/// Primes found in one [`RangeTask`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialResult {
    pub batch: u32,
    pub start: u64,
    pub end: u64,
    pub primes: Vec<u64>,
}

impl RangeTask {
    pub fn new(batch: u32, range: RangeInclusive<u64>, known: Arc<KnownPrimes>) -> Self {
        Self {
            batch,
            range,
            known,
        }
    }

    /// Test every number in the range.
    pub fn run(&self) -> PartialResult {
        let (start, end) = (*self.range.start(), *self.range.end());
        debug!("Batch {}: testing [{start}, {end}]", self.batch);

        let primes: Vec<u64> = self
            .range
            .clone()
            .filter(|&n| is_prime_with(n, &self.known))
            .collect();

        debug!("Batch {}: found {} primes", self.batch, primes.len());

        PartialResult {
            batch: self.batch,
            start,
            end,
            primes,
        }
    }
}

/// Split `range` into at most `parts` contiguous, non-overlapping tasks of near equal
/// size. An empty range gives no tasks, `parts == 0` is treated as one part.
pub fn split(range: RangeInclusive<u64>, parts: u32, known: Arc<KnownPrimes>) -> Vec<RangeTask> {
    let (start, end) = (*range.start(), *range.end());
    if start > end {
        return Vec::new();
    }

    // Width in u128, `[0, u64::MAX]` holds 2^64 numbers.
    let width = (end - start) as u128 + 1;
    let parts = (parts.max(1) as u128).min(width);
    let (chunk, extra) = (width / parts, width % parts);

    let mut tasks = Vec::with_capacity(parts as usize);
    let mut next = start as u128;

    for batch in 0..parts {
        let len = chunk + u128::from(batch < extra);
        let last = next + len - 1;
        tasks.push(RangeTask::new(
            batch as u32,
            next as u64..=last as u64,
            known.clone(),
        ));
        next = last + 1;
    }

    tasks
}

/// Merge partial results into one ascending list of primes.
///
/// Results may arrive in any order. Overlapping ranges are reported and the overlap is
/// deduplicated.
pub fn merge(mut results: Vec<PartialResult>) -> Vec<u64> {
    results.sort_by_key(|r| r.start);

    for pair in results.windows(2) {
        if pair[1].start <= pair[0].end {
            warn!(
                "Batches {} and {} overlap in [{}, {}]",
                pair[0].batch, pair[1].batch, pair[1].start, pair[0].end
            );
        }
    }

    let mut primes: Vec<u64> = results.into_iter().flat_map(|r| r.primes).collect();
    primes.sort_unstable();
    primes.dedup();
    primes
}
