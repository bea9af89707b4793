//! Bounded trial division, plain and accelerated with a list of known primes.

use crate::sqrt::sqrt_high;
use core::ops::Deref;

/// Errors when building a [`KnownPrimes`] list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KnownPrimesError {
    /// Values below 2 can't be trial divisors.
    #[error("value {value} at index {index} is not a valid divisor")]
    TooSmall { index: usize, value: u64 },
    /// The list is not strictly ascending (this includes duplicates).
    #[error("value {value} at index {index} does not exceed its predecessor {previous}")]
    NotAscending {
        index: usize,
        value: u64,
        previous: u64,
    },
}

/// Strictly ascending list of divisor candidates, usually a decoded NCC prime file.
///
/// The list is expected to hold every prime up to its last element. That is not
/// verified here, a list with holes makes [`is_prime_with`] skip the missing divisors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnownPrimes(Vec<u64>);

impl KnownPrimes {
    /// Validate and wrap a list of primes.
    pub fn new(primes: Vec<u64>) -> Result<Self, KnownPrimesError> {
        let mut previous = None;

        for (index, &value) in primes.iter().enumerate() {
            if value < 2 {
                return Err(KnownPrimesError::TooSmall { index, value });
            }

            if let Some(previous) = previous.filter(|&p| value <= p) {
                return Err(KnownPrimesError::NotAscending {
                    index,
                    value,
                    previous,
                });
            }

            previous = Some(value);
        }

        Ok(Self(primes))
    }

    /// Largest listed value, if any.
    pub fn last(&self) -> Option<u64> {
        self.0.last().copied()
    }

    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }
}

impl Deref for KnownPrimes {
    type Target = [u64];

    fn deref(&self) -> &[u64] {
        &self.0
    }
}

impl TryFrom<Vec<u64>> for KnownPrimes {
    type Error = KnownPrimesError;

    fn try_from(value: Vec<u64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Outcome of the checks every variant runs before dividing.
enum FastPath {
    Decided(Option<u64>),
    TrialDivide { bound: u64 },
}

fn fast_path(number: u64) -> FastPath {
    if number < 2 {
        // Neither prime nor composite, there is no divisor to report.
        return FastPath::Decided(None);
    }

    if number < 4 {
        return FastPath::Decided(None);
    }

    if number % 2 == 0 {
        return FastPath::Decided(Some(2));
    }

    FastPath::TrialDivide {
        bound: sqrt_high(number),
    }
}

/// Odd trial divisors from `from` up to and including `bound`.
fn odd_divisor(number: u64, from: u64, bound: u64) -> Option<u64> {
    (from..=bound).step_by(2).find(|d| number % d == 0)
}

/// Smallest divisor `> 1` proving `number` composite, `None` for primes and for `0` and
/// `1`.
pub fn smallest_divisor(number: u64) -> Option<u64> {
    match fast_path(number) {
        FastPath::Decided(divisor) => divisor,
        FastPath::TrialDivide { bound } => odd_divisor(number, 3, bound),
    }
}

/// Same as [`smallest_divisor`], dividing by `known` first.
///
/// The walk stops at the first listed value above `sqrt_high(number)`. If the list runs
/// out before that, odd candidates continue from the last listed value.
pub fn smallest_divisor_with(number: u64, known: &KnownPrimes) -> Option<u64> {
    let bound = match fast_path(number) {
        FastPath::Decided(divisor) => return divisor,
        FastPath::TrialDivide { bound } => bound,
    };

    let mut last = None;

    for &candidate in known.iter().filter(|&&p| p != 2) {
        if candidate > bound {
            return None;
        }

        if number % candidate == 0 {
            return Some(candidate);
        }

        last = Some(candidate);
    }

    // List exhausted below the bound, keep going in odd steps.
    let next = match last {
        Some(p) if p % 2 == 0 => p + 1,
        Some(p) => p + 2,
        None => 3,
    };

    odd_divisor(number, next, bound)
}

/// Trial-division primality test.
pub fn is_prime(number: u64) -> bool {
    number >= 2 && smallest_divisor(number).is_none()
}

/// Trial-division primality test dividing by `known` first.
///
/// Agrees with [`is_prime`] whenever `known` is a prefix of the primes.
pub fn is_prime_with(number: u64, known: &KnownPrimes) -> bool {
    number >= 2 && smallest_divisor_with(number, known).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn sieve(limit: usize) -> Vec<bool> {
        let mut is_prime = vec![true; limit + 1];
        is_prime[0] = false;
        if limit >= 1 {
            is_prime[1] = false;
        }

        let mut i = 2;
        while i * i <= limit {
            if is_prime[i] {
                (i * i..=limit).step_by(i).for_each(|j| is_prime[j] = false);
            }
            i += 1;
        }

        is_prime
    }

    fn primes_below(limit: usize) -> Vec<u64> {
        sieve(limit)
            .iter()
            .enumerate()
            .filter(|(_, &p)| p)
            .map(|(i, _)| i as u64)
            .collect()
    }

    #[test]
    fn fast_paths() {
        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(!is_prime(4));
        assert!(is_prime(5));
        assert!(!is_prime(9));
        assert!(!is_prime(25));
    }

    #[test]
    fn matches_sieve() {
        const LIMIT: usize = 1_000_000;
        let reference = sieve(LIMIT);

        for (n, &expected) in reference.iter().enumerate() {
            assert_eq!(is_prime(n as u64), expected, "mismatch at {n}");
        }
    }

    #[test]
    fn accelerated_matches_plain() {
        let primes = primes_below(2_000);

        for prefix in [0, 1, 2, 5, 50, primes.len()] {
            let known = KnownPrimes::new(primes[..prefix].to_vec()).unwrap();

            for n in 0..200_000u64 {
                assert_eq!(
                    is_prime_with(n, &known),
                    is_prime(n),
                    "mismatch at {n} with {prefix} known primes"
                );
            }
        }
    }

    #[test]
    fn accelerated_sampled_large() {
        let known = KnownPrimes::new(primes_below(10_000)).unwrap();
        let mut rng = rand::thread_rng();

        for _ in 0..2_000 {
            let n = rng.gen_range(1_000_000u64..=1_000_000_000_000);
            assert_eq!(is_prime_with(n, &known), is_prime(n), "mismatch at {n}");
        }
    }

    #[test]
    fn divisors() {
        assert_eq!(smallest_divisor(0), None);
        assert_eq!(smallest_divisor(1), None);
        assert_eq!(smallest_divisor(2), None);
        assert_eq!(smallest_divisor(100), Some(2));
        assert_eq!(smallest_divisor(91), Some(7));
        assert_eq!(smallest_divisor(97), None);
        // 65521 is the largest prime below 2^16.
        assert_eq!(smallest_divisor(65521 * 65521), Some(65521));

        let known = KnownPrimes::new(vec![2, 3, 5, 7, 11, 13]).unwrap();
        assert_eq!(smallest_divisor_with(91, &known), Some(7));
        assert_eq!(smallest_divisor_with(17 * 19, &known), Some(17));
        assert_eq!(smallest_divisor_with(65521 * 65521, &known), Some(65521));
    }

    #[test]
    fn large_prime() {
        // Largest prime below 2^32.
        assert!(is_prime(4_294_967_291));
        let known = KnownPrimes::new(primes_below(1_000)).unwrap();
        assert!(is_prime_with(4_294_967_291, &known));
        assert!(!is_prime_with(4_294_967_291 * 3, &known));
    }

    #[test]
    fn even_last_value_rounds_up_to_odd() {
        let known = KnownPrimes::new(vec![3, 4]).unwrap();

        for n in [5 * 5, 5 * 7, 7 * 7, 11 * 13, 97, 101, 65521 * 3, 65521 * 65521] {
            assert_eq!(is_prime_with(n, &known), is_prime(n), "mismatch at {n}");
        }
        assert_eq!(smallest_divisor_with(35, &known), Some(5));
    }

    #[test]
    fn values_above_number_are_ignored() {
        let known = KnownPrimes::new(vec![3, 5, 7, 11, 13, 17, 19, 23]).unwrap();
        assert!(is_prime_with(5, &known));
        assert!(is_prime_with(7, &known));
        assert!(!is_prime_with(9, &known));
    }

    #[test]
    fn rejects_invalid_lists() {
        assert_eq!(
            KnownPrimes::new(vec![1, 2, 3]),
            Err(KnownPrimesError::TooSmall { index: 0, value: 1 })
        );
        assert_eq!(
            KnownPrimes::new(vec![2, 3, 3, 5]),
            Err(KnownPrimesError::NotAscending {
                index: 2,
                value: 3,
                previous: 3
            })
        );
        assert_eq!(
            KnownPrimes::try_from(vec![2, 5, 3]),
            Err(KnownPrimesError::NotAscending {
                index: 2,
                value: 3,
                previous: 5
            })
        );
        assert!(KnownPrimes::new(Vec::new()).is_ok());
    }
}
