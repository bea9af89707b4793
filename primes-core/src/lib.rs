//! Primality testing of `u64` accelerated by NCC-compressed lists of known primes.
//!
//! - [`sqrt`]: ceiling square root bounding trial division.
//! - [`primality`]: trial division, plain and with known primes.
//! - [`ncc`]: decoder for the NCC gap-compressed format.
//! - [`task`]: range tasks for schedulers running many tests in parallel.

pub mod ncc;
pub mod primality;
pub mod sqrt;
pub mod task;

pub use ncc::{decode_gaps, AnchorIndex, DecodeError, Decoder};
pub use primality::{is_prime, is_prime_with, KnownPrimes, KnownPrimesError};
pub use sqrt::sqrt_high;
pub use task::{PartialResult, RangeTask};
