//! Integer square root bound used by trial division.

/// Exclusive upper end of the search interval. Every `c` squared during the search is
/// strictly below this, so `c * c` always fits in a `u64`.
const SEARCH_MAX: u64 = 1 << 32;

/// Smallest `r` such that `r * r >= number`, rounding the square root upwards.
///
/// `0`, `1` and `2` are returned as-is. Inputs above `(2^32 - 1)^2` give `2^32`.
pub fn sqrt_high(number: u64) -> u64 {
    if number <= 2 {
        return number;
    }

    let (mut min, mut max) = (0u64, SEARCH_MAX);

    loop {
        let c = min + (max - min) / 2;
        let c2 = c * c;

        if c2 < number {
            min = c;
        } else if c2 > number {
            max = c;
        } else {
            return c;
        }

        if max - min <= 1 {
            return max;
        }
    }
}
