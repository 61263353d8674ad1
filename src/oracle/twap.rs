//! TWAP (Time-Weighted Average Price) calculation.
//!
//! A pool accumulates `price * seconds` in UQ112x112 fixed point. Between two
//! readings `(c1, t1)` and `(c2, t2)` the average price is
//!
//! ```text
//! avg = (c2 - c1 mod 2^256) / (t2 - t1 mod 2^32)
//! ```
//!
//! and a quote is `amount_in * avg >> 112`. All arithmetic is unsigned integer;
//! the multiply goes through a 512-bit intermediate.

use ethers::types::{U256, U512};

use super::error::{OracleError, Result};
use crate::types::PairSnapshot;

/// Fractional bits of the UQ112x112 format
pub const RESOLUTION: usize = 112;

/// 2^112, the fixed-point one
pub const Q112: U256 = U256([0, 1 << 48, 0, 0]);

/// Accumulators are `uint256` and wrap modulo 2^ACCUMULATOR_BITS
pub const ACCUMULATOR_BITS: u32 = 256;

/// `blockTimestampLast` is `uint32` and wraps modulo 2^TIMESTAMP_BITS
pub const TIMESTAMP_BITS: u32 = 32;

/// Seconds between two pool timestamps, modulo 2^32
pub fn elapsed(previous: u32, current: u32) -> u32 {
    current.wrapping_sub(previous)
}

/// Accumulator growth between two readings, modulo 2^256
pub fn cumulative_delta(previous: U256, current: U256) -> U256 {
    current.overflowing_sub(previous).0
}

/// Average UQ112x112 price over `elapsed` seconds
pub fn average_price(previous: U256, current: U256, elapsed: u32) -> Option<U256> {
    if elapsed == 0 {
        return None;
    }
    Some(cumulative_delta(previous, current) / U256::from(elapsed))
}

/// Average price of one hop, using the accumulator matching the hop direction
pub fn hop_average(previous: &PairSnapshot, current: &PairSnapshot) -> Option<U256> {
    average_price(
        previous.directional_cumulative(),
        current.directional_cumulative(),
        elapsed(previous.block_timestamp_last, current.block_timestamp_last),
    )
}

/// `amount_in * average >> 112`
pub fn quote(average: U256, amount_in: U256) -> Result<U256> {
    let U512(limbs) = average.full_mul(amount_in) >> RESOLUTION;
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(OracleError::Overflow("hop output"));
    }
    Ok(U256([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// Feed `amount_in` through each hop average in order
pub fn compose(averages: &[U256], amount_in: U256) -> Result<U256> {
    averages
        .iter()
        .try_fold(amount_in, |amount, average| quote(*average, amount))
}

/// UQ112x112 encoding of `numerator / denominator`, as the pair's `encode(..).uqdiv(..)`
pub fn encode_ratio(numerator: u128, denominator: u128) -> Option<U256> {
    if denominator == 0 {
        return None;
    }
    Some((U256::from(numerator) << RESOLUTION) / U256::from(denominator))
}
