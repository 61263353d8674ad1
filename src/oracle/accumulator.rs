//! Accumulator reader seam
//!
//! A pool exposes `price0CumulativeLast`, `price1CumulativeLast` and
//! `blockTimestampLast`; the oracle only ever reads them.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

use super::error::Result;
use super::path::HopDescriptor;
use crate::types::PairSnapshot;

/// Raw accumulator registers of one pool at the time of the read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccumulatorReading {
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
    pub block_timestamp_last: u32,
}

impl AccumulatorReading {
    /// Bind the reading to the hop it was taken for
    pub fn into_snapshot(self, hop: &HopDescriptor) -> PairSnapshot {
        PairSnapshot {
            pair_address: hop.pair_address,
            token0_first: hop.token0_first,
            price0_cumulative_last: self.price0_cumulative_last,
            price1_cumulative_last: self.price1_cumulative_last,
            block_timestamp_last: self.block_timestamp_last,
        }
    }
}

/// Trait for pool accumulator sources
#[async_trait]
pub trait AccumulatorSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Read the pool's current registers.
    ///
    /// Fails with `PoolUnavailable` when no pool exists at `pair`.
    async fn read(&self, pair: Address) -> Result<AccumulatorReading>;
}
