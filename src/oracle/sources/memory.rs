//! In-memory constant-product pools
//!
//! Keeps the same three registers a Uniswap V2 pair keeps and advances them
//! the way the pair's `_update` does, so the oracle can run against simulated
//! markets. Clones share the same pool set.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::oracle::accumulator::{AccumulatorReading, AccumulatorSource};
use crate::oracle::error::{OracleError, Result};
use crate::oracle::pair_address::{sort_tokens, OracleParams};
use crate::oracle::twap;

/// Registers of one simulated pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolState {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: u128,
    pub reserve1: u128,
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
    pub block_timestamp_last: u32,
}

impl PoolState {
    /// Accrue `reserve ratio * elapsed` up to `timestamp`, with wrapping adds
    fn accrue(&mut self, timestamp: u32) {
        let elapsed = twap::elapsed(self.block_timestamp_last, timestamp);
        if elapsed > 0 {
            if let (Some(price0), Some(price1)) = (
                twap::encode_ratio(self.reserve1, self.reserve0),
                twap::encode_ratio(self.reserve0, self.reserve1),
            ) {
                let elapsed = U256::from(elapsed);
                self.price0_cumulative_last = self
                    .price0_cumulative_last
                    .overflowing_add(price0.overflowing_mul(elapsed).0)
                    .0;
                self.price1_cumulative_last = self
                    .price1_cumulative_last
                    .overflowing_add(price1.overflowing_mul(elapsed).0)
                    .0;
            }
        }
        self.block_timestamp_last = timestamp;
    }

    fn reading(&self) -> AccumulatorReading {
        AccumulatorReading {
            price0_cumulative_last: self.price0_cumulative_last,
            price1_cumulative_last: self.price1_cumulative_last,
            block_timestamp_last: self.block_timestamp_last,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPools {
    pools: Arc<RwLock<HashMap<Address, PoolState>>>,
}

impl InMemoryPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a pool at the address the factory in `params` would use.
    ///
    /// Reserves are given in `(token_a, token_b)` order.
    pub fn create_pair(
        &self,
        params: &OracleParams,
        token_a: Address,
        token_b: Address,
        reserve_a: u128,
        reserve_b: u128,
        timestamp: u32,
    ) -> Result<Address> {
        let (token0, token1) = sort_tokens(token_a, token_b)?;
        let pair = params.pair_for(token0, token1)?;
        let (reserve0, reserve1) = if token0 == token_a {
            (reserve_a, reserve_b)
        } else {
            (reserve_b, reserve_a)
        };
        self.insert(
            pair,
            PoolState {
                token0,
                token1,
                reserve0,
                reserve1,
                price0_cumulative_last: U256::zero(),
                price1_cumulative_last: U256::zero(),
                block_timestamp_last: timestamp,
            },
        );
        Ok(pair)
    }

    pub fn insert(&self, pair: Address, state: PoolState) {
        self.pools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pair, state);
    }

    pub fn remove(&self, pair: Address) -> Option<PoolState> {
        self.pools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&pair)
    }

    pub fn state(&self, pair: Address) -> Option<PoolState> {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pair)
            .copied()
    }

    /// Bring the accumulators current as of `timestamp` (the pair's `sync`)
    pub fn sync(&self, pair: Address, timestamp: u32) -> Result<()> {
        self.with_pool(pair, |pool| pool.accrue(timestamp))
    }

    /// Accrue at the old reserves, then move to new ones (a swap or mint)
    pub fn update(
        &self,
        pair: Address,
        reserve0: u128,
        reserve1: u128,
        timestamp: u32,
    ) -> Result<()> {
        self.with_pool(pair, |pool| {
            pool.accrue(timestamp);
            pool.reserve0 = reserve0;
            pool.reserve1 = reserve1;
        })
    }

    /// Overwrite the registers directly
    pub fn set_accumulators(
        &self,
        pair: Address,
        price0_cumulative_last: U256,
        price1_cumulative_last: U256,
        block_timestamp_last: u32,
    ) -> Result<()> {
        self.with_pool(pair, |pool| {
            pool.price0_cumulative_last = price0_cumulative_last;
            pool.price1_cumulative_last = price1_cumulative_last;
            pool.block_timestamp_last = block_timestamp_last;
        })
    }

    fn with_pool(&self, pair: Address, apply: impl FnOnce(&mut PoolState)) -> Result<()> {
        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        let pool = pools
            .get_mut(&pair)
            .ok_or(OracleError::PoolUnavailable { pair })?;
        apply(pool);
        Ok(())
    }
}

#[async_trait]
impl AccumulatorSource for InMemoryPools {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, pair: Address) -> Result<AccumulatorReading> {
        self.state(pair)
            .map(|pool| pool.reading())
            .ok_or(OracleError::PoolUnavailable { pair })
    }
}
