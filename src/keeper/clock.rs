//! Chain time sources

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::BlockNumber;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Current chain time in unix seconds
#[async_trait]
pub trait ChainClock: Send + Sync {
    async fn now(&self) -> Result<u64>;
}

/// Timestamp of the latest block
pub struct ProviderClock<M> {
    client: Arc<M>,
}

impl<M> ProviderClock<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainClock for ProviderClock<M> {
    async fn now(&self) -> Result<u64> {
        let block = self
            .client
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| anyhow::anyhow!("get_block failed: {}", e))?
            .context("Latest block not available")?;
        Ok(block.timestamp.low_u64())
    }
}

/// Clock moved by hand; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) -> u64 {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

#[async_trait]
impl ChainClock for ManualClock {
    async fn now(&self) -> Result<u64> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}
