//! Uniswap V2 pair reader over JSON-RPC
//!
//! Reads `price0CumulativeLast`, `price1CumulativeLast` and the timestamp
//! from `getReserves()`, all pinned to one block so the three registers are
//! consistent.

use async_trait::async_trait;
use ethers::abi::parse_abi;
use ethers::contract::{BaseContract, Contract};
use ethers::providers::Middleware;
use ethers::types::{Address, BlockId, U256};
use std::sync::Arc;
use tracing::debug;

use crate::oracle::accumulator::{AccumulatorReading, AccumulatorSource};
use crate::oracle::error::{OracleError, Result};

const PAIR_ABI: &[&str] = &[
    "function price0CumulativeLast() external view returns (uint256)",
    "function price1CumulativeLast() external view returns (uint256)",
    "function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast)",
];

pub struct UniswapV2PairReader<M> {
    client: Arc<M>,
    abi: BaseContract,
}

impl<M: Middleware + 'static> UniswapV2PairReader<M> {
    pub fn new(client: Arc<M>) -> Result<Self> {
        let abi = parse_abi(PAIR_ABI)
            .map_err(|e| OracleError::Source(format!("invalid pair ABI: {}", e)))?;
        Ok(Self {
            client,
            abi: abi.into(),
        })
    }

    async fn call<D>(&self, contract: &Contract<M>, method: &str, block: BlockId) -> Result<D>
    where
        D: ethers::abi::Detokenize + Send + Sync,
    {
        contract
            .method::<_, D>(method, ())
            .map_err(|e| OracleError::Source(format!("{}: {}", method, e)))?
            .block(block)
            .call()
            .await
            .map_err(|e| {
                OracleError::Source(format!("{} at {:#x}: {}", method, contract.address(), e))
            })
    }
}

#[async_trait]
impl<M: Middleware + 'static> AccumulatorSource for UniswapV2PairReader<M> {
    fn name(&self) -> &'static str {
        "uniswap-v2"
    }

    async fn read(&self, pair: Address) -> Result<AccumulatorReading> {
        let block: BlockId = self
            .client
            .get_block_number()
            .await
            .map_err(|e| OracleError::Source(format!("get_block_number: {}", e)))?
            .into();

        let code = self
            .client
            .get_code(pair, Some(block))
            .await
            .map_err(|e| OracleError::Source(format!("get_code {:#x}: {}", pair, e)))?;
        if code.is_empty() {
            return Err(OracleError::PoolUnavailable { pair });
        }

        let contract = Contract::new(pair, self.abi.clone(), self.client.clone());
        let price0_cumulative_last: U256 =
            self.call(&contract, "price0CumulativeLast", block).await?;
        let price1_cumulative_last: U256 =
            self.call(&contract, "price1CumulativeLast", block).await?;
        let (_reserve0, _reserve1, block_timestamp_last): (u128, u128, u32) =
            self.call(&contract, "getReserves", block).await?;

        debug!(
            pair = %format!("{:#x}", pair),
            block_timestamp_last,
            "Read pair accumulators"
        );

        Ok(AccumulatorReading {
            price0_cumulative_last,
            price1_cumulative_last,
            block_timestamp_last,
        })
    }
}
