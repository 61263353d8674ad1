//! Accumulator source implementations (Uniswap V2 over RPC, in-memory pools)

mod memory;
mod uniswap_v2;

pub use memory::{InMemoryPools, PoolState};
pub use uniswap_v2::UniswapV2PairReader;
