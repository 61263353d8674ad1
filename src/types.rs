//! Core types used throughout the oracle
//!
//! Defines oracle identifiers, token paths and the per-hop accumulator snapshot.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen identifier of one tracked path
pub type OracleId = u64;

/// Ordered list of token addresses describing a multi-hop route,
/// e.g. `[UNI, WETH, LINK]` prices UNI in LINK through two pools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TokenPath(Vec<Address>);

impl TokenPath {
    pub fn new(tokens: Vec<Address>) -> Self {
        Self(tokens)
    }

    pub fn tokens(&self) -> &[Address] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of pools traversed (`len - 1`)
    pub fn hop_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Token the quote amount is denominated in
    pub fn token_in(&self) -> Option<Address> {
        self.0.first().copied()
    }

    /// Token the quote is returned in
    pub fn token_out(&self) -> Option<Address> {
        self.0.last().copied()
    }

    /// Consecutive `(token_in, token_out)` pairs in path order
    pub fn hops(&self) -> impl Iterator<Item = (Address, Address)> + '_ {
        self.0.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

impl From<Vec<Address>> for TokenPath {
    fn from(tokens: Vec<Address>) -> Self {
        Self(tokens)
    }
}

impl fmt::Display for TokenPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|t| format!("{:#x}", t)).collect();
        write!(f, "{}", rendered.join(" -> "))
    }
}

/// Accumulator state of one hop's pool as recorded by `exec`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSnapshot {
    /// CREATE2 address of the pool (reproducible from the hop's tokens)
    pub pair_address: Address,
    /// Whether the hop's input token is the pool's token0
    pub token0_first: bool,
    pub price0_cumulative_last: U256,
    pub price1_cumulative_last: U256,
    pub block_timestamp_last: u32,
}

impl PairSnapshot {
    /// Accumulator matching the hop direction: `price0` prices token0 in token1
    pub fn directional_cumulative(&self) -> U256 {
        if self.token0_first {
            self.price0_cumulative_last
        } else {
            self.price1_cumulative_last
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn path_hops_follow_token_order() {
        let path = TokenPath::new(vec![addr(1), addr(2), addr(3)]);
        let hops: Vec<_> = path.hops().collect();
        assert_eq!(hops, vec![(addr(1), addr(2)), (addr(2), addr(3))]);
        assert_eq!(path.hop_count(), 2);
        assert_eq!(path.token_in(), Some(addr(1)));
        assert_eq!(path.token_out(), Some(addr(3)));
    }

    #[test]
    fn single_token_path_has_no_hops() {
        let path = TokenPath::new(vec![addr(1)]);
        assert_eq!(path.hop_count(), 0);
        assert_eq!(path.hops().count(), 0);
    }

    #[test]
    fn directional_cumulative_picks_mirrored_register() {
        let mut snapshot = PairSnapshot {
            pair_address: addr(9),
            token0_first: true,
            price0_cumulative_last: U256::from(10u64),
            price1_cumulative_last: U256::from(20u64),
            block_timestamp_last: 0,
        };
        assert_eq!(snapshot.directional_cumulative(), U256::from(10u64));
        snapshot.token0_first = false;
        assert_eq!(snapshot.directional_cumulative(), U256::from(20u64));
    }
}
