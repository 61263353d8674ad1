//! Path resolution: token route -> ordered pool hops

use ethers::types::Address;

use super::error::{OracleError, Result};
use super::pair_address::OracleParams;
use crate::types::TokenPath;

/// One pool traversal of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HopDescriptor {
    pub pair_address: Address,
    pub token_in: Address,
    pub token_out: Address,
    /// `token_in` is the pool's token0, so `price0CumulativeLast` prices this hop
    pub token0_first: bool,
}

/// Decompose `path` into `len - 1` hops, in path order.
pub fn resolve(params: &OracleParams, path: &TokenPath) -> Result<Vec<HopDescriptor>> {
    if path.len() < 2 {
        return Err(OracleError::InvalidPath(format!(
            "path needs at least 2 tokens, got {}",
            path.len()
        )));
    }

    path.hops()
        .map(|(token_in, token_out)| {
            let pair_address = params.pair_for(token_in, token_out)?;
            Ok(HopDescriptor {
                pair_address,
                token_in,
                token_out,
                token0_first: token_in < token_out,
            })
        })
        .collect()
}
