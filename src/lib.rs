//! TWAP Oracle Library
//!
//! Time-weighted average prices over Uniswap V2 cumulative price
//! accumulators, with a keeper that samples configured paths on chain time.

pub mod config;
pub mod keeper;
pub mod oracle;
pub mod persistence;
pub mod types;
