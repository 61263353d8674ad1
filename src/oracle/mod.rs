//! Oracle module - TWAP prices from Uniswap V2 accumulators
//!
//! Each oracle id tracks one token path. `exec` snapshots the cumulative
//! price registers of every pair along the path; two snapshots per hop give
//! a time-weighted average, and the hop averages compose into a quote for
//! the whole path.

mod accumulator;
mod bounds;
mod error;
mod pair_address;
mod path;
mod scheduler;
pub mod sources;
mod store;
pub mod twap;
mod twap_oracle;

pub use accumulator::{AccumulatorReading, AccumulatorSource};
pub use bounds::check_elapsed;
pub use error::{OracleError, Result, TIME_ELAPSED_OUT_OF_RANGE};
pub use pair_address::{
    pair_for, sort_tokens, OracleParams, UNISWAP_V2_FACTORY, UNISWAP_V2_INIT_CODE_HASH,
};
pub use path::{resolve, HopDescriptor};
pub use scheduler::{
    start_oracle_time, ChannelNotifier, LogNotifier, TaskNotifier, TaskSubmission,
};
pub use store::{HopRecord, OracleRecord, PairOracleStore, WriteOutcome};
pub use twap_oracle::{OracleConfig, OracleState, TwapOracle};
