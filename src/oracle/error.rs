use ethers::types::Address;

use crate::types::OracleId;

/// Literal rejection text surfaced when the sample interval exceeds `max_period`
pub const TIME_ELAPSED_OUT_OF_RANGE: &str = "TimeElapsed out of range";

/// Error types for oracle operations.
///
/// Every failure aborts the whole call; no snapshot or setting is changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    /// Path is too short or contains a degenerate hop.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No pool contract lives at the derived pair address.
    #[error("pool unavailable at {pair:#x}")]
    PoolUnavailable { pair: Address },

    /// Query before the first `exec` for this id (or hop index out of range).
    #[error("oracle {id} not initialized")]
    NotInitialized { id: OracleId },

    /// Only one sample exists, or both samples share a timestamp.
    #[error("oracle {id} not ready: hop {hop} has no positive sample interval")]
    NotReady { id: OracleId, hop: usize },

    /// Sample interval exceeds `max_period`.
    #[error("TimeElapsed out of range: {elapsed}s elapsed, max period {max_period}s")]
    StaleOracle { elapsed: u64, max_period: u64 },

    /// `delay` shorter than `period` would start the oracle in the past.
    #[error("invalid schedule: delay {delay}s is shorter than period {period}s")]
    InvalidSchedule { delay: u64, period: u64 },

    /// Quote does not fit in 256 bits.
    #[error("arithmetic overflow while quoting {0}")]
    Overflow(&'static str),

    /// Transport or decoding failure in the accumulator source.
    #[error("accumulator source error: {0}")]
    Source(String),
}

/// Convenience result type for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;
