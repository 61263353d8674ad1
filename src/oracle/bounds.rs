//! Freshness bounds on the sample interval

use super::error::{OracleError, Result};
use crate::types::OracleId;

/// Accept `0 < elapsed <= max_period`.
///
/// A zero interval means no second sample exists yet for the hop.
pub fn check_elapsed(id: OracleId, hop: usize, elapsed: u32, max_period: u64) -> Result<()> {
    if elapsed == 0 {
        return Err(OracleError::NotReady { id, hop });
    }
    let elapsed = u64::from(elapsed);
    if elapsed > max_period {
        return Err(OracleError::StaleOracle {
            elapsed,
            max_period,
        });
    }
    Ok(())
}
