//! Pair oracle store
//!
//! Per oracle id: the path of the latest `exec` and, for each hop, the
//! previous and current snapshot. Writes replace a record in place; nothing is
//! ever appended or deleted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::{OracleError, Result};
use crate::types::{OracleId, PairSnapshot, TokenPath};

/// The two most recent samples of one hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopRecord {
    pub previous: Option<PairSnapshot>,
    pub current: PairSnapshot,
}

/// Everything recorded for one oracle id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    pub path: TokenPath,
    pub hops: Vec<HopRecord>,
}

impl OracleRecord {
    /// Same pools, same order, same direction as `snapshots`
    fn tracks(&self, snapshots: &[PairSnapshot]) -> bool {
        self.hops.len() == snapshots.len()
            && self.hops.iter().zip(snapshots).all(|(hop, snap)| {
                hop.current.pair_address == snap.pair_address
                    && hop.current.token0_first == snap.token0_first
            })
    }
}

/// Outcome of a store write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// First write for the id
    Created,
    /// Current samples moved to previous
    Rotated,
    /// Path changed; previous samples dropped
    Restarted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOracleStore {
    records: HashMap<OracleId, OracleRecord>,
}

impl PairOracleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshots of `id` in one step.
    ///
    /// `snapshots` must be index-aligned with the hops of `path`.
    pub fn write(
        &mut self,
        id: OracleId,
        path: TokenPath,
        snapshots: Vec<PairSnapshot>,
    ) -> WriteOutcome {
        let (outcome, hops) = match self.records.get(&id) {
            Some(existing) if existing.tracks(&snapshots) => {
                let hops = existing
                    .hops
                    .iter()
                    .zip(snapshots)
                    .map(|(hop, current)| HopRecord {
                        previous: Some(hop.current),
                        current,
                    })
                    .collect();
                (WriteOutcome::Rotated, hops)
            }
            existing => {
                let outcome = if existing.is_some() {
                    WriteOutcome::Restarted
                } else {
                    WriteOutcome::Created
                };
                let hops = snapshots
                    .into_iter()
                    .map(|current| HopRecord {
                        previous: None,
                        current,
                    })
                    .collect();
                (outcome, hops)
            }
        };

        self.records.insert(id, OracleRecord { path, hops });
        outcome
    }

    /// Last-written snapshot of `(id, hop)`
    pub fn read(&self, id: OracleId, hop: usize) -> Result<&PairSnapshot> {
        self.record(id)?
            .hops
            .get(hop)
            .map(|h| &h.current)
            .ok_or(OracleError::NotInitialized { id })
    }

    pub fn record(&self, id: OracleId) -> Result<&OracleRecord> {
        self.records
            .get(&id)
            .ok_or(OracleError::NotInitialized { id })
    }

    pub fn ids(&self) -> impl Iterator<Item = OracleId> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
