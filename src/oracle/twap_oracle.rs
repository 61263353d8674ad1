//! TWAP oracle - per-id multi-hop price tracking
//!
//! `exec` samples every pool of a path and records the readings; `get_price`
//! turns the two most recent samples of each hop into a time-weighted quote.
//! All mutation goes through `&mut self`, so the host decides how calls are
//! serialized.

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::accumulator::AccumulatorSource;
use super::bounds;
use super::error::{OracleError, Result};
use super::pair_address::OracleParams;
use super::path::{self, HopDescriptor};
use super::scheduler::{self, TaskNotifier, TaskSubmission};
use super::store::{OracleRecord, PairOracleStore};
use super::twap;
use crate::types::{OracleId, PairSnapshot, TokenPath};

/// Sampling parameters, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Minimum spacing between samples; also the lead time of `schedule_start`
    pub period: u64,
    /// Longest sample interval a quote may be based on
    pub max_period: u64,
}

impl OracleConfig {
    pub fn new(period: u64, max_period: u64) -> Self {
        Self { period, max_period }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self::new(300, 600) // 5 min samples, 10 min tolerance
    }
}

/// Serializable oracle state (settings plus recorded samples)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleState {
    pub config: OracleConfig,
    pub store: PairOracleStore,
}

pub struct TwapOracle<S, N> {
    params: OracleParams,
    config: OracleConfig,
    store: PairOracleStore,
    source: S,
    notifier: N,
}

impl<S: AccumulatorSource, N: TaskNotifier> TwapOracle<S, N> {
    pub fn new(params: OracleParams, config: OracleConfig, source: S, notifier: N) -> Self {
        Self::with_state(
            params,
            OracleState {
                config,
                store: PairOracleStore::new(),
            },
            source,
            notifier,
        )
    }

    /// Resume from a previously saved state
    pub fn with_state(params: OracleParams, state: OracleState, source: S, notifier: N) -> Self {
        Self {
            params,
            config: state.config,
            store: state.store,
            source,
            notifier,
        }
    }

    pub fn params(&self) -> &OracleParams {
        &self.params
    }

    pub fn config(&self) -> OracleConfig {
        self.config
    }

    pub fn store(&self) -> &PairOracleStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> OracleState {
        OracleState {
            config: self.config,
            store: self.store.clone(),
        }
    }

    /// Hops of `path` against this oracle's factory
    pub fn resolve(&self, path: &TokenPath) -> Result<Vec<HopDescriptor>> {
        path::resolve(&self.params, path)
    }

    /// Sample every pool of `path` and record the readings under `id`.
    ///
    /// All pools are read before anything is written, so a failing hop leaves
    /// the id untouched.
    pub async fn exec(&mut self, id: OracleId, path: &TokenPath) -> Result<()> {
        let hops = self.resolve(path)?;

        let mut snapshots = Vec::with_capacity(hops.len());
        for hop in &hops {
            let reading = self.source.read(hop.pair_address).await?;
            snapshots.push(reading.into_snapshot(hop));
        }

        let timestamps: Vec<u32> = snapshots.iter().map(|s| s.block_timestamp_last).collect();
        let outcome = self.store.write(id, path.clone(), snapshots);

        info!(
            oracle_id = id,
            path = %path,
            hops = hops.len(),
            ?timestamps,
            outcome = ?outcome,
            source = self.source.name(),
            "Oracle sampled"
        );
        Ok(())
    }

    /// Quote `amount_in` of the first token along the last `exec` path of `id`
    pub fn get_price(&self, id: OracleId, amount_in: U256) -> Result<U256> {
        let record = self.store.record(id)?;
        self.price_recorded(id, record, amount_in)
    }

    /// Like [`get_price`](Self::get_price), but `path` must name the recorded pools in order
    pub fn get_price_for_path(
        &self,
        id: OracleId,
        path: &TokenPath,
        amount_in: U256,
    ) -> Result<U256> {
        let hops = self.resolve(path)?;
        let record = self.store.record(id)?;
        ensure_matches(id, record, &hops)?;
        self.price_recorded(id, record, amount_in)
    }

    /// Quote against the pools' live registers instead of the last `exec`.
    ///
    /// Each hop is priced from its current recorded snapshot to a fresh read;
    /// nothing is written.
    pub async fn consult(&self, id: OracleId, amount_in: U256) -> Result<U256> {
        let record = self.store.record(id)?;

        let mut averages = Vec::with_capacity(record.hops.len());
        for (index, hop) in record.hops.iter().enumerate() {
            let recorded = hop.current;
            let reading = self.source.read(recorded.pair_address).await?;
            let live = PairSnapshot {
                price0_cumulative_last: reading.price0_cumulative_last,
                price1_cumulative_last: reading.price1_cumulative_last,
                block_timestamp_last: reading.block_timestamp_last,
                ..recorded
            };
            averages.push(self.hop_average(id, index, &recorded, &live)?);
        }

        twap::compose(&averages, amount_in)
    }

    /// Latest recorded snapshot of hop `hop` of `id`
    pub fn oracles_from_id(&self, id: OracleId, hop: usize) -> Result<PairSnapshot> {
        self.store.read(id, hop).copied()
    }

    /// Publish a request to start sampling `id` at `reference_time + delay - period`
    pub fn schedule_start(&self, id: OracleId, delay: u64, reference_time: u64) -> Result<u64> {
        let start_oracle_time =
            scheduler::start_oracle_time(delay, reference_time, self.config.period)?;

        self.notifier.notify(TaskSubmission {
            id,
            start_oracle_time,
        });
        info!(
            oracle_id = id,
            delay,
            reference_time,
            start_oracle_time,
            "Start task submitted"
        );
        Ok(start_oracle_time)
    }

    pub fn set_period(&mut self, period: u64) {
        info!(old = self.config.period, new = period, "Period updated");
        self.config.period = period;
    }

    pub fn set_max_period(&mut self, max_period: u64) {
        info!(
            old = self.config.max_period,
            new = max_period,
            "Max period updated"
        );
        self.config.max_period = max_period;
    }

    fn price_recorded(&self, id: OracleId, record: &OracleRecord, amount_in: U256) -> Result<U256> {
        let averages = record
            .hops
            .iter()
            .enumerate()
            .map(|(index, hop)| {
                let previous = hop
                    .previous
                    .as_ref()
                    .ok_or(OracleError::NotReady { id, hop: index })?;
                self.hop_average(id, index, previous, &hop.current)
            })
            .collect::<Result<Vec<_>>>()?;

        let amount_out = twap::compose(&averages, amount_in)?;
        debug!(
            oracle_id = id,
            amount_in = %amount_in,
            amount_out = %amount_out,
            "TWAP quote"
        );
        Ok(amount_out)
    }

    fn hop_average(
        &self,
        id: OracleId,
        index: usize,
        previous: &PairSnapshot,
        current: &PairSnapshot,
    ) -> Result<U256> {
        let elapsed = twap::elapsed(previous.block_timestamp_last, current.block_timestamp_last);
        bounds::check_elapsed(id, index, elapsed, self.config.max_period)?;
        twap::hop_average(previous, current).ok_or(OracleError::NotReady { id, hop: index })
    }
}

fn ensure_matches(id: OracleId, record: &OracleRecord, hops: &[HopDescriptor]) -> Result<()> {
    let matches = record.hops.len() == hops.len()
        && record.hops.iter().zip(hops).all(|(recorded, hop)| {
            recorded.current.pair_address == hop.pair_address
                && recorded.current.token0_first == hop.token0_first
        });
    if matches {
        Ok(())
    } else {
        Err(OracleError::InvalidPath(format!(
            "path does not match the pools recorded for oracle {}",
            id
        )))
    }
}
