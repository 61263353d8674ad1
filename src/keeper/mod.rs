//! Keeper - local stand-in for the automation network
//!
//! Receives the start requests the oracle publishes, waits for chain time to
//! reach each start time, then calls `exec` once per period and logs the
//! resulting quotes. The oracle itself never keeps time; all waiting lives
//! here.

mod clock;

pub use clock::{ChainClock, ManualClock, ProviderClock};

use anyhow::Result;
use chrono::Utc;
use ethers::types::U256;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::oracle::{AccumulatorSource, OracleError, TaskNotifier, TaskSubmission, TwapOracle};
use crate::persistence::{PersistedState, PriceLog, PriceRecord, StateFile};
use crate::types::{OracleId, TokenPath};

/// Outcome of one sampling round for an oracle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Sampled; a quote exists over the last interval
    Priced(U256),
    /// Sampled; a second sample is still needed
    Warming,
    /// Sampled, but the interval just closed exceeds `max_period`
    Stale { elapsed: u64, max_period: u64 },
    /// Sampled, but no quote could be derived
    Rejected(OracleError),
}

pub struct Keeper<S, N, C> {
    oracle: Arc<Mutex<TwapOracle<S, N>>>,
    clock: C,
    paths: HashMap<OracleId, TokenPath>,
    /// Next chain time each active oracle is due
    due: HashMap<OracleId, u64>,
    poll_interval: Duration,
    quote_amount: U256,
    price_log: Option<PriceLog>,
    state_file: Option<StateFile>,
}

impl<S, N, C> Keeper<S, N, C>
where
    S: AccumulatorSource,
    N: TaskNotifier,
    C: ChainClock,
{
    pub fn new(
        oracle: Arc<Mutex<TwapOracle<S, N>>>,
        clock: C,
        poll_interval: Duration,
        quote_amount: U256,
    ) -> Self {
        Self {
            oracle,
            clock,
            paths: HashMap::new(),
            due: HashMap::new(),
            poll_interval,
            quote_amount,
            price_log: None,
            state_file: None,
        }
    }

    pub fn with_price_log(mut self, price_log: PriceLog) -> Self {
        self.price_log = Some(price_log);
        self
    }

    pub fn with_state_file(mut self, state_file: StateFile) -> Self {
        self.state_file = Some(state_file);
        self
    }

    pub fn oracle(&self) -> Arc<Mutex<TwapOracle<S, N>>> {
        Arc::clone(&self.oracle)
    }

    /// Next due time of `id`, once its start request has arrived
    pub fn due_at(&self, id: OracleId) -> Option<u64> {
        self.due.get(&id).copied()
    }

    /// Register `path` for `id` and ask the oracle to schedule its start
    /// `delay` seconds from now.
    pub async fn submit(&mut self, id: OracleId, path: TokenPath, delay: u64) -> Result<u64> {
        let now = self.clock.now().await?;
        let oracle = self.oracle.lock().await;
        oracle.resolve(&path)?;
        let start = oracle.schedule_start(id, delay, now)?;
        drop(oracle);

        self.paths.insert(id, path);
        Ok(start)
    }

    /// Record a start request
    pub fn accept(&mut self, task: TaskSubmission) {
        if !self.paths.contains_key(&task.id) {
            warn!(oracle_id = task.id, "Start request for unknown oracle ignored");
            return;
        }
        info!(
            oracle_id = task.id,
            start_oracle_time = task.start_oracle_time,
            "Start request accepted"
        );
        self.due.insert(task.id, task.start_oracle_time);
    }

    /// Sample every oracle due at `now`; returns how many were sampled
    pub async fn tick(&mut self, now: u64) -> Result<usize> {
        let mut ready: Vec<OracleId> = self
            .due
            .iter()
            .filter(|(_, due)| **due <= now)
            .map(|(id, _)| *id)
            .collect();
        ready.sort_unstable();

        let mut sampled = 0;
        for id in ready {
            match self.sample(id).await {
                Ok(outcome) => {
                    sampled += 1;
                    let period = self.oracle.lock().await.config().period;
                    self.due.insert(id, now.saturating_add(period.max(1)));
                    debug!(oracle_id = id, ?outcome, "Oracle sampled by keeper");
                }
                // left due, retried on the next tick
                Err(e) => warn!(oracle_id = id, error = %e, "Sampling failed"),
            }
        }

        if sampled > 0 {
            self.save_state().await?;
        }
        Ok(sampled)
    }

    /// `exec` the oracle, then quote over the interval just closed
    pub async fn sample(&self, id: OracleId) -> Result<SampleOutcome> {
        let path = self
            .paths
            .get(&id)
            .ok_or(OracleError::NotInitialized { id })?;

        let mut oracle = self.oracle.lock().await;
        oracle.exec(id, path).await?;

        // the store has rotated; quote failures from here on are outcomes
        let outcome = match oracle.get_price(id, self.quote_amount) {
            Ok(amount_out) => SampleOutcome::Priced(amount_out),
            Err(OracleError::NotReady { .. }) => SampleOutcome::Warming,
            Err(OracleError::StaleOracle {
                elapsed,
                max_period,
            }) => SampleOutcome::Stale {
                elapsed,
                max_period,
            },
            Err(e) => SampleOutcome::Rejected(e),
        };
        drop(oracle);

        match &outcome {
            SampleOutcome::Priced(amount_out) => {
                info!(
                    oracle_id = id,
                    path = %path,
                    amount_in = %self.quote_amount,
                    amount_out = %amount_out,
                    "TWAP price"
                );
                if let Err(e) = self.log_price(id, path, *amount_out, "twap").await {
                    warn!(oracle_id = id, error = %e, "Failed to log price");
                }
            }
            SampleOutcome::Stale {
                elapsed,
                max_period,
            } => warn!(
                oracle_id = id,
                elapsed, max_period, "Sample interval exceeds max period, no price"
            ),
            SampleOutcome::Rejected(e) => warn!(oracle_id = id, error = %e, "Quote rejected"),
            SampleOutcome::Warming => {}
        }
        Ok(outcome)
    }

    async fn log_price(
        &self,
        id: OracleId,
        path: &TokenPath,
        amount_out: U256,
        kind: &str,
    ) -> Result<()> {
        if let Some(log) = &self.price_log {
            log.save_price(PriceRecord {
                timestamp: Utc::now().timestamp_millis(),
                oracle_id: id,
                path: path.to_string(),
                amount_in: self.quote_amount.to_string(),
                amount_out: amount_out.to_string(),
                kind: kind.to_string(),
            })
            .await?;
        }
        Ok(())
    }

    pub async fn save_state(&self) -> Result<()> {
        if let Some(file) = &self.state_file {
            let oracle = self.oracle.lock().await;
            file.save(&PersistedState::new(*oracle.params(), oracle.state()))?;
        }
        Ok(())
    }

    /// Serve start requests and sample on chain time until `shutdown` resolves
    pub async fn run(
        mut self,
        mut requests: UnboundedReceiver<TaskSubmission>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);
        let mut poll = tokio::time::interval(self.poll_interval);
        let mut requests_open = true;

        info!(
            oracles = self.paths.len(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Keeper started"
        );

        loop {
            tokio::select! {
                request = requests.recv(), if requests_open => match request {
                    Some(task) => self.accept(task),
                    None => requests_open = false,
                },
                _ = poll.tick() => {
                    if self.due.is_empty() {
                        continue;
                    }
                    match self.clock.now().await {
                        Ok(now) => {
                            self.tick(now).await?;
                        }
                        Err(e) => warn!(error = %e, "Chain clock unavailable"),
                    }
                }
                _ = &mut shutdown => {
                    info!("Keeper shutting down");
                    break;
                }
            }
        }

        self.save_state().await
    }
}
