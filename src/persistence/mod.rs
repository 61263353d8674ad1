//! Persistence Module
//!
//! JSON snapshot of the oracle state, so a restarted keeper keeps its
//! samples, plus a CSV log of every computed quote for analysis.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::info;

use crate::oracle::{OracleParams, OracleState};

const STATE_VERSION: &str = "1.0";
const STATE_FILE: &str = "oracle_state.json";

/// On-disk form of the oracle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: String,
    /// Unix millis
    pub saved_at: i64,
    pub params: OracleParams,
    pub state: OracleState,
}

impl PersistedState {
    pub fn new(params: OracleParams, state: OracleState) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            saved_at: Utc::now().timestamp_millis(),
            params,
            state,
        }
    }
}

pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(data_dir: &str) -> Result<Self> {
        let data_dir = PathBuf::from(data_dir);
        fs::create_dir_all(&data_dir).context("Failed to create data directory")?;
        Ok(Self {
            path: data_dir.join(STATE_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        info!(
            path = %self.path.display(),
            oracles = state.state.store.len(),
            "Oracle state saved"
        );
        Ok(())
    }

    /// Previously saved state, if any.
    ///
    /// A state saved against a different factory is refused rather than
    /// silently mixed with new samples.
    pub fn load(&self, params: &OracleParams) -> Result<Option<OracleState>> {
        if !self.exists() {
            info!(path = %self.path.display(), "No previous oracle state found, starting fresh");
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let persisted: PersistedState =
            serde_json::from_str(&json).context("Failed to parse oracle state")?;

        if persisted.params != *params {
            bail!(
                "State file {} was written for factory {:#x}, configured factory is {:#x}",
                self.path.display(),
                persisted.params.factory,
                params.factory
            );
        }

        info!(
            path = %self.path.display(),
            version = %persisted.version,
            oracles = persisted.state.store.len(),
            "Oracle state loaded"
        );
        Ok(Some(persisted.state))
    }
}

/// One computed quote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecord {
    pub timestamp: i64,
    pub oracle_id: u64,
    pub path: String,
    pub amount_in: String,
    pub amount_out: String,
    /// Quote source; the keeper writes "twap"
    pub kind: String,
}

struct DailyWriter {
    day: NaiveDate,
    path: PathBuf,
    writer: csv::Writer<std::fs::File>,
}

/// Append-only CSV of quotes, one file per UTC day.
///
/// The writer rolls over to a new file on the first record of a new day.
pub struct PriceLog {
    dir: PathBuf,
    current: Arc<AsyncRwLock<DailyWriter>>,
}

impl PriceLog {
    pub fn new(data_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(data_dir).join("prices");
        fs::create_dir_all(&dir).context("Failed to create prices directory")?;

        let current = Self::open_day(&dir, Utc::now().date_naive())?;
        info!(path = %current.path.display(), "Price log opened");
        Ok(Self {
            dir,
            current: Arc::new(AsyncRwLock::new(current)),
        })
    }

    /// File currently being written
    pub async fn path(&self) -> PathBuf {
        self.current.read().await.path.clone()
    }

    fn open_day(dir: &Path, day: NaiveDate) -> Result<DailyWriter> {
        let path = dir.join(format!("prices_{}.csv", day.format("%Y-%m-%d")));
        let writer = Self::create_writer(&path)?;
        Ok(DailyWriter { day, path, writer })
    }

    fn create_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
        let file_has_data =
            path.exists() && fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .context("Failed to open CSV file")?;

        let writer = WriterBuilder::new()
            .has_headers(!file_has_data)
            .from_writer(file);

        Ok(writer)
    }

    pub async fn save_price(&self, record: PriceRecord) -> Result<()> {
        self.save_price_on(Utc::now().date_naive(), record).await
    }

    async fn save_price_on(&self, day: NaiveDate, record: PriceRecord) -> Result<()> {
        let mut current = self.current.write().await;
        if current.day != day {
            current.writer.flush().context("Failed to flush price writer")?;
            *current = Self::open_day(&self.dir, day)?;
            info!(path = %current.path.display(), "Price log rolled over");
        }

        current
            .writer
            .serialize(&record)
            .context("Failed to write price record")?;
        current
            .writer
            .flush()
            .context("Failed to flush price writer")?;
        Ok(())
    }
}
