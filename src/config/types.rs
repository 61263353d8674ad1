//! Configuration section types

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the chain the pairs live on
    pub rpc_url: String,
    /// Uniswap V2 factory address (hex)
    pub factory: String,
    /// Pair creation code hash (hex)
    pub init_code_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleSettings {
    /// Sampling period in seconds
    pub period_secs: u64,
    /// Maximum accepted sample interval in seconds
    pub max_period_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    /// Oracles to schedule at startup
    pub tasks: Vec<TaskConfig>,
    /// How often the chain clock is polled while waiting, in seconds
    pub poll_interval_secs: u64,
    /// Input amount for logged quotes, in base units (decimal string)
    pub quote_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    pub id: u64,
    /// Token addresses, input first
    pub path: Vec<String>,
    /// Seconds from startup until the oracle must be ready
    pub delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Data directory
    pub data_dir: String,
    /// Enable CSV price log
    pub csv_enabled: bool,
}
