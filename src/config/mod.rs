//! Configuration management for the TWAP oracle keeper
//!
//! Loads from config files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use ethers::types::{Address, H256, U256};
use serde::Deserialize;
use std::str::FromStr;

use crate::oracle::{OracleConfig, OracleParams, UNISWAP_V2_FACTORY, UNISWAP_V2_INIT_CODE_HASH};
use crate::types::TokenPath;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub oracle: OracleSettings,
    pub keeper: KeeperConfig,
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let builder = Self::defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (TWAP_ORACLE__*)
            .add_source(Environment::with_prefix("TWAP_ORACLE").separator("__"));

        Self::build(builder)
    }

    /// Builder pre-populated with every default
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Network defaults (Ethereum mainnet Uniswap V2)
            .set_default("network.rpc_url", "http://127.0.0.1:8545")?
            .set_default("network.factory", format!("{:#x}", UNISWAP_V2_FACTORY))?
            .set_default(
                "network.init_code_hash",
                format!("{:#x}", UNISWAP_V2_INIT_CODE_HASH),
            )?
            // Oracle defaults
            .set_default("oracle.period_secs", 300)?
            .set_default("oracle.max_period_secs", 600)?
            // Keeper defaults
            .set_default("keeper.tasks", Vec::<String>::new())?
            .set_default("keeper.poll_interval_secs", 15)?
            .set_default("keeper.quote_amount", "1000000000000000000")?
            // Persistence defaults
            .set_default("persistence.data_dir", "./data")?
            .set_default("persistence.csv_enabled", true)?;
        Ok(builder)
    }

    pub fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Factory and init code hash as typed values
    pub fn oracle_params(&self) -> Result<OracleParams> {
        let factory = Address::from_str(&self.network.factory)
            .with_context(|| format!("Invalid factory address {}", self.network.factory))?;
        let init_code_hash = H256::from_str(&self.network.init_code_hash).with_context(|| {
            format!("Invalid init code hash {}", self.network.init_code_hash)
        })?;
        Ok(OracleParams::new(factory, init_code_hash))
    }

    pub fn oracle_config(&self) -> OracleConfig {
        OracleConfig::new(self.oracle.period_secs, self.oracle.max_period_secs)
    }

    pub fn quote_amount(&self) -> Result<U256> {
        U256::from_dec_str(&self.keeper.quote_amount)
            .with_context(|| format!("Invalid quote amount {}", self.keeper.quote_amount))
    }

    /// Generate a digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "rpc={} factory={} period={}s max_period={}s tasks={} data_dir={} csv={}",
            self.network.rpc_url,
            self.network.factory,
            self.oracle.period_secs,
            self.oracle.max_period_secs,
            self.keeper.tasks.len(),
            self.persistence.data_dir,
            self.persistence.csv_enabled
        )
    }

    /// Check that every address, path and amount parses
    pub fn validate(&self) -> Result<()> {
        self.oracle_params()?;
        self.quote_amount()?;

        if self.keeper.poll_interval_secs == 0 {
            bail!("keeper.poll_interval_secs must be positive");
        }

        let mut seen = std::collections::HashSet::new();
        for task in &self.keeper.tasks {
            if !seen.insert(task.id) {
                bail!("Duplicate oracle id {} in keeper.tasks", task.id);
            }
            let path = task.token_path()?;
            if path.len() < 2 {
                bail!("Oracle {} path needs at least two tokens", task.id);
            }
            if task.delay_secs < self.oracle.period_secs {
                bail!(
                    "Oracle {} delay {}s is shorter than the {}s period",
                    task.id,
                    task.delay_secs,
                    self.oracle.period_secs
                );
            }
        }

        Ok(())
    }
}

impl TaskConfig {
    pub fn token_path(&self) -> Result<TokenPath> {
        let tokens = self
            .path
            .iter()
            .map(|token| {
                Address::from_str(token)
                    .with_context(|| format!("Invalid token address {} in oracle {}", token, self.id))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TokenPath::new(tokens))
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
