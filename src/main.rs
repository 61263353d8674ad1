//! TWAP oracle keeper
//!
//! Samples the configured Uniswap V2 paths on chain time and logs the
//! resulting time-weighted prices.

use anyhow::{Context, Result};
use ethers::providers::{Http, Provider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use twap_oracle::config::AppConfig;
use twap_oracle::keeper::{Keeper, ProviderClock};
use twap_oracle::oracle::sources::UniswapV2PairReader;
use twap_oracle::oracle::{ChannelNotifier, TwapOracle};
use twap_oracle::persistence::{PriceLog, StateFile};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing();
    config.validate()?;

    info!(version = env!("CARGO_PKG_VERSION"), config = %config, "Starting TWAP oracle keeper");

    let params = config.oracle_params()?;
    let provider = Provider::<Http>::try_from(config.network.rpc_url.as_str())
        .with_context(|| format!("Invalid RPC url {}", config.network.rpc_url))?;
    let client = Arc::new(provider);

    let state_file = StateFile::new(&config.persistence.data_dir)?;
    let mut state = state_file.load(&params)?.unwrap_or_default();
    // configured periods win over saved ones
    state.config = config.oracle_config();

    let reader = UniswapV2PairReader::new(Arc::clone(&client))?;
    let (notifier, requests) = ChannelNotifier::channel();
    let oracle = TwapOracle::with_state(params, state, reader, notifier);

    let mut keeper = Keeper::new(
        Arc::new(Mutex::new(oracle)),
        ProviderClock::new(client),
        Duration::from_secs(config.keeper.poll_interval_secs),
        config.quote_amount()?,
    )
    .with_state_file(state_file);
    if config.persistence.csv_enabled {
        keeper = keeper.with_price_log(PriceLog::new(&config.persistence.data_dir)?);
    }

    for task in &config.keeper.tasks {
        let path = task.token_path()?;
        let start = keeper
            .submit(task.id, path, task.delay_secs)
            .await
            .with_context(|| format!("Failed to schedule oracle {}", task.id))?;
        info!(oracle_id = task.id, start_oracle_time = start, "Oracle scheduled");
    }

    keeper
        .run(requests, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
}
