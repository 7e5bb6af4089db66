mod args;
mod watch;

use anyhow::{Context, Result};
use args::CliArgs;
use clap::Parser;
use soroshark_config::{AppConfig, LogConfig};
use soroshark_rpc_client::{NotificationBridge, RpcClient, RpcReadGateway};
use soroshark_sync::CampaignSession;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use watch::WatchOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    let mut config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    cli.apply(&mut config);
    config.validate()?;

    init_tracing(&config.log);
    info!(
        rpc = %config.rpc.url,
        token = %config.campaign.token_contract,
        crowdfund = %config.campaign.crowdfund_contract,
        "watching campaign"
    );

    let client = Arc::new(RpcClient::from_config(&config.rpc)?);
    let gateway = Arc::new(RpcReadGateway::new(client));
    // Nothing publishes into the bridge over JSON-RPC; updates come from periodic refresh.
    let bridge = Arc::new(NotificationBridge::from_config(&config.sync));
    let session =
        CampaignSession::from_config(gateway, bridge, &config.campaign, config.sync.clone())?;
    if !cli.once && cli.refresh_interval.unwrap_or(0) == 0 {
        warn!("no --refresh-interval given, the campaign view will not update");
    }

    let options = WatchOptions {
        once: cli.once,
        refresh_interval: cli
            .refresh_interval
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs),
    };
    watch::run(session, options).await
}

fn init_tracing(log: &LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let builder = fmt().with_env_filter(env_filter);
    let _ = if log.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
