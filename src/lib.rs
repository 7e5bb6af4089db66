//! # SoroShark: live crowdfunding campaign state
//!
//! Keeps a presentation-facing view of a pledge campaign consistent with its
//! smart contracts: an equity token and the crowdfund contract that collects
//! pledges.
//!
//! - [`primitives`] - fixed-point amounts, contract values and display derivations
//! - [`sync`] - the view synchronizer, view definitions and the campaign session
//! - [`config`] - TOML configuration
//! - [`rpc_client`] - JSON-RPC read gateway and notification bridge (feature `rpc`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use soroshark::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load("soroshark.toml")?;
//!     let session = soroshark::connect(&config)?;
//!
//!     session.mount().settled().await;
//!     if let Some(snapshot) = session.snapshot() {
//!         println!("{snapshot}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub use soroshark_config as config;
pub use soroshark_primitives as primitives;
pub use soroshark_sync as sync;

#[cfg(feature = "rpc")]
pub use soroshark_rpc_client as rpc_client;

use thiserror::Error;

/// Common imports for SoroShark front-ends
pub mod prelude {
    pub use crate::config::{AppConfig, CampaignConfig, SyncConfig};
    pub use crate::primitives::{
        format_amount, parse_amount, percentage, remaining_time, BigDecimal, ContractValue,
    };
    pub use crate::sync::{
        Account, CampaignSession, CampaignSnapshot, ContractId, EventFeed, FeedEvent,
        PledgeReceipt, ReadGateway, RefreshToken, ViewDefinition, ViewState, ViewSynchronizer,
    };

    #[cfg(feature = "rpc")]
    pub use crate::rpc_client::{NotificationBridge, RpcClient, RpcReadGateway};
}

/// Errors raised while wiring a campaign session.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// Invalid view definition
    #[error(transparent)]
    Sync(#[from] sync::SyncError),

    /// RPC client construction failed
    #[cfg(feature = "rpc")]
    #[error(transparent)]
    Rpc(#[from] rpc_client::RpcError),
}

/// Result type for SoroShark operations
pub type Result<T> = std::result::Result<T, Error>;

/// Campaign session over the JSON-RPC transport.
#[cfg(feature = "rpc")]
pub type RpcCampaignSession =
    sync::CampaignSession<rpc_client::RpcReadGateway, rpc_client::NotificationBridge>;

/// Builds an unmounted campaign session from `config`.
///
/// The session owns its notification bridge. Use [`connect_with_bridge`] to
/// keep a handle for publishing contract events.
#[cfg(feature = "rpc")]
pub fn connect(config: &config::AppConfig) -> Result<RpcCampaignSession> {
    let bridge = std::sync::Arc::new(rpc_client::NotificationBridge::from_config(&config.sync));
    connect_with_bridge(config, bridge)
}

/// Like [`connect`], with a caller-owned notification bridge.
#[cfg(feature = "rpc")]
pub fn connect_with_bridge(
    config: &config::AppConfig,
    bridge: std::sync::Arc<rpc_client::NotificationBridge>,
) -> Result<RpcCampaignSession> {
    config.validate()?;
    let client = std::sync::Arc::new(rpc_client::RpcClient::from_config(&config.rpc)?);
    let gateway = std::sync::Arc::new(rpc_client::RpcReadGateway::new(client));
    tracing::debug!(rpc = %config.rpc.url, "connecting campaign session");
    Ok(sync::CampaignSession::from_config(
        gateway,
        bridge,
        &config.campaign,
        config.sync.clone(),
    )?)
}

/// SoroShark library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
