use clap::Parser;
use soroshark_config::AppConfig;
use std::path::PathBuf;

/// Command-line arguments for soroshark-watch
#[derive(Parser, Debug, Clone)]
#[command(
    name = "soroshark-watch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch a SoroShark pledge campaign",
    long_about = "Reads the campaign's equity token and crowdfund contract and prints the \
                  derived campaign view. No contract events are received over JSON-RPC, so \
                  the view only changes when --refresh-interval re-reads it."
)]
pub struct CliArgs {
    /// Path to the TOML configuration file
    #[arg(short = 'c', long = "config", default_value = "soroshark.toml", value_name = "FILE")]
    pub config: PathBuf,

    /// Overrides the configured RPC endpoint
    #[arg(long = "rpc-url", env = "SOROSHARK_RPC_URL", value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Overrides the connected backer account
    #[arg(long = "backer", value_name = "ADDRESS")]
    pub backer: Option<String>,

    /// Print the view once and exit
    #[arg(long = "once")]
    pub once: bool,

    /// Re-read the whole view every N seconds. Without it the view is printed
    /// once and never updated.
    #[arg(long = "refresh-interval", value_name = "SECONDS")]
    pub refresh_interval: Option<u64>,
}

impl CliArgs {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(url) = &self.rpc_url {
            config.rpc.url = url.clone();
        }
        if let Some(backer) = &self.backer {
            config.campaign.backer = Some(backer.clone());
        }
    }
}
