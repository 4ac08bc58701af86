use std::net::SocketAddr;

use clap::Parser;
use trialflow_rust::config::{AppConfig, StorageMode};
use trialflow_rust::server;

#[derive(Debug, Parser)]
#[command(name = "trialflow-server", version, about = "Manufacturing trial tracking REST service")]
struct Cli {
    /// Socket address to bind, e.g. 127.0.0.1:3001
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Base URL encoded in report QR codes.
    #[arg(long)]
    public_url: Option<String>,
    /// Storage backend. `auto` picks postgres when DATABASE_URL is configured.
    #[arg(long, value_enum)]
    storage: Option<StorageMode>,
    /// Reject submissions whose lower-order steps are not OK yet.
    #[arg(long)]
    enforce_step_order: bool,
    /// Validate catalog fields on ok / not_ok submissions.
    #[arg(long)]
    validate_fields: bool,
}

impl Cli {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(url) = self.public_url {
            config.public_url = url;
        }
        if let Some(storage) = self.storage {
            config.storage = storage;
        }
        config.policy.enforce_step_order |= self.enforce_step_order;
        config.policy.validate_fields |= self.validate_fields;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
                                                                          "trialflow_rust=info,trial_api=info,info".to_string()
                                                                      }))
                             .init();
    let cli = Cli::parse();
    let config = cli.apply(AppConfig::from_env()?);
    server::serve(config).await
}
