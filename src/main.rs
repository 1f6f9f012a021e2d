//! ODoH stub proxy.
//!
//! ```text
//!   local resolver                 odoh-stub-proxy                    network
//!  ┌──────────────┐   udp/tcp   ┌──────────────────────┐   https   ┌─────────┐   https   ┌────────┐
//!  │ stub / OS    │────────────▶│ listener → provider  │──────────▶│  proxy  │──────────▶│ target │
//!  │ DNS client   │◀────────────│ → flow → relay (HPKE)│◀──────────│         │◀──────────│        │
//!  └──────────────┘  plaintext  └──────────────────────┘ encrypted └─────────┘           └────────┘
//! ```
//!
//! The proxy learns who is asking but not what; the target learns what is
//! asked but not by whom.

use std::path::PathBuf;

use clap::Parser;

use odoh_stub_proxy::config::{read_config, validate_config, ConfigError, ProxyConfig};
use odoh_stub_proxy::lifecycle::startup;
use odoh_stub_proxy::observability::{logging, metrics};

/// Oblivious DNS-over-HTTPS stub proxy.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// ODoH target resolver base URL.
    #[arg(long)]
    target: Option<String>,

    /// Oblivious proxy URL.
    #[arg(long, conflicts_with = "direct")]
    proxy: Option<String>,

    /// Send queries straight to the target, without an oblivious proxy.
    #[arg(long)]
    direct: bool,

    /// Local UDP/TCP address to serve DNS on.
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(target) = self.target {
            config.endpoint.target = target;
        }
        if let Some(proxy) = self.proxy {
            config.endpoint.proxy = Some(proxy);
        }
        if self.direct {
            config.endpoint.proxy = None;
        }
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!("odoh-stub-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        odoh_target = %config.endpoint.target,
        proxy = config.endpoint.proxy.as_deref().unwrap_or("(direct)"),
        bind_address = %config.listener.bind_address,
        max_flows = config.listener.max_flows,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
