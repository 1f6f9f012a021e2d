//! Startup orchestration.
//!
//! Order: provider bootstrap, then the listener. Traffic is only accepted
//! once the session is Ready; a failed bootstrap is fatal.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::net::LocalListener;
use crate::provider::DnsProxyProvider;

/// How long in-flight flows get to finish after shutdown is signalled.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Run the proxy until a shutdown signal arrives.
pub async fn run(config: ProxyConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider = Arc::new(DnsProxyProvider::from_config(&config)?);
    provider.start().await?;

    let listener = LocalListener::bind(&config.listener, &config.timeouts).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        endpoint = %provider.endpoint(),
        "Serving DNS"
    );

    let serve = tokio::spawn(listener.serve(Arc::clone(&provider)));

    wait_for_shutdown_signal().await;
    provider.stop();

    if let Err(e) = serve.await {
        tracing::error!(error = %e, "Listener task failed");
    }

    if tokio::time::timeout(DRAIN_TIMEOUT, provider.flows().wait_idle())
        .await
        .is_err()
    {
        tracing::warn!(
            active_flows = provider.flows().active_count(),
            "Drain timeout elapsed, exiting with flows in flight"
        );
    }

    Ok(())
}
