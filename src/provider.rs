//! Session lifecycle: bootstrap once, then hand flows to the adapters.
//!
//! # Data Flow
//! ```text
//! start():
//!     Uninitialized → Bootstrapping
//!         → GET {target}/.well-known/odohconfigs
//!         → HpkeBackend::create_context
//!     → Ready            (context stored, flows accepted)
//!     → Failed           (any error; flows declined forever)
//!
//! dispatch(flow):
//!     not Ready → false  (flow untouched)
//!     Ready     → spawn relay_stream / relay_datagrams → true
//! ```
//!
//! # Design Decisions
//! - The context is written once and only read afterwards, so flows share it
//!   through the provider's `Arc` without locking
//! - `stop` only signals the flow source; dispatched flows run to completion
//! - A failed bootstrap is terminal for the session

use std::sync::{Arc, Mutex, OnceLock};

use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::endpoint::ProxyEndpoint;
use crate::error::ProxyError;
use crate::flow::{relay_datagrams, relay_stream, DatagramFlow, Flow, StreamFlow};
use crate::hpke::{HpkeBackend, HpkeContext, OdohBackend};
use crate::http::RelayClient;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::net::FlowTracker;
use crate::observability::metrics;
use crate::relay::QueryRelay;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    Uninitialized,
    Bootstrapping,
    Ready,
    Failed,
}

impl ProviderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderState::Uninitialized => "uninitialized",
            ProviderState::Bootstrapping => "bootstrapping",
            ProviderState::Ready => "ready",
            ProviderState::Failed => "failed",
        }
    }
}

/// Owns the session's HPKE context and dispatches flows.
pub struct DnsProxyProvider<B: HpkeBackend = OdohBackend> {
    relay: QueryRelay,
    backend: B,
    state: Mutex<ProviderState>,
    context: OnceLock<B::Context>,
    shutdown: Shutdown,
    flows: FlowTracker,
}

impl DnsProxyProvider<OdohBackend> {
    /// Build a provider backed by `odoh-rs` from the loaded configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let endpoint = ProxyEndpoint::from_config(&config.endpoint)?;
        let client = RelayClient::new(&config.timeouts)?;
        Ok(Self::new(QueryRelay::new(endpoint, client), OdohBackend))
    }
}

impl<B: HpkeBackend> DnsProxyProvider<B> {
    pub fn new(relay: QueryRelay, backend: B) -> Self {
        Self {
            relay,
            backend,
            state: Mutex::new(ProviderState::Uninitialized),
            context: OnceLock::new(),
            shutdown: Shutdown::new(),
            flows: FlowTracker::new(),
        }
    }

    pub fn state(&self) -> ProviderState {
        *self.state.lock().expect("provider state mutex poisoned")
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ProviderState::Ready
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        self.relay.endpoint()
    }

    /// The session context; `NotReady` until bootstrap has succeeded.
    pub fn context(&self) -> Result<&B::Context, ProxyError> {
        self.context.get().ok_or(ProxyError::NotReady)
    }

    /// Diagnostic rendering of the context, once there is one.
    pub fn describe_context(&self) -> Option<String> {
        self.context().ok().map(|context| context.describe())
    }

    /// In-flight flow accounting, used to drain on shutdown.
    pub fn flows(&self) -> &FlowTracker {
        &self.flows
    }

    pub fn subscribe_shutdown(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Fetch the target's configuration and build the session context.
    ///
    /// Valid only once, from `Uninitialized`.
    pub async fn start(&self) -> Result<(), ProxyError> {
        {
            let mut state = self.state.lock().expect("provider state mutex poisoned");
            if *state != ProviderState::Uninitialized {
                return Err(ProxyError::AlreadyStarted);
            }
            *state = ProviderState::Bootstrapping;
        }

        tracing::info!(endpoint = %self.relay.endpoint(), "Bootstrapping ODoH session");

        match self.bootstrap().await {
            Ok(context) => {
                let description = context.describe();
                // Only the Bootstrapping holder reaches this, so the cell is empty.
                let _ = self.context.set(context);
                self.set_state(ProviderState::Ready);
                metrics::record_bootstrap("ready");
                tracing::info!(context = %description, "ODoH session ready");
                Ok(())
            }
            Err(e) => {
                self.set_state(ProviderState::Failed);
                metrics::record_bootstrap("failed");
                tracing::error!(error = %e, "ODoH bootstrap failed");
                Err(e)
            }
        }
    }

    /// Signal the flow source to stop. In-flight flows are not cancelled.
    pub fn stop(&self) {
        tracing::info!(
            active_flows = self.flows.active_count(),
            "Stopping DNS proxy provider"
        );
        self.shutdown.trigger();
    }

    /// Claim `flow` and relay it on a new task.
    ///
    /// Returns `false`, without touching the flow, when the session is not
    /// Ready.
    pub fn dispatch<S, D>(self: &Arc<Self>, flow: Flow<S, D>) -> bool
    where
        S: StreamFlow,
        D: DatagramFlow,
    {
        let kind = flow.kind();
        if self.context().is_err() || !self.is_ready() {
            tracing::debug!(kind = kind.as_str(), state = self.state().as_str(), "Declining flow");
            metrics::record_flow(kind.as_str(), "declined");
            return false;
        }

        let guard = self.flows.track();
        let span = tracing::info_span!("flow", flow_id = %guard.id(), kind = kind.as_str());
        let provider = Arc::clone(self);

        tokio::spawn(
            async move {
                let _guard = guard;
                let Ok(context) = provider.context() else {
                    return;
                };

                let result = match flow {
                    Flow::Stream(mut stream) => relay_stream(&mut stream, &provider.relay, context).await,
                    Flow::Datagram(mut datagrams) => {
                        relay_datagrams(&mut datagrams, &provider.relay, context).await
                    }
                };

                match result {
                    Ok(()) => {
                        tracing::debug!("Flow completed");
                        metrics::record_flow(kind.as_str(), "completed");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Flow failed");
                        metrics::record_flow(kind.as_str(), "failed");
                    }
                }
            }
            .instrument(span),
        );
        true
    }

    async fn bootstrap(&self) -> Result<B::Context, ProxyError> {
        let config = self.relay.fetch_config().await?;
        tracing::debug!(config_len = config.len(), "Fetched ODoH configuration");
        Ok(self.backend.create_context(&config)?)
    }

    fn set_state(&self, next: ProviderState) {
        *self.state.lock().expect("provider state mutex poisoned") = next;
    }
}
