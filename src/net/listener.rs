//! Local DNS listener with backpressure.
//!
//! # Responsibilities
//! - Bind a UDP socket and a TCP listener on the same local address
//! - Turn each datagram / connection into a flow for the provider
//! - Enforce `max_flows` via semaphore
//! - Stop accepting when shutdown is signalled

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{ListenerConfig, TimeoutConfig};
use crate::constants::MAX_DNS_MESSAGE_LEN;
use crate::flow::Flow;
use crate::hpke::HpkeBackend;
use crate::net::flows::{TcpFlow, UdpFlow};
use crate::provider::DnsProxyProvider;

/// Flows produced by the local listener.
pub type LocalFlow = Flow<TcpFlow, UdpFlow>;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The configured address is not a socket address.
    Address(String),
    /// Failed to bind a socket.
    Bind(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Address(addr) => write!(f, "Invalid bind address: {}", addr),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// UDP socket plus TCP listener sharing one port.
pub struct LocalListener {
    udp: Arc<UdpSocket>,
    tcp: TcpListener,
    flow_limit: Arc<Semaphore>,
    max_flows: usize,
    idle_timeout: Duration,
}

impl LocalListener {
    /// Bind both sockets. With port 0 the TCP listener reuses the port the
    /// UDP socket was given.
    pub async fn bind(config: &ListenerConfig, timeouts: &TimeoutConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|_| ListenerError::Address(config.bind_address.clone()))?;

        let udp = UdpSocket::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = udp.local_addr().map_err(ListenerError::Bind)?;
        let tcp = TcpListener::bind(local_addr).await.map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_flows = config.max_flows,
            idle_secs = timeouts.idle_secs,
            "Listener bound (udp + tcp)"
        );

        Ok(Self {
            udp: Arc::new(udp),
            tcp,
            flow_limit: Arc::new(Semaphore::new(config.max_flows)),
            max_flows: config.max_flows,
            idle_timeout: Duration::from_secs(timeouts.idle_secs),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.udp.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.flow_limit.available_permits()
    }

    pub fn max_flows(&self) -> usize {
        self.max_flows
    }

    /// Produce flows until the provider is stopped.
    ///
    /// A permit is taken before each receive, so at most `max_flows` flows
    /// are in flight; further traffic waits in the socket buffers. TCP flows
    /// give their permit back after the idle timeout if no query arrives.
    pub async fn serve<B: HpkeBackend>(self, provider: Arc<DnsProxyProvider<B>>) {
        let mut shutdown = provider.subscribe_shutdown();
        let mut buf = vec![0u8; MAX_DNS_MESSAGE_LEN];

        loop {
            let permit = tokio::select! {
                _ = shutdown.recv() => break,
                permit = Arc::clone(&self.flow_limit).acquire_owned() => match permit {
                    Ok(permit) => FlowPermit { _permit: permit },
                    Err(_) => break,
                },
            };

            let flow = tokio::select! {
                _ = shutdown.recv() => break,
                received = self.udp.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => {
                        tracing::trace!(%peer, len, "Datagram received");
                        let datagram = Bytes::copy_from_slice(&buf[..len]);
                        LocalFlow::Datagram(UdpFlow::new(Arc::clone(&self.udp), datagram, peer, Some(permit)))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "UDP receive failed");
                        continue;
                    }
                },
                accepted = self.tcp.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!(
                            %peer,
                            available_permits = self.flow_limit.available_permits(),
                            "Connection accepted"
                        );
                        LocalFlow::Stream(TcpFlow::new(stream, peer, self.idle_timeout, Some(permit)))
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "TCP accept failed");
                        continue;
                    }
                },
            };

            let kind = flow.kind();
            if !provider.dispatch(flow) {
                tracing::debug!(kind = kind.as_str(), "Flow declined, dropping");
            }
        }

        tracing::info!("Listener stopped accepting flows");
    }
}

/// A flow slot. Dropping it (with its flow) releases the slot, even if the
/// flow task panics.
#[derive(Debug)]
pub struct FlowPermit {
    _permit: OwnedSemaphorePermit,
}
