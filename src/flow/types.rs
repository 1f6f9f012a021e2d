//! Flow capabilities provided by the flow source.

use std::future::Future;
use std::net::SocketAddr;

use bytes::Bytes;
use thiserror::Error;

use crate::error::ProxyError;

/// Errors reported by, or about, a flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The read completed without a query (or without a peer endpoint).
    #[error("Missing data")]
    MissingData,

    #[error("Failed to open flow: {0}")]
    Open(String),

    #[error("Read failed: {0}")]
    Read(String),

    #[error("Write failed: {0}")]
    Write(String),

    /// The flow was already closed by either side.
    #[error("Flow is closed")]
    Closed,
}

/// A connection-oriented flow carrying one DNS message each way.
///
/// Implement this to plug a flow source (OS interception, a local listener,
/// a test double) into the adapter.
pub trait StreamFlow: Send + 'static {
    fn open(&mut self) -> impl Future<Output = Result<(), FlowError>> + Send;

    /// Read one query. `Ok(None)` means the peer sent nothing.
    fn read(&mut self) -> impl Future<Output = Result<Option<Bytes>, FlowError>> + Send;

    fn write(&mut self, data: Bytes) -> impl Future<Output = Result<(), FlowError>> + Send;

    /// Close the read side, reporting why the cycle ended (if it failed).
    fn close_read(&mut self, error: Option<ProxyError>) -> impl Future<Output = ()> + Send;

    fn close_write(&mut self, error: Option<ProxyError>) -> impl Future<Output = ()> + Send;
}

/// What one datagram read produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadDatagrams {
    /// Datagrams in arrival order.
    pub datagrams: Vec<Bytes>,
    /// Peer endpoint of each datagram.
    pub endpoints: Vec<SocketAddr>,
}

/// A datagram flow; one read cycle yields one logical DNS query.
pub trait DatagramFlow: Send + 'static {
    fn open(&mut self) -> impl Future<Output = Result<(), FlowError>> + Send;

    fn read_datagrams(&mut self) -> impl Future<Output = Result<ReadDatagrams, FlowError>> + Send;

    /// Write `datagrams` in order; `datagrams[i]` goes to `endpoints[i]`.
    fn write_datagrams(
        &mut self,
        datagrams: Vec<Bytes>,
        endpoints: Vec<SocketAddr>,
    ) -> impl Future<Output = Result<(), FlowError>> + Send;

    fn close_read(&mut self, error: Option<ProxyError>) -> impl Future<Output = ()> + Send;

    fn close_write(&mut self, error: Option<ProxyError>) -> impl Future<Output = ()> + Send;
}

/// A new flow handed over by the flow source.
#[derive(Debug)]
pub enum Flow<S, D> {
    Stream(S),
    Datagram(D),
}

impl<S, D> Flow<S, D> {
    pub fn kind(&self) -> FlowKind {
        match self {
            Flow::Stream(_) => FlowKind::Tcp,
            Flow::Datagram(_) => FlowKind::Udp,
        }
    }
}

/// Transport of a flow, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Tcp,
    Udp,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Tcp => "tcp",
            FlowKind::Udp => "udp",
        }
    }
}

impl std::fmt::Display for FlowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
