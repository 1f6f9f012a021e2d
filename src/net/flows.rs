//! `StreamFlow` / `DatagramFlow` implementations over local sockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

use crate::error::ProxyError;
use crate::flow::{DatagramFlow, FlowError, ReadDatagrams, StreamFlow};
use crate::net::listener::FlowPermit;

/// One DNS-over-TCP connection, framed with a 2-byte length prefix.
///
/// The query must arrive within `idle_timeout` of the read starting, so an
/// idle client cannot hold its flow slot.
#[derive(Debug)]
pub struct TcpFlow {
    stream: TcpStream,
    peer: SocketAddr,
    idle_timeout: Duration,
    read_closed: bool,
    write_closed: bool,
    _permit: Option<FlowPermit>,
}

impl TcpFlow {
    pub fn new(stream: TcpStream, peer: SocketAddr, idle_timeout: Duration, permit: Option<FlowPermit>) -> Self {
        Self {
            stream,
            peer,
            idle_timeout,
            read_closed: false,
            write_closed: false,
            _permit: permit,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn read_frame(&mut self) -> Result<Option<Bytes>, FlowError> {
        let len = match self.stream.read_u16().await {
            Ok(len) => len as usize,
            // Peer closed before sending a length prefix.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(FlowError::Read(e.to_string())),
        };
        if len == 0 {
            return Ok(None);
        }

        let mut buf = vec![0u8; len];
        self.stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| FlowError::Read(e.to_string()))?;
        tracing::trace!(peer = %self.peer, len, "Read TCP query");
        Ok(Some(Bytes::from(buf)))
    }
}

impl StreamFlow for TcpFlow {
    async fn open(&mut self) -> Result<(), FlowError> {
        if self.read_closed || self.write_closed {
            return Err(FlowError::Closed);
        }
        self.stream
            .set_nodelay(true)
            .map_err(|e| FlowError::Open(e.to_string()))
    }

    async fn read(&mut self) -> Result<Option<Bytes>, FlowError> {
        if self.read_closed {
            return Err(FlowError::Closed);
        }

        match tokio::time::timeout(self.idle_timeout, self.read_frame()).await {
            Ok(read) => read,
            Err(_) => {
                tracing::debug!(peer = %self.peer, timeout = ?self.idle_timeout, "TCP client idle");
                Err(FlowError::Read(format!(
                    "No query within {}s",
                    self.idle_timeout.as_secs_f64()
                )))
            }
        }
    }

    async fn write(&mut self, data: Bytes) -> Result<(), FlowError> {
        if self.write_closed {
            return Err(FlowError::Closed);
        }
        let len = u16::try_from(data.len())
            .map_err(|_| FlowError::Write(format!("Response too large: {} bytes", data.len())))?;

        let mut framed = Vec::with_capacity(data.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(&data);

        self.stream
            .write_all(&framed)
            .await
            .map_err(|e| FlowError::Write(e.to_string()))?;
        self.stream.flush().await.map_err(|e| FlowError::Write(e.to_string()))
    }

    async fn close_read(&mut self, error: Option<ProxyError>) {
        if self.read_closed {
            return;
        }
        self.read_closed = true;
        if let Some(e) = error {
            tracing::debug!(peer = %self.peer, error = %e, "Closing TCP flow after failure");
        }
    }

    async fn close_write(&mut self, error: Option<ProxyError>) {
        if self.write_closed {
            return;
        }
        self.write_closed = true;
        if let Some(e) = error {
            tracing::debug!(peer = %self.peer, error = %e, "Closing TCP write side after failure");
        }
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(peer = %self.peer, error = %e, "TCP shutdown failed");
        }
    }
}

/// One received datagram on the shared local UDP socket.
#[derive(Debug)]
pub struct UdpFlow {
    socket: Arc<UdpSocket>,
    pending: Option<(Bytes, SocketAddr)>,
    read_closed: bool,
    write_closed: bool,
    _permit: Option<FlowPermit>,
}

impl UdpFlow {
    pub fn new(socket: Arc<UdpSocket>, datagram: Bytes, peer: SocketAddr, permit: Option<FlowPermit>) -> Self {
        Self {
            socket,
            pending: Some((datagram, peer)),
            read_closed: false,
            write_closed: false,
            _permit: permit,
        }
    }
}

impl DatagramFlow for UdpFlow {
    async fn open(&mut self) -> Result<(), FlowError> {
        if self.read_closed || self.write_closed {
            return Err(FlowError::Closed);
        }
        Ok(())
    }

    async fn read_datagrams(&mut self) -> Result<ReadDatagrams, FlowError> {
        if self.read_closed {
            return Err(FlowError::Closed);
        }
        Ok(match self.pending.take() {
            Some((datagram, peer)) => ReadDatagrams {
                datagrams: vec![datagram],
                endpoints: vec![peer],
            },
            None => ReadDatagrams::default(),
        })
    }

    async fn write_datagrams(&mut self, datagrams: Vec<Bytes>, endpoints: Vec<SocketAddr>) -> Result<(), FlowError> {
        if self.write_closed {
            return Err(FlowError::Closed);
        }
        if datagrams.len() != endpoints.len() {
            return Err(FlowError::Write(format!(
                "{} datagrams for {} endpoints",
                datagrams.len(),
                endpoints.len()
            )));
        }

        for (datagram, peer) in datagrams.iter().zip(&endpoints) {
            self.socket
                .send_to(datagram, peer)
                .await
                .map_err(|e| FlowError::Write(e.to_string()))?;
        }
        Ok(())
    }

    async fn close_read(&mut self, error: Option<ProxyError>) {
        if self.read_closed {
            return;
        }
        self.read_closed = true;
        self.pending = None;
        if let Some(e) = error {
            tracing::debug!(error = %e, "Closing UDP flow after failure");
        }
    }

    async fn close_write(&mut self, _error: Option<ProxyError>) {
        self.write_closed = true;
    }
}
