//! Datagram (UDP) flow adapter.

use bytes::{Bytes, BytesMut};

use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::ProxyError;
use crate::flow::types::{DatagramFlow, FlowError, ReadDatagrams};
use crate::hpke::HpkeContext;
use crate::relay::QueryRelay;

/// Serve one query on a datagram flow.
///
/// All datagrams of the read are concatenated into a single query. The
/// response goes back to the first datagram's peer, split into chunks of at
/// most [`MAX_DATAGRAM_SIZE`] bytes.
pub async fn relay_datagrams<F, C>(flow: &mut F, relay: &QueryRelay, context: &C) -> Result<(), ProxyError>
where
    F: DatagramFlow,
    C: HpkeContext,
{
    if let Err(e) = flow.open().await {
        tracing::warn!(error = %e, "Failed to open UDP flow");
        return Err(e.into());
    }

    let ReadDatagrams { datagrams, endpoints } = match flow.read_datagrams().await {
        Ok(read) => read,
        Err(e) => {
            tracing::debug!(error = %e, "UDP read failed");
            return fail(flow, FlowError::MissingData.into()).await;
        }
    };

    let peer = match endpoints.first() {
        Some(peer) if !datagrams.is_empty() => *peer,
        _ => return fail(flow, FlowError::MissingData.into()).await,
    };

    let query = concat(&datagrams);
    if query.is_empty() {
        return fail(flow, FlowError::MissingData.into()).await;
    }

    let response = match relay.exchange(context, &query).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, %peer, "Failed to relay UDP query");
            return fail(flow, e).await;
        }
    };

    let chunks = split_datagrams(&response);
    let peers = vec![peer; chunks.len()];
    tracing::trace!(%peer, chunks = chunks.len(), "Writing UDP response");

    let outcome = flow.write_datagrams(chunks, peers).await.map_err(ProxyError::from);
    if let Err(e) = &outcome {
        tracing::warn!(error = %e, %peer, "Failed to write UDP response");
    }
    flow.close_read(outcome.clone().err()).await;
    flow.close_write(None).await;
    outcome
}

/// Split `data` into consecutive chunks of at most [`MAX_DATAGRAM_SIZE`] bytes.
///
/// Empty input yields no chunks. Chunks share `data`'s buffer.
pub fn split_datagrams(data: &Bytes) -> Vec<Bytes> {
    (0..data.len())
        .step_by(MAX_DATAGRAM_SIZE)
        .map(|start| data.slice(start..(start + MAX_DATAGRAM_SIZE).min(data.len())))
        .collect()
}

fn concat(datagrams: &[Bytes]) -> Bytes {
    if let [single] = datagrams {
        return single.clone();
    }
    let mut buf = BytesMut::with_capacity(datagrams.iter().map(Bytes::len).sum());
    for datagram in datagrams {
        buf.extend_from_slice(datagram);
    }
    buf.freeze()
}

async fn fail<F: DatagramFlow>(flow: &mut F, error: ProxyError) -> Result<(), ProxyError> {
    flow.close_read(Some(error.clone())).await;
    flow.close_write(None).await;
    Err(error)
}
