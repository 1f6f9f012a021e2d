//! Stream (TCP) flow adapter.

use crate::error::ProxyError;
use crate::flow::types::{FlowError, StreamFlow};
use crate::hpke::HpkeContext;
use crate::relay::QueryRelay;

/// Serve one query on a stream flow.
///
/// Returns the error the flow was closed with, if any. An open failure is
/// returned without closing, since there is nothing to close.
pub async fn relay_stream<F, C>(flow: &mut F, relay: &QueryRelay, context: &C) -> Result<(), ProxyError>
where
    F: StreamFlow,
    C: HpkeContext,
{
    if let Err(e) = flow.open().await {
        tracing::warn!(error = %e, "Failed to open TCP flow");
        return Err(e.into());
    }

    let query = match flow.read().await {
        Ok(Some(query)) if !query.is_empty() => query,
        Ok(_) => return fail(flow, FlowError::MissingData.into()).await,
        Err(e) => {
            tracing::debug!(error = %e, "TCP read failed");
            return fail(flow, FlowError::MissingData.into()).await;
        }
    };

    let response = match relay.exchange(context, &query).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to relay TCP query");
            return fail(flow, e).await;
        }
    };

    let outcome = flow.write(response).await.map_err(ProxyError::from);
    if let Err(e) = &outcome {
        tracing::warn!(error = %e, "Failed to write TCP response");
    }
    flow.close_read(outcome.clone().err()).await;
    flow.close_write(None).await;
    outcome
}

async fn fail<F: StreamFlow>(flow: &mut F, error: ProxyError) -> Result<(), ProxyError> {
    flow.close_read(Some(error.clone())).await;
    flow.close_write(None).await;
    Err(error)
}
