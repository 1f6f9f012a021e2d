//! The per-query pipeline: encrypt, relay, decrypt.
//!
//! The secret minted by `encrypt` lives on this function's stack and is
//! moved into the matching `decrypt`; no other query can observe it.

use bytes::Bytes;

use crate::endpoint::ProxyEndpoint;
use crate::error::ProxyError;
use crate::hpke::HpkeContext;
use crate::http::{HttpRequestSpec, RelayClient};

/// Sends config fetches and encrypted queries for one session.
#[derive(Debug, Clone)]
pub struct QueryRelay {
    endpoint: ProxyEndpoint,
    client: RelayClient,
}

impl QueryRelay {
    pub fn new(endpoint: ProxyEndpoint, client: RelayClient) -> Self {
        Self { endpoint, client }
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.endpoint
    }

    /// Fetch the target's published ODoH configuration.
    pub async fn fetch_config(&self) -> Result<Bytes, ProxyError> {
        let spec = HttpRequestSpec::config(&self.endpoint)?;
        Ok(self.client.send(&spec).await?)
    }

    /// Run one query through encrypt → relay → decrypt.
    pub async fn exchange<C: HpkeContext>(&self, context: &C, query: &[u8]) -> Result<Bytes, ProxyError> {
        let (ciphertext, secret) = context.encrypt(query)?;
        let spec = HttpRequestSpec::query(&self.endpoint, ciphertext)?;
        let response = self.client.send(&spec).await?;
        let plaintext = context.decrypt(&response, query, secret)?;

        tracing::debug!(
            query_len = query.len(),
            response_len = plaintext.len(),
            "Relayed query"
        );
        Ok(plaintext)
    }
}
