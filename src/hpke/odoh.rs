//! `odoh-rs` backed implementation of the HPKE traits.

use bytes::Bytes;
use odoh_rs::{
    compose, decrypt_response, encrypt_query, parse, ObliviousDoHConfigContents,
    ObliviousDoHConfigs, ObliviousDoHMessage, ObliviousDoHMessagePlaintext, OdohSecret,
};

use crate::constants::UNKNOWN_CONTEXT;
use crate::hpke::{CryptoError, HpkeBackend, HpkeContext};

/// Queries are sent unpadded so the plaintext can be rebuilt from the
/// original query bytes at decryption time.
const QUERY_PADDING: usize = 0;

/// Backend producing contexts from RFC 9230 `ObliviousDoHConfigs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OdohBackend;

impl HpkeBackend for OdohBackend {
    type Context = OdohContext;

    fn create_context(&self, config: &[u8]) -> Result<OdohContext, CryptoError> {
        let mut buf = Bytes::copy_from_slice(config);
        let configs: ObliviousDoHConfigs = parse(&mut buf)
            .map_err(|e| CryptoError::InvalidContext(format!("Malformed ODoH configs: {}", e)))?;

        let config = configs
            .supported()
            .into_iter()
            .next()
            .ok_or_else(|| CryptoError::InvalidContext("No supported ODoH config".to_string()))?;

        Ok(OdohContext {
            config: config.into(),
        })
    }
}

/// The target's public key configuration.
///
/// Immutable after creation; encryption draws randomness from the calling
/// thread's RNG, so one context serves concurrent flows without locking.
#[derive(Debug, Clone)]
pub struct OdohContext {
    config: ObliviousDoHConfigContents,
}

/// Response key for exactly one query.
pub struct OdohClientSecret(OdohSecret);

impl std::fmt::Debug for OdohClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OdohClientSecret(..)")
    }
}

impl HpkeContext for OdohContext {
    type Secret = OdohClientSecret;

    fn encrypt(&self, query: &[u8]) -> Result<(Bytes, OdohClientSecret), CryptoError> {
        let plaintext = ObliviousDoHMessagePlaintext::new(query, QUERY_PADDING);
        let (message, secret) = encrypt_query(&plaintext, &self.config, &mut rand::thread_rng())
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let body = compose(&message)
            .map_err(|e| CryptoError::Encryption(format!("Failed to encode query: {}", e)))?
            .freeze();
        Ok((body, OdohClientSecret(secret)))
    }

    fn decrypt(
        &self,
        response: &[u8],
        original_query: &[u8],
        secret: OdohClientSecret,
    ) -> Result<Bytes, CryptoError> {
        let mut buf = Bytes::copy_from_slice(response);
        let message: ObliviousDoHMessage = parse(&mut buf)
            .map_err(|e| CryptoError::Decryption(format!("Malformed response: {}", e)))?;

        let plaintext = ObliviousDoHMessagePlaintext::new(original_query, QUERY_PADDING);
        let decrypted = decrypt_response(&plaintext, &message, secret.0)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        Ok(decrypted.into_msg())
    }

    fn describe(&self) -> String {
        match self.config.identifier() {
            Ok(key_id) => {
                let hex: String = key_id.iter().map(|b| format!("{:02x}", b)).collect();
                format!("ODoH config (key id {})", hex)
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to describe ODoH config");
                UNKNOWN_CONTEXT.to_string()
            }
        }
    }
}
