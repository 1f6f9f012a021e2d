//! HPKE context management.
//!
//! # Data Flow
//! ```text
//! config bytes (from target)
//!     → HpkeBackend::create_context (once per session)
//!     → HpkeContext (owned by the provider, shared read-only by flows)
//!
//! per query:
//!     encrypt(query) → (ciphertext, secret)
//!     decrypt(response, query, secret)   // secret moved in, single use
//! ```
//!
//! # Design Decisions
//! - Secrets are move-only values, so a secret cannot be reused or shared
//!   between queries
//! - The original query is associated input to decryption, binding each
//!   response to the request that elicited it
//! - `describe` never fails; diagnostics cannot take the proxy down

pub mod odoh;

use bytes::Bytes;
use thiserror::Error;

pub use odoh::{OdohBackend, OdohClientSecret, OdohContext};

/// Errors from context creation, encryption or decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The published configuration could not be parsed or is unsupported.
    #[error("Invalid ODoH context: {0}")]
    InvalidContext(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),
}

/// Creates session contexts from a target's published configuration.
pub trait HpkeBackend: Send + Sync + 'static {
    type Context: HpkeContext;

    /// Parse and validate `config`. Called once per session.
    fn create_context(&self, config: &[u8]) -> Result<Self::Context, CryptoError>;
}

/// Per-session cryptographic state.
///
/// Implementations must be safe to use from many flows at once.
pub trait HpkeContext: Send + Sync + 'static {
    /// Key material pairing one query with its response.
    type Secret: Send + 'static;

    /// Encrypt a plaintext DNS query. Every call mints a fresh secret.
    fn encrypt(&self, query: &[u8]) -> Result<(Bytes, Self::Secret), CryptoError>;

    /// Decrypt the response to `original_query`, consuming its secret.
    fn decrypt(
        &self,
        response: &[u8],
        original_query: &[u8],
        secret: Self::Secret,
    ) -> Result<Bytes, CryptoError>;

    /// Human-readable summary for logs.
    fn describe(&self) -> String;
}
