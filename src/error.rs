//! Top-level error type for the relay pipeline.
//!
//! Each subsystem owns its own error enum; `ProxyError` aggregates them so a
//! flow can be closed with whatever ended its cycle.

use thiserror::Error;

use crate::flow::FlowError;
use crate::hpke::CryptoError;
use crate::http::HttpError;

/// Errors that end a flow's query/response cycle or the session bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    /// Request construction, transport or status failure.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Context creation, encryption or decryption failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Failure reported by (or about) the flow itself.
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// A query arrived before the ODoH context was created.
    #[error("ODoH context is not ready")]
    NotReady,

    /// `start` was called on a provider that already left `Uninitialized`.
    #[error("Proxy provider already started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, ProxyError>;
