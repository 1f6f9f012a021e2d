//! HTTP request model.
//!
//! # Data Flow
//! ```text
//! ProxyEndpoint + request kind
//!     → request.rs (method, headers, body, URL)
//!     → client.rs (send via reqwest, map outcome)
//!     → Ok(body) | HttpError
//! ```
//!
//! # Design Decisions
//! - Only status 200 with a non-empty body counts as success
//! - Error bodies are logged, never carried in the error value
//! - No retries; each query is one-shot

pub mod client;
pub mod request;

pub use client::{HttpError, RelayClient};
pub use request::{HttpRequestSpec, RequestKind};
