//! ODoH stub proxy library.
//!
//! Intercepted (or locally received) DNS queries are encrypted for an
//! Oblivious DoH target, relayed through an oblivious proxy, and the
//! decrypted answers are written back to the originating flow.

// Core pipeline
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod flow;
pub mod hpke;
pub mod http;
pub mod provider;
pub mod relay;

// Flow source and process plumbing
pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::ProxyConfig;
pub use endpoint::ProxyEndpoint;
pub use error::ProxyError;
pub use flow::{DatagramFlow, Flow, StreamFlow};
pub use hpke::{HpkeBackend, HpkeContext, OdohBackend};
pub use lifecycle::Shutdown;
pub use provider::{DnsProxyProvider, ProviderState};
pub use relay::QueryRelay;
