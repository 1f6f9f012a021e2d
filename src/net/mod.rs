//! Local flow source.
//!
//! # Data Flow
//! ```text
//! UDP datagram / TCP connection on listener.bind_address
//!     → listener.rs (flow limit, shutdown-aware receive loop)
//!     → flows.rs (UdpFlow / TcpFlow with 2-byte framing)
//!     → DnsProxyProvider::dispatch
//!     → connection.rs (flow id + in-flight tracking)
//! ```
//!
//! # Design Decisions
//! - One datagram or one connection is one flow
//! - A permit is held for the lifetime of the flow (backpressure)
//! - A declined flow is dropped, which closes it

pub mod connection;
pub mod flows;
pub mod listener;

pub use connection::{FlowGuard, FlowId, FlowTracker};
pub use flows::{TcpFlow, UdpFlow};
pub use listener::{FlowPermit, ListenerError, LocalFlow, LocalListener};
