//! Flow adaptation: binds intercepted DNS flows to the relay pipeline.
//!
//! # Data Flow
//! ```text
//! TCP (stream.rs):
//!     open → read query → relay → write response → close read + write
//!
//! UDP (datagram.rs):
//!     open → read datagrams + peer → concatenate → relay
//!          → split into ≤512-byte datagrams → write to peer → close read + write
//!
//! States: Opened → AwaitingQuery → Relaying → Completed | Failed
//! ```
//!
//! # Design Decisions
//! - One query, one response, then the flow is closed (no keep-alive)
//! - Nothing is written on a failure path; the flow just closes
//! - Each side of a flow is closed exactly once

pub mod datagram;
pub mod stream;
pub mod types;

pub use datagram::{relay_datagrams, split_datagrams};
pub use stream::relay_stream;
pub use types::{DatagramFlow, Flow, FlowError, FlowKind, ReadDatagrams, StreamFlow};
