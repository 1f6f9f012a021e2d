//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bootstrap provider → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → provider.stop() → Listener stops → Drain flows → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: no socket is bound before the session is Ready
//! - Draining has a deadline; flows still running after it are abandoned

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
