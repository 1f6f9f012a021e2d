//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! provider / flow adapters / http client produce:
//!     → logging.rs (structured tracing events, one span per flow)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Plaintext DNS never reaches a log line, only sizes
//! - Metric updates go through the `metrics` facade and are no-ops when no
//!   exporter is installed
//! - Every flow task runs inside a span carrying its flow id and transport

pub mod logging;
pub mod metrics;
