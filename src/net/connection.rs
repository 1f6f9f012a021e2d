//! In-flight flow accounting.
//!
//! Every dispatched flow holds a [`FlowGuard`]; the count lives in a watch
//! channel so shutdown can wait for it to reach zero without polling.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique flow number, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowId(u64);

impl FlowId {
    fn next() -> Self {
        Self(NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

/// Counts flows that have been claimed but not finished.
#[derive(Debug, Clone)]
pub struct FlowTracker {
    active: Arc<watch::Sender<usize>>,
}

impl Default for FlowTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowTracker {
    pub fn new() -> Self {
        let (active, _) = watch::channel(0);
        Self {
            active: Arc::new(active),
        }
    }

    /// Claim a slot for a new flow. Dropping the guard releases it, also when
    /// the flow task panics.
    pub fn track(&self) -> FlowGuard {
        self.active.send_modify(|n| *n += 1);
        FlowGuard {
            active: Arc::clone(&self.active),
            id: FlowId::next(),
        }
    }

    pub fn active_count(&self) -> usize {
        *self.active.borrow()
    }

    /// Resolve once no flow is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        loop {
            if *rx.borrow_and_update() == 0 {
                return;
            }
            // The tracker itself keeps the sender alive.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// One in-flight flow.
#[derive(Debug)]
pub struct FlowGuard {
    active: Arc<watch::Sender<usize>>,
    id: FlowId,
}

impl FlowGuard {
    pub fn id(&self) -> FlowId {
        self.id
    }
}

impl Drop for FlowGuard {
    fn drop(&mut self) {
        self.active.send_modify(|n| *n -= 1);
        tracing::trace!(flow_id = %self.id, "Flow finished");
    }
}
