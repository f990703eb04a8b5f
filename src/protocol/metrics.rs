//! Process-wide engine counters, tracked without external dependencies.

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::Role;

pub(crate) struct Metrics;

static ACTIVE_CONNECTIONS: AtomicU64 = AtomicU64::new(0);
static ACTIVE_SESSIONS: AtomicU64 = AtomicU64::new(0);
static ACTIVE_SENDERS: AtomicU64 = AtomicU64::new(0);
static ACTIVE_RECEIVERS: AtomicU64 = AtomicU64::new(0);
static DELIVERIES_CREATED: AtomicU64 = AtomicU64::new(0);
static DELIVERIES_SETTLED: AtomicU64 = AtomicU64::new(0);
static MODIFIED_DRAINED: AtomicU64 = AtomicU64::new(0);
static REMOTE_TRANSITIONS_REJECTED: AtomicU64 = AtomicU64::new(0);

/// Kind of endpoint whose liveness is being counted.
#[derive(Clone, Copy)]
pub(crate) enum EndpointKind {
    Connection,
    Session,
    Link(Role),
}

impl EndpointKind {
    fn counter(self) -> &'static AtomicU64 {
        match self {
            Self::Connection => &ACTIVE_CONNECTIONS,
            Self::Session => &ACTIVE_SESSIONS,
            Self::Link(Role::Sender) => &ACTIVE_SENDERS,
            Self::Link(Role::Receiver) => &ACTIVE_RECEIVERS,
        }
    }
}

impl Metrics {
    #[inline]
    pub(crate) fn record_endpoint_created(kind: EndpointKind) {
        kind.counter().fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_endpoint_freed(kind: EndpointKind) {
        let _ = kind
            .counter()
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    #[inline]
    pub(crate) fn record_delivery_created() {
        DELIVERIES_CREATED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_delivery_settled() {
        DELIVERIES_SETTLED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_modified_drained() {
        MODIFIED_DRAINED.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_remote_transition_rejected() {
        REMOTE_TRANSITIONS_REJECTED.fetch_add(1, Ordering::Relaxed);
    }
}

/// Read the current counter values.
#[must_use]
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        active_connections: ACTIVE_CONNECTIONS.load(Ordering::Relaxed),
        active_sessions: ACTIVE_SESSIONS.load(Ordering::Relaxed),
        active_senders: ACTIVE_SENDERS.load(Ordering::Relaxed),
        active_receivers: ACTIVE_RECEIVERS.load(Ordering::Relaxed),
        deliveries_created: DELIVERIES_CREATED.load(Ordering::Relaxed),
        deliveries_settled: DELIVERIES_SETTLED.load(Ordering::Relaxed),
        modified_drained: MODIFIED_DRAINED.load(Ordering::Relaxed),
        remote_transitions_rejected: REMOTE_TRANSITIONS_REJECTED.load(Ordering::Relaxed),
    }
}

/// Lightweight snapshot of engine counters.
#[derive(Default, Debug, Clone, Copy)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub active_connections: u64,
    pub active_sessions: u64,
    pub active_senders: u64,
    pub active_receivers: u64,
    pub deliveries_created: u64,
    pub deliveries_settled: u64,
    pub modified_drained: u64,
    pub remote_transitions_rejected: u64,
}

impl MetricsSnapshot {
    /// Links of either role currently alive.
    #[must_use]
    pub const fn active_links(&self) -> u64 {
        self.active_senders + self.active_receivers
    }

    /// Deliveries created but not yet locally settled, across all links.
    #[must_use]
    pub const fn outstanding_deliveries(&self) -> u64 {
        self.deliveries_created.saturating_sub(self.deliveries_settled)
    }
}
