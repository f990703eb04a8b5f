//! Connection configuration.

use uuid::Uuid;

/// How the frame layer's remote state updates are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RemoteTransitionPolicy {
    /// Refuse updates that move the remote lifecycle backwards.
    #[default]
    Reject,
    /// Apply every update as given.
    Tolerate,
}

/// Connection configuration options.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionConfig {
    /// Container identifier announced in the open frame.
    pub container_id: String,
    /// Virtual host requested from the peer.
    pub hostname: Option<String>,
    /// Number of endpoints to pre-allocate room for.
    pub endpoint_capacity: usize,
    /// Handling of backwards remote state updates.
    pub remote_transitions: RemoteTransitionPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            container_id: Uuid::new_v4().to_string(),
            hostname: None,
            endpoint_capacity: 16,
            remote_transitions: RemoteTransitionPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Configuration with a fixed container identifier.
    #[must_use]
    pub fn with_container_id(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_container_ids_are_unique() {
        let a = ConnectionConfig::default();
        let b = ConnectionConfig::default();
        assert_ne!(a.container_id, b.container_id);
        assert_eq!(a.remote_transitions, RemoteTransitionPolicy::Reject);
    }
}
