//! Endpoint lifecycle shared by connections, sessions and links.

use std::any::Any;
use std::fmt;

use tracing::{debug, warn};

use super::arena::ArenaKey;
use super::config::RemoteTransitionPolicy;
use super::error::{EngineError, Result};
use super::modified::ModifiedSet;
use super::state::EndpointState;
use crate::protocol::ErrorCondition;
use crate::protocol::metrics::Metrics;

/// Application data attached to an endpoint.
pub type Context = Box<dyn Any + Send>;

macro_rules! endpoint_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) ArenaKey);

        impl $name {
            /// Underlying arena key.
            #[must_use]
            pub const fn key(self) -> ArenaKey {
                self.0
            }
        }
    };
}

endpoint_handle!(
    /// Handle to any endpoint owned by a connection.
    EndpointId
);
endpoint_handle!(
    /// Handle to a session.
    SessionId
);
endpoint_handle!(
    /// Handle to a link.
    LinkId
);

impl From<SessionId> for EndpointId {
    fn from(id: SessionId) -> Self {
        Self(id.0)
    }
}

impl From<LinkId> for EndpointId {
    fn from(id: LinkId) -> Self {
        Self(id.0)
    }
}

/// Local and remote lifecycle of one endpoint, plus its error slots and context.
#[derive(Default)]
pub struct Endpoint {
    local_state: EndpointState,
    remote_state: EndpointState,
    local_error: Option<ErrorCondition>,
    remote_error: Option<ErrorCondition>,
    context: Option<Context>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("local_state", &self.local_state)
            .field("remote_state", &self.remote_state)
            .field("local_error", &self.local_error)
            .field("remote_error", &self.remote_error)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

impl Endpoint {
    /// Local lifecycle state.
    #[must_use]
    pub const fn local_state(&self) -> EndpointState {
        self.local_state
    }

    /// Lifecycle state last reported by the peer.
    #[must_use]
    pub const fn remote_state(&self) -> EndpointState {
        self.remote_state
    }

    /// Error set by the application.
    #[must_use]
    pub const fn local_error(&self) -> Option<&ErrorCondition> {
        self.local_error.as_ref()
    }

    /// Error reported by the peer.
    #[must_use]
    pub const fn remote_error(&self) -> Option<&ErrorCondition> {
        self.remote_error.as_ref()
    }

    /// Attached application data.
    #[must_use]
    pub fn context(&self) -> Option<&(dyn Any + Send)> {
        self.context.as_deref()
    }

    /// Attached application data, if it has type `T`.
    #[must_use]
    pub fn context_as<T: Any>(&self) -> Option<&T> {
        self.context.as_deref()?.downcast_ref()
    }

    fn open(&mut self) -> bool {
        if self.local_state == EndpointState::Uninitialized {
            self.local_state = EndpointState::Active;
            true
        } else {
            false
        }
    }

    fn close(&mut self) -> bool {
        if self.local_state == EndpointState::Active {
            self.local_state = EndpointState::Closed;
            true
        } else {
            false
        }
    }
}

/// Mutable access to one endpoint together with its connection's modified set.
#[derive(Debug)]
pub struct EndpointMut<'a> {
    key: ArenaKey,
    endpoint: &'a mut Endpoint,
    modified: &'a mut ModifiedSet,
    policy: RemoteTransitionPolicy,
}

impl<'a> EndpointMut<'a> {
    pub(crate) fn new(
        key: ArenaKey,
        endpoint: &'a mut Endpoint,
        modified: &'a mut ModifiedSet,
        policy: RemoteTransitionPolicy,
    ) -> Self {
        Self {
            key,
            endpoint,
            modified,
            policy,
        }
    }

    /// Handle of this endpoint.
    #[must_use]
    pub const fn id(&self) -> EndpointId {
        EndpointId(self.key)
    }

    /// Read-only view.
    #[must_use]
    pub fn get(&self) -> &Endpoint {
        self.endpoint
    }

    /// Move the local state from `Uninitialized` to `Active`.
    ///
    /// Any other local state is left alone. The endpoint is marked modified either way.
    pub fn open(&mut self) {
        if self.endpoint.open() {
            debug!(endpoint = ?self.key, "endpoint opened locally");
        }
        self.mark_modified();
    }

    /// Move the local state from `Active` to `Closed`.
    ///
    /// Any other local state is left alone. The endpoint is marked modified either way.
    pub fn close(&mut self) {
        if self.endpoint.close() {
            debug!(endpoint = ?self.key, "endpoint closed locally");
        }
        self.mark_modified();
    }

    /// Attach an error condition to be sent with the next close or detach.
    pub fn set_local_error(&mut self, error: ErrorCondition) {
        self.endpoint.local_error = Some(error);
        self.mark_modified();
    }

    /// Attach application data, returning what was there before.
    pub fn set_context(&mut self, context: Context) -> Option<Context> {
        self.endpoint.context.replace(context)
    }

    /// Detach application data.
    pub fn take_context(&mut self) -> Option<Context> {
        self.endpoint.context.take()
    }

    /// Enqueue in the connection's modified set.
    pub fn mark_modified(&mut self) {
        self.modified.insert(self.key);
    }

    /// Remove from the connection's modified set.
    pub fn clear_modified(&mut self) {
        self.modified.remove(self.key);
    }

    /// Whether the endpoint is in the modified set.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.modified.contains(self.key)
    }

    /// Record the peer's lifecycle state. Called by the frame layer only.
    ///
    /// Backwards moves fail with [`EngineError::IllegalTransition`] and leave the
    /// endpoint untouched unless the connection tolerates them.
    pub fn set_remote_state(&mut self, state: EndpointState) -> Result<()> {
        let from = self.endpoint.remote_state;
        if !from.can_advance_to(state) {
            match self.policy {
                RemoteTransitionPolicy::Reject => {
                    warn!(
                        endpoint = ?self.key,
                        %from,
                        to = %state,
                        "rejecting remote state regression"
                    );
                    Metrics::record_remote_transition_rejected();
                    return Err(EngineError::IllegalTransition { from, to: state });
                }
                RemoteTransitionPolicy::Tolerate => {
                    warn!(
                        endpoint = ?self.key,
                        %from,
                        to = %state,
                        "applying remote state regression"
                    );
                }
            }
        }
        if from != state {
            debug!(endpoint = ?self.key, %from, to = %state, "remote state changed");
        }
        self.endpoint.remote_state = state;
        self.mark_modified();
        Ok(())
    }

    /// Record the error the peer attached to its close or detach. Called by the frame layer only.
    pub fn set_remote_error(&mut self, error: ErrorCondition) {
        self.endpoint.remote_error = Some(error);
        self.mark_modified();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::arena::Arena;

    fn fixture() -> (ArenaKey, Endpoint, ModifiedSet) {
        let mut arena = Arena::default();
        (arena.insert(()), Endpoint::default(), ModifiedSet::default())
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let (key, mut endpoint, mut modified) = fixture();
        let mut view = EndpointMut::new(
            key,
            &mut endpoint,
            &mut modified,
            RemoteTransitionPolicy::Reject,
        );

        view.close();
        assert_eq!(view.get().local_state(), EndpointState::Uninitialized);
        view.open();
        view.open();
        assert_eq!(view.get().local_state(), EndpointState::Active);
        view.close();
        view.open();
        view.close();
        assert_eq!(view.get().local_state(), EndpointState::Closed);
        assert!(view.is_modified());
    }

    #[test]
    fn remote_regression_is_rejected_by_default() {
        let (key, mut endpoint, mut modified) = fixture();
        let mut view = EndpointMut::new(
            key,
            &mut endpoint,
            &mut modified,
            RemoteTransitionPolicy::Reject,
        );

        view.set_remote_state(EndpointState::Closed).unwrap();
        view.clear_modified();
        let err = view.set_remote_state(EndpointState::Active).unwrap_err();
        assert_eq!(
            err,
            EngineError::IllegalTransition {
                from: EndpointState::Closed,
                to: EndpointState::Active
            }
        );
        assert_eq!(view.get().remote_state(), EndpointState::Closed);
        assert!(!view.is_modified());
    }

    #[test]
    fn remote_regression_can_be_tolerated() {
        let (key, mut endpoint, mut modified) = fixture();
        let mut view = EndpointMut::new(
            key,
            &mut endpoint,
            &mut modified,
            RemoteTransitionPolicy::Tolerate,
        );

        view.set_remote_state(EndpointState::Closed).unwrap();
        view.set_remote_state(EndpointState::Active).unwrap();
        assert_eq!(view.get().remote_state(), EndpointState::Active);
    }

    #[test]
    fn errors_and_context_are_independent_of_state() {
        let (key, mut endpoint, mut modified) = fixture();
        let mut view = EndpointMut::new(
            key,
            &mut endpoint,
            &mut modified,
            RemoteTransitionPolicy::Reject,
        );

        view.set_local_error(ErrorCondition::new("amqp:internal-error"));
        view.set_remote_error(ErrorCondition::new("amqp:not-found"));
        assert!(view.set_context(Box::new(7u32)).is_none());
        assert_eq!(view.get().local_state(), EndpointState::Uninitialized);
        assert_eq!(
            view.get().local_error().map(ErrorCondition::condition),
            Some("amqp:internal-error")
        );
        assert_eq!(
            view.get().remote_error().map(ErrorCondition::condition),
            Some("amqp:not-found")
        );
        assert_eq!(view.get().context_as::<u32>(), Some(&7));
        assert!(view.take_context().is_some());
        assert!(view.get().context().is_none());
    }
}
