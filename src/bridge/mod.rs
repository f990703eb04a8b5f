//! Bridge to a foreign engine
//!
//! Exposes links owned by an externally supplied engine through the same
//! typed surface as the native [`engine`](crate::engine). Each foreign link
//! gets at most one wrapper; the wrapper's key lives in the link's context
//! slot so repeated lookups return the same wrapper. Releasing a wrapper
//! clears that slot before the foreign link is freed.

mod foreign;
mod link;
#[cfg(test)]
mod mock;

pub use foreign::ForeignEngine;
pub use link::{BridgedLink, ForeignLink, LinkWrapper};

use tracing::{debug, trace};

use crate::engine::arena::Arena;
use crate::engine::{ArenaKey, StateMask};
use crate::protocol::Role;

/// Registry of wrappers over one foreign engine's links.
#[derive(Debug)]
pub struct Bridge<E: ForeignEngine> {
    engine: E,
    links: Arena<ForeignLink<E::Link>>,
}

impl<E: ForeignEngine> Bridge<E> {
    /// Take ownership of a foreign engine.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            links: Arena::default(),
        }
    }

    /// Underlying engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Underlying engine, mutably.
    ///
    /// Freeing a wrapped link directly through the engine bypasses the
    /// bridge; use [`free`](Self::free) instead.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Wrapper for `handle`, created on first use.
    ///
    /// Returns `None` for an absent handle or one that is neither a sender
    /// nor a receiver.
    pub fn wrap(&mut self, handle: Option<E::Link>) -> Option<ArenaKey> {
        let handle = handle?;
        if let Some(key) = self.engine.link_context(handle) {
            if self.links.get(key).is_some_and(|link| link.handle() == handle) {
                return Some(key);
            }
            trace!(?handle, ?key, "stale link context");
        }

        let role = if self.engine.link_is_receiver(handle) {
            Role::Receiver
        } else if self.engine.link_is_sender(handle) {
            Role::Sender
        } else {
            debug!(?handle, "foreign link has no direction");
            return None;
        };

        let key = self.links.insert(ForeignLink::new(role, handle));
        self.engine.set_link_context(handle, Some(key));
        debug!(?handle, ?key, %role, "foreign link wrapped");
        Some(key)
    }

    /// Wrapper registered under `key`.
    #[must_use]
    pub fn wrapper(&self, key: ArenaKey) -> Option<&ForeignLink<E::Link>> {
        self.links.get(key)
    }

    /// View of the link registered under `key`.
    pub fn link(&mut self, key: ArenaKey) -> Option<BridgedLink<'_, E>> {
        let link = self.links.get_mut(key)?;
        Some(BridgedLink::new(key, &mut self.engine, link))
    }

    /// Next link after `key` whose states match the masks, wrapping it if needed.
    pub fn next(&mut self, key: ArenaKey, local: StateMask, remote: StateMask) -> Option<ArenaKey> {
        let handle = self.links.get(key)?.handle();
        let next = self.engine.link_next(handle, local, remote);
        self.wrap(next)
    }

    /// Release the wrapper and free the foreign link. Freeing twice is a no-op.
    pub fn free(&mut self, key: ArenaKey) {
        let Some(link) = self.links.remove(key) else {
            trace!(?key, "foreign link already released");
            return;
        };
        let handle = link.handle();
        self.engine.set_link_context(handle, None);
        self.engine.link_free(handle);
        debug!(?handle, ?key, "foreign link freed");
    }

    /// Number of live wrappers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no wrappers are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.len() == 0
    }
}

impl<E: ForeignEngine> Drop for Bridge<E> {
    fn drop(&mut self) {
        let keys: Vec<_> = self.links.keys().collect();
        if !keys.is_empty() {
            debug!(count = keys.len(), "releasing foreign links on drop");
        }
        for key in keys {
            self.free(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockEngine, MockLinkHandle};
    use super::*;
    use crate::engine::{EndpointState, EngineError};
    use crate::protocol::{
        Coordinator, Source, Target, TargetTerminus, TerminusDurability, TerminusExpiryPolicy,
        TerminusType,
    };

    fn bridge_with(links: &[(&str, bool)]) -> (Bridge<MockEngine>, Vec<MockLinkHandle>) {
        let mut engine = MockEngine::default();
        let handles = links
            .iter()
            .map(|(name, sender)| engine.add_link(name, *sender))
            .collect();
        (Bridge::new(engine), handles)
    }

    #[test]
    fn wrap_picks_variant_from_direction() {
        let (mut bridge, h) = bridge_with(&[("out", true), ("in", false)]);
        let out = bridge.wrap(Some(h[0])).unwrap();
        let inbound = bridge.wrap(Some(h[1])).unwrap();
        assert!(matches!(bridge.wrapper(out), Some(ForeignLink::Sender(_))));
        assert!(matches!(bridge.wrapper(inbound), Some(ForeignLink::Receiver(_))));
        assert_eq!(bridge.len(), 2);
    }

    #[test]
    fn wrap_absent_handle_is_none() {
        let (mut bridge, _) = bridge_with(&[]);
        assert_eq!(bridge.wrap(None), None);
        assert!(bridge.is_empty());
    }

    #[test]
    fn wrap_returns_same_wrapper() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let first = bridge.wrap(Some(h[0])).unwrap();
        let second = bridge.wrap(Some(h[0])).unwrap();
        assert_eq!(first, second);
        assert_eq!(bridge.len(), 1);
        assert_eq!(bridge.engine().link_ref(h[0]).context, Some(first));
    }

    #[test]
    fn free_clears_context_and_is_idempotent() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let key = bridge.wrap(Some(h[0])).unwrap();
        bridge.free(key);
        assert!(bridge.engine().link_ref(h[0]).context.is_none());
        assert!(bridge.engine().link_ref(h[0]).freed);
        bridge.free(key);
        assert_eq!(bridge.engine().free_calls, 1);
        assert!(bridge.link(key).is_none());
    }

    #[test]
    fn wrap_ignores_context_pointing_at_another_wrapper() {
        let (mut bridge, h) = bridge_with(&[("out", true), ("in", false)]);
        let out = bridge.wrap(Some(h[0])).unwrap();
        bridge.engine_mut().link_ref_mut(h[1]).context = Some(out);

        let inbound = bridge.wrap(Some(h[1])).unwrap();
        assert_ne!(inbound, out);
        assert_eq!(bridge.wrapper(inbound).map(ForeignLink::handle), Some(h[1]));
        assert_eq!(bridge.wrapper(out).map(ForeignLink::handle), Some(h[0]));
        assert_eq!(bridge.engine().link_ref(h[1]).context, Some(inbound));
        assert_eq!(bridge.len(), 2);
    }

    #[test]
    fn drop_frees_live_links() {
        let (mut bridge, h) = bridge_with(&[("a", true), ("b", false), ("c", true)]);
        let released = bridge.engine().released.clone();
        let a = bridge.wrap(Some(h[0])).unwrap();
        bridge.wrap(Some(h[1])).unwrap();
        bridge.wrap(Some(h[2])).unwrap();
        bridge.free(a);
        assert_eq!(*released.borrow(), vec![h[0]]);

        drop(bridge);
        let mut freed = released.borrow().clone();
        freed.sort_by_key(|handle| handle.0);
        assert_eq!(freed, vec![h[0], h[1], h[2]]);
    }

    #[test]
    fn drop_skips_unwrapped_links() {
        let (mut bridge, h) = bridge_with(&[("a", true), ("b", false)]);
        let released = bridge.engine().released.clone();
        bridge.wrap(Some(h[1])).unwrap();
        drop(bridge);
        assert_eq!(*released.borrow(), vec![h[1]]);
    }

    #[test]
    fn flow_and_offered_respect_direction() {
        let (mut bridge, h) = bridge_with(&[("out", true), ("in", false)]);
        let out = bridge.wrap(Some(h[0])).unwrap();
        let inbound = bridge.wrap(Some(h[1])).unwrap();

        let mut receiver = bridge.link(inbound).unwrap();
        receiver.flow(10).unwrap();
        assert_eq!(receiver.credit(), 10);
        assert_eq!(
            receiver.offered(1),
            Err(EngineError::WrongRole {
                expected: Role::Sender
            })
        );

        let mut sender = bridge.link(out).unwrap();
        sender.offered(4).unwrap();
        assert_eq!(
            sender.flow(1),
            Err(EngineError::WrongRole {
                expected: Role::Receiver
            })
        );
        assert_eq!(bridge.engine().link_ref(h[0]).offered, 4);
    }

    #[test]
    fn lifecycle_passes_through() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let key = bridge.wrap(Some(h[0])).unwrap();
        let mut link = bridge.link(key).unwrap();
        assert_eq!(link.name(), "out");
        assert_eq!(link.local_state(), EndpointState::Uninitialized);
        link.open();
        assert_eq!(link.local_state(), EndpointState::Active);
        link.close();
        assert_eq!(link.local_state(), EndpointState::Closed);
        assert_eq!(link.remote_state(), EndpointState::Uninitialized);
    }

    #[test]
    fn next_wraps_lazily() {
        let (mut bridge, h) = bridge_with(&[("a", true), ("b", false), ("c", true)]);
        bridge.engine_mut().link_ref_mut(h[2]).local = EndpointState::Active;
        let a = bridge.wrap(Some(h[0])).unwrap();
        assert_eq!(bridge.len(), 1);

        let next = bridge.next(a, StateMask::ACTIVE, StateMask::ANY).unwrap();
        assert_eq!(bridge.wrapper(next).unwrap().handle(), h[2]);
        assert_eq!(bridge.len(), 2);
        assert_eq!(bridge.next(next, StateMask::ANY, StateMask::ANY), None);
    }

    #[test]
    fn source_round_trips_through_engine() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let key = bridge.wrap(Some(h[0])).unwrap();
        let source = Source::new("queue://a")
            .with_durable(TerminusDurability::UnsettledState)
            .with_expiry_policy(TerminusExpiryPolicy::SessionEnd)
            .with_timeout(30)
            .with_capability("shared");

        let mut link = bridge.link(key).unwrap();
        link.set_source(&source).unwrap();
        assert_eq!(link.source(), Some(source));

        let terminus = bridge.engine().link_ref(h[0]).source;
        let raw = bridge.engine().terminus_ref(terminus);
        assert_eq!(raw.kind, TerminusType::Source);
        assert_eq!(raw.durability, Some(2));
        assert_eq!(raw.expiry.as_deref(), Some("session-end"));
    }

    #[test]
    fn unset_fields_leave_engine_values() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let terminus = bridge.engine().link_ref(h[0]).source;
        bridge.engine_mut().terminus_ref_mut(terminus).durability = Some(1);
        let key = bridge.wrap(Some(h[0])).unwrap();

        bridge
            .link(key)
            .unwrap()
            .set_source(&Source::new("q"))
            .unwrap();
        assert_eq!(bridge.engine().terminus_ref(terminus).durability, Some(1));
    }

    #[test]
    fn coordinator_target_keeps_only_capabilities() {
        let (mut bridge, h) = bridge_with(&[("txn", true)]);
        let key = bridge.wrap(Some(h[0])).unwrap();
        let terminus = bridge.engine().link_ref(h[0]).target;
        bridge.engine_mut().terminus_ref_mut(terminus).address = Some("old".into());

        let coordinator = Coordinator {
            capabilities: vec!["amqp:local-transactions".into()],
        };
        let mut link = bridge.link(key).unwrap();
        link.set_target(coordinator.clone()).unwrap();
        assert_eq!(link.target(), Some(TargetTerminus::Coordinator(coordinator)));

        let raw = bridge.engine().terminus_ref(terminus);
        assert_eq!(raw.kind, TerminusType::Coordinator);
        assert_eq!(raw.address.as_deref(), Some("old"));
    }

    #[test]
    fn unspecified_remote_target_reads_as_target() {
        let (mut bridge, h) = bridge_with(&[("in", false)]);
        let terminus = bridge.engine().link_ref(h[0]).remote_target;
        {
            let raw = bridge.engine_mut().terminus_ref_mut(terminus);
            raw.address = Some("topic".into());
            raw.durability = Some(0);
        }
        let key = bridge.wrap(Some(h[0])).unwrap();
        let link = bridge.link(key).unwrap();
        let target = link.remote_target().unwrap();
        assert_eq!(
            target,
            TargetTerminus::Target(
                Target::new("topic").with_durable(TerminusDurability::None)
            )
        );
    }

    #[test]
    fn source_typed_terminus_is_not_a_target() {
        let (mut bridge, h) = bridge_with(&[("in", false)]);
        let terminus = bridge.engine().link_ref(h[0]).remote_target;
        bridge.engine_mut().terminus_ref_mut(terminus).kind = TerminusType::Source;
        let key = bridge.wrap(Some(h[0])).unwrap();
        assert_eq!(bridge.link(key).unwrap().remote_target(), None);
    }

    #[test]
    fn delivery_tags_and_cursor() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let key = bridge.wrap(Some(h[0])).unwrap();
        let mut link = bridge.link(key).unwrap();

        let mut buf = *b"xxtag1yy";
        let d1 = link.delivery_from(&buf, 2, 4).unwrap();
        buf[2] = b'!';
        assert_eq!(
            link.delivery(b"tag1"),
            Err(EngineError::DuplicateTag {
                tag: b"tag1".to_vec()
            })
        );
        assert!(matches!(
            link.delivery_from(&buf, 6, 4),
            Err(EngineError::TagOutOfBounds { available: 8, .. })
        ));

        assert_eq!(link.current(), Some(d1));
        assert!(link.advance());
        assert_eq!(link.current(), None);
        assert!(!link.advance());
        assert_eq!(&bridge.engine().tags[d1.0][..], b"tag1");
    }

    #[test]
    fn context_lives_on_wrapper() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        let key = bridge.wrap(Some(h[0])).unwrap();
        let mut link = bridge.link(key).unwrap();
        assert!(link.set_context(Box::new(7_u32)).is_none());
        let previous = link.set_context(Box::new(8_u32)).unwrap();
        assert_eq!(previous.downcast_ref::<u32>(), Some(&7));
        let stored = bridge.wrapper(key).unwrap().context().unwrap();
        assert_eq!(stored.downcast_ref::<u32>(), Some(&8));
    }

    #[test]
    fn remote_error_passes_through() {
        let (mut bridge, h) = bridge_with(&[("out", true)]);
        bridge.engine_mut().link_ref_mut(h[0]).remote_error = Some(
            crate::protocol::ErrorCondition::new(crate::protocol::condition::NOT_FOUND),
        );
        let key = bridge.wrap(Some(h[0])).unwrap();
        let link = bridge.link(key).unwrap();
        assert!(link.local_error().is_none());
        assert_eq!(
            link.remote_error().unwrap().condition(),
            crate::protocol::condition::NOT_FOUND
        );
    }
}
