//! Connections own every session and link beneath them and the modified set
//! the transport drains to decide which frames to emit.

use tracing::{debug, instrument};

use super::arena::{Arena, ArenaKey};
use super::config::ConnectionConfig;
use super::endpoint::{Endpoint, EndpointId, EndpointMut, LinkId, SessionId};
use super::error::{EngineError, Result};
use super::link::{Link, LinkMut};
use super::modified::ModifiedSet;
use super::state::StateMask;
use crate::protocol::Role;
use crate::protocol::metrics::{EndpointKind, Metrics};

/// What an endpoint handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointType {
    /// The connection itself
    Connection,
    /// A session
    Session,
    /// A link with the given local role
    Link(Role),
}

#[derive(Debug)]
enum Node {
    Connection,
    Session(Vec<LinkId>),
    Link(Link),
}

impl Node {
    const fn kind(&self) -> EndpointType {
        match self {
            Self::Connection => EndpointType::Connection,
            Self::Session(_) => EndpointType::Session,
            Self::Link(link) => EndpointType::Link(link.role()),
        }
    }

    const fn metrics_kind(&self) -> EndpointKind {
        match self {
            Self::Connection => EndpointKind::Connection,
            Self::Session(_) => EndpointKind::Session,
            Self::Link(link) => EndpointKind::Link(link.role()),
        }
    }
}

#[derive(Debug)]
struct Slot {
    endpoint: Endpoint,
    node: Node,
}

impl Slot {
    fn new(node: Node) -> Self {
        Metrics::record_endpoint_created(node.metrics_kind());
        Self {
            endpoint: Endpoint::default(),
            node,
        }
    }

    fn matches(&self, local: StateMask, remote: StateMask) -> bool {
        local.contains(self.endpoint.local_state()) && remote.contains(self.endpoint.remote_state())
    }
}

/// An AMQP connection and the endpoint graph beneath it.
///
/// The connection is driven by a single thread; nothing here locks or blocks.
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    root: ArenaKey,
    endpoints: Arena<Slot>,
    modified: ModifiedSet,
    sessions: Vec<SessionId>,
    links: Vec<LinkId>,
    remote_container_id: Option<String>,
    remote_hostname: Option<String>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

impl Connection {
    /// Create a connection with no sessions.
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let mut endpoints = Arena::with_capacity(config.endpoint_capacity);
        let root = endpoints.insert(Slot::new(Node::Connection));
        debug!(container = %config.container_id, "connection created");
        Self {
            modified: ModifiedSet::with_capacity(config.endpoint_capacity),
            config,
            root,
            endpoints,
            sessions: Vec::new(),
            links: Vec::new(),
            remote_container_id: None,
            remote_hostname: None,
        }
    }

    /// Handle of the connection's own endpoint.
    #[must_use]
    pub const fn id(&self) -> EndpointId {
        EndpointId(self.root)
    }

    /// Configuration the connection was built with.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Local container identifier.
    #[must_use]
    pub fn container_id(&self) -> &str {
        &self.config.container_id
    }

    /// Requested virtual host.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.config.hostname.as_deref()
    }

    /// Container identifier announced by the peer.
    #[must_use]
    pub fn remote_container_id(&self) -> Option<&str> {
        self.remote_container_id.as_deref()
    }

    /// Hostname announced by the peer.
    #[must_use]
    pub fn remote_hostname(&self) -> Option<&str> {
        self.remote_hostname.as_deref()
    }

    /// Record the identity from the peer's open frame. Called by the frame layer only.
    pub fn set_remote_identity(&mut self, container_id: Option<String>, hostname: Option<String>) {
        self.remote_container_id = container_id;
        self.remote_hostname = hostname;
        self.modified.insert(self.root);
    }

    /// Create a session.
    pub fn session(&mut self) -> SessionId {
        let id = SessionId(self.endpoints.insert(Slot::new(Node::Session(Vec::new()))));
        self.sessions.push(id);
        debug!(session = ?id.key(), "session created");
        id
    }

    /// Create a sending link on `session`.
    pub fn sender(&mut self, session: SessionId, name: impl Into<String>) -> Result<LinkId> {
        self.create_link(session, name.into(), Role::Sender)
    }

    /// Create a receiving link on `session`.
    pub fn receiver(&mut self, session: SessionId, name: impl Into<String>) -> Result<LinkId> {
        self.create_link(session, name.into(), Role::Receiver)
    }

    #[instrument(level = "debug", skip(self))]
    fn create_link(&mut self, session: SessionId, name: String, role: Role) -> Result<LinkId> {
        match self.endpoints.get(session.0) {
            Some(Slot {
                node: Node::Session(_),
                ..
            }) => {}
            Some(_) => return Err(EngineError::WrongKind { expected: "session" }),
            None => return Err(EngineError::UnknownEndpoint),
        }
        let link = Link::new(name, role, session);
        let id = LinkId(self.endpoints.insert(Slot::new(Node::Link(link))));
        if let Some(Slot {
            node: Node::Session(links),
            ..
        }) = self.endpoints.get_mut(session.0)
        {
            links.push(id);
        }
        self.links.push(id);
        Ok(id)
    }

    /// What `id` refers to, `None` once freed.
    #[must_use]
    pub fn endpoint_type(&self, id: impl Into<EndpointId>) -> Option<EndpointType> {
        self.endpoints.get(id.into().0).map(|slot| slot.node.kind())
    }

    /// Lifecycle view of any endpoint.
    #[must_use]
    pub fn endpoint(&self, id: impl Into<EndpointId>) -> Option<&Endpoint> {
        self.endpoints.get(id.into().0).map(|slot| &slot.endpoint)
    }

    /// Mutable lifecycle view of any endpoint.
    pub fn endpoint_mut(&mut self, id: impl Into<EndpointId>) -> Option<EndpointMut<'_>> {
        let key = id.into().0;
        let policy = self.config.remote_transitions;
        let slot = self.endpoints.get_mut(key)?;
        Some(EndpointMut::new(
            key,
            &mut slot.endpoint,
            &mut self.modified,
            policy,
        ))
    }

    /// Link view.
    #[must_use]
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        match &self.endpoints.get(id.0)?.node {
            Node::Link(link) => Some(link),
            _ => None,
        }
    }

    /// Mutable link view.
    pub fn link_mut(&mut self, id: LinkId) -> Option<LinkMut<'_>> {
        let policy = self.config.remote_transitions;
        let Slot { endpoint, node } = self.endpoints.get_mut(id.0)?;
        let Node::Link(link) = node else {
            return None;
        };
        Some(LinkMut::new(
            EndpointMut::new(id.0, endpoint, &mut self.modified, policy),
            link,
        ))
    }

    /// Links of a session in creation order.
    #[must_use]
    pub fn session_links(&self, session: SessionId) -> Option<&[LinkId]> {
        match &self.endpoints.get(session.0)?.node {
            Node::Session(links) => Some(links),
            _ => None,
        }
    }

    /// Open an endpoint locally.
    pub fn open(&mut self, id: impl Into<EndpointId>) -> Result<()> {
        self.endpoint_mut(id)
            .ok_or(EngineError::UnknownEndpoint)?
            .open();
        Ok(())
    }

    /// Close an endpoint locally.
    pub fn close(&mut self, id: impl Into<EndpointId>) -> Result<()> {
        self.endpoint_mut(id)
            .ok_or(EngineError::UnknownEndpoint)?
            .close();
        Ok(())
    }

    /// Release an endpoint.
    ///
    /// The endpoint leaves the modified set and its parent; a session takes its
    /// links with it. Freeing a freed handle does nothing. The connection's own
    /// endpoint is only unlinked from the modified set, since it lives as long
    /// as the `Connection`.
    pub fn free(&mut self, id: impl Into<EndpointId>) {
        let key = id.into().0;
        if key == self.root {
            self.modified.remove(key);
            return;
        }
        let Some(slot) = self.endpoints.get(key) else {
            return;
        };
        match &slot.node {
            Node::Session(links) => {
                for link in links.clone() {
                    self.release(link.0);
                }
                self.sessions.retain(|s| s.0 != key);
            }
            Node::Link(link) => {
                let session = link.session();
                if let Some(Slot {
                    node: Node::Session(links),
                    ..
                }) = self.endpoints.get_mut(session.0)
                {
                    links.retain(|l| l.0 != key);
                }
            }
            Node::Connection => {}
        }
        self.release(key);
    }

    fn release(&mut self, key: ArenaKey) {
        self.modified.remove(key);
        if let Some(slot) = self.endpoints.remove(key) {
            if let Node::Link(_) = slot.node {
                self.links.retain(|l| l.0 != key);
            }
            Metrics::record_endpoint_freed(slot.node.metrics_kind());
            debug!(endpoint = ?key, "endpoint freed");
        }
    }

    /// Whether `id` is in the modified set.
    #[must_use]
    pub fn is_modified(&self, id: impl Into<EndpointId>) -> bool {
        self.modified.contains(id.into().0)
    }

    /// Number of endpoints in the modified set.
    #[must_use]
    pub fn modified_len(&self) -> usize {
        self.modified.len()
    }

    /// Endpoints in the modified set, oldest first. Does not clear anything.
    pub fn modified(&self) -> impl Iterator<Item = EndpointId> + '_ {
        self.modified.iter().map(EndpointId)
    }

    /// Remove and return the oldest modified endpoint.
    ///
    /// Only the modified flag is cleared; endpoint state is untouched.
    pub fn pop_modified(&mut self) -> Option<EndpointId> {
        let key = self.modified.pop_front()?;
        Metrics::record_modified_drained();
        Some(EndpointId(key))
    }

    /// Drain the modified set, oldest first.
    pub fn drain_modified(&mut self) -> DrainModified<'_> {
        DrainModified { connection: self }
    }

    /// First session whose states match the masks.
    #[must_use]
    pub fn first_session(&self, local: StateMask, remote: StateMask) -> Option<SessionId> {
        self.find(&self.sessions, 0, local, remote)
    }

    /// Next session after `after` whose states match the masks.
    #[must_use]
    pub fn next_session(
        &self,
        after: SessionId,
        local: StateMask,
        remote: StateMask,
    ) -> Option<SessionId> {
        let start = self.sessions.iter().position(|s| *s == after)? + 1;
        self.find(&self.sessions, start, local, remote)
    }

    /// First link on the connection whose states match the masks.
    #[must_use]
    pub fn first_link(&self, local: StateMask, remote: StateMask) -> Option<LinkId> {
        self.find(&self.links, 0, local, remote)
    }

    /// Next link on the connection after `after` whose states match the masks.
    #[must_use]
    pub fn next_link(&self, after: LinkId, local: StateMask, remote: StateMask) -> Option<LinkId> {
        let start = self.links.iter().position(|l| *l == after)? + 1;
        self.find(&self.links, start, local, remote)
    }

    /// Next link within `after`'s own session whose states match the masks.
    #[must_use]
    pub fn next_link_in_session(
        &self,
        after: LinkId,
        local: StateMask,
        remote: StateMask,
    ) -> Option<LinkId> {
        let links = self.session_links(self.link(after)?.session())?;
        let start = links.iter().position(|l| *l == after)? + 1;
        self.find(links, start, local, remote)
    }

    fn find<T>(&self, ids: &[T], start: usize, local: StateMask, remote: StateMask) -> Option<T>
    where
        T: Copy + Into<EndpointId>,
    {
        ids.get(start..)?.iter().copied().find(|id| {
            self.endpoints
                .get((*id).into().0)
                .is_some_and(|slot| slot.matches(local, remote))
        })
    }

    /// Live endpoints, the connection itself included.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for key in self.endpoints.keys().collect::<Vec<_>>() {
            if let Some(slot) = self.endpoints.remove(key) {
                Metrics::record_endpoint_freed(slot.node.metrics_kind());
            }
        }
    }
}

/// Draining iterator over a connection's modified set.
#[derive(Debug)]
pub struct DrainModified<'a> {
    connection: &'a mut Connection,
}

impl Iterator for DrainModified<'_> {
    type Item = EndpointId;

    fn next(&mut self) -> Option<Self::Item> {
        self.connection.pop_modified()
    }
}
