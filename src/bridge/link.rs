//! Wrappers around foreign link handles.

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use tracing::{debug, instrument};

use super::foreign::ForeignEngine;
use crate::engine::{ArenaKey, Context, EndpointState, EngineError, Result};
use crate::protocol::{
    Coordinator, ErrorCondition, Role, Source, Target, TargetTerminus, TerminusDurability,
    TerminusExpiryPolicy, TerminusType,
};

/// Wrapper state shared by both link variants.
pub struct LinkWrapper<H> {
    handle: H,
    context: Option<Context>,
}

impl<H: fmt::Debug> fmt::Debug for LinkWrapper<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkWrapper")
            .field("handle", &self.handle)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

/// A wrapped foreign link: exactly one of the two directions.
#[derive(Debug)]
pub enum ForeignLink<H> {
    /// Sending link
    Sender(LinkWrapper<H>),
    /// Receiving link
    Receiver(LinkWrapper<H>),
}

impl<H: Copy> ForeignLink<H> {
    pub(crate) fn new(role: Role, handle: H) -> Self {
        let wrapper = LinkWrapper {
            handle,
            context: None,
        };
        match role {
            Role::Sender => Self::Sender(wrapper),
            Role::Receiver => Self::Receiver(wrapper),
        }
    }

    const fn wrapper(&self) -> &LinkWrapper<H> {
        match self {
            Self::Sender(w) | Self::Receiver(w) => w,
        }
    }

    fn wrapper_mut(&mut self) -> &mut LinkWrapper<H> {
        match self {
            Self::Sender(w) | Self::Receiver(w) => w,
        }
    }

    /// Foreign handle.
    #[must_use]
    pub const fn handle(&self) -> H {
        self.wrapper().handle
    }

    /// Direction fixed when the wrapper was built.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Sender(_) => Role::Sender,
            Self::Receiver(_) => Role::Receiver,
        }
    }

    /// Attached application data.
    #[must_use]
    pub fn context(&self) -> Option<&(dyn Any + Send)> {
        self.wrapper().context.as_deref()
    }
}

/// Mutable view of one wrapped link and the engine behind it.
pub struct BridgedLink<'a, E: ForeignEngine> {
    key: ArenaKey,
    engine: &'a mut E,
    link: &'a mut ForeignLink<E::Link>,
}

impl<E: ForeignEngine> fmt::Debug for BridgedLink<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgedLink")
            .field("key", &self.key)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl<'a, E: ForeignEngine> BridgedLink<'a, E> {
    pub(crate) fn new(
        key: ArenaKey,
        engine: &'a mut E,
        link: &'a mut ForeignLink<E::Link>,
    ) -> Self {
        Self { key, engine, link }
    }

    fn handle(&self) -> E::Link {
        self.link.handle()
    }

    /// Key of this wrapper in the bridge.
    #[must_use]
    pub const fn key(&self) -> ArenaKey {
        self.key
    }

    /// Wrapped link.
    #[must_use]
    pub fn wrapper(&self) -> &ForeignLink<E::Link> {
        &*self.link
    }

    /// Direction.
    #[must_use]
    pub fn role(&self) -> Role {
        self.link.role()
    }

    /// Link name.
    #[must_use]
    pub fn name(&self) -> String {
        self.engine.link_name(self.handle())
    }

    /// Local lifecycle state.
    #[must_use]
    pub fn local_state(&self) -> EndpointState {
        self.engine.link_state(self.handle()).0
    }

    /// Remote lifecycle state.
    #[must_use]
    pub fn remote_state(&self) -> EndpointState {
        self.engine.link_state(self.handle()).1
    }

    /// Local error condition.
    #[must_use]
    pub fn local_error(&self) -> Option<ErrorCondition> {
        self.engine.link_error(self.handle())
    }

    /// Remote error condition.
    #[must_use]
    pub fn remote_error(&self) -> Option<ErrorCondition> {
        self.engine.link_remote_error(self.handle())
    }

    /// Attach the link.
    pub fn open(&mut self) {
        self.engine.link_open(self.handle());
    }

    /// Detach the link.
    pub fn close(&mut self) {
        self.engine.link_close(self.handle());
    }

    /// Local source.
    #[must_use]
    pub fn source(&self) -> Option<Source> {
        let terminus = self.engine.link_source(self.handle())?;
        Some(read_source(&*self.engine, terminus))
    }

    /// Local target or coordinator.
    #[must_use]
    pub fn target(&self) -> Option<TargetTerminus> {
        let terminus = self.engine.link_target(self.handle())?;
        read_target(&*self.engine, terminus)
    }

    /// Source declared by the peer.
    #[must_use]
    pub fn remote_source(&self) -> Option<Source> {
        let terminus = self.engine.link_remote_source(self.handle())?;
        Some(read_source(&*self.engine, terminus))
    }

    /// Target or coordinator declared by the peer.
    #[must_use]
    pub fn remote_target(&self) -> Option<TargetTerminus> {
        let terminus = self.engine.link_remote_target(self.handle())?;
        read_target(&*self.engine, terminus)
    }

    /// Write the local source.
    #[instrument(level = "debug", skip(self, source), fields(key = ?self.key))]
    pub fn set_source(&mut self, source: &Source) -> Result<()> {
        let terminus = self
            .engine
            .link_source(self.handle())
            .ok_or(EngineError::Released)?;
        write_fields(
            &mut *self.engine,
            terminus,
            source.address.as_deref(),
            source.dynamic,
            source.durable,
            source.expiry_policy,
            source.timeout,
        );
        self.engine
            .set_terminus_capabilities(terminus, &source.capabilities);
        self.engine.set_terminus_type(terminus, TerminusType::Source);
        Ok(())
    }

    /// Write the local target or coordinator.
    #[instrument(level = "debug", skip(self, target), fields(key = ?self.key))]
    pub fn set_target(&mut self, target: impl Into<TargetTerminus>) -> Result<()> {
        let terminus = self
            .engine
            .link_target(self.handle())
            .ok_or(EngineError::Released)?;
        match target.into() {
            TargetTerminus::Target(t) => {
                write_fields(
                    &mut *self.engine,
                    terminus,
                    t.address.as_deref(),
                    t.dynamic,
                    t.durable,
                    t.expiry_policy,
                    t.timeout,
                );
                self.engine.set_terminus_capabilities(terminus, &t.capabilities);
                self.engine.set_terminus_type(terminus, TerminusType::Target);
            }
            TargetTerminus::Coordinator(c) => {
                self.engine.set_terminus_capabilities(terminus, &c.capabilities);
                self.engine
                    .set_terminus_type(terminus, TerminusType::Coordinator);
            }
        }
        Ok(())
    }

    /// Current credit.
    #[must_use]
    pub fn credit(&self) -> u32 {
        self.engine.link_credit(self.handle())
    }

    /// Queued deliveries.
    #[must_use]
    pub fn queued(&self) -> u32 {
        self.engine.link_queued(self.handle())
    }

    /// Unsettled deliveries.
    #[must_use]
    pub fn unsettled(&self) -> u32 {
        self.engine.link_unsettled(self.handle())
    }

    /// Grant credit. Receivers only.
    pub fn flow(&mut self, credit: u32) -> Result<()> {
        match self.link {
            ForeignLink::Receiver(w) => {
                self.engine.link_flow(w.handle, credit);
                Ok(())
            }
            ForeignLink::Sender(_) => Err(EngineError::WrongRole {
                expected: Role::Receiver,
            }),
        }
    }

    /// Announce available messages. Senders only.
    pub fn offered(&mut self, available: u32) -> Result<()> {
        match self.link {
            ForeignLink::Sender(w) => {
                self.engine.link_offered(w.handle, available);
                Ok(())
            }
            ForeignLink::Receiver(_) => Err(EngineError::WrongRole {
                expected: Role::Sender,
            }),
        }
    }

    /// Create a delivery identified by `tag`.
    pub fn delivery(&mut self, tag: &[u8]) -> Result<E::Delivery> {
        let tag = Bytes::copy_from_slice(tag);
        self.engine
            .delivery(self.handle(), tag.clone())
            .ok_or_else(|| EngineError::DuplicateTag { tag: tag.to_vec() })
    }

    /// Create a delivery whose tag is a copy of `buf[offset..offset + len]`.
    pub fn delivery_from(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<E::Delivery> {
        let tag = offset
            .checked_add(len)
            .and_then(|end| buf.get(offset..end))
            .ok_or(EngineError::TagOutOfBounds {
                offset,
                len,
                available: buf.len(),
            })?;
        self.delivery(tag)
    }

    /// Delivery under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<E::Delivery> {
        self.engine.link_current(self.handle())
    }

    /// Move past the current delivery; `false` if there was none.
    pub fn advance(&mut self) -> bool {
        self.engine.link_advance(self.handle())
    }

    /// Attach application data, returning what was there before.
    pub fn set_context(&mut self, context: Context) -> Option<Context> {
        self.link.wrapper_mut().context.replace(context)
    }

    /// Attached application data.
    #[must_use]
    pub fn context(&self) -> Option<&(dyn Any + Send)> {
        self.link.context()
    }
}

fn write_fields<E: ForeignEngine>(
    engine: &mut E,
    terminus: E::Terminus,
    address: Option<&str>,
    dynamic: bool,
    durable: Option<TerminusDurability>,
    expiry: Option<TerminusExpiryPolicy>,
    timeout: Option<u32>,
) {
    engine.set_terminus_address(terminus, address);
    engine.set_terminus_dynamic(terminus, dynamic);
    if let Some(durable) = durable {
        engine.set_terminus_durability(terminus, durable.as_wire());
    }
    if let Some(expiry) = expiry {
        engine.set_terminus_expiry_policy(terminus, expiry.as_symbol());
    }
    if let Some(timeout) = timeout {
        engine.set_terminus_timeout(terminus, timeout);
    }
    debug!(?terminus, ?durable, ?expiry, "terminus written");
}

fn read_source<E: ForeignEngine>(engine: &E, terminus: E::Terminus) -> Source {
    Source {
        address: engine.terminus_address(terminus),
        durable: engine
            .terminus_durability(terminus)
            .and_then(TerminusDurability::from_wire),
        expiry_policy: engine
            .terminus_expiry_policy(terminus)
            .and_then(TerminusExpiryPolicy::from_symbol),
        dynamic: engine.terminus_is_dynamic(terminus),
        timeout: engine.terminus_timeout(terminus),
        capabilities: engine.terminus_capabilities(terminus),
    }
}

fn read_target<E: ForeignEngine>(engine: &E, terminus: E::Terminus) -> Option<TargetTerminus> {
    match engine.terminus_type(terminus) {
        TerminusType::Target | TerminusType::Unspecified => {
            let Source {
                address,
                durable,
                expiry_policy,
                dynamic,
                timeout,
                capabilities,
            } = read_source(engine, terminus);
            Some(TargetTerminus::Target(Target {
                address,
                durable,
                expiry_policy,
                dynamic,
                timeout,
                capabilities,
            }))
        }
        TerminusType::Coordinator => Some(TargetTerminus::Coordinator(Coordinator {
            capabilities: engine.terminus_capabilities(terminus),
        })),
        TerminusType::Source => None,
    }
}
