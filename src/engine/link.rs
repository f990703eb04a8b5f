//! Links: termini, flow counters, settlement modes and deliveries.

use bytes::Bytes;
use tracing::{debug, instrument, trace};

use super::delivery::{Delivery, DeliveryId, DeliveryQueue};
use super::endpoint::{EndpointMut, LinkId, SessionId};
use super::error::{EngineError, Result};
use crate::protocol::{
    DeliveryState, ReceiverSettleMode, Role, SenderSettleMode, Source, TargetTerminus,
    TerminusRecord,
};

/// Link-specific state. Lifecycle state lives in the link's
/// [`Endpoint`](super::Endpoint).
#[derive(Debug)]
pub struct Link {
    name: String,
    role: Role,
    session: SessionId,
    source: Option<TerminusRecord>,
    target: Option<TerminusRecord>,
    remote_source: Option<TerminusRecord>,
    remote_target: Option<TerminusRecord>,
    credit: u32,
    queued: u32,
    unsettled: u32,
    offered: u32,
    sender_settle_mode: Option<SenderSettleMode>,
    receiver_settle_mode: Option<ReceiverSettleMode>,
    remote_sender_settle_mode: Option<SenderSettleMode>,
    remote_receiver_settle_mode: Option<ReceiverSettleMode>,
    deliveries: DeliveryQueue,
}

impl Link {
    pub(crate) fn new(name: String, role: Role, session: SessionId) -> Self {
        Self {
            name,
            role,
            session,
            source: None,
            target: None,
            remote_source: None,
            remote_target: None,
            credit: 0,
            queued: 0,
            unsettled: 0,
            offered: 0,
            sender_settle_mode: None,
            receiver_settle_mode: None,
            remote_sender_settle_mode: None,
            remote_receiver_settle_mode: None,
            deliveries: DeliveryQueue::default(),
        }
    }

    /// Link name, unique per session pair.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Whether the local end sends.
    #[must_use]
    pub const fn is_sender(&self) -> bool {
        matches!(self.role, Role::Sender)
    }

    /// Whether the local end receives.
    #[must_use]
    pub const fn is_receiver(&self) -> bool {
        matches!(self.role, Role::Receiver)
    }

    /// Owning session.
    #[must_use]
    pub const fn session(&self) -> SessionId {
        self.session
    }

    /// Local source, `None` until one is set.
    #[must_use]
    pub fn source(&self) -> Option<Source> {
        self.source.as_ref().map(TerminusRecord::to_source)
    }

    /// Local target or coordinator, `None` until one is set.
    #[must_use]
    pub fn target(&self) -> Option<TargetTerminus> {
        self.target.as_ref().and_then(TerminusRecord::to_target)
    }

    /// Source declared by the peer.
    #[must_use]
    pub fn remote_source(&self) -> Option<Source> {
        self.remote_source.as_ref().map(TerminusRecord::to_source)
    }

    /// Target or coordinator declared by the peer.
    #[must_use]
    pub fn remote_target(&self) -> Option<TargetTerminus> {
        self.remote_target.as_ref().and_then(TerminusRecord::to_target)
    }

    /// Raw local source record.
    #[must_use]
    pub const fn source_record(&self) -> Option<&TerminusRecord> {
        self.source.as_ref()
    }

    /// Raw local target record.
    #[must_use]
    pub const fn target_record(&self) -> Option<&TerminusRecord> {
        self.target.as_ref()
    }

    /// Transfers the sender may currently make.
    #[must_use]
    pub const fn credit(&self) -> u32 {
        self.credit
    }

    /// Deliveries waiting to be sent or read.
    #[must_use]
    pub const fn queued(&self) -> u32 {
        self.queued
    }

    /// Deliveries in flight awaiting settlement.
    #[must_use]
    pub const fn unsettled(&self) -> u32 {
        self.unsettled
    }

    /// Messages a sender has announced as available.
    #[must_use]
    pub const fn offered(&self) -> u32 {
        self.offered
    }

    /// Local sender settle mode, `None` until chosen.
    #[must_use]
    pub const fn sender_settle_mode(&self) -> Option<SenderSettleMode> {
        self.sender_settle_mode
    }

    /// Local receiver settle mode, `None` until chosen.
    #[must_use]
    pub const fn receiver_settle_mode(&self) -> Option<ReceiverSettleMode> {
        self.receiver_settle_mode
    }

    /// Sender settle mode declared by the peer.
    #[must_use]
    pub const fn remote_sender_settle_mode(&self) -> Option<SenderSettleMode> {
        self.remote_sender_settle_mode
    }

    /// Receiver settle mode declared by the peer.
    #[must_use]
    pub const fn remote_receiver_settle_mode(&self) -> Option<ReceiverSettleMode> {
        self.remote_receiver_settle_mode
    }

    /// Look up a delivery.
    #[must_use]
    pub fn delivery(&self, id: DeliveryId) -> Option<&Delivery> {
        self.deliveries.get(id)
    }

    /// Delivery under the cursor, `None` past the end.
    #[must_use]
    pub fn current(&self) -> Option<&Delivery> {
        self.deliveries.current()
    }

    /// Deliveries not yet settled locally, oldest first.
    pub fn unsettled_deliveries(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.unsettled()
    }

    /// Number of deliveries still held by the link.
    #[must_use]
    pub fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }
}

/// Mutable access to a link.
#[derive(Debug)]
pub struct LinkMut<'a> {
    endpoint: EndpointMut<'a>,
    link: &'a mut Link,
}

impl<'a> LinkMut<'a> {
    pub(crate) fn new(endpoint: EndpointMut<'a>, link: &'a mut Link) -> Self {
        Self { endpoint, link }
    }

    /// Handle of this link.
    #[must_use]
    pub fn id(&self) -> LinkId {
        LinkId(self.endpoint.id().key())
    }

    /// Read-only view.
    #[must_use]
    pub fn get(&self) -> &Link {
        self.link
    }

    /// Lifecycle operations.
    pub fn endpoint(&mut self) -> &mut EndpointMut<'a> {
        &mut self.endpoint
    }

    /// Attach the link locally.
    pub fn open(&mut self) {
        self.endpoint.open();
    }

    /// Detach the link locally.
    pub fn close(&mut self) {
        self.endpoint.close();
    }

    /// Replace the local source.
    #[instrument(level = "debug", skip(self, source), fields(link = %self.link.name))]
    pub fn set_source(&mut self, source: &Source) {
        self.link
            .source
            .get_or_insert_with(TerminusRecord::default)
            .apply_source(source);
        self.endpoint.mark_modified();
    }

    /// Replace the local target or coordinator.
    #[instrument(level = "debug", skip(self, target), fields(link = %self.link.name))]
    pub fn set_target(&mut self, target: impl Into<TargetTerminus>) {
        self.link
            .target
            .get_or_insert_with(TerminusRecord::default)
            .apply_target(&target.into());
        self.endpoint.mark_modified();
    }

    /// Choose the local sender settle mode.
    pub fn set_sender_settle_mode(&mut self, mode: SenderSettleMode) {
        self.link.sender_settle_mode = Some(mode);
        self.endpoint.mark_modified();
    }

    /// Choose the local receiver settle mode.
    pub fn set_receiver_settle_mode(&mut self, mode: ReceiverSettleMode) {
        self.link.receiver_settle_mode = Some(mode);
        self.endpoint.mark_modified();
    }

    /// Create a delivery identified by `tag`.
    pub fn delivery(&mut self, tag: &[u8]) -> Result<DeliveryId> {
        let id = self.link.deliveries.create(Bytes::copy_from_slice(tag))?;
        self.endpoint.mark_modified();
        Ok(id)
    }

    /// Create a delivery whose tag is `buf[offset..offset + len]`.
    ///
    /// The tag is copied, so later changes to `buf` do not affect it.
    pub fn delivery_from(&mut self, buf: &[u8], offset: usize, len: usize) -> Result<DeliveryId> {
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

    /// Move the cursor past the current delivery. Returns `false` if there was none.
    pub fn advance(&mut self) -> bool {
        let advanced = self.link.deliveries.advance();
        if advanced {
            trace!(link = %self.link.name, "delivery cursor advanced");
            self.endpoint.mark_modified();
        }
        advanced
    }

    /// Set the local disposition of a delivery. Settled deliveries refuse.
    pub fn update(&mut self, id: DeliveryId, state: DeliveryState) -> Result<()> {
        self.link.deliveries.update(id, state)?;
        self.endpoint.mark_modified();
        Ok(())
    }

    /// Settle a delivery locally. Settling twice is a no-op.
    pub fn settle(&mut self, id: DeliveryId) -> Result<()> {
        if self.link.deliveries.settle(id)? {
            debug!(link = %self.link.name, delivery = id.sequence(), "delivery settled");
            self.endpoint.mark_modified();
        }
        Ok(())
    }

    /// Forget deliveries settled on both sides. Returns how many were dropped.
    pub fn release_settled(&mut self) -> usize {
        self.link.deliveries.release_settled()
    }

    /// Grant `credit` more transfers to the peer. Receivers only.
    pub fn flow(&mut self, credit: u32) -> Result<()> {
        if !self.link.is_receiver() {
            return Err(EngineError::WrongRole {
                expected: Role::Receiver,
            });
        }
        self.link.credit = self.link.credit.saturating_add(credit);
        debug!(link = %self.link.name, credit = self.link.credit, "credit granted");
        self.endpoint.mark_modified();
        Ok(())
    }

    /// Announce how many messages are available to send. Senders only.
    pub fn offered(&mut self, available: u32) -> Result<()> {
        if !self.link.is_sender() {
            return Err(EngineError::WrongRole {
                expected: Role::Sender,
            });
        }
        self.link.offered = available;
        self.endpoint.mark_modified();
        Ok(())
    }

    /// Record the peer's source. Called by the frame layer only.
    pub fn set_remote_source(&mut self, source: Option<&Source>) {
        self.link.remote_source = source.map(TerminusRecord::from_source);
        self.endpoint.mark_modified();
    }

    /// Record the peer's target. Called by the frame layer only.
    pub fn set_remote_target(&mut self, target: Option<&TargetTerminus>) {
        self.link.remote_target = target.map(TerminusRecord::from_target);
        self.endpoint.mark_modified();
    }

    /// Record the peer's settle modes. Called by the frame layer only.
    pub fn set_remote_settle_modes(
        &mut self,
        sender: Option<SenderSettleMode>,
        receiver: Option<ReceiverSettleMode>,
    ) {
        self.link.remote_sender_settle_mode = sender;
        self.link.remote_receiver_settle_mode = receiver;
        self.endpoint.mark_modified();
    }

    /// Update link credit. Called by the frame layer only.
    pub fn set_credit(&mut self, credit: u32) {
        self.link.credit = credit;
        self.endpoint.mark_modified();
    }

    /// Update the queued count. Called by the frame layer only.
    pub fn set_queued(&mut self, queued: u32) {
        self.link.queued = queued;
        self.endpoint.mark_modified();
    }

    /// Update the unsettled count. Called by the frame layer only.
    pub fn set_unsettled(&mut self, unsettled: u32) {
        self.link.unsettled = unsettled;
        self.endpoint.mark_modified();
    }

    /// Record the peer's disposition of a delivery. Called by the frame layer only.
    ///
    /// A `None` state keeps the previous remote state; `settled` can only turn
    /// remote settlement on.
    pub fn set_remote_disposition(
        &mut self,
        id: DeliveryId,
        state: Option<DeliveryState>,
        settled: bool,
    ) -> Result<()> {
        self.link.deliveries.set_remote(id, state, settled)?;
        self.endpoint.mark_modified();
        Ok(())
    }
}
