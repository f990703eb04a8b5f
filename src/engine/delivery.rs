//! Per-link delivery records and the current-delivery cursor.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::trace;

use super::error::{EngineError, Result};
use crate::protocol::DeliveryState;
use crate::protocol::metrics::Metrics;

/// Identifier of a delivery, unique for the lifetime of its link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryId(u64);

impl DeliveryId {
    /// Position of the delivery in its link's creation order.
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.0
    }
}

/// One message transfer tracked on a link.
#[derive(Debug, Clone)]
pub struct Delivery {
    id: DeliveryId,
    tag: Bytes,
    local_state: Option<DeliveryState>,
    remote_state: Option<DeliveryState>,
    settled: bool,
    remote_settled: bool,
}

impl Delivery {
    /// Identifier on the owning link.
    #[must_use]
    pub const fn id(&self) -> DeliveryId {
        self.id
    }

    /// Delivery tag.
    #[must_use]
    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    /// Disposition set locally, `None` while unset.
    #[must_use]
    pub const fn local_state(&self) -> Option<DeliveryState> {
        self.local_state
    }

    /// Disposition reported by the peer, `None` while unset.
    #[must_use]
    pub const fn remote_state(&self) -> Option<DeliveryState> {
        self.remote_state
    }

    /// Whether the local side has settled. Never reverts once true.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.settled
    }

    /// Whether the peer has settled. Never reverts once true.
    #[must_use]
    pub const fn is_remote_settled(&self) -> bool {
        self.remote_settled
    }

    /// Settled on both sides and eligible for release.
    #[must_use]
    pub const fn is_fully_settled(&self) -> bool {
        self.settled && self.remote_settled
    }
}

/// Deliveries of one link in creation order, with a forward-only cursor.
#[derive(Debug, Default)]
pub(crate) struct DeliveryQueue {
    deliveries: VecDeque<Delivery>,
    cursor: usize,
    next_id: u64,
}

impl DeliveryQueue {
    pub(crate) fn create(&mut self, tag: Bytes) -> Result<DeliveryId> {
        if self
            .deliveries
            .iter()
            .any(|d| !d.settled && d.tag == tag)
        {
            return Err(EngineError::DuplicateTag { tag: tag.to_vec() });
        }
        let id = DeliveryId(self.next_id);
        self.next_id += 1;
        trace!(delivery = id.0, tag = ?tag, "delivery created");
        self.deliveries.push_back(Delivery {
            id,
            tag,
            local_state: None,
            remote_state: None,
            settled: false,
            remote_settled: false,
        });
        Metrics::record_delivery_created();
        Ok(id)
    }

    fn position(&self, id: DeliveryId) -> Option<usize> {
        // ids increase along the queue
        self.deliveries
            .binary_search_by_key(&id, |d| d.id)
            .ok()
    }

    pub(crate) fn get(&self, id: DeliveryId) -> Option<&Delivery> {
        self.position(id).map(|pos| &self.deliveries[pos])
    }

    fn get_mut(&mut self, id: DeliveryId) -> Result<&mut Delivery> {
        let pos = self.position(id).ok_or(EngineError::UnknownDelivery)?;
        Ok(&mut self.deliveries[pos])
    }

    /// Fails once the delivery is settled; the outcome is frozen from then on.
    pub(crate) fn update(&mut self, id: DeliveryId, state: DeliveryState) -> Result<()> {
        let delivery = self.get_mut(id)?;
        if delivery.settled {
            return Err(EngineError::AlreadySettled);
        }
        delivery.local_state = Some(state);
        Ok(())
    }

    /// Returns `true` if this call settled the delivery.
    pub(crate) fn settle(&mut self, id: DeliveryId) -> Result<bool> {
        let delivery = self.get_mut(id)?;
        if delivery.settled {
            return Ok(false);
        }
        delivery.settled = true;
        Metrics::record_delivery_settled();
        Ok(true)
    }

    pub(crate) fn set_remote(
        &mut self,
        id: DeliveryId,
        state: Option<DeliveryState>,
        settled: bool,
    ) -> Result<()> {
        let delivery = self.get_mut(id)?;
        if state.is_some() {
            delivery.remote_state = state;
        }
        delivery.remote_settled |= settled;
        Ok(())
    }

    pub(crate) fn current(&self) -> Option<&Delivery> {
        self.deliveries.get(self.cursor)
    }

    /// Step past the current delivery. Returns `false` if there was none.
    pub(crate) fn advance(&mut self) -> bool {
        if self.cursor < self.deliveries.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Drop deliveries settled on both sides. Returns how many were released.
    pub(crate) fn release_settled(&mut self) -> usize {
        let before = self.deliveries.len();
        let current = self.cursor;
        let mut index = 0;
        let mut cursor = current;
        self.deliveries.retain(|d| {
            let keep = !d.is_fully_settled();
            if !keep && index < current {
                cursor -= 1;
            }
            index += 1;
            keep
        });
        self.cursor = cursor;
        before - self.deliveries.len()
    }

    pub(crate) fn unsettled(&self) -> impl Iterator<Item = &Delivery> {
        self.deliveries.iter().filter(|d| !d.settled)
    }

    pub(crate) fn len(&self) -> usize {
        self.deliveries.len()
    }
}
