//! Narrow handle interface to an externally supplied engine.

use std::fmt;

use bytes::Bytes;

use crate::engine::{ArenaKey, EndpointState, StateMask};
use crate::protocol::{ErrorCondition, TerminusType};

/// Operations the bridge needs from a foreign engine.
///
/// Handles are opaque, cheap to copy, and owned by the engine. The bridge is
/// the only caller of [`link_free`](Self::link_free) for any handle it has
/// wrapped. Durability and expiry policy cross this boundary in wire form:
/// durability as its numeric code and expiry policy as its symbol. `None`
/// means the engine holds no value for that field.
pub trait ForeignEngine {
    /// Link handle.
    type Link: Copy + Eq + fmt::Debug;
    /// Terminus handle.
    type Terminus: Copy + Eq + fmt::Debug;
    /// Delivery handle.
    type Delivery: Copy + Eq + fmt::Debug;

    /// Value stored in the link's context slot.
    fn link_context(&self, link: Self::Link) -> Option<ArenaKey>;
    /// Replace the value in the link's context slot.
    fn set_link_context(&mut self, link: Self::Link, context: Option<ArenaKey>);

    /// Whether the link sends.
    fn link_is_sender(&self, link: Self::Link) -> bool;
    /// Whether the link receives.
    fn link_is_receiver(&self, link: Self::Link) -> bool;
    /// Link name.
    fn link_name(&self, link: Self::Link) -> String;
    /// Local and remote lifecycle states, in that order.
    fn link_state(&self, link: Self::Link) -> (EndpointState, EndpointState);
    /// Open the link locally.
    fn link_open(&mut self, link: Self::Link);
    /// Close the link locally.
    fn link_close(&mut self, link: Self::Link);
    /// Release the link. The handle is dead afterwards.
    fn link_free(&mut self, link: Self::Link);
    /// Next link on the same connection whose states match the masks.
    fn link_next(&self, link: Self::Link, local: StateMask, remote: StateMask)
    -> Option<Self::Link>;

    /// Local error condition.
    fn link_error(&self, _link: Self::Link) -> Option<ErrorCondition> {
        None
    }
    /// Error condition reported by the peer.
    fn link_remote_error(&self, _link: Self::Link) -> Option<ErrorCondition> {
        None
    }

    /// Local source terminus.
    fn link_source(&self, link: Self::Link) -> Option<Self::Terminus>;
    /// Local target terminus.
    fn link_target(&self, link: Self::Link) -> Option<Self::Terminus>;
    /// Source declared by the peer.
    fn link_remote_source(&self, link: Self::Link) -> Option<Self::Terminus>;
    /// Target declared by the peer.
    fn link_remote_target(&self, link: Self::Link) -> Option<Self::Terminus>;

    /// Current credit.
    fn link_credit(&self, link: Self::Link) -> u32;
    /// Deliveries queued locally.
    fn link_queued(&self, link: Self::Link) -> u32;
    /// Deliveries awaiting settlement.
    fn link_unsettled(&self, link: Self::Link) -> u32;
    /// Grant credit on a receiving link.
    fn link_flow(&mut self, link: Self::Link, credit: u32);
    /// Announce available messages on a sending link.
    fn link_offered(&mut self, link: Self::Link, available: u32);

    /// Create a delivery with the given tag; `None` if the tag is in use.
    fn delivery(&mut self, link: Self::Link, tag: Bytes) -> Option<Self::Delivery>;
    /// Delivery under the link's cursor.
    fn link_current(&self, link: Self::Link) -> Option<Self::Delivery>;
    /// Move the cursor past the current delivery; `false` if there was none.
    fn link_advance(&mut self, link: Self::Link) -> bool;

    /// Declared terminus type.
    fn terminus_type(&self, terminus: Self::Terminus) -> TerminusType;
    /// Set the declared terminus type.
    fn set_terminus_type(&mut self, terminus: Self::Terminus, kind: TerminusType);
    /// Address.
    fn terminus_address(&self, terminus: Self::Terminus) -> Option<String>;
    /// Set the address.
    fn set_terminus_address(&mut self, terminus: Self::Terminus, address: Option<&str>);
    /// Dynamic flag.
    fn terminus_is_dynamic(&self, terminus: Self::Terminus) -> bool;
    /// Set the dynamic flag.
    fn set_terminus_dynamic(&mut self, terminus: Self::Terminus, dynamic: bool);
    /// Durability code.
    fn terminus_durability(&self, terminus: Self::Terminus) -> Option<u32>;
    /// Set the durability code.
    fn set_terminus_durability(&mut self, terminus: Self::Terminus, code: u32);
    /// Expiry policy symbol.
    fn terminus_expiry_policy(&self, terminus: Self::Terminus) -> Option<&str>;
    /// Set the expiry policy symbol.
    fn set_terminus_expiry_policy(&mut self, terminus: Self::Terminus, symbol: &'static str);
    /// Timeout in seconds.
    fn terminus_timeout(&self, terminus: Self::Terminus) -> Option<u32>;
    /// Set the timeout in seconds.
    fn set_terminus_timeout(&mut self, terminus: Self::Terminus, seconds: u32);
    /// Capability symbols.
    fn terminus_capabilities(&self, terminus: Self::Terminus) -> Vec<String>;
    /// Replace the capability symbols.
    fn set_terminus_capabilities(&mut self, terminus: Self::Terminus, capabilities: &[String]);
}
