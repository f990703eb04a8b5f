//! Native endpoint engine
//!
//! Connections, sessions and links with independently advancing local and
//! remote lifecycles, and the per-connection modified set that tells the
//! transport which endpoints have changes to flush.

pub(crate) mod arena;
mod config;
mod connection;
mod delivery;
mod endpoint;
mod error;
mod link;
mod modified;
mod state;

pub use arena::ArenaKey;
pub use config::{ConnectionConfig, RemoteTransitionPolicy};
pub use connection::{Connection, DrainModified, EndpointType};
pub use delivery::{Delivery, DeliveryId};
pub use endpoint::{Context, Endpoint, EndpointId, EndpointMut, LinkId, SessionId};
pub use error::{EngineError, Result};
pub use link::{Link, LinkMut};
pub use state::{EndpointState, StateMask};
