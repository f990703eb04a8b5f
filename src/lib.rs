//! AMQP 1.0 protocol engine core
//!
//! Endpoint state machines, link termini and delivery tracking for AMQP 1.0
//! connections. Nothing here touches a socket: the frame layer feeds remote
//! state in and drains the modified set to learn what to send.
//!
//! # Quick Start
//!
//! ```rust
//! use amqp_engine::{Connection, ConnectionConfig, EndpointId, EndpointState, Source};
//!
//! let mut connection = Connection::new(ConnectionConfig::with_container_id("client-1"));
//! let session = connection.session();
//! let link = connection.sender(session, "orders")?;
//!
//! let mut sender = connection.link_mut(link).expect("link exists");
//! sender.set_source(&Source::new("queue://orders"));
//! sender.open();
//!
//! // The frame layer walks the modified set to find endpoints with news.
//! let pending: Vec<_> = connection.drain_modified().collect();
//! assert_eq!(pending, vec![EndpointId::from(link)]);
//! assert_eq!(
//!     connection.endpoint(link).map(|e| e.local_state()),
//!     Some(EndpointState::Active)
//! );
//! # Ok::<(), amqp_engine::EngineError>(())
//! ```
//!
//! # Layout
//!
//! - [`protocol`]: wire-level vocabulary (termini, delivery states, error
//!   conditions) and process-wide metrics
//! - [`engine`]: the native connection/session/link graph
//! - [`bridge`]: the same link surface over an externally supplied engine

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod bridge;
pub mod engine;
pub mod protocol;

pub use bridge::{Bridge, BridgedLink, ForeignEngine, ForeignLink};
pub use engine::{
    Connection, ConnectionConfig, Delivery, DeliveryId, Endpoint, EndpointId, EndpointState,
    EngineError, Link, LinkId, Result, SessionId, StateMask,
};
pub use protocol::{
    Coordinator, DeliveryState, ErrorCondition, Role, Source, Target, TargetTerminus,
    TerminusDurability, TerminusExpiryPolicy,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
