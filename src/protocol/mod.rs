//! AMQP 1.0 protocol vocabulary
//!
//! This module provides the wire-level enumerations, terminus descriptors and
//! error conditions shared by the native engine and the foreign-engine bridge.

mod error;
pub mod metrics;
mod terminus;
mod types;

pub use error::{ErrorCondition, condition};
pub use metrics::MetricsSnapshot;
pub use terminus::{Coordinator, Source, Target, TargetTerminus, TerminusRecord};
pub use types::{
    DeliveryState, ReceiverSettleMode, Role, SenderSettleMode, TerminusDurability,
    TerminusExpiryPolicy, TerminusType,
};
