//! Engine error types

use thiserror::Error;

use super::state::EndpointState;
use crate::protocol::Role;

/// Errors raised by engine operations.
///
/// Protocol-level endpoint errors are not represented here; they live in the
/// endpoint error slots and are never raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Handle refers to an endpoint that was freed or never existed
    #[error("unknown or freed endpoint")]
    UnknownEndpoint,

    /// Handle refers to an endpoint of a different kind
    #[error("endpoint is not a {expected}")]
    WrongKind {
        /// Kind the operation needed
        expected: &'static str,
    },

    /// Operation is only valid for the other link role
    #[error("operation requires a {expected} link")]
    WrongRole {
        /// Role the operation needed
        expected: Role,
    },

    /// An unsettled delivery with the same tag already exists on the link
    #[error("delivery tag {tag:02x?} already in use")]
    DuplicateTag {
        /// Offending tag bytes
        tag: Vec<u8>,
    },

    /// Requested tag slice lies outside the supplied buffer
    #[error("tag slice {offset}..{offset}+{len} outside buffer of {available} bytes")]
    TagOutOfBounds {
        /// Start of the slice
        offset: usize,
        /// Length of the slice
        len: usize,
        /// Size of the buffer
        available: usize,
    },

    /// Delivery was released or never existed on this link
    #[error("unknown delivery")]
    UnknownDelivery,

    /// Delivery is settled locally and its outcome is final
    #[error("delivery already settled")]
    AlreadySettled,

    /// Remote state update would move the lifecycle backwards
    #[error("illegal remote transition {from} -> {to}")]
    IllegalTransition {
        /// Current remote state
        from: EndpointState,
        /// Requested remote state
        to: EndpointState,
    },

    /// The foreign handle behind a bridged endpoint was already released
    #[error("foreign handle already released")]
    Released,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
