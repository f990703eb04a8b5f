//! AMQP error conditions attached to endpoints

use std::fmt;

/// Well-known AMQP error condition symbols.
pub mod condition {
    /// An internal error occurred
    pub const INTERNAL_ERROR: &str = "amqp:internal-error";
    /// A peer attempted to work with a remote entity that does not exist
    pub const NOT_FOUND: &str = "amqp:not-found";
    /// A peer attempted to work with a remote entity to which it has no access
    pub const UNAUTHORIZED_ACCESS: &str = "amqp:unauthorized-access";
    /// Data could not be decoded
    pub const DECODE_ERROR: &str = "amqp:decode-error";
    /// A peer exceeded its resource allocation
    pub const RESOURCE_LIMIT_EXCEEDED: &str = "amqp:resource-limit-exceeded";
    /// The peer tried to use a frame in a manner that is inconsistent with the semantics
    pub const NOT_ALLOWED: &str = "amqp:not-allowed";
    /// An invalid field was passed in a frame body
    pub const INVALID_FIELD: &str = "amqp:invalid-field";
    /// The peer tried to use functionality that is not implemented
    pub const NOT_IMPLEMENTED: &str = "amqp:not-implemented";
    /// An operator intervened to detach for some reason
    pub const LINK_DETACH_FORCED: &str = "amqp:link:detach-forced";
    /// An operator intervened to close the connection for some reason
    pub const CONNECTION_FORCED: &str = "amqp:connection:forced";
}

/// Structured error carried by an endpoint: a condition symbol and an optional description.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorCondition {
    condition: String,
    description: Option<String>,
}

impl ErrorCondition {
    /// Create a condition without a description
    #[must_use]
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            description: None,
        }
    }

    /// Attach a human readable description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Condition symbol
    #[must_use]
    pub fn condition(&self) -> &str {
        &self.condition
    }

    /// Description, if any
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{}: {description}", self.condition),
            None => write!(f, "{}", self.condition),
        }
    }
}
