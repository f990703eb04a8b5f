//! AMQP terminus, link and settlement enumerations with their wire values

use std::fmt;

/// How much terminus state survives recovery of the link, session or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum TerminusDurability {
    /// No terminus state is retained durably
    None = 0,
    /// Only the existence and configuration of the terminus is retained
    Configuration = 1,
    /// Configuration and unsettled delivery state is retained
    UnsettledState = 2,
}

impl TerminusDurability {
    /// Convert from the wire value
    #[must_use]
    pub const fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Configuration),
            2 => Some(Self::UnsettledState),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_wire(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for TerminusDurability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Configuration => "configuration",
            Self::UnsettledState => "unsettled-state",
        };
        write!(f, "{name}")
    }
}

/// When the resources held by a terminus are reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminusExpiryPolicy {
    /// The terminus never expires
    Never,
    /// Expires when the connection closes
    ConnectionClose,
    /// Expires when the session ends
    SessionEnd,
    /// Expires when the link detaches
    LinkDetach,
}

impl TerminusExpiryPolicy {
    /// Parse the wire symbol
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "never" => Some(Self::Never),
            "connection-close" => Some(Self::ConnectionClose),
            "session-end" => Some(Self::SessionEnd),
            "link-detach" => Some(Self::LinkDetach),
            _ => None,
        }
    }

    /// Wire symbol for this policy
    #[must_use]
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::ConnectionClose => "connection-close",
            Self::SessionEnd => "session-end",
            Self::LinkDetach => "link-detach",
        }
    }
}

impl fmt::Display for TerminusExpiryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_symbol())
    }
}

/// Declared kind of a terminus as held by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TerminusType {
    /// Nothing has been declared yet
    #[default]
    Unspecified = 0,
    /// A message source
    Source = 1,
    /// A message target
    Target = 2,
    /// A transaction coordinator standing in for a target
    Coordinator = 3,
}

impl TerminusType {
    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Source),
            2 => Some(Self::Target),
            3 => Some(Self::Coordinator),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether a terminus of this type may be read back as a plain target
    #[must_use]
    pub const fn is_target_like(self) -> bool {
        matches!(self, Self::Target | Self::Unspecified)
    }
}

/// Role of the local end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Transfers messages to the peer
    Sender,
    /// Receives messages from the peer
    Receiver,
}

impl Role {
    /// AMQP encodes the role as a boolean; `true` is receiver
    #[must_use]
    pub const fn as_wire(self) -> bool {
        matches!(self, Self::Receiver)
    }

    /// Convert from the wire boolean
    #[must_use]
    pub const fn from_wire(receiver: bool) -> Self {
        if receiver { Self::Receiver } else { Self::Sender }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => write!(f, "sender"),
            Self::Receiver => write!(f, "receiver"),
        }
    }
}

/// Settlement policy requested for the sending side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SenderSettleMode {
    /// Deliveries are sent unsettled (at least once)
    Unsettled = 0,
    /// Deliveries are sent pre-settled (at most once)
    Settled = 1,
    /// The sender may choose per delivery
    Mixed = 2,
}

impl SenderSettleMode {
    /// Convert from the wire value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unsettled),
            1 => Some(Self::Settled),
            2 => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Settlement policy requested for the receiving side of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ReceiverSettleMode {
    /// Receiver settles spontaneously on its first disposition
    First = 0,
    /// Receiver settles only after the sender has settled
    Second = 1,
}

impl ReceiverSettleMode {
    /// Convert from the wire value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::First),
            1 => Some(Self::Second),
            _ => None,
        }
    }

    /// Convert to the wire value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Outcome or progress state of a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeliveryState {
    /// Partially or fully received, no outcome yet
    Received,
    /// Processed successfully
    Accepted,
    /// Invalid and cannot be processed
    Rejected,
    /// Not processed, may be redelivered
    Released,
    /// Not processed and annotated before redelivery
    Modified,
}

impl DeliveryState {
    /// AMQP descriptor code of the delivery-state composite
    #[must_use]
    pub const fn descriptor(self) -> u64 {
        match self {
            Self::Received => 0x23,
            Self::Accepted => 0x24,
            Self::Rejected => 0x25,
            Self::Released => 0x26,
            Self::Modified => 0x27,
        }
    }

    /// Look up a state by descriptor code
    #[must_use]
    pub const fn from_descriptor(code: u64) -> Option<Self> {
        match code {
            0x23 => Some(Self::Received),
            0x24 => Some(Self::Accepted),
            0x25 => Some(Self::Rejected),
            0x26 => Some(Self::Released),
            0x27 => Some(Self::Modified),
            _ => None,
        }
    }

    /// Whether this state is a terminal outcome rather than progress
    #[must_use]
    pub const fn is_outcome(self) -> bool {
        !matches!(self, Self::Received)
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Released => "released",
            Self::Modified => "modified",
        };
        write!(f, "{name}")
    }
}
