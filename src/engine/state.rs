//! Endpoint lifecycle states and state filters.

use std::fmt;

/// Lifecycle state of one side of an endpoint.
///
/// States only move forward: `Uninitialized` → `Active` → `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EndpointState {
    /// Not yet opened
    #[default]
    Uninitialized,
    /// Opened and not yet closed
    Active,
    /// Closed, terminal
    Closed,
}

impl EndpointState {
    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        next >= self
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Uninitialized => StateMask::UNINITIALIZED.0,
            Self::Active => StateMask::ACTIVE.0,
            Self::Closed => StateMask::CLOSED.0,
        }
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Active => "ACTIVE",
            Self::Closed => "CLOSED",
        };
        write!(f, "{name}")
    }
}

/// Set of endpoint states used to filter endpoint traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateMask(u8);

impl StateMask {
    /// Matches nothing
    pub const EMPTY: Self = Self(0);
    /// Matches `Uninitialized`
    pub const UNINITIALIZED: Self = Self(1 << 0);
    /// Matches `Active`
    pub const ACTIVE: Self = Self(1 << 1);
    /// Matches `Closed`
    pub const CLOSED: Self = Self(1 << 2);
    /// Matches every state
    pub const ANY: Self = Self(Self::UNINITIALIZED.0 | Self::ACTIVE.0 | Self::CLOSED.0);

    /// Mask matching exactly one state
    #[must_use]
    pub const fn of(state: EndpointState) -> Self {
        Self(state.bit())
    }

    /// Union with another mask
    #[must_use]
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check if `state` is a member
    #[must_use]
    pub const fn contains(self, state: EndpointState) -> bool {
        self.0 & state.bit() != 0
    }

    /// Check whether the mask matches nothing
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<EndpointState> for StateMask {
    fn from(state: EndpointState) -> Self {
        Self::of(state)
    }
}

impl FromIterator<EndpointState> for StateMask {
    fn from_iter<I: IntoIterator<Item = EndpointState>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, |mask, state| mask.with(Self::of(state)))
    }
}
