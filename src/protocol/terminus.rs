//! Source and target terminus descriptors and their wire-coded record form.

use super::types::{TerminusDurability, TerminusExpiryPolicy, TerminusType};

macro_rules! terminus_accessors {
    ($ty:ident) => {
        impl $ty {
            /// Create a terminus bound to an address.
            #[must_use]
            pub fn new(address: impl Into<String>) -> Self {
                Self {
                    address: Some(address.into()),
                    ..Self::default()
                }
            }

            /// Request a node created on demand by the peer.
            #[must_use]
            pub fn dynamic() -> Self {
                Self {
                    dynamic: true,
                    ..Self::default()
                }
            }

            /// Set the durability.
            #[must_use]
            pub const fn with_durable(mut self, durable: TerminusDurability) -> Self {
                self.durable = Some(durable);
                self
            }

            /// Set the expiry policy.
            #[must_use]
            pub const fn with_expiry_policy(mut self, policy: TerminusExpiryPolicy) -> Self {
                self.expiry_policy = Some(policy);
                self
            }

            /// Set the expiry timeout in seconds.
            #[must_use]
            pub const fn with_timeout(mut self, seconds: u32) -> Self {
                self.timeout = Some(seconds);
                self
            }

            /// Append a capability symbol.
            #[must_use]
            pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
                self.capabilities.push(capability.into());
                self
            }
        }
    };
}

/// Where messages on a link originate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Source {
    /// Node address, absent for dynamic nodes not yet named.
    pub address: Option<String>,
    /// Durability, absent when not negotiated.
    pub durable: Option<TerminusDurability>,
    /// Expiry policy, absent when not negotiated.
    pub expiry_policy: Option<TerminusExpiryPolicy>,
    /// Whether the peer should create the node.
    pub dynamic: bool,
    /// Seconds the terminus outlives its expiry trigger.
    pub timeout: Option<u32>,
    /// Opaque capability symbols.
    pub capabilities: Vec<String>,
}

terminus_accessors!(Source);

/// Where messages on a link are delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Target {
    /// Node address, absent for dynamic nodes not yet named.
    pub address: Option<String>,
    /// Durability, absent when not negotiated.
    pub durable: Option<TerminusDurability>,
    /// Expiry policy, absent when not negotiated.
    pub expiry_policy: Option<TerminusExpiryPolicy>,
    /// Whether the peer should create the node.
    pub dynamic: bool,
    /// Seconds the terminus outlives its expiry trigger.
    pub timeout: Option<u32>,
    /// Opaque capability symbols.
    pub capabilities: Vec<String>,
}

terminus_accessors!(Target);

/// Transaction coordinator used in place of a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinator {
    /// Transaction capabilities supported by the coordinator.
    pub capabilities: Vec<String>,
}

/// The target slot of a link: an ordinary target or a coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetTerminus {
    /// Ordinary message target
    Target(Target),
    /// Transaction coordinator
    Coordinator(Coordinator),
}

impl TargetTerminus {
    /// Borrow as a plain target, `None` for a coordinator.
    #[must_use]
    pub const fn as_target(&self) -> Option<&Target> {
        match self {
            Self::Target(target) => Some(target),
            Self::Coordinator(_) => None,
        }
    }

    /// Borrow as a coordinator, `None` for a plain target.
    #[must_use]
    pub const fn as_coordinator(&self) -> Option<&Coordinator> {
        match self {
            Self::Coordinator(coordinator) => Some(coordinator),
            Self::Target(_) => None,
        }
    }

    /// Address of a plain target.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.as_target().and_then(|target| target.address.as_deref())
    }
}

impl From<Target> for TargetTerminus {
    fn from(target: Target) -> Self {
        Self::Target(target)
    }
}

impl From<Coordinator> for TargetTerminus {
    fn from(coordinator: Coordinator) -> Self {
        Self::Coordinator(coordinator)
    }
}

/// Terminus as held on a link, with durability and expiry kept in wire form.
///
/// Applying a descriptor copies address, dynamic flag and capabilities
/// unconditionally. Durability, expiry policy and timeout are only written
/// when the descriptor carries them, so an unset value never overwrites a
/// negotiated one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminusRecord {
    kind: TerminusType,
    address: Option<String>,
    durability: Option<u32>,
    expiry_policy: Option<&'static str>,
    dynamic: bool,
    timeout: Option<u32>,
    capabilities: Vec<String>,
}

impl TerminusRecord {
    /// Empty record of the given type.
    #[must_use]
    pub fn new(kind: TerminusType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Record built from a source descriptor.
    #[must_use]
    pub fn from_source(source: &Source) -> Self {
        let mut record = Self::default();
        record.apply_source(source);
        record
    }

    /// Record built from a target slot.
    #[must_use]
    pub fn from_target(target: &TargetTerminus) -> Self {
        let mut record = Self::default();
        record.apply_target(target);
        record
    }

    /// Declared type.
    #[must_use]
    pub const fn kind(&self) -> TerminusType {
        self.kind
    }

    /// Raw durability code.
    #[must_use]
    pub const fn durability_code(&self) -> Option<u32> {
        self.durability
    }

    /// Raw expiry policy symbol.
    #[must_use]
    pub const fn expiry_symbol(&self) -> Option<&'static str> {
        self.expiry_policy
    }

    /// Copy a source descriptor into this record.
    pub fn apply_source(&mut self, source: &Source) {
        self.copy_fields(
            source.address.as_deref(),
            source.dynamic,
            source.durable,
            source.expiry_policy,
            source.timeout,
        );
        self.capabilities.clone_from(&source.capabilities);
        self.kind = TerminusType::Source;
    }

    /// Copy a target slot into this record.
    pub fn apply_target(&mut self, target: &TargetTerminus) {
        match target {
            TargetTerminus::Target(t) => {
                self.copy_fields(
                    t.address.as_deref(),
                    t.dynamic,
                    t.durable,
                    t.expiry_policy,
                    t.timeout,
                );
                self.capabilities.clone_from(&t.capabilities);
                self.kind = TerminusType::Target;
            }
            TargetTerminus::Coordinator(c) => {
                self.capabilities.clone_from(&c.capabilities);
                self.kind = TerminusType::Coordinator;
            }
        }
    }

    fn copy_fields(
        &mut self,
        address: Option<&str>,
        dynamic: bool,
        durable: Option<TerminusDurability>,
        expiry: Option<TerminusExpiryPolicy>,
        timeout: Option<u32>,
    ) {
        self.address = address.map(str::to_owned);
        self.dynamic = dynamic;
        if let Some(durable) = durable {
            self.durability = Some(durable.as_wire());
        }
        if let Some(expiry) = expiry {
            self.expiry_policy = Some(expiry.as_symbol());
        }
        if let Some(timeout) = timeout {
            self.timeout = Some(timeout);
        }
    }

    /// Materialize as a source descriptor.
    #[must_use]
    pub fn to_source(&self) -> Source {
        Source {
            address: self.address.clone(),
            durable: self.durability.and_then(TerminusDurability::from_wire),
            expiry_policy: self.expiry_policy.and_then(TerminusExpiryPolicy::from_symbol),
            dynamic: self.dynamic,
            timeout: self.timeout,
            capabilities: self.capabilities.clone(),
        }
    }

    /// Materialize as a target slot. A record declared as a source yields `None`.
    #[must_use]
    pub fn to_target(&self) -> Option<TargetTerminus> {
        match self.kind {
            kind if kind.is_target_like() => Some(TargetTerminus::Target(Target {
                address: self.address.clone(),
                durable: self.durability.and_then(TerminusDurability::from_wire),
                expiry_policy: self.expiry_policy.and_then(TerminusExpiryPolicy::from_symbol),
                dynamic: self.dynamic,
                timeout: self.timeout,
                capabilities: self.capabilities.clone(),
            })),
            TerminusType::Coordinator => Some(TargetTerminus::Coordinator(Coordinator {
                capabilities: self.capabilities.clone(),
            })),
            _ => None,
        }
    }
}
