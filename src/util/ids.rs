//! Identifiers for actors, abilities, casts, and items.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to each dispatched cast.
pub type CastId = u64;

/// Opaque identifier of a casting actor, stable for the actor's session.
///
/// The nil UUID stands for a missing actor: cooldown queries treat it as
/// "not on cooldown" and mutations ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(Uuid);

impl ActorId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The missing-actor identifier.
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the missing-actor identifier.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for ActorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// String key of an ability, unique within the host's registry.
///
/// The empty key stands for a missing ability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityKey(String);

impl AbilityKey {
    /// Create a key from any string-like value.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the missing-ability key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for AbilityKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for AbilityKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&AbilityKey> for AbilityKey {
    fn from(key: &AbilityKey) -> Self {
        key.clone()
    }
}

impl Borrow<str> for AbilityKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for AbilityKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Game-visible description of a physical item instance.
///
/// Two descriptors with the same kind and label describe the same item as far
/// as cooldown overrides are concerned, even if the host rebuilt the backing
/// object in between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemDescriptor {
    /// Item type, e.g. `BLAZE_ROD`.
    pub kind: String,
    /// Display label shown to players, if the item has one.
    pub display_label: Option<String>,
}

impl ItemDescriptor {
    /// Describe an unlabeled item of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            display_label: None,
        }
    }

    /// Attach a display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.display_label = Some(label.into());
        self
    }

    /// Content-based identity of this item.
    #[must_use]
    pub fn identity(&self) -> ItemIdentity {
        ItemIdentity::of(self)
    }
}

/// Content-derived identity of an item: its kind plus its display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemIdentity(String);

impl ItemIdentity {
    /// Derive the identity of `item`.
    #[must_use]
    pub fn of(item: &ItemDescriptor) -> Self {
        let label = match item.display_label.as_deref() {
            None => "default",
            Some("") => "empty",
            Some(label) => label,
        };
        Self(format!("{}:{label}", item.kind))
    }

    /// Identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
