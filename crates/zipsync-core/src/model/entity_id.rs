use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context-local handle for an entity that has not been stabilised yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalHandle(u64);

impl LocalHandle {
    pub(crate) fn new(seq: u64) -> Self {
        Self(seq)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Permanent identifier allocated by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StableId(Uuid);

impl StableId {
    /// Allocate a fresh time-ordered id
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for StableId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an entity within a [`Context`](crate::ops::Context).
///
/// Freshly inserted entities start out `Provisional`. They receive a
/// `Stable` id when the context saves or when
/// [`Context::obtain_permanent_ids`](crate::ops::Context::obtain_permanent_ids)
/// is called. Only stable ids are reported in a changeset or stored in an
/// identity cache. The context keeps resolving a provisional handle after
/// its entity was stabilised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Provisional(LocalHandle),
    Stable(StableId),
}

impl EntityId {
    pub fn is_provisional(&self) -> bool {
        matches!(self, EntityId::Provisional(_))
    }

    pub fn stable(&self) -> Option<StableId> {
        match self {
            EntityId::Stable(id) => Some(*id),
            EntityId::Provisional(_) => None,
        }
    }
}

impl From<StableId> for EntityId {
    fn from(id: StableId) -> Self {
        EntityId::Stable(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Provisional(handle) => write!(f, "provisional-{}", handle.value()),
            EntityId::Stable(id) => write!(f, "{}", id),
        }
    }
}
