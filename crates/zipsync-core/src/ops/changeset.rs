use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::StableId;

/// Stable ids touched by one or more saved units of work.
///
/// `inserted` and `updated` never overlap, and an id in `deleted` appears in
/// neither of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Changeset {
    inserted: BTreeSet<StableId>,
    updated: BTreeSet<StableId>,
    deleted: BTreeSet<StableId>,
}

impl Changeset {
    pub fn new(
        inserted: impl IntoIterator<Item = StableId>,
        updated: impl IntoIterator<Item = StableId>,
        deleted: impl IntoIterator<Item = StableId>,
    ) -> Self {
        let deleted: BTreeSet<StableId> = deleted.into_iter().collect();
        let inserted: BTreeSet<StableId> = inserted
            .into_iter()
            .filter(|id| !deleted.contains(id))
            .collect();
        let updated = updated
            .into_iter()
            .filter(|id| !deleted.contains(id) && !inserted.contains(id))
            .collect();
        Self {
            inserted,
            updated,
            deleted,
        }
    }

    pub fn inserted(&self) -> &BTreeSet<StableId> {
        &self.inserted
    }

    pub fn updated(&self) -> &BTreeSet<StableId> {
        &self.updated
    }

    pub fn deleted(&self) -> &BTreeSet<StableId> {
        &self.deleted
    }

    /// Every id that still exists after the change: inserted plus updated
    pub fn all(&self) -> BTreeSet<StableId> {
        self.inserted.union(&self.updated).copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    /// Fold a later changeset into this one.
    ///
    /// An id inserted earlier and updated later stays inserted. An id
    /// deleted later leaves both `inserted` and `updated`.
    pub fn merged(mut self, later: Changeset) -> Changeset {
        for id in &later.deleted {
            self.inserted.remove(id);
            self.updated.remove(id);
        }
        self.deleted.extend(later.deleted);

        for id in later.inserted {
            self.deleted.remove(&id);
            self.updated.remove(&id);
            self.inserted.insert(id);
        }
        for id in later.updated {
            if !self.inserted.contains(&id) {
                self.updated.insert(id);
            }
        }
        self
    }
}
