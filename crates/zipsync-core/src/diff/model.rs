//! Change and edit types.
//!
//! All types serialize to tagged JSON for the CLI.

use serde::{Deserialize, Serialize};

/// Position of an item: section index, then item index within the section
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl std::fmt::Display for IndexPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.section, self.item)
    }
}

/// What the change source says happened to an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Move,
    Delete,
}

/// One item-level change notification.
///
/// `old` is the position before the batch, `new` the position after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChange<P> {
    pub kind: ChangeKind,
    pub old: Option<IndexPath>,
    pub new: Option<IndexPath>,
    pub payload: P,
}

impl<P> RawChange<P> {
    pub fn insert(at: IndexPath, payload: P) -> Self {
        Self {
            kind: ChangeKind::Insert,
            old: None,
            new: Some(at),
            payload,
        }
    }

    /// An in-place update: the item is at `at` both before and after.
    pub fn update(at: IndexPath, payload: P) -> Self {
        Self {
            kind: ChangeKind::Update,
            old: Some(at),
            new: Some(at),
            payload,
        }
    }

    pub fn moved(from: IndexPath, to: IndexPath, payload: P) -> Self {
        Self {
            kind: ChangeKind::Move,
            old: Some(from),
            new: Some(to),
            payload,
        }
    }

    pub fn delete(at: IndexPath, payload: P) -> Self {
        Self {
            kind: ChangeKind::Delete,
            old: Some(at),
            new: None,
            payload,
        }
    }
}

/// Section-level change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum SectionChange {
    Insert(usize),
    Delete(usize),
}

/// One list mutation instruction for the consumer.
///
/// Deletes and updates address positions before the batch; inserts address
/// positions after it; moves carry both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation<P> {
    Insert { at: IndexPath, payload: P },
    Update { at: IndexPath, payload: P },
    Move { from: IndexPath, to: IndexPath },
    Delete { at: IndexPath },
    InsertSection { index: usize },
    DeleteSection { index: usize },
}

impl<P> EditOperation<P> {
    pub fn is_section_edit(&self) -> bool {
        matches!(
            self,
            EditOperation::InsertSection { .. } | EditOperation::DeleteSection { .. }
        )
    }
}
