//! Raw changes derived from two ordered snapshots of a sectioned list.
//!
//! Sections are matched by name and items by key. Only sections and items
//! whose relative order changed are reported as moved; items that merely
//! shift because of inserts or deletes around them are left in place.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::emitter::DiffEmitter;
use super::model::{EditOperation, IndexPath, RawChange, SectionChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotItem<K, P> {
    pub key: K,
    pub payload: P,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSection<K, P> {
    pub name: String,
    #[serde(default = "Vec::new")]
    pub items: Vec<SnapshotItem<K, P>>,
}

/// Ordered sections of keyed items.
///
/// Section names and item keys are expected to be unique; for repeats only
/// the first occurrence takes part in the diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot<K, P> {
    pub sections: Vec<SnapshotSection<K, P>>,
}

impl<K, P> Default for Snapshot<K, P> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
        }
    }
}

/// Section and item changes between two snapshots, in application order
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotChanges<P> {
    /// Deletions by descending old index, then insertions by ascending new index
    pub sections: Vec<SectionChange>,
    /// Deletes by descending old position, inserts and moves by ascending
    /// new position, then in-place updates by ascending old position
    pub items: Vec<RawChange<P>>,
}

impl<P> SnapshotChanges<P> {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.items.is_empty()
    }
}

/// Compute the changes that turn `old` into `new`.
///
/// A section that exists in both but changed its relative order is replaced
/// (deleted and inserted) along with its items. Items inside a deleted or
/// inserted section are covered by the section change and not reported
/// individually.
pub fn diff_snapshots<K, P>(old: &Snapshot<K, P>, new: &Snapshot<K, P>) -> SnapshotChanges<P>
where
    K: Hash + Eq,
    P: Clone + PartialEq,
{
    let old_sections = first_index(old.sections.iter().map(|s| s.name.as_str()));
    let new_sections = first_index(new.sections.iter().map(|s| s.name.as_str()));

    // Surviving sections, in new order, as (old index, new index)
    let mut common: Vec<(usize, usize)> = new_sections
        .iter()
        .filter_map(|(name, new_idx)| old_sections.get(name).map(|old_idx| (*old_idx, *new_idx)))
        .collect();
    common.sort_by_key(|(_, new_idx)| *new_idx);
    let old_order: Vec<usize> = common.iter().map(|(old_idx, _)| *old_idx).collect();
    let kept: HashMap<usize, usize> = longest_increasing_run(&old_order)
        .into_iter()
        .map(|pos| common[pos])
        .collect();
    let kept_new: HashSet<usize> = kept.values().copied().collect();

    let mut sections: Vec<SectionChange> = (0..old.sections.len())
        .rev()
        .filter(|idx| !kept.contains_key(idx))
        .map(SectionChange::Delete)
        .collect();
    sections.extend(
        (0..new.sections.len())
            .filter(|idx| !kept_new.contains(idx))
            .map(SectionChange::Insert),
    );

    let old_items = index_items(old, |section| kept.contains_key(&section));
    let new_items = index_items(new, |section| kept_new.contains(&section));

    let mut deletes = Vec::new();
    let mut inserts = Vec::new();
    let mut moves = Vec::new();
    let mut updates = Vec::new();

    for (key, (path, payload)) in &old_items {
        if !new_items.contains_key(key) {
            deletes.push(RawChange::delete(*path, (*payload).clone()));
        }
    }
    for (key, (path, payload)) in &new_items {
        if !old_items.contains_key(key) {
            inserts.push(RawChange::insert(*path, (*payload).clone()));
        }
    }

    // Items present on both sides, grouped by the section pair they live in
    let mut stayed_in_section: HashMap<usize, Vec<(usize, usize, &K)>> = HashMap::new();
    for (key, (new_path, payload)) in &new_items {
        let Some((old_path, _)) = old_items.get(key) else {
            continue;
        };
        if kept.get(&old_path.section) == Some(&new_path.section) {
            stayed_in_section
                .entry(new_path.section)
                .or_default()
                .push((new_path.item, old_path.item, *key));
        } else {
            moves.push(RawChange::moved(*old_path, *new_path, (*payload).clone()));
        }
    }

    for group in stayed_in_section.values_mut() {
        group.sort_by_key(|(new_item, _, _)| *new_item);
        let old_order: Vec<usize> = group.iter().map(|(_, old_item, _)| *old_item).collect();
        let in_place: HashSet<usize> = longest_increasing_run(&old_order).into_iter().collect();

        for (pos, (_, _, key)) in group.iter().enumerate() {
            let (old_path, old_payload) = old_items[key];
            let (new_path, new_payload) = new_items[key];
            if !in_place.contains(&pos) {
                moves.push(RawChange::moved(old_path, new_path, new_payload.clone()));
            } else if old_payload != new_payload {
                updates.push(RawChange::update(old_path, new_payload.clone()));
            }
        }
    }

    deletes.sort_by(|a, b| b.old.cmp(&a.old));
    inserts.sort_by(|a, b| a.new.cmp(&b.new));
    moves.sort_by(|a, b| a.new.cmp(&b.new));
    updates.sort_by(|a, b| a.old.cmp(&b.old));

    let mut items = deletes;
    items.extend(inserts);
    items.extend(moves);
    items.extend(updates);

    SnapshotChanges { sections, items }
}

/// Diff two snapshots and run the result through a [`DiffEmitter`] as one
/// batch: section edits first, then item edits.
pub fn edits_for_snapshots<K, P>(old: &Snapshot<K, P>, new: &Snapshot<K, P>) -> Vec<EditOperation<P>>
where
    K: Hash + Eq,
    P: Clone + PartialEq,
{
    let changes = diff_snapshots(old, new);
    let mut emitter = DiffEmitter::new();
    emitter.will_change();
    for section in changes.sections {
        emitter.push_section(section);
    }
    for change in changes.items {
        emitter.push(change);
    }
    emitter.did_change()
}

fn first_index<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    let mut index = HashMap::new();
    for (pos, name) in names.enumerate() {
        index.entry(name).or_insert(pos);
    }
    index
}

fn index_items<K, P>(
    snapshot: &Snapshot<K, P>,
    include_section: impl Fn(usize) -> bool,
) -> HashMap<&K, (IndexPath, &P)>
where
    K: Hash + Eq,
{
    let mut items = HashMap::new();
    for (section_idx, section) in snapshot.sections.iter().enumerate() {
        if !include_section(section_idx) {
            continue;
        }
        for (item_idx, item) in section.items.iter().enumerate() {
            items
                .entry(&item.key)
                .or_insert((IndexPath::new(section_idx, item_idx), &item.payload));
        }
    }
    items
}

/// Positions in `values` of one longest strictly increasing subsequence.
fn longest_increasing_run(values: &[usize]) -> Vec<usize> {
    // tails[len] = position of the smallest tail of an increasing run of length len + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (pos, value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&tail| values[tail] < *value);
        previous[pos] = slot.checked_sub(1).map(|p| tails[p]);
        if slot == tails.len() {
            tails.push(pos);
        } else {
            tails[slot] = pos;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(pos) = cursor {
        run.push(pos);
        cursor = previous[pos];
    }
    run.reverse();
    run
}
