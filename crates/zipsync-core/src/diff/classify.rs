use super::model::{EditOperation, RawChange, SectionChange};

/// Classify one raw change into the edits a list needs to apply it.
///
/// Only the positions decide, never the kind:
/// - old and new present and different: update at old, then move from old
///   to new;
/// - old and new present and equal: update in place;
/// - only new: insert at new;
/// - only old: delete at old.
///
/// # Panics
///
/// Panics when neither position is present. Such a change means the change
/// source is broken and cannot be recovered from.
pub fn classify<P>(change: RawChange<P>) -> Vec<EditOperation<P>> {
    let RawChange {
        kind,
        old,
        new,
        payload,
    } = change;

    match (old, new) {
        (Some(from), Some(to)) if from != to => vec![
            EditOperation::Update { at: from, payload },
            EditOperation::Move { from, to },
        ],
        (Some(at), Some(_)) => vec![EditOperation::Update { at, payload }],
        (None, Some(at)) => vec![EditOperation::Insert { at, payload }],
        (Some(at), None) => vec![EditOperation::Delete { at }],
        (None, None) => panic!("malformed {:?} change: no old or new position", kind),
    }
}

pub fn classify_section<P>(change: SectionChange) -> EditOperation<P> {
    match change {
        SectionChange::Insert(index) => EditOperation::InsertSection { index },
        SectionChange::Delete(index) => EditOperation::DeleteSection { index },
    }
}
