//! Import Tests
//!
//! ## Scenarios Covered
//!
//! 1. Relationships resolve entities created by the properties pass of the same chunk
//! 2. Unknown parents get a placeholder record
//! 3. Chunked imports save per chunk and report progress over both passes
//! 4. Cancellation discards the in-flight chunk and keeps earlier ones
//! 5. A failing callback rolls back the current chunk
//! 6. Batch delete removes committed records directly

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{seeded_store, stored_keys};
use zipsync_core::{
    batch_delete, import_batch, CancelFlag, EntityCache, ImportOptions, ImportProgress,
    KeyedStore, MemoryStore, Record, RecordInput, StableId, ZipSyncError,
};

fn options(batch_size: usize) -> ImportOptions {
    ImportOptions {
        batch_size,
        cache: None,
    }
}

fn record<'a>(store: &'a MemoryStore<Record>, key: &str) -> (StableId, &'a Record) {
    let matches: Vec<(StableId, &Record)> = store
        .all_sorted()
        .into_iter()
        .filter(|(_, r)| r.key == key)
        .collect();
    assert_eq!(matches.len(), 1, "expected exactly one record for {}", key);
    matches[0]
}

#[test]
fn test_relationship_to_key_in_same_chunk_reuses_inserted_entity() {
    // GIVEN a child whose parent is created by the same batch
    let mut store = MemoryStore::<Record>::new();
    let batch = vec![
        RecordInput::new("child")
            .with_field("name", "c")
            .with_parent("parent"),
        RecordInput::new("parent").with_field("name", "p"),
    ];

    // WHEN the batch is imported
    let changes = import_batch(
        &mut store,
        &batch,
        &ImportOptions::default(),
        None,
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    // THEN exactly two records exist and the child links to the parent
    assert_eq!(changes.inserted().len(), 2);
    assert_eq!(stored_keys(&store), vec!["child", "parent"]);
    let (parent_id, parent) = record(&store, "parent");
    let (_, child) = record(&store, "child");
    assert_eq!(child.parent, Some(parent_id));
    assert_eq!(parent.fields["name"], "p");
}

#[test]
fn test_unknown_parent_creates_placeholder() {
    let mut store = MemoryStore::<Record>::new();
    let batch = vec![RecordInput::new("orphan").with_parent("ghost")];

    let changes = import_batch(
        &mut store,
        &batch,
        &ImportOptions::default(),
        None,
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    assert_eq!(changes.inserted().len(), 2);
    let (ghost_id, ghost) = record(&store, "ghost");
    assert!(ghost.fields.is_empty());
    assert_eq!(record(&store, "orphan").1.parent, Some(ghost_id));
}

#[test]
fn test_parent_in_later_chunk_is_found_after_earlier_save() {
    // GIVEN a parent that sorts before its child and chunks of one record
    let mut store = MemoryStore::<Record>::new();
    let batch = vec![
        RecordInput::new("a-parent"),
        RecordInput::new("b-child").with_parent("a-parent"),
    ];

    // WHEN imported chunk by chunk
    import_batch(
        &mut store,
        &batch,
        &options(1),
        None,
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    // THEN the child links to the committed parent without a placeholder
    assert_eq!(store.len(), 2);
    let (parent_id, _) = record(&store, "a-parent");
    assert_eq!(record(&store, "b-child").1.parent, Some(parent_id));
}

#[test]
fn test_chunks_are_saved_and_progress_covers_both_passes() {
    // GIVEN 5 records and chunks of 2
    let mut store = seeded_store(&["r1"]);
    let batch: Vec<RecordInput> = (1..=5)
        .map(|n| RecordInput::new(format!("r{}", n)).with_field("n", n))
        .collect();
    let mut reports: Vec<ImportProgress> = Vec::new();

    // WHEN imported
    let changes = import_batch(
        &mut store,
        &batch,
        &options(2),
        None,
        &CancelFlag::new(),
        |p| reports.push(p),
    )
    .unwrap();

    // THEN one existing record is updated and four are inserted
    assert_eq!(changes.updated().len(), 1);
    assert_eq!(changes.inserted().len(), 4);
    assert_eq!(store.len(), 5);

    // AND progress counts one step per record per pass
    assert_eq!(reports.len(), 10);
    assert!(reports.iter().all(|p| p.total == 10));
    assert_eq!(reports.last().map(|p| p.completed), Some(10));
    assert!(reports.windows(2).all(|w| w[0].completed < w[1].completed));
}

#[test]
fn test_cancel_before_start_commits_nothing() {
    let mut store = MemoryStore::<Record>::new();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let result = import_batch(
        &mut store,
        &common::inputs(&["a", "b"]),
        &ImportOptions::default(),
        None,
        &cancel,
        |_| {},
    );

    assert_eq!(
        result.unwrap_err(),
        ZipSyncError::Cancelled {
            committed_batches: 0
        }
    );
    assert!(store.is_empty());
}

#[test]
fn test_cancel_mid_import_discards_in_flight_chunk() {
    // GIVEN 4 records in chunks of 2, cancelled during the second chunk
    let mut store = MemoryStore::<Record>::new();
    let batch = common::inputs(&["a", "b", "c", "d"]);
    let cancel = CancelFlag::new();
    let trigger = cancel.clone();

    // WHEN the import runs
    let result = import_batch(
        &mut store,
        &batch,
        &options(2),
        None,
        &cancel,
        |p| {
            if p.completed == 5 {
                trigger.cancel();
            }
        },
    );

    // THEN the first chunk stays committed and the second is discarded
    assert_eq!(
        result.unwrap_err(),
        ZipSyncError::Cancelled {
            committed_batches: 1
        }
    );
    assert_eq!(stored_keys(&store), vec!["a", "b"]);
}

#[test]
fn test_callback_error_rolls_back_chunk() {
    // GIVEN a chunk where one record names itself as parent
    let mut store = MemoryStore::<Record>::new();
    let batch = vec![
        RecordInput::new("ok"),
        RecordInput::new("self").with_parent("self"),
    ];

    // WHEN imported
    let result = import_batch(
        &mut store,
        &batch,
        &ImportOptions::default(),
        None,
        &CancelFlag::new(),
        |_| {},
    );

    // THEN the error surfaces and nothing from the chunk is committed
    assert!(matches!(result, Err(ZipSyncError::InvalidInput { ref key, .. }) if key == "self"));
    assert!(store.is_empty());
}

#[test]
fn test_import_with_cache_registers_every_record() {
    let mut store = MemoryStore::<Record>::new();
    let cache = EntityCache::new();
    let batch = vec![
        RecordInput::new("a").with_parent("b"),
        RecordInput::new("b"),
    ];

    import_batch(
        &mut store,
        &batch,
        &ImportOptions::default(),
        Some(&cache),
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(cache.len(), 2);

    // AND a re-import served from the cache inserts nothing
    let again = import_batch(
        &mut store,
        &batch,
        &ImportOptions::default(),
        Some(&cache),
        &CancelFlag::new(),
        |_| {},
    )
    .unwrap();
    assert!(again.inserted().is_empty());
    assert_eq!(store.len(), 2);
}

#[test]
fn test_batch_delete_removes_matching_records() {
    let mut store = seeded_store(&["keep", "drop-1", "drop-2"]);

    let removed = batch_delete(&mut store, |r: &Record| r.key.starts_with("drop")).unwrap();

    assert_eq!(removed.len(), 2);
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(stored_keys(&store), vec!["keep"]);
}
