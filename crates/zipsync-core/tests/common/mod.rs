use zipsync_core::ops::CommitSet;
use zipsync_core::{
    Entity, KeyedStore, MemoryStore, Record, RecordInput, Result, StableId, ZipSyncError,
};

/// Create a store holding one committed record per key
#[allow(dead_code)]
pub fn seeded_store(keys: &[&str]) -> MemoryStore<Record> {
    let mut store = MemoryStore::new();
    for key in keys {
        store
            .insert_committed(Record::with_key(key.to_string()))
            .unwrap();
    }
    store
}

/// One bare intermediate per key, in the given order
#[allow(dead_code)]
pub fn inputs(keys: &[&str]) -> Vec<RecordInput> {
    keys.iter().map(|k| RecordInput::new(*k)).collect()
}

/// Keys of every committed record, sorted
#[allow(dead_code)]
pub fn stored_keys(store: &MemoryStore<Record>) -> Vec<String> {
    let mut keys: Vec<String> = store
        .all_sorted()
        .into_iter()
        .map(|(_, record)| record.key.clone())
        .collect();
    keys.sort();
    keys
}

/// Store whose key lookup always fails; everything else is delegated
#[allow(dead_code)]
pub struct FailingFetchStore {
    pub inner: MemoryStore<Record>,
}

impl KeyedStore<Record> for FailingFetchStore {
    fn fetch_sorted(&self, _keys: &[String]) -> Result<Vec<(StableId, Record)>> {
        Err(ZipSyncError::StoreFetch {
            entity: "Record".to_string(),
            reason: "backend offline".to_string(),
        })
    }

    fn get(&self, id: StableId) -> Result<Option<Record>> {
        self.inner.get(id)
    }

    fn fetch_matching(&self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<(StableId, Record)>> {
        self.inner.fetch_matching(predicate)
    }

    fn count(&self) -> Result<usize> {
        self.inner.count()
    }

    fn allocate_ids(&mut self, n: usize) -> Vec<StableId> {
        self.inner.allocate_ids(n)
    }

    fn commit(&mut self, writes: CommitSet<Record>) -> Result<()> {
        self.inner.commit(writes)
    }

    fn batch_delete(&mut self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<StableId>> {
        self.inner.batch_delete(predicate)
    }
}
