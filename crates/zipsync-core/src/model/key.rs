use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A value that identifies one entity within its collection.
///
/// Keys are totally ordered; the reconciler relies on the ordering to merge
/// incoming and stored collections in one pass. Within one committed
/// collection at most one entity holds a given key.
pub trait UniqueKey: Ord + Hash + Clone + Debug + Display + Send + Sync + 'static {}

impl UniqueKey for String {}
impl UniqueKey for i16 {}
impl UniqueKey for i32 {}
impl UniqueKey for i64 {}
impl UniqueKey for u32 {}
impl UniqueKey for u64 {}
impl UniqueKey for uuid::Uuid {}

/// Anything that can report the unique key it stands for.
///
/// Implemented by both stored entities and the intermediate records that
/// describe them.
pub trait UniqueIdentifiable {
    type Key: UniqueKey;

    fn unique_key(&self) -> Self::Key;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagged(i64);

    impl UniqueIdentifiable for Tagged {
        type Key = i64;

        fn unique_key(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_keys_sort_by_natural_order() {
        let mut items = vec![Tagged(3), Tagged(-1), Tagged(2)];
        items.sort_by_key(|t| t.unique_key());
        let keys: Vec<i64> = items.iter().map(|t| t.unique_key()).collect();
        assert_eq!(keys, vec![-1, 2, 3]);
    }

    #[test]
    fn test_string_keys_sort_lexicographically() {
        let mut keys = vec!["b".to_string(), "a10".to_string(), "a2".to_string()];
        keys.sort();
        assert_eq!(keys, vec!["a10", "a2", "b"]);
    }
}
