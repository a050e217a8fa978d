//! Two-cursor merge of key-sorted intermediates with key-sorted entities.

use crate::model::{EntityId, UniqueIdentifiable, UniqueKey};

/// What the reconciler decided for one intermediate
#[derive(Debug, PartialEq)]
pub enum Pairing<'a, I> {
    /// Matches an existing entity
    Update(&'a I, EntityId),
    /// Has no match; a new entity will be created for it
    Insert(&'a I),
}

impl<'a, I> Pairing<'a, I> {
    pub fn intermediate(&self) -> &'a I {
        match self {
            Pairing::Update(intermediate, _) | Pairing::Insert(intermediate) => intermediate,
        }
    }
}

/// Walk `sorted` and `existing` (both ascending by key) in one pass.
///
/// An existing entity whose key is below the current intermediate's key is
/// skipped. An equal key pairs both and advances both cursors. Otherwise the
/// intermediate becomes an insert and only its cursor advances.
///
/// Both inputs must already be sorted. Duplicate intermediate keys are not
/// detected: the first pairs with the existing entity and later ones become
/// inserts.
pub fn merge_sorted<'a, I, K>(sorted: &[&'a I], existing: &[(K, EntityId)]) -> Vec<Pairing<'a, I>>
where
    I: UniqueIdentifiable<Key = K>,
    K: UniqueKey,
{
    let mut pairings = Vec::with_capacity(sorted.len());
    let mut cursor = 0;

    for intermediate in sorted {
        let key = intermediate.unique_key();
        while cursor < existing.len() && existing[cursor].0 < key {
            cursor += 1;
        }
        match existing.get(cursor) {
            Some((existing_key, id)) if *existing_key == key => {
                pairings.push(Pairing::Update(*intermediate, *id));
                cursor += 1;
            }
            _ => pairings.push(Pairing::Insert(*intermediate)),
        }
    }

    pairings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StableId;

    #[derive(Debug, PartialEq)]
    struct Key(&'static str);

    impl UniqueIdentifiable for Key {
        type Key = String;

        fn unique_key(&self) -> String {
            self.0.to_string()
        }
    }

    fn existing(keys: &[&str]) -> Vec<(String, EntityId)> {
        keys.iter()
            .map(|k| (k.to_string(), EntityId::Stable(StableId::new())))
            .collect()
    }

    #[test]
    fn test_skips_existing_entities_below_current_key() {
        let stored = existing(&["a", "b", "d"]);
        let incoming = [Key("b"), Key("c"), Key("d")];
        let sorted: Vec<&Key> = incoming.iter().collect();

        let pairings = merge_sorted(&sorted, &stored);

        assert_eq!(
            pairings,
            vec![
                Pairing::Update(&incoming[0], stored[1].1),
                Pairing::Insert(&incoming[1]),
                Pairing::Update(&incoming[2], stored[2].1),
            ]
        );
    }

    #[test]
    fn test_duplicate_intermediate_key_inserts_second_copy() {
        let stored = existing(&["a"]);
        let incoming = [Key("a"), Key("a")];
        let sorted: Vec<&Key> = incoming.iter().collect();

        let pairings = merge_sorted(&sorted, &stored);

        assert!(matches!(pairings[0], Pairing::Update(_, _)));
        assert!(matches!(pairings[1], Pairing::Insert(_)));
    }
}
