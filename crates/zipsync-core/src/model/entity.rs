use super::key::UniqueIdentifiable;

/// A persisted entity type that can be looked up by its unique key.
pub trait Entity: UniqueIdentifiable + Clone + std::fmt::Debug + Send + 'static {
    /// Collection name, used in logs, errors and identity cache keys
    const ENTITY_NAME: &'static str;

    /// A blank entity carrying only its key
    fn with_key(key: Self::Key) -> Self;
}
