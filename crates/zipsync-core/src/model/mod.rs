pub mod entity;
pub mod entity_id;
pub mod key;
pub mod record;

pub use entity::Entity;
pub use entity_id::{EntityId, LocalHandle, StableId};
pub use key::{UniqueIdentifiable, UniqueKey};
pub use record::{Record, RecordInput};
