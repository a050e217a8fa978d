//! A schemaless keyed record, used by the CLI and in tests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::EntityCache;
use crate::errors::{Result, ZipSyncError};
use crate::import::Updatable;
use crate::model::{Entity, EntityId, StableId, UniqueIdentifiable};
use crate::ops::Context;

/// Stored form: a key, free-form fields and an optional parent link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<StableId>,
}

impl UniqueIdentifiable for Record {
    type Key = String;

    fn unique_key(&self) -> String {
        self.key.clone()
    }
}

impl Entity for Record {
    const ENTITY_NAME: &'static str = "Record";

    fn with_key(key: String) -> Self {
        Record {
            key,
            fields: Map::new(),
            parent: None,
        }
    }
}

/// Incoming form; `parent` names another record by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordInput {
    pub key: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl RecordInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: Map::new(),
            parent: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

impl UniqueIdentifiable for RecordInput {
    type Key = String;

    fn unique_key(&self) -> String {
        self.key.clone()
    }
}

impl Updatable for RecordInput {
    type Entity = Record;

    const HAS_RELATIONSHIPS: bool = true;

    fn update_properties(&self, record: &mut Record) -> Result<()> {
        record.fields = self.fields.clone();
        Ok(())
    }

    /// Link to the parent record, creating a placeholder when no record
    /// holds the parent key yet.
    fn update_relationships(
        &self,
        id: EntityId,
        ctx: &mut Context<'_, Record>,
        cache: Option<&EntityCache>,
    ) -> Result<()> {
        let parent = match &self.parent {
            None => None,
            Some(parent_key) if *parent_key == self.key => {
                return Err(ZipSyncError::InvalidInput {
                    key: self.key.clone(),
                    reason: "record cannot be its own parent".to_string(),
                });
            }
            Some(parent_key) => {
                let parent_id = ctx.fetch_or_insert(parent_key.clone(), cache)?;
                ctx.obtain_permanent_ids(&[parent_id])?.first().copied()
            }
        };
        if ctx.entity(id)?.parent != parent {
            ctx.entity_mut(id)?.parent = parent;
        }
        Ok(())
    }
}
