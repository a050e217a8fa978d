//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_REQUEST_ID: &str = "request_id";
pub const FIELD_QUEUED_MS: &str = "queued_ms";
pub const FIELD_JOB_ID: &str = "job_id";

// Entity identifiers
pub const FIELD_ENTITY: &str = "entity";
pub const FIELD_UNIQUE_KEY: &str = "unique_key";

// Collection sizes
pub const FIELD_BATCH_LEN: &str = "batch_len";
pub const FIELD_FETCHED: &str = "fetched";
pub const FIELD_INSERTED: &str = "inserted";
pub const FIELD_UPDATED: &str = "updated";
pub const FIELD_DELETED: &str = "deleted";
pub const FIELD_EDITS: &str = "edits";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
