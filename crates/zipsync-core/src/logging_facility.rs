//! Structured logging for reconciliation, import and diff operations
//!
//! One initialization point (`init(profile)`), a small set of operation
//! macros that every instrumented boundary uses, and an in-memory capture
//! layer for asserting on emitted events in tests.
//!
//! ```rust
//! use zipsync_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```
//!
//! # Macros
//!
//! - `log_op_start!(op, ...)` at the top of an operation
//! - `log_op_progress!(op, ...)` for intermediate checkpoints (chunk saves, batch flushes)
//! - `log_op_end!(op, duration_ms = ..., ...)` on success
//! - `log_op_error!(op, err, duration_ms = ..., ...)` on failure

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
