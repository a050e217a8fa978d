//! Operation boundary macros.
//!
//! Every event carries `component`, `op` and `event`. The remaining fields are
//! supplied at the call site using the names in `zipsync_core_types::schema`.

/// Log the start of an operation
///
/// ```
/// # use zipsync_core::log_op_start;
/// log_op_start!("reconcile");
/// log_op_start!("reconcile", entity = "Event", batch_len = 12usize);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = zipsync_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = zipsync_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log a checkpoint inside a running operation at debug level
///
/// ```
/// # use zipsync_core::log_op_progress;
/// log_op_progress!("import_batch", completed = 10usize, total = 40usize);
/// ```
#[macro_export]
macro_rules! log_op_progress {
    ($op:expr, $($field:tt)*) => {
        tracing::debug!(
            component = module_path!(),
            op = $op,
            event = "progress",
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// ```
/// # use zipsync_core::log_op_end;
/// log_op_end!("reconcile", duration_ms = 3);
/// log_op_end!("reconcile", duration_ms = 3, inserted = 2usize, updated = 5usize);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = zipsync_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = zipsync_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation failure
///
/// The error is converted into an `ExError` to obtain its stable code.
///
/// ```
/// # use zipsync_core::{log_op_error, errors::ZipSyncError};
/// let err = ZipSyncError::StoreFetch {
///     entity: "Event".to_string(),
///     reason: "offline".to_string(),
/// };
/// log_op_error!("reconcile", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = zipsync_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            message = %ex_err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let ex_err: $crate::errors::ExError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = zipsync_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?ex_err.kind(),
            err_code = ex_err.code(),
            message = %ex_err,
            $($field)*
        );
    }};
}
