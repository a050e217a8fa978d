//! Import configuration.
//!
//! Loaded from TOML by the CLI; every field has a default so an empty file
//! is valid.
//!
//! ```toml
//! batch_size = 1000
//!
//! [cache]
//! count_limit = 10000
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{Result, ZipSyncError};

/// Default number of intermediates reconciled per saved chunk
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportOptions {
    /// Intermediates per chunk; each chunk is reconciled and saved on its own
    pub batch_size: usize,
    /// Identity cache limits; no cache is used when absent
    pub cache: Option<CacheOptions>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cache: None,
        }
    }
}

impl ImportOptions {
    /// # Errors
    ///
    /// Returns `InvalidConfig` when `batch_size` is 0.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ZipSyncError::InvalidConfig {
                reason: "batch_size must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Parse and validate options from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed TOML and `InvalidConfig` for
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let options: ImportOptions =
            toml::from_str(text).map_err(|e| ZipSyncError::Serialization {
                message: e.to_string(),
            })?;
        options.validate()?;
        Ok(options)
    }
}

/// Limits for the identity cache; 0 means unlimited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheOptions {
    pub count_limit: usize,
    pub total_cost_limit: usize,
}
