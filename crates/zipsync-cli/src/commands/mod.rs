pub mod diff;
pub mod reconcile;

use std::path::Path;

use serde::de::DeserializeOwned;

/// Parse a JSON fixture file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let value = serde_json::from_str(&text)
        .map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))?;
    Ok(value)
}
