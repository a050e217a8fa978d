//! Snapshot diff command
//!
//! Usage: zipsync diff --old <JSON> --new <JSON>

use std::path::PathBuf;

use clap::Args;
use serde_json::Value;
use zipsync_core::diff::{edits_for_snapshots, Snapshot};

use super::read_json;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Snapshot before the change: JSON array of named sections
    #[arg(long)]
    pub old: PathBuf,

    /// Snapshot after the change
    #[arg(long)]
    pub new: PathBuf,
}

/// Execute diff command
pub fn execute(args: DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let old: Snapshot<String, Value> = read_json(&args.old)?;
    let new: Snapshot<String, Value> = read_json(&args.new)?;

    let edits = edits_for_snapshots(&old, &new);

    println!("{}", serde_json::to_string_pretty(&edits)?);
    Ok(())
}
