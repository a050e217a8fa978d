//! Reconcile command
//!
//! Usage: zipsync reconcile --incoming <JSON> [--existing <JSON>] [--config <TOML>]
//!        [--output <JSON>] [--dry-run]

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use zipsync_core::{
    check_unique_keys, reconcile, Context, EntityCache, EntityId, ImportOptions, MemoryStore,
    Record, RecordInput,
};
use zipsync_engine::StoreWorker;

use super::read_json;

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// JSON array of records already stored
    #[arg(long)]
    pub existing: Option<PathBuf>,

    /// JSON array of incoming records
    #[arg(long)]
    pub incoming: PathBuf,

    /// TOML file with import options
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the reconciled records here as a JSON array
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Only pair records with existing ones; change nothing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ReconcileReport {
    dry_run: bool,
    inserted_keys: Vec<String>,
    updated_keys: Vec<String>,
    inserted: usize,
    updated: usize,
    total: usize,
}

/// Execute reconcile command
pub fn execute(args: ReconcileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let options = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            ImportOptions::from_toml_str(&text)?
        }
        None => ImportOptions::default(),
    };

    let existing: Vec<Record> = match &args.existing {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let incoming: Vec<RecordInput> = read_json(&args.incoming)?;
    check_unique_keys::<Record, _>(&incoming)?;

    let mut store = MemoryStore::new().with_unique_keys(true);
    for record in existing {
        store.insert_committed(record)?;
    }
    let cache = options.cache.as_ref().map(EntityCache::from_options);

    let report = if args.dry_run {
        plan_only(&mut store, &incoming, cache.as_ref())?
    } else {
        let worker = StoreWorker::spawn(store, cache)?;
        let changes = worker.submit_import(incoming, options)?.wait()?;
        store = worker.shutdown()?;

        let key_of = |id| store.stored(id).map(|s| s.entity.key.clone());
        let inserted_keys: BTreeSet<String> =
            changes.inserted().iter().filter_map(|id| key_of(*id)).collect();
        let updated_keys: BTreeSet<String> =
            changes.updated().iter().filter_map(|id| key_of(*id)).collect();
        ReconcileReport {
            dry_run: false,
            inserted: inserted_keys.len(),
            updated: updated_keys.len(),
            inserted_keys: inserted_keys.into_iter().collect(),
            updated_keys: updated_keys.into_iter().collect(),
            total: store.len(),
        }
    };

    if let (Some(path), false) = (&args.output, args.dry_run) {
        let records: Vec<&Record> = store.all_sorted().into_iter().map(|(_, r)| r).collect();
        std::fs::write(path, serde_json::to_string_pretty(&records)?)
            .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn plan_only(
    store: &mut MemoryStore<Record>,
    incoming: &[RecordInput],
    cache: Option<&EntityCache>,
) -> Result<ReconcileReport, Box<dyn std::error::Error>> {
    let total_before = store.len();
    let mut ctx = Context::new(store);
    let outcome = reconcile(&mut ctx, incoming, cache)?;
    ctx.rollback();

    Ok(ReconcileReport {
        dry_run: true,
        inserted: outcome.to_insert.len(),
        updated: outcome.to_update.len(),
        inserted_keys: keys(&outcome.to_insert),
        updated_keys: keys(&outcome.to_update),
        total: total_before + outcome.to_insert.len(),
    })
}

fn keys(pairs: &[(&RecordInput, EntityId)]) -> Vec<String> {
    pairs.iter().map(|(input, _)| input.key.clone()).collect()
}
