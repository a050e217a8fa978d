//! zipsync CLI
//!
//! Command-line front end for reconciling record fixtures and diffing
//! list snapshots.

use clap::{Parser, Subcommand};
use zipsync_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "zipsync")]
#[command(about = "zipsync - keyed reconciliation and list diffing", long_about = None)]
struct Cli {
    /// Log output: dev, prod or off
    #[arg(long, global = true, default_value = "off")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Reconcile incoming records against existing ones
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Compute list edits between two snapshots
    Diff(commands::diff::DiffArgs),
}

fn main() {
    let cli = Cli::parse();

    if cli.log != "off" {
        match cli.log.parse::<Profile>() {
            Ok(profile) => logging_facility::init(profile),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(2);
            }
        }
    }

    let result = match cli.command {
        Commands::Reconcile(args) => commands::reconcile::execute(args),
        Commands::Diff(args) => commands::diff::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
