//! `sszkit missing` - batch-decode every companion-less fixture.
//!
//! Resolution failures are expected for corners of the corpus the resolver
//! does not cover; they are tallied as skips. Only a missing tests
//! directory fails the command.

use std::path::PathBuf;

use clap::Args;
use sszkit_core::batch::{self, BatchSummary, Disposition};
use sszkit_core::decode::Dispatcher;
use sszkit_core::{Resolver, StaticCatalog};

use super::{EXIT_ERROR, EXIT_OK, load_schedule, tests_dir};
use crate::external::{CommandDecoder, FileRenderer};

/// Arguments for the `missing` command.
#[derive(Debug, Args)]
pub struct MissingArgs {
    /// Corpus version identifier (e.g. v1.6.0).
    pub version: String,

    /// Directory holding the downloaded corpora.
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// External decoder program; same contract as `decode --decoder`.
    #[arg(long)]
    pub decoder: PathBuf,

    /// Specification constants file to load the fork schedule from.
    #[arg(long)]
    pub spec_constants: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

/// Runs the `missing` command.
pub fn run(args: &MissingArgs) -> u8 {
    let tests = tests_dir(&args.data_dir, &args.version);

    let schedule = match load_schedule(args.spec_constants.as_deref()) {
        Ok(schedule) => schedule,
        Err(e) => {
            eprintln!("error: {e:#}");
            return EXIT_ERROR;
        },
    };
    let resolver = Resolver::new(&schedule);
    let registry = StaticCatalog::new(schedule.clone());
    let decoder = CommandDecoder::new(&args.decoder);
    let dispatcher = Dispatcher::new(&registry, &decoder);

    let summary = match batch::decode_missing(&tests, &resolver, &dispatcher, &FileRenderer) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_ERROR;
        },
    };

    if args.format == "json" {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: cannot serialize summary: {e}");
                return EXIT_ERROR;
            },
        }
        return EXIT_OK;
    }

    print_text(&summary);
    EXIT_OK
}

fn print_text(summary: &BatchSummary) {
    println!("Decoded:  {}", summary.decoded);
    println!("Skipped:  {}", summary.skipped);
    println!("Failed:   {}", summary.failed);

    if summary.failed > 0 {
        println!();
        println!("Failures:");
        for outcome in &summary.outcomes {
            if outcome.disposition == Disposition::Failed {
                println!(
                    "  {} - {}",
                    outcome.path,
                    outcome.detail.as_deref().unwrap_or("unknown")
                );
            }
        }
    }
}
