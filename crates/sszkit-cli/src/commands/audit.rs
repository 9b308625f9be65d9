//! `sszkit audit` - report binary fixtures without a rendered companion.

use std::path::PathBuf;

use clap::Args;
use sszkit_core::audit::{AuditError, CompletenessReport, audit};

use super::{EXIT_ERROR, EXIT_OK, tests_dir};

/// Arguments for the `audit` command.
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Corpus version identifier (e.g. v1.6.0).
    pub version: String,

    /// Directory holding the downloaded corpora.
    #[arg(long, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Output format.
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,
}

/// Runs the `audit` command.
///
/// Exits non-zero only when the tests directory is missing; an incomplete
/// corpus is a finding, not a failure.
pub fn run(args: &AuditArgs) -> u8 {
    let tests = tests_dir(&args.data_dir, &args.version);

    let report = match audit(&tests) {
        Ok(report) => report,
        Err(e @ AuditError::RootNotFound { .. }) => {
            eprintln!("error: {e}");
            eprintln!("download the corpus for {} into {} first", args.version, args.data_dir.display());
            return EXIT_ERROR;
        },
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_ERROR;
        },
    };

    if args.format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: cannot serialize report: {e}");
                return EXIT_ERROR;
            },
        }
        return EXIT_OK;
    }

    print_text(&report, &tests.display().to_string());
    EXIT_OK
}

fn print_text(report: &CompletenessReport, tests: &str) {
    println!("Checking for missing companions in: {tests}");
    println!();
    println!("Total binary fixtures: {}", report.total_binary);
    println!("Fixtures with companions: {}", report.with_companion);
    println!("Fixtures WITHOUT companions: {}", report.missing);
    println!();

    if report.is_complete() {
        println!("All binary fixtures have rendered companions.");
        return;
    }

    println!("Missing companions by test category:");
    println!("{}", "=".repeat(80));
    for entry in &report.missing_by_category {
        println!("{:<70} {:>6} files", entry.key, entry.count);
    }
    println!();
    println!("Total: {} fixtures missing companions", report.missing);
    println!();
    println!("Individual fixtures missing companions:");
    println!("{}", "=".repeat(80));
    for path in &report.missing_paths {
        println!("{tests}/{path}");
    }
    println!();
    println!("Run `sszkit missing` with an external decoder to generate them.");
}
