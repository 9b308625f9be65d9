//! `sszkit decode` - resolve one fixture and decode it.
//!
//! Exit codes: 0 on success, 2 when the fixture is intentionally outside
//! resolver coverage (malformed path, no type rule, no schema: an expected
//! skip, not a bug), 1 on unexpected errors.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use sszkit_core::decode::{DispatchError, Dispatcher, effective_preset};
use sszkit_core::registry::TypeRegistry;
use sszkit_core::{ResolvedTarget, Resolver, StaticCatalog};

use super::{EXIT_ERROR, EXIT_OK, EXIT_SKIP, load_schedule};
use crate::external::CommandDecoder;

/// Arguments for the `decode` command.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Path to the binary fixture.
    pub fixture: PathBuf,

    /// Where to write the rendered output; stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// External decoder program. Receives `--fork/--preset/--type` and the
    /// blob on stdin; must write the rendered form to stdout. Without one,
    /// the command stops after schema resolution.
    #[arg(long)]
    pub decoder: Option<PathBuf>,

    /// Specification constants file to load the fork schedule from.
    #[arg(long)]
    pub spec_constants: Option<PathBuf>,
}

/// Runs the `decode` command.
pub fn run(args: &DecodeArgs) -> u8 {
    if !args.fixture.exists() {
        eprintln!("error: fixture does not exist: {}", args.fixture.display());
        return EXIT_ERROR;
    }

    let schedule = match load_schedule(args.spec_constants.as_deref()) {
        Ok(schedule) => schedule,
        Err(e) => {
            eprintln!("error: {e:#}");
            return EXIT_ERROR;
        },
    };
    let resolver = Resolver::new(&schedule);

    let target = match resolver.resolve(&args.fixture) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("skipping fixture: {e}");
            return EXIT_SKIP;
        },
    };

    println!("Detected configuration:");
    println!("  Preset: {}", target.preset);
    println!("  Fork:   {}", target.fork);
    println!("  Type:   {}", target.type_name);
    println!("  File:   {}", target.filename);
    println!();

    let registry = StaticCatalog::new(schedule.clone());

    let Some(decoder) = &args.decoder else {
        // Resolution-only run: confirm a schema exists and stop.
        let preset = effective_preset(target.preset);
        return match registry.resolve(&target.fork, preset, &target.type_name) {
            Ok(_) => {
                println!("Schema resolved; no decoder configured, stopping after resolution.");
                EXIT_OK
            },
            Err(e) => {
                eprintln!("skipping fixture: {e}");
                EXIT_SKIP
            },
        };
    };

    let bytes = match fs::read(&args.fixture) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: cannot read fixture: {e}");
            return EXIT_ERROR;
        },
    };

    let decoder = CommandDecoder::new(decoder);
    let dispatcher = Dispatcher::new(&registry, &decoder);
    match dispatcher.resolve_and_decode(&target, &bytes) {
        Ok(decoded) => {
            if decoded.fork != target.fork {
                println!("Decoded under alternate fork: {}", decoded.fork);
            }
            emit(args, &target, &decoded.object)
        },
        Err(e @ DispatchError::Registry(_)) => {
            eprintln!("skipping fixture: {e}");
            EXIT_SKIP
        },
        Err(e) => {
            eprintln!("error: {e}");
            EXIT_ERROR
        },
    }
}

fn emit(args: &DecodeArgs, target: &ResolvedTarget, rendered: &[u8]) -> u8 {
    match &args.output {
        Some(out) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("error: cannot create {}: {e}", parent.display());
                    return EXIT_ERROR;
                }
            }
            if let Err(e) = fs::write(out, rendered) {
                eprintln!("error: cannot write {}: {e}", out.display());
                return EXIT_ERROR;
            }
            println!("Exported {} to: {}", target.type_name, out.display());
            EXIT_OK
        },
        None => {
            println!("{}", String::from_utf8_lossy(rendered));
            EXIT_OK
        },
    }
}
