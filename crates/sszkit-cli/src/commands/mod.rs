//! Subcommand implementations.
//!
//! Each `run` returns a process exit code rather than a `Result`, so the
//! entry point can hand the shell exactly the code the command decided on.

pub mod audit;
pub mod decode;
pub mod missing;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sszkit_core::ForkSchedule;

/// Success.
pub const EXIT_OK: u8 = 0;

/// Unexpected error.
pub const EXIT_ERROR: u8 = 1;

/// Expected skip: the fixture is intentionally outside resolver coverage.
pub const EXIT_SKIP: u8 = 2;

/// Corpus layout: `<data-dir>/<version>/tests`.
pub fn tests_dir(data_dir: &Path, version: &str) -> PathBuf {
    data_dir.join(version).join("tests")
}

/// Loads the fork schedule: the given specification constants file, or the
/// built-in table when none is configured.
///
/// # Errors
///
/// Fails when the configured file cannot be read or parsed; an explicitly
/// configured artifact is not silently ignored.
pub fn load_schedule(spec_constants: Option<&Path>) -> Result<ForkSchedule> {
    let Some(path) = spec_constants else {
        return Ok(ForkSchedule::builtin());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read spec constants {}", path.display()))?;
    ForkSchedule::from_spec_constants(&content)
        .with_context(|| format!("cannot parse spec constants {}", path.display()))
}
