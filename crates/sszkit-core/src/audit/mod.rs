//! Corpus completeness audit.
//!
//! Every binary fixture is supposed to ship with a rendered companion file
//! (`X.ssz_snappy` next to `X.ssz_snappy.yaml`). The auditor walks the two
//! size-preset subtrees, counts binaries and companions, and reports the
//! gaps grouped by four-segment category key. Counts and orderings are
//! deterministic regardless of filesystem iteration order.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::fixture::{COMPANION_SUFFIX, SSZ_SUFFIX, category_key_of};

/// Preset subtrees the audit covers.
pub const AUDITED_PRESETS: &[&str] = &["minimal", "mainnet"];

/// Errors raised while auditing a corpus tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuditError {
    /// The tests directory does not exist.
    #[error("tests directory not found: {path}")]
    RootNotFound {
        /// The missing path.
        path: String,
    },

    /// A directory could not be walked.
    #[error("cannot walk {path}: {source}")]
    Walk {
        /// The directory that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Missing-companion count for one category key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// Four-segment category key (`preset/fork/category/suite`).
    pub key: String,
    /// Number of binaries in this category without a companion.
    pub count: usize,
}

/// Result of one audit run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletenessReport {
    /// Binary fixtures found.
    pub total_binary: usize,
    /// Binaries with a rendered companion.
    pub with_companion: usize,
    /// Binaries without one.
    pub missing: usize,
    /// Missing counts per category key, descending by count (ties by key).
    pub missing_by_category: Vec<CategoryCount>,
    /// Root-relative paths of companion-less binaries, lexicographic.
    ///
    /// Binaries shallower than four segments are counted in `missing` but
    /// carry no category key and are not listed.
    pub missing_paths: Vec<String>,
}

impl CompletenessReport {
    /// Whether every binary has its companion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing == 0
    }
}

struct Scan {
    total_binary: usize,
    with_companion: usize,
    missing: usize,
    by_category: BTreeMap<String, usize>,
    missing_paths: Vec<String>,
}

/// Audits the corpus tree rooted at `tests_root`.
///
/// Walks the preset subtrees in [`AUDITED_PRESETS`]; an absent preset
/// subtree is skipped, an absent root is an error.
///
/// # Errors
///
/// Returns [`AuditError::RootNotFound`] when `tests_root` is not a
/// directory and [`AuditError::Walk`] when a subdirectory cannot be read.
pub fn audit(tests_root: &Path) -> Result<CompletenessReport, AuditError> {
    if !tests_root.is_dir() {
        return Err(AuditError::RootNotFound {
            path: tests_root.display().to_string(),
        });
    }

    let mut scan = Scan {
        total_binary: 0,
        with_companion: 0,
        missing: 0,
        by_category: BTreeMap::new(),
        missing_paths: Vec::new(),
    };

    for preset in AUDITED_PRESETS {
        let preset_root = tests_root.join(preset);
        if !preset_root.is_dir() {
            debug!(preset, "preset subtree absent, skipping");
            continue;
        }
        visit(&preset_root, tests_root, &mut scan)?;
    }

    let mut missing_by_category: Vec<CategoryCount> = scan
        .by_category
        .into_iter()
        .map(|(key, count)| CategoryCount { key, count })
        .collect();
    missing_by_category.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));

    let mut missing_paths = scan.missing_paths;
    missing_paths.sort();

    info!(
        total = scan.total_binary,
        with_companion = scan.with_companion,
        missing = scan.missing,
        "audit complete"
    );

    Ok(CompletenessReport {
        total_binary: scan.total_binary,
        with_companion: scan.with_companion,
        missing: scan.missing,
        missing_by_category,
        missing_paths,
    })
}

fn visit(dir: &Path, root: &Path, scan: &mut Scan) -> Result<(), AuditError> {
    let entries = fs::read_dir(dir).map_err(|e| AuditError::Walk {
        path: dir.display().to_string(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| AuditError::Walk {
            path: dir.display().to_string(),
            source: e,
        })?;
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            visit(&path, root, scan)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(SSZ_SUFFIX) {
            continue;
        }

        scan.total_binary += 1;
        let companion = dir.join(format!("{name}{COMPANION_SUFFIX}"));
        if companion.is_file() {
            scan.with_companion += 1;
            continue;
        }

        scan.missing += 1;
        record_missing(&path, root, scan);
    }
    Ok(())
}

fn record_missing(path: &Path, root: &Path, scan: &mut Scan) {
    let Ok(relative) = path.strip_prefix(root) else {
        return;
    };
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let Some(key) = category_key_of(&segments) else {
        return;
    };
    *scan.by_category.entry(key).or_insert(0) += 1;
    scan.missing_paths.push(segments.join("/"));
}
