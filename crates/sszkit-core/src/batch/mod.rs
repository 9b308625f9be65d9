//! Batch decode of companion-less fixtures.
//!
//! Drives the resolver and dispatcher over every binary fixture the audit
//! reports as missing a companion, rendering each decoded object next to
//! its blob through the external [`Renderer`] seam. Resolution-layer
//! failures are expected for corners of the corpus this resolver does not
//! cover; they are tallied as skips and never abort the run. Decode and
//! render failures are hard errors, also tallied per fixture.

use std::fs;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::audit::{AuditError, audit};
use crate::decode::{Decoder, Dispatcher, DispatchError};
use crate::fixture::COMPANION_SUFFIX;
use crate::registry::TypeRegistry;
use crate::resolve::Resolver;

/// The external serializer rejected or failed to write an object.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct RenderError {
    /// Collaborator-supplied failure detail.
    pub reason: String,
}

impl RenderError {
    /// Wraps a failure reason from the external serializer.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External human-readable serialization seam.
pub trait Renderer<T> {
    /// Renders `object` to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the object cannot be serialized or the
    /// file cannot be written.
    fn render(&self, object: &T, out: &Path) -> Result<(), RenderError>;
}

/// How one fixture fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Decoded and rendered.
    Decoded,
    /// Expected skip: malformed path, no type rule, or no schema.
    Skipped,
    /// Unexpected failure: unreadable blob, decode or render error.
    Failed,
}

/// Per-fixture outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FixtureOutcome {
    /// Root-relative fixture path.
    pub path: String,
    /// How the fixture fared.
    pub disposition: Disposition,
    /// Skip or failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tallies for one batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Fixtures decoded and rendered.
    pub decoded: usize,
    /// Expected skips.
    pub skipped: usize,
    /// Hard failures.
    pub failed: usize,
    /// Per-fixture outcomes, in audit (lexicographic) order.
    pub outcomes: Vec<FixtureOutcome>,
}

/// Decodes and renders every companion-less fixture under `tests_root`.
///
/// `tests_root` is the corpus tests directory; its final component is the
/// conventional `tests` marker the resolver anchors on.
///
/// # Errors
///
/// Returns [`AuditError`] when the tree cannot be enumerated. Per-fixture
/// trouble never fails the run; it lands in the summary.
pub fn decode_missing<R, D, S>(
    tests_root: &Path,
    resolver: &Resolver<'_>,
    dispatcher: &Dispatcher<'_, R, D>,
    renderer: &S,
) -> Result<BatchSummary, AuditError>
where
    R: TypeRegistry,
    D: Decoder<R::Handle>,
    S: Renderer<D::Object>,
{
    let report = audit(tests_root)?;
    let mut summary = BatchSummary::default();

    for relative in &report.missing_paths {
        let outcome = process_one(tests_root, relative, resolver, dispatcher, renderer);
        match outcome.disposition {
            Disposition::Decoded => summary.decoded += 1,
            Disposition::Skipped => summary.skipped += 1,
            Disposition::Failed => summary.failed += 1,
        }
        summary.outcomes.push(outcome);
    }

    info!(
        decoded = summary.decoded,
        skipped = summary.skipped,
        failed = summary.failed,
        "batch decode complete"
    );
    Ok(summary)
}

fn process_one<R, D, S>(
    tests_root: &Path,
    relative: &str,
    resolver: &Resolver<'_>,
    dispatcher: &Dispatcher<'_, R, D>,
    renderer: &S,
) -> FixtureOutcome
where
    R: TypeRegistry,
    D: Decoder<R::Handle>,
    S: Renderer<D::Object>,
{
    let path = tests_root.join(relative);

    let target = match resolver.resolve(&path) {
        Ok(target) => target,
        Err(e) => {
            warn!(path = relative, error = %e, "fixture not resolvable, skipping");
            return FixtureOutcome {
                path: relative.to_string(),
                disposition: Disposition::Skipped,
                detail: Some(e.to_string()),
            };
        },
    };

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return FixtureOutcome {
                path: relative.to_string(),
                disposition: Disposition::Failed,
                detail: Some(format!("cannot read fixture: {e}")),
            };
        },
    };

    let decoded = match dispatcher.resolve_and_decode(&target, &bytes) {
        Ok(decoded) => decoded,
        Err(e @ DispatchError::Registry(_)) => {
            warn!(path = relative, error = %e, "no schema for fixture, skipping");
            return FixtureOutcome {
                path: relative.to_string(),
                disposition: Disposition::Skipped,
                detail: Some(e.to_string()),
            };
        },
        Err(e) => {
            return FixtureOutcome {
                path: relative.to_string(),
                disposition: Disposition::Failed,
                detail: Some(e.to_string()),
            };
        },
    };

    let companion = path.with_file_name(format!("{}{COMPANION_SUFFIX}", target.filename));
    match renderer.render(&decoded.object, &companion) {
        Ok(()) => FixtureOutcome {
            path: relative.to_string(),
            disposition: Disposition::Decoded,
            detail: None,
        },
        Err(e) => FixtureOutcome {
            path: relative.to_string(),
            disposition: Disposition::Failed,
            detail: Some(e.to_string()),
        },
    }
}
