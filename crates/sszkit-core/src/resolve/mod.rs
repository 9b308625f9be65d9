//! Fixture resolution: path plus sidecars in, decode target out.
//!
//! [`Resolver`] ties the decomposer, the fork rules, and the type-name rules
//! together. Its output, [`ResolvedTarget`], is the sole handoff to the
//! decode dispatcher: it carries the decode coordinates, the filename for
//! error messages, and the pre-computed retry candidates for fork-ambiguous
//! sync fixtures, so the dispatcher never reaches back into the path.

mod fork_rules;
mod type_rules;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

pub use fork_rules::resolve_fork;
pub use type_rules::{RuleCtx, TYPE_RULES, TypeName, TypeRule, Unresolvable, derive_type_name};

use crate::fixture::{FixturePath, PathError, Preset};
use crate::forks::{ForkName, ForkSchedule};
use crate::sidecar::{DirSidecars, SidecarSource};

/// Everything the dispatcher needs to decode one fixture.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTarget {
    /// Parameter set for schema lookup.
    pub preset: Preset,
    /// The effective protocol fork.
    pub fork: ForkName,
    /// The schema type name.
    pub type_name: TypeName,
    /// The fixture filename, for error messages.
    pub filename: String,
    /// Alternate forks to retry on decode failure, in path-occurrence
    /// order. Empty outside light-client sync fixtures, whose directory
    /// naming is fork-ambiguous by design.
    pub fallback_forks: Vec<ForkName>,
}

/// Terminal resolution failures for a single fixture.
///
/// A batch run catches these per fixture and tallies skips separately from
/// hard errors; they never abort the batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The path does not match the conventional structure.
    #[error(transparent)]
    MalformedPath(#[from] PathError),

    /// No type-name rule matched.
    #[error(transparent)]
    Unresolvable(#[from] Unresolvable),
}

/// Maps a fixture path and its sidecars to a decode target.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    schedule: &'a ForkSchedule,
}

impl<'a> Resolver<'a> {
    /// A resolver over the given fork schedule.
    #[must_use]
    pub const fn new(schedule: &'a ForkSchedule) -> Self {
        Self { schedule }
    }

    /// The schedule this resolver consults.
    #[must_use]
    pub const fn schedule(&self) -> &'a ForkSchedule {
        self.schedule
    }

    /// Resolves a fixture path, reading sidecars from its directory.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the path is malformed or no type rule
    /// matches. Sidecar trouble never fails resolution; it degrades to the
    /// directory fork.
    pub fn resolve(&self, path: &Path) -> Result<ResolvedTarget, ResolveError> {
        let fixture = FixturePath::decompose(path)?;
        let sidecars = DirSidecars::for_fixture(fixture.path());
        self.resolve_fixture(&fixture, &sidecars)
    }

    /// Resolves an already-decomposed fixture against explicit sidecars.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Unresolvable`] when no type rule matches.
    pub fn resolve_fixture(
        &self,
        fixture: &FixturePath,
        sidecars: &dyn SidecarSource,
    ) -> Result<ResolvedTarget, ResolveError> {
        let fork = resolve_fork(fixture, self.schedule, sidecars);
        let type_name = derive_type_name(&RuleCtx::from_fixture(fixture))?;
        let fallback_forks = self.fallback_forks(fixture, &fork);

        Ok(ResolvedTarget {
            preset: fixture.preset(),
            fork,
            type_name,
            filename: fixture.filename().to_string(),
            fallback_forks,
        })
    }

    /// Retry candidates for fork-ambiguous fixtures: every known fork named
    /// anywhere in the path, minus the fork already chosen.
    fn fallback_forks(&self, fixture: &FixturePath, chosen: &ForkName) -> Vec<ForkName> {
        if fixture.category() != "light_client" || fixture.suite() != "sync" {
            return Vec::new();
        }
        self.schedule
            .names_in_path_order(&fixture.path().to_string_lossy())
            .into_iter()
            .filter(|f| f != chosen)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sidecar::StaticSidecars;

    fn resolver_target(path: &str) -> ResolvedTarget {
        let schedule = ForkSchedule::builtin();
        let resolver = Resolver::new(&schedule);
        let fixture = FixturePath::decompose(Path::new(path)).unwrap();
        resolver
            .resolve_fixture(&fixture, &StaticSidecars::default())
            .unwrap()
    }

    #[test]
    fn resolves_operations_fixture() {
        let target = resolver_target(
            "tests/mainnet/electra/operations/attestation/pyspec_tests/case_0/attestation.ssz_snappy",
        );
        assert_eq!(target.preset, Preset::Mainnet);
        assert_eq!(target.fork, ForkName::new("electra"));
        assert_eq!(target.type_name, "Attestation");
        assert_eq!(target.filename, "attestation.ssz_snappy");
        assert!(target.fallback_forks.is_empty());
    }

    #[test]
    fn sync_fixtures_carry_fallback_candidates() {
        let target = resolver_target(
            "tests/minimal/altair/light_client/sync/pyspec_tests/bellatrix_fork/update_0xab.ssz_snappy",
        );
        assert_eq!(target.fork, ForkName::new("altair"));
        assert_eq!(target.fallback_forks, vec![ForkName::new("bellatrix")]);
    }

    #[test]
    fn non_sync_fixtures_never_retry() {
        let target = resolver_target(
            "tests/minimal/altair/light_client/update_ranking/pyspec_tests/bellatrix_case/updates_0.ssz_snappy",
        );
        assert!(target.fallback_forks.is_empty());
    }

    #[test]
    fn malformed_path_fails_without_guessing() {
        let schedule = ForkSchedule::builtin();
        let resolver = Resolver::new(&schedule);
        let err = resolver
            .resolve(Path::new("somewhere/minimal/altair/pre.ssz_snappy"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::MalformedPath(_)));
    }
}
