//! Fixture path decomposition.
//!
//! Corpus layout is convention-heavy:
//!
//! ```text
//! <root>/<version>/<artifact-set>/tests/<preset>/<fork>/<category>/<suite>/.../<file>
//! ```
//!
//! Everything after the `tests` marker carries meaning. [`FixturePath`]
//! splits a path into those segments once, up front, and the resolver works
//! from the segments alone. Decomposition is a pure function of the path
//! string; nothing here touches the filesystem.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forks::ForkName;

/// Directory segment that anchors the conventional layout.
pub const ROOT_MARKER: &str = "tests";

/// Suffix identifying a binary fixture blob.
pub const SSZ_SUFFIX: &str = ".ssz_snappy";

/// Suffix appended to a binary fixture's name to form its rendered
/// companion (`X.ssz_snappy` -> `X.ssz_snappy.yaml`).
pub const COMPANION_SUFFIX: &str = ".yaml";

/// A named parameter set affecting bounded-collection capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Reduced-size preset used by fast test vectors.
    Minimal,
    /// Full-size production preset.
    Mainnet,
    /// Preset-independent vectors; aliased to [`Preset::Mainnet`] for schema
    /// lookup.
    General,
}

impl Preset {
    /// Parses a preset directory segment.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minimal" => Some(Self::Minimal),
            "mainnet" => Some(Self::Mainnet),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    /// Canonical directory-segment spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Mainnet => "mainnet",
            Self::General => "general",
        }
    }

    /// Slots per epoch when the sidecar configuration does not say
    /// otherwise: 8 for the reduced preset, 32 for the full-size ones.
    #[must_use]
    pub const fn default_slots_per_epoch(self) -> u64 {
        match self {
            Self::Minimal => 8,
            Self::Mainnet | Self::General => 32,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while decomposing a fixture path.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PathError {
    /// The path has no `tests` marker segment.
    #[error("path has no 'tests' marker segment: {path}")]
    MissingMarker {
        /// The offending path.
        path: String,
    },

    /// Fewer than four segments follow the marker.
    #[error("path too short, expected tests/<preset>/<fork>/<category>/<suite>/...: {path}")]
    TooShort {
        /// The offending path.
        path: String,
    },

    /// The preset segment is not a recognized preset name.
    #[error("unknown preset '{preset}' in path: {path}")]
    UnknownPreset {
        /// The unrecognized segment.
        preset: String,
        /// The offending path.
        path: String,
    },
}

/// A fixture path split into its conventional segments.
///
/// Immutable once built. `tail` holds every segment strictly after the
/// suite, filename last; it may be empty when the path ends at the suite.
#[derive(Debug, Clone)]
pub struct FixturePath {
    path: PathBuf,
    preset: Preset,
    fork: ForkName,
    category: String,
    suite: String,
    tail: Vec<String>,
    filename: String,
}

impl FixturePath {
    /// Decomposes a path into its conventional segments.
    ///
    /// The *last* `tests` segment anchors the split, which tolerates corpus
    /// archives that nest the tree one level deeper (`.../tests/tests/...`).
    ///
    /// # Errors
    ///
    /// Fails fast with the offending path when the marker is absent, fewer
    /// than four segments follow it, or the preset segment is unrecognized.
    pub fn decompose(path: &Path) -> Result<Self, PathError> {
        let segments: Vec<&str> = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(os) => os.to_str(),
                _ => None,
            })
            .collect();

        let marker = segments
            .iter()
            .rposition(|s| *s == ROOT_MARKER)
            .ok_or_else(|| PathError::MissingMarker {
                path: path.display().to_string(),
            })?;

        // preset, fork, category, suite must all be present after the marker.
        if segments.len() < marker + 5 {
            return Err(PathError::TooShort {
                path: path.display().to_string(),
            });
        }

        let preset = Preset::parse(segments[marker + 1]).ok_or_else(|| PathError::UnknownPreset {
            preset: segments[marker + 1].to_string(),
            path: path.display().to_string(),
        })?;
        let fork = ForkName::new(segments[marker + 2]);
        let category = segments[marker + 3].to_string();
        let suite = segments[marker + 4].to_string();
        let tail: Vec<String> = segments[marker + 5..].iter().map(|s| (*s).to_string()).collect();
        let filename = segments
            .last()
            .map(|s| (*s).to_string())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            preset,
            fork,
            category,
            suite,
            tail,
            filename,
        })
    }

    /// The full path this fixture was decomposed from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The parameter-set segment.
    #[must_use]
    pub const fn preset(&self) -> Preset {
        self.preset
    }

    /// The fork named by the directory layout. The *effective* fork may
    /// differ; see the resolver.
    #[must_use]
    pub const fn directory_fork(&self) -> &ForkName {
        &self.fork
    }

    /// The test category segment (`operations`, `light_client`, ...).
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// The test suite segment (`attestation`, `sync`, ...).
    #[must_use]
    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Segments strictly after the suite, filename last.
    #[must_use]
    pub fn tail(&self) -> &[String] {
        &self.tail
    }

    /// The final path component.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The test-case directory name (second tail segment), when present.
    ///
    /// Light-client trees nest as `<suite>/<runner>/<test_case>/<file>`, so
    /// the case name sits two levels below the suite.
    #[must_use]
    pub fn test_case(&self) -> Option<&str> {
        self.tail.get(1).map(String::as_str)
    }

    /// The segment immediately after the suite, when present.
    ///
    /// Single-object-proof suites store the schema type name here.
    #[must_use]
    pub fn segment_after_suite(&self) -> Option<&str> {
        self.tail.first().map(String::as_str)
    }

    /// The four-segment category key (`preset/fork/category/suite`).
    #[must_use]
    pub fn category_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.preset, self.fork, self.category, self.suite
        )
    }

    /// Whether this path names a binary fixture blob.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.filename.ends_with(SSZ_SUFFIX)
    }
}

/// Builds the four-segment category key from path segments, shared between
/// [`FixturePath::category_key`] and the completeness auditor (which works
/// from paths relative to the tree root rather than marker-anchored ones).
#[must_use]
pub fn category_key_of(segments: &[String]) -> Option<String> {
    if segments.len() < 4 {
        return None;
    }
    Some(segments[..4].join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decompose(path: &str) -> Result<FixturePath, PathError> {
        FixturePath::decompose(Path::new(path))
    }

    #[test]
    fn decomposes_conventional_path() {
        let fx = decompose(
            "data/v1.6.0/tests/mainnet/gloas/ssz_static/IndexedPayloadAttestation/ssz_random/case_0/serialized.ssz_snappy",
        )
        .unwrap();
        assert_eq!(fx.preset(), Preset::Mainnet);
        assert_eq!(fx.directory_fork(), &ForkName::new("gloas"));
        assert_eq!(fx.category(), "ssz_static");
        assert_eq!(fx.suite(), "IndexedPayloadAttestation");
        assert_eq!(fx.filename(), "serialized.ssz_snappy");
        assert_eq!(fx.tail(), ["ssz_random", "case_0", "serialized.ssz_snappy"]);
        assert!(fx.is_binary());
    }

    #[test]
    fn anchors_on_last_marker_for_doubled_trees() {
        let fx = decompose(
            "data/v1.6.0/tests/tests/minimal/altair/operations/attestation/pyspec_tests/case_0/pre.ssz_snappy",
        )
        .unwrap();
        assert_eq!(fx.preset(), Preset::Minimal);
        assert_eq!(fx.category(), "operations");
    }

    #[test]
    fn test_case_is_second_tail_segment() {
        let fx = decompose(
            "x/tests/minimal/deneb/light_client/sync/pyspec_tests/deneb_electra_reorg_aligned/update_100_0xabc.ssz_snappy",
        )
        .unwrap();
        assert_eq!(fx.test_case(), Some("deneb_electra_reorg_aligned"));
        assert_eq!(fx.segment_after_suite(), Some("pyspec_tests"));
    }

    #[test]
    fn missing_marker_fails() {
        assert!(matches!(
            decompose("data/minimal/altair/operations/attestation/pre.ssz_snappy"),
            Err(PathError::MissingMarker { .. })
        ));
    }

    #[test]
    fn short_path_fails_without_guessing() {
        assert!(matches!(
            decompose("data/tests/minimal/altair/operations"),
            Err(PathError::TooShort { .. })
        ));
    }

    #[test]
    fn unknown_preset_fails() {
        let err = decompose("data/tests/minimall/altair/operations/attestation/pre.ssz_snappy")
            .unwrap_err();
        assert!(matches!(err, PathError::UnknownPreset { .. }));
    }

    #[test]
    fn category_key_needs_four_segments() {
        let segments: Vec<String> = ["minimal", "altair", "operations", "attestation", "x"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            category_key_of(&segments).as_deref(),
            Some("minimal/altair/operations/attestation")
        );
        assert_eq!(category_key_of(&segments[..3]), None);
    }

    #[test]
    fn preset_defaults() {
        assert_eq!(Preset::Minimal.default_slots_per_epoch(), 8);
        assert_eq!(Preset::Mainnet.default_slots_per_epoch(), 32);
        assert_eq!(Preset::parse("general"), Some(Preset::General));
        assert_eq!(Preset::parse("medium"), None);
    }
}
