//! Sidecar metadata files.
//!
//! Two small YAML files may sit next to a fixture and override what the path
//! alone says: a per-test `meta.yaml` (post-transition fork, transition
//! block index) and a per-directory `config.yaml` (preset base, per-fork
//! activation epochs). Both are flat key/value mappings; an absent file is
//! an empty mapping, never an error. Parse failures surface as
//! [`SidecarError`] so the resolver can log and degrade to the directory
//! fork.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Per-test metadata filename.
pub const TEST_META_FILE: &str = "meta.yaml";

/// Per-directory configuration filename.
pub const DIR_CONFIG_FILE: &str = "config.yaml";

/// Accepted spellings for the post-transition fork key, in priority order.
pub const POST_FORK_KEYS: &[&str] = &["post_fork", "postFork"];

/// Accepted spellings for the transition block index key, in priority order.
pub const FORK_BLOCK_KEYS: &[&str] = &["fork_block", "transitionBlockIndex"];

/// Preset-base key in the per-directory configuration.
pub const PRESET_BASE_KEY: &str = "PRESET_BASE";

/// Errors raised while reading a sidecar file.
///
/// Never fatal to resolution; callers log and continue with the directory
/// fork.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SidecarError {
    /// The file exists but could not be read.
    #[error("cannot read sidecar {path}: {source}")]
    Io {
        /// The sidecar path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid YAML.
    #[error("cannot parse sidecar {path}: {source}")]
    Parse {
        /// The sidecar path.
        path: String,
        /// The underlying parse error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but is not a flat mapping.
    #[error("sidecar {path} is not a key/value mapping")]
    NotMapping {
        /// The sidecar path.
        path: String,
    },
}

/// A flat string-key mapping read from a sidecar file.
#[derive(Debug, Clone, Default)]
pub struct Sidecar {
    values: BTreeMap<String, serde_yaml::Value>,
}

impl Sidecar {
    /// Loads a sidecar file. An absent file yields an empty mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError`] when the file exists but cannot be read or
    /// is not a flat YAML mapping.
    pub fn load(path: &Path) -> Result<Self, SidecarError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(SidecarError::Io {
                    path: path.display().to_string(),
                    source: e,
                });
            },
        };

        let value: serde_yaml::Value =
            serde_yaml::from_str(&text).map_err(|e| SidecarError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        match value {
            serde_yaml::Value::Null => Ok(Self::default()),
            serde_yaml::Value::Mapping(mapping) => {
                let values = mapping
                    .into_iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v)))
                    .collect();
                Ok(Self { values })
            },
            _ => Err(SidecarError::NotMapping {
                path: path.display().to_string(),
            }),
        }
    }

    /// Builds a sidecar from literal pairs; test seam.
    #[must_use]
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_yaml::Value)>,
        K: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.values.get(key)
    }

    /// First string value found under any of `keys`.
    #[must_use]
    pub fn get_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.values.get(*k))
            .and_then(serde_yaml::Value::as_str)
    }

    /// First unsigned integer found under any of `keys`. String-typed
    /// digits are accepted; sidecars are hand-written and quoting varies.
    #[must_use]
    pub fn get_u64(&self, keys: &[&str]) -> Option<u64> {
        let value = keys.iter().find_map(|k| self.values.get(*k))?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }
}

/// Where a resolution gets its sidecar mappings from.
///
/// The filesystem implementation is [`DirSidecars`]; tests substitute
/// [`StaticSidecars`].
pub trait SidecarSource {
    /// The per-test metadata mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError`] when the backing file is unreadable or
    /// malformed; absence is an empty mapping, not an error.
    fn test_meta(&self) -> Result<Sidecar, SidecarError>;

    /// The per-directory configuration mapping.
    ///
    /// # Errors
    ///
    /// Returns [`SidecarError`] when the backing file is unreadable or
    /// malformed; absence is an empty mapping, not an error.
    fn dir_config(&self) -> Result<Sidecar, SidecarError>;
}

/// Sidecars read from the directory containing a fixture.
#[derive(Debug, Clone)]
pub struct DirSidecars {
    dir: PathBuf,
}

impl DirSidecars {
    /// Sidecar source rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sidecar source for the directory containing `fixture`.
    #[must_use]
    pub fn for_fixture(fixture: &Path) -> Self {
        Self::new(fixture.parent().unwrap_or_else(|| Path::new(".")))
    }
}

impl SidecarSource for DirSidecars {
    fn test_meta(&self) -> Result<Sidecar, SidecarError> {
        Sidecar::load(&self.dir.join(TEST_META_FILE))
    }

    fn dir_config(&self) -> Result<Sidecar, SidecarError> {
        Sidecar::load(&self.dir.join(DIR_CONFIG_FILE))
    }
}

/// In-memory sidecar source for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSidecars {
    /// Returned by [`SidecarSource::test_meta`].
    pub meta: Sidecar,
    /// Returned by [`SidecarSource::dir_config`].
    pub config: Sidecar,
}

impl SidecarSource for StaticSidecars {
    fn test_meta(&self) -> Result<Sidecar, SidecarError> {
        Ok(self.meta.clone())
    }

    fn dir_config(&self) -> Result<Sidecar, SidecarError> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_file_is_empty_mapping() {
        let sidecar = Sidecar::load(Path::new("/nonexistent/meta.yaml")).unwrap();
        assert!(sidecar.is_empty());
    }

    #[test]
    fn alternative_key_spellings() {
        let sidecar = Sidecar::from_pairs([
            ("postFork", serde_yaml::Value::String("electra".into())),
            ("fork_block", serde_yaml::Value::Number(3.into())),
        ]);
        assert_eq!(sidecar.get_str(POST_FORK_KEYS), Some("electra"));
        assert_eq!(sidecar.get_u64(FORK_BLOCK_KEYS), Some(3));
        assert_eq!(sidecar.get_str(&["absent"]), None);
    }

    #[test]
    fn string_typed_numbers_are_accepted() {
        let sidecar = Sidecar::from_pairs([("ALTAIR_FORK_EPOCH", serde_yaml::Value::String("74240".into()))]);
        assert_eq!(sidecar.get_u64(&["ALTAIR_FORK_EPOCH"]), Some(74_240));
    }

    #[test]
    fn loads_yaml_mapping_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TEST_META_FILE);
        std::fs::write(&path, "post_fork: capella\nfork_block: 7\n").unwrap();
        let sidecar = Sidecar::load(&path).unwrap();
        assert_eq!(sidecar.get_str(POST_FORK_KEYS), Some("capella"));
        assert_eq!(sidecar.get_u64(FORK_BLOCK_KEYS), Some(7));
    }

    #[test]
    fn non_mapping_yaml_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DIR_CONFIG_FILE);
        std::fs::write(&path, "- a\n- b\n").unwrap();
        assert!(matches!(
            Sidecar::load(&path),
            Err(SidecarError::NotMapping { .. })
        ));
    }
}
