//! Protocol fork identities and the fork transition schedule.
//!
//! Every fixture decodes against exactly one protocol fork. The corpus does
//! not record the fork inside the blob, so resolution leans on the directory
//! fork plus a process-wide [`ForkSchedule`]: the ordered list of known forks
//! and each fork's immediate predecessor. The schedule is built once at
//! startup (either the built-in table or one parsed from the upstream
//! specification's constants file) and injected by reference everywhere it is
//! needed, so tests can substitute their own table.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fork names in activation order, as shipped with this build.
///
/// `eip7805` is a feature fork layered on `electra`; it sits between
/// `electra` and `fulu` in scan order even though it is not on the mainline
/// predecessor chain.
pub const KNOWN_FORKS: &[&str] = &[
    "phase0",
    "altair",
    "bellatrix",
    "capella",
    "deneb",
    "electra",
    "eip7805",
    "fulu",
    "gloas",
];

/// Built-in predecessor links, `(fork, predecessor)`.
///
/// `phase0` is the genesis fork and carries no entry. Feature forks
/// (`eip7805`) branch from the mainline, so two forks may share a
/// predecessor; every non-genesis fork still has exactly one.
const BUILTIN_PREDECESSORS: &[(&str, &str)] = &[
    ("altair", "phase0"),
    ("bellatrix", "altair"),
    ("capella", "bellatrix"),
    ("deneb", "capella"),
    ("electra", "deneb"),
    ("eip7805", "electra"),
    ("fulu", "electra"),
    ("gloas", "fulu"),
];

static PREVIOUS_FORK_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"PREVIOUS_FORK_OF\s*=\s*\{([^}]*)\}").expect("previous-fork regex is valid")
});

/// A protocol fork identifier (`phase0`, `altair`, ...).
///
/// Stored lowercase; comparisons are exact after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForkName(String);

impl ForkName {
    /// Creates a fork name, normalizing to lowercase.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_ascii_lowercase())
    }

    /// Returns the fork name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ForkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ForkName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors raised while building or validating a fork schedule.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleError {
    /// The specification artifact has no `PREVIOUS_FORK_OF` block.
    #[error("specification artifact has no PREVIOUS_FORK_OF block")]
    MissingTransitionBlock,

    /// The artifact's transition block parsed to an empty mapping.
    #[error("PREVIOUS_FORK_OF block contains no fork entries")]
    EmptyTransitionBlock,

    /// Following predecessor links from a fork does not terminate.
    #[error("predecessor links from fork '{fork}' do not terminate")]
    UnterminatedChain {
        /// The fork whose chain loops.
        fork: String,
    },
}

/// The process-wide fork transition table.
///
/// Read-only after construction. Holds the forks in activation order plus
/// each fork's immediate predecessor (`None` for the genesis fork).
#[derive(Debug, Clone)]
pub struct ForkSchedule {
    order: Vec<ForkName>,
    predecessor: HashMap<ForkName, Option<ForkName>>,
}

impl ForkSchedule {
    /// Builds the schedule shipped with this build.
    #[must_use]
    pub fn builtin() -> Self {
        let order: Vec<ForkName> = KNOWN_FORKS.iter().map(ForkName::new).collect();
        let mut predecessor: HashMap<ForkName, Option<ForkName>> =
            order.iter().map(|f| (f.clone(), None)).collect();
        for (fork, prev) in BUILTIN_PREDECESSORS {
            predecessor.insert(ForkName::new(fork), Some(ForkName::new(prev)));
        }
        Self { order, predecessor }
    }

    /// Parses a schedule out of the upstream specification's constants file.
    ///
    /// The artifact is a Python source file containing a block of the form
    /// `PREVIOUS_FORK_OF = { ALTAIR: PHASE0, ... }`. Entry order in the block
    /// is taken as activation order. A `None` predecessor marks the genesis
    /// fork.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::MissingTransitionBlock`] when no block is
    /// found, [`ScheduleError::EmptyTransitionBlock`] when the block has no
    /// usable entries, and [`ScheduleError::UnterminatedChain`] when the
    /// parsed links contain a cycle.
    pub fn from_spec_constants(content: &str) -> Result<Self, ScheduleError> {
        let captures = PREVIOUS_FORK_BLOCK
            .captures(content)
            .ok_or(ScheduleError::MissingTransitionBlock)?;
        let block = captures.get(1).map_or("", |m| m.as_str());

        let mut order = Vec::new();
        let mut predecessor = HashMap::new();
        for line in block.lines() {
            let line = line.trim().trim_end_matches(',');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let fork = ForkName::new(key.trim());
            let value = value.trim();
            let prev = if value.is_empty() || value == "None" {
                None
            } else {
                Some(ForkName::new(value))
            };
            if !predecessor.contains_key(&fork) {
                order.push(fork.clone());
            }
            predecessor.insert(fork, prev);
        }

        if order.is_empty() {
            return Err(ScheduleError::EmptyTransitionBlock);
        }

        // A fork that appears only as someone's predecessor is still part of
        // the schedule; splice it in ahead of its first successor.
        let referenced: Vec<ForkName> = order
            .iter()
            .filter_map(|f| predecessor.get(f).cloned().flatten())
            .filter(|p| !predecessor.contains_key(p))
            .collect();
        for prev in referenced {
            if predecessor.contains_key(&prev) {
                continue;
            }
            predecessor.insert(prev.clone(), None);
            let at = order
                .iter()
                .position(|f| predecessor_in(&predecessor, f) == Some(&prev))
                .unwrap_or(0);
            order.insert(at, prev);
        }

        let schedule = Self { order, predecessor };
        schedule.validate()?;
        Ok(schedule)
    }

    /// The forks in activation order.
    #[must_use]
    pub fn ordered(&self) -> &[ForkName] {
        &self.order
    }

    /// The genesis fork (first in activation order), if the schedule is
    /// non-empty.
    #[must_use]
    pub fn genesis(&self) -> Option<&ForkName> {
        self.order.first()
    }

    /// Returns the immediate predecessor of `fork`, or `None` for the
    /// genesis fork and for forks this schedule does not know.
    #[must_use]
    pub fn predecessor_of(&self, fork: &ForkName) -> Option<&ForkName> {
        self.predecessor.get(fork).and_then(Option::as_ref)
    }

    /// Returns whether `fork` is part of this schedule.
    #[must_use]
    pub fn contains(&self, fork: &ForkName) -> bool {
        self.predecessor.contains_key(fork)
    }

    /// Position of `fork` in activation order.
    #[must_use]
    pub fn position_of(&self, fork: &ForkName) -> Option<usize> {
        self.order.iter().position(|f| f == fork)
    }

    /// The forks at or after `fork` in activation order.
    ///
    /// An unknown fork yields the full list, matching the resolver's
    /// best-effort posture: scanning from the start never skips a candidate.
    #[must_use]
    pub fn ordered_from(&self, fork: &ForkName) -> &[ForkName] {
        let start = self.position_of(fork).unwrap_or(0);
        &self.order[start..]
    }

    /// Known fork names appearing as substrings of `text`, in activation
    /// order. `text` is matched case-insensitively.
    #[must_use]
    pub fn names_in(&self, text: &str) -> Vec<ForkName> {
        let lower = text.to_ascii_lowercase();
        self.order
            .iter()
            .filter(|f| lower.contains(f.as_str()))
            .cloned()
            .collect()
    }

    /// Known fork names appearing as substrings of `text`, ordered by first
    /// occurrence offset. This is the retry-candidate order for fork-ambiguous
    /// paths.
    #[must_use]
    pub fn names_in_path_order(&self, text: &str) -> Vec<ForkName> {
        let lower = text.to_ascii_lowercase();
        let mut hits: Vec<(usize, &ForkName)> = self
            .order
            .iter()
            .filter_map(|f| lower.find(f.as_str()).map(|at| (at, f)))
            .collect();
        hits.sort_by_key(|(at, _)| *at);
        hits.into_iter().map(|(_, f)| f.clone()).collect()
    }

    /// Checks that predecessor links from every fork terminate.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::UnterminatedChain`] naming the first fork
    /// whose chain exceeds the schedule size (a cycle).
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let bound = self.predecessor.len();
        for fork in &self.order {
            let mut current = fork;
            let mut steps = 0usize;
            while let Some(prev) = self.predecessor_of(current) {
                steps += 1;
                if steps > bound {
                    return Err(ScheduleError::UnterminatedChain {
                        fork: fork.to_string(),
                    });
                }
                current = prev;
            }
        }
        Ok(())
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        Self::builtin()
    }
}

fn predecessor_in<'a>(
    predecessor: &'a HashMap<ForkName, Option<ForkName>>,
    fork: &ForkName,
) -> Option<&'a ForkName> {
    predecessor.get(fork).and_then(Option::as_ref)
}
