//! Effective-fork resolution.
//!
//! The directory fork is only the default. Transition tests store their
//! pre-transition artifacts under the post-transition directory, and a
//! light-client directory may hold artifacts from several consecutive forks
//! distinguished only by slot or by the test-case name. Every override here
//! is advisory best effort: a missing or unparsable sidecar value degrades
//! to the directory fork with a logged warning, never a failure. Wrong
//! inference elsewhere would silently misinterpret the bytes, but *absent*
//! inference still has the directory fork to stand on.

use tracing::{debug, info, warn};

use crate::fixture::FixturePath;
use crate::forks::{ForkName, ForkSchedule};
use crate::sidecar::{
    FORK_BLOCK_KEYS, POST_FORK_KEYS, PRESET_BASE_KEY, Sidecar, SidecarSource,
};

/// Filename of the light-client initial snapshot, which always represents
/// pre-transition state and never leaves the directory fork.
const INITIAL_STATE_FILE: &str = "initial_state.ssz_snappy";

/// Filename prefixes that may carry a slot number.
const SLOT_PREFIXES: &[&str] = &[
    "update_",
    "optimistic_update_",
    "finality_update_",
    "bootstrap_",
    "block_",
];

/// Resolves the protocol fork to decode a fixture against.
///
/// Defaults to the directory fork; overridden by, in order: the
/// fork-category pre-state rule, the transition pre-state and block-index
/// rules, the light-client slot-boundary rule, and the light-client
/// multi-fork-name rule. The initial-snapshot filename is exempt from the
/// name rule unconditionally.
#[must_use]
pub fn resolve_fork(
    fixture: &FixturePath,
    schedule: &ForkSchedule,
    sidecars: &dyn SidecarSource,
) -> ForkName {
    let dir_fork = fixture.directory_fork().clone();

    match fixture.category() {
        "fork" if fixture.filename() == "pre.ssz_snappy" => {
            fork_category_pre(fixture, schedule, &dir_fork)
        },
        "transition" if fixture.filename() == "pre.ssz_snappy" => {
            transition_pre(fixture, schedule, sidecars, &dir_fork)
        },
        "transition" if fixture.filename().starts_with("blocks_") => {
            transition_block(fixture, schedule, sidecars, &dir_fork)
        },
        "light_client" => light_client(fixture, schedule, sidecars, &dir_fork),
        _ => dir_fork,
    }
}

/// Fork-category tests keep their pre-transition state under the
/// post-transition directory; read it under the predecessor.
fn fork_category_pre(
    fixture: &FixturePath,
    schedule: &ForkSchedule,
    dir_fork: &ForkName,
) -> ForkName {
    match schedule.predecessor_of(dir_fork) {
        Some(prev) => {
            info!(
                file = fixture.filename(),
                fork = %prev,
                directory_fork = %dir_fork,
                "fork test pre-state, using predecessor fork"
            );
            prev.clone()
        },
        None => {
            warn!(
                directory_fork = %dir_fork,
                "no predecessor known for fork test pre-state, keeping directory fork"
            );
            dir_fork.clone()
        },
    }
}

/// Multi-block transition tests name the post-transition fork in their
/// metadata; the pre-state decodes under its predecessor.
fn transition_pre(
    fixture: &FixturePath,
    schedule: &ForkSchedule,
    sidecars: &dyn SidecarSource,
    dir_fork: &ForkName,
) -> ForkName {
    let meta = load_or_empty(sidecars.test_meta(), fixture);
    let post_fork = post_fork_of(&meta, dir_fork);
    match schedule.predecessor_of(&post_fork) {
        Some(prev) => {
            info!(
                post_fork = %post_fork,
                fork = %prev,
                "transition pre-state, using predecessor of post fork"
            );
            prev.clone()
        },
        None => {
            warn!(
                post_fork = %post_fork,
                "no predecessor known for transition post fork, keeping directory fork"
            );
            dir_fork.clone()
        },
    }
}

/// Blocks in a transition test straddle the boundary: blocks at or before
/// the transition index decode under the predecessor, later ones under the
/// post-transition fork itself.
fn transition_block(
    fixture: &FixturePath,
    schedule: &ForkSchedule,
    sidecars: &dyn SidecarSource,
    dir_fork: &ForkName,
) -> ForkName {
    let Some(block_index) = block_index_of(fixture.filename()) else {
        warn!(
            file = fixture.filename(),
            "cannot parse block index from transition filename, keeping directory fork"
        );
        return dir_fork.clone();
    };

    let meta = load_or_empty(sidecars.test_meta(), fixture);
    let post_fork = post_fork_of(&meta, dir_fork);
    let Some(transition_index) = meta.get_u64(FORK_BLOCK_KEYS) else {
        warn!(
            file = fixture.filename(),
            "transition metadata has no fork block index, keeping directory fork"
        );
        return dir_fork.clone();
    };

    if block_index <= transition_index {
        match schedule.predecessor_of(&post_fork) {
            Some(prev) => {
                info!(
                    block_index,
                    transition_index,
                    fork = %prev,
                    "transition block at or before boundary, using predecessor fork"
                );
                prev.clone()
            },
            None => {
                warn!(
                    post_fork = %post_fork,
                    "no predecessor known for transition post fork, keeping directory fork"
                );
                dir_fork.clone()
            },
        }
    } else {
        info!(
            block_index,
            transition_index,
            fork = %post_fork,
            "transition block past boundary, using post fork"
        );
        post_fork
    }
}

/// Light-client directories mix artifacts from consecutive forks. A slot
/// number in the filename places the artifact against the configured
/// activation epochs; failing that, fork names embedded in the test-case
/// name pick the newest named fork. The initial snapshot is exempt: it is
/// pre-transition state by construction.
fn light_client(
    fixture: &FixturePath,
    schedule: &ForkSchedule,
    sidecars: &dyn SidecarSource,
    dir_fork: &ForkName,
) -> ForkName {
    if let Some(slot) = slot_of(fixture.filename()) {
        // A slot number always claims the decision, even when the
        // configuration is absent and no adjustment can be computed.
        return slot_boundary(fixture, schedule, sidecars, dir_fork, slot);
    }

    if fixture.filename() == INITIAL_STATE_FILE {
        return dir_fork.clone();
    }

    let test_case = fixture.test_case().unwrap_or_default();
    let embedded = schedule.names_in(test_case);
    if embedded.is_empty() || fixture.suite() == "sync" {
        // Sync-suite artifacts may straddle an unknown boundary; the
        // dispatcher's retry policy covers them instead.
        return dir_fork.clone();
    }

    let selected = embedded[embedded.len() - 1].clone();
    if selected != *dir_fork {
        info!(
            test_case,
            fork = %selected,
            directory_fork = %dir_fork,
            "light-client test name embeds fork names, using newest"
        );
    }
    selected
}

/// Walks the schedule from the directory fork, advancing past every fork
/// whose activation epoch (from the per-directory configuration) is at or
/// before the artifact's epoch.
fn slot_boundary(
    fixture: &FixturePath,
    schedule: &ForkSchedule,
    sidecars: &dyn SidecarSource,
    dir_fork: &ForkName,
    slot: u64,
) -> ForkName {
    let config = load_or_empty(sidecars.dir_config(), fixture);
    let slots_per_epoch = match config.get_str(&[PRESET_BASE_KEY]) {
        Some(base) if base.eq_ignore_ascii_case("minimal") => 8,
        Some(_) => 32,
        None => fixture.preset().default_slots_per_epoch(),
    };
    let epoch = slot / slots_per_epoch;

    let mut selected = dir_fork.clone();
    for fork in schedule.ordered_from(dir_fork) {
        let key = format!("{}_FORK_EPOCH", fork.as_str().to_ascii_uppercase());
        let Some(activation) = config.get_u64(&[key.as_str()]) else {
            // No activation epoch recorded for this fork; keep scanning.
            continue;
        };
        if epoch >= activation {
            selected = fork.clone();
        } else {
            break;
        }
    }

    if selected != *dir_fork {
        info!(
            slot,
            epoch,
            fork = %selected,
            directory_fork = %dir_fork,
            "light-client artifact past activation epoch, advancing fork"
        );
    } else {
        debug!(slot, epoch, fork = %selected, "light-client artifact within directory fork");
    }
    selected
}

fn load_or_empty(
    result: Result<Sidecar, crate::sidecar::SidecarError>,
    fixture: &FixturePath,
) -> Sidecar {
    result.unwrap_or_else(|e| {
        warn!(
            path = %fixture.path().display(),
            error = %e,
            "sidecar unreadable, continuing with empty metadata"
        );
        Sidecar::default()
    })
}

fn post_fork_of(meta: &Sidecar, dir_fork: &ForkName) -> ForkName {
    meta.get_str(POST_FORK_KEYS)
        .map_or_else(|| dir_fork.clone(), ForkName::new)
}

/// Parses the block index from `blocks_<N>.ssz_snappy`.
fn block_index_of(filename: &str) -> Option<u64> {
    filename
        .split('_')
        .nth(1)?
        .split('.')
        .next()?
        .parse()
        .ok()
}

/// First numeric `_`-separated token of a slot-prefixed filename.
fn slot_of(filename: &str) -> Option<u64> {
    if !SLOT_PREFIXES.iter().any(|p| filename.starts_with(p)) {
        return None;
    }
    filename.split('_').find_map(|token| token.parse().ok())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use serde_yaml::Value;

    use super::*;
    use crate::sidecar::StaticSidecars;

    fn fixture(path: &str) -> FixturePath {
        FixturePath::decompose(Path::new(path)).unwrap()
    }

    fn resolve(path: &str, sidecars: &StaticSidecars) -> ForkName {
        let schedule = ForkSchedule::builtin();
        resolve_fork(&fixture(path), &schedule, sidecars)
    }

    #[test]
    fn directory_fork_is_the_default() {
        let fork = resolve(
            "tests/minimal/capella/operations/attestation/pyspec_tests/case_0/attestation.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("capella"));
    }

    #[test]
    fn fork_test_pre_state_uses_predecessor() {
        let fork = resolve(
            "tests/minimal/altair/fork/fork/pyspec_tests/fork_base_state/pre.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("phase0"));
    }

    #[test]
    fn genesis_fork_pre_state_degrades_to_directory_fork() {
        let fork = resolve(
            "tests/minimal/phase0/fork/fork/pyspec_tests/case/pre.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("phase0"));
    }

    #[test]
    fn transition_pre_state_uses_predecessor_of_post_fork() {
        let sidecars = StaticSidecars {
            meta: Sidecar::from_pairs([("post_fork", Value::String("electra".into()))]),
            ..Default::default()
        };
        let fork = resolve(
            "tests/minimal/electra/transition/core/pyspec_tests/transition_case/pre.ssz_snappy",
            &sidecars,
        );
        assert_eq!(fork, ForkName::new("deneb"));
    }

    #[test]
    fn transition_blocks_straddle_the_boundary() {
        let sidecars = StaticSidecars {
            meta: Sidecar::from_pairs([
                ("post_fork", Value::String("capella".into())),
                ("fork_block", Value::Number(3.into())),
            ]),
            ..Default::default()
        };
        let before = resolve(
            "tests/minimal/capella/transition/core/pyspec_tests/case/blocks_3.ssz_snappy",
            &sidecars,
        );
        assert_eq!(before, ForkName::new("bellatrix"));

        let after = resolve(
            "tests/minimal/capella/transition/core/pyspec_tests/case/blocks_4.ssz_snappy",
            &sidecars,
        );
        assert_eq!(after, ForkName::new("capella"));
    }

    #[test]
    fn transition_block_without_metadata_keeps_directory_fork() {
        let fork = resolve(
            "tests/minimal/capella/transition/core/pyspec_tests/case/blocks_0.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("capella"));
    }

    #[test]
    fn slot_boundary_advances_past_activation_epoch() {
        // Minimal preset: 8 slots per epoch, so slot 100 is epoch 12.
        let sidecars = StaticSidecars {
            config: Sidecar::from_pairs([
                ("PRESET_BASE", Value::String("minimal".into())),
                ("ALTAIR_FORK_EPOCH", Value::Number(0.into())),
                ("BELLATRIX_FORK_EPOCH", Value::Number(10.into())),
                ("CAPELLA_FORK_EPOCH", Value::Number(20.into())),
            ]),
            ..Default::default()
        };
        let fork = resolve(
            "tests/minimal/altair/light_client/sync/pyspec_tests/case/update_100_0xab.ssz_snappy",
            &sidecars,
        );
        assert_eq!(fork, ForkName::new("bellatrix"));
    }

    #[test]
    fn slot_boundary_stops_at_unreached_fork() {
        let sidecars = StaticSidecars {
            config: Sidecar::from_pairs([
                ("PRESET_BASE", Value::String("minimal".into())),
                ("BELLATRIX_FORK_EPOCH", Value::Number(100.into())),
            ]),
            ..Default::default()
        };
        let fork = resolve(
            "tests/minimal/altair/light_client/sync/pyspec_tests/case/update_40_0xab.ssz_snappy",
            &sidecars,
        );
        assert_eq!(fork, ForkName::new("altair"));
    }

    #[test]
    fn slot_number_suppresses_name_rule_even_without_config() {
        let fork = resolve(
            "tests/minimal/deneb/light_client/data_collection/pyspec_tests/deneb_electra_reorg/block_64_0xab.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("deneb"));
    }

    #[test]
    fn name_rule_picks_newest_embedded_fork() {
        let fork = resolve(
            "tests/minimal/deneb/light_client/data_collection/pyspec_tests/deneb_electra_reorg_aligned/bootstrap_0xab.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("electra"));
    }

    #[test]
    fn sync_suite_is_exempt_from_name_rule() {
        let fork = resolve(
            "tests/minimal/deneb/light_client/sync/pyspec_tests/deneb_electra_reorg_aligned/bootstrap_0xab.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("deneb"));
    }

    #[test]
    fn initial_state_always_keeps_directory_fork() {
        let fork = resolve(
            "tests/minimal/deneb/light_client/data_collection/pyspec_tests/deneb_electra_reorg_aligned/initial_state.ssz_snappy",
            &StaticSidecars::default(),
        );
        assert_eq!(fork, ForkName::new("deneb"));
    }

    #[test]
    fn mainnet_preset_defaults_to_32_slots_per_epoch() {
        // Slot 100 is epoch 3 on mainnet; bellatrix activates at epoch 4.
        let sidecars = StaticSidecars {
            config: Sidecar::from_pairs([
                ("ALTAIR_FORK_EPOCH", Value::Number(0.into())),
                ("BELLATRIX_FORK_EPOCH", Value::Number(4.into())),
            ]),
            ..Default::default()
        };
        let fork = resolve(
            "tests/mainnet/altair/light_client/sync/pyspec_tests/case/update_100_0xab.ssz_snappy",
            &sidecars,
        );
        assert_eq!(fork, ForkName::new("altair"));
    }

    #[test]
    fn block_index_parsing() {
        assert_eq!(block_index_of("blocks_0.ssz_snappy"), Some(0));
        assert_eq!(block_index_of("blocks_17.ssz_snappy"), Some(17));
        assert_eq!(block_index_of("blocks_x.ssz_snappy"), None);
    }

    #[test]
    fn slot_parsing() {
        assert_eq!(slot_of("update_100_0xab.ssz_snappy"), Some(100));
        assert_eq!(slot_of("finality_update_64_0xab.ssz_snappy"), Some(64));
        assert_eq!(slot_of("bootstrap_0xab.ssz_snappy"), None);
        assert_eq!(slot_of("anchor_state.ssz_snappy"), None);
    }
}
