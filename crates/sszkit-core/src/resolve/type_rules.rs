//! Schema type-name derivation.
//!
//! Which typed structure a blob holds is encoded in its category, suite, and
//! filename. Several rules could claim the same filename, so the cascade is
//! an explicit ordered table (priority is data, not nested control flow)
//! and each rule is a named function testable on its own.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::fixture::FixturePath;

/// A schema type name (`BeaconState`, `LightClientUpdate`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Wraps a type name verbatim.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// No rule matched and no default was possible.
///
/// Surfaced distinctly from decode failures: callers classify this as an
/// expected skip (generic and property-style fixtures sit outside this
/// resolver's coverage), not a bug.
#[derive(Debug, Clone, Error)]
#[error("no type rule matched category '{category}', suite '{suite}', file '{filename}'")]
pub struct Unresolvable {
    /// The category segment.
    pub category: String,
    /// The suite segment.
    pub suite: String,
    /// The fixture filename.
    pub filename: String,
}

/// Inputs a type rule may consult.
#[derive(Debug, Clone, Copy)]
pub struct RuleCtx<'a> {
    /// The category segment.
    pub category: &'a str,
    /// The suite segment.
    pub suite: &'a str,
    /// The fixture filename, suffix included.
    pub filename: &'a str,
    /// Path segments after the suite, filename last.
    pub tail: &'a [String],
}

impl<'a> RuleCtx<'a> {
    /// Rule context for a decomposed fixture path.
    #[must_use]
    pub fn from_fixture(fixture: &'a FixturePath) -> Self {
        Self {
            category: fixture.category(),
            suite: fixture.suite(),
            filename: fixture.filename(),
            tail: fixture.tail(),
        }
    }
}

/// One entry of the derivation cascade.
pub struct TypeRule {
    /// Stable rule name, for logs and rule-level tests.
    pub name: &'static str,
    matcher: fn(&RuleCtx<'_>) -> Option<TypeName>,
}

impl TypeRule {
    /// Applies this rule alone.
    #[must_use]
    pub fn apply(&self, ctx: &RuleCtx<'_>) -> Option<TypeName> {
        (self.matcher)(ctx)
    }
}

/// The derivation cascade, highest priority first.
pub static TYPE_RULES: &[TypeRule] = &[
    TypeRule { name: "state-filename", matcher: state_filename },
    TypeRule { name: "fixed-filename", matcher: fixed_filename },
    TypeRule { name: "ssz-static-suite", matcher: ssz_static_suite },
    TypeRule { name: "single-object-proof", matcher: single_object_proof },
    TypeRule { name: "fork-choice-input", matcher: fork_choice_input },
    TypeRule { name: "light-client-file", matcher: light_client_file },
    TypeRule { name: "rewards-deltas", matcher: rewards_deltas },
    TypeRule { name: "genesis-file", matcher: genesis_file },
    TypeRule { name: "unsigned-block-suite", matcher: unsigned_block_suite },
    TypeRule { name: "generic-block", matcher: generic_block },
    TypeRule { name: "operations-suite", matcher: operations_suite },
    TypeRule { name: "suite-pascal-case", matcher: suite_pascal_case },
];

/// Derives the schema type name for a fixture.
///
/// Pure function of the context: identical inputs always yield the identical
/// type name. Rules are tried in [`TYPE_RULES`] order; first match wins.
///
/// # Errors
///
/// Returns [`Unresolvable`] when no rule matches, including the default
/// (only possible with an empty suite).
pub fn derive_type_name(ctx: &RuleCtx<'_>) -> Result<TypeName, Unresolvable> {
    for rule in TYPE_RULES {
        if let Some(type_name) = rule.apply(ctx) {
            debug!(rule = rule.name, type_name = %type_name, file = ctx.filename, "type rule matched");
            return Ok(type_name);
        }
    }
    Err(Unresolvable {
        category: ctx.category.to_string(),
        suite: ctx.suite.to_string(),
        filename: ctx.filename.to_string(),
    })
}

/// Full protocol state snapshots, whatever the category.
fn state_filename(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    matches!(
        ctx.filename,
        "pre.ssz_snappy"
            | "post.ssz_snappy"
            | "pre_epoch.ssz_snappy"
            | "post_epoch.ssz_snappy"
            | "initial_state.ssz_snappy"
    )
    .then(|| TypeName::new("BeaconState"))
}

/// Fixed filename-to-type overrides.
fn fixed_filename(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    match ctx.filename {
        "body.ssz_snappy" => Some(TypeName::new("BeaconBlockBody")),
        "signed_envelope.ssz_snappy" => Some(TypeName::new("SignedExecutionPayloadEnvelope")),
        _ => None,
    }
}

/// In `ssz_static` trees the suite segment IS the type name.
fn ssz_static_suite(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    (ctx.category == "ssz_static").then(|| TypeName::new(ctx.suite))
}

/// Single-object-proof suites name the type as a path segment, not in the
/// filename: `.../single_merkle_proof/<TypeName>/<case>/object.ssz_snappy`.
fn single_object_proof(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    if !matches!(ctx.category, "light_client" | "merkle_proof")
        || ctx.suite != "single_merkle_proof"
        || ctx.filename != "object.ssz_snappy"
    {
        return None;
    }
    // tail is [<TypeName>, ..., object.ssz_snappy]; a tail holding only the
    // filename has no type segment to read.
    if ctx.tail.len() < 2 {
        return None;
    }
    ctx.tail.first().map(TypeName::new)
}

/// Fork-choice inputs, shared with the sync category.
fn fork_choice_input(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    if !matches!(ctx.category, "fork_choice" | "sync") {
        return None;
    }
    match ctx.filename {
        "anchor_state.ssz_snappy" => return Some(TypeName::new("BeaconState")),
        "anchor_block.ssz_snappy" => return Some(TypeName::new("BeaconBlock")),
        _ => {},
    }
    const PREFIXES: &[(&str, &str)] = &[
        ("block_", "SignedBeaconBlock"),
        ("attestation_", "Attestation"),
        ("attester_slashing_", "AttesterSlashing"),
        ("pow_block_", "PowBlock"),
        ("column_", "DataColumnSidecar"),
        ("blobs_", "BlobSidecar"),
    ];
    PREFIXES
        .iter()
        .find(|(prefix, _)| ctx.filename.starts_with(prefix))
        .map(|(_, type_name)| TypeName::new(*type_name))
}

/// Light-client artifacts: update variants by filename prefix, plus the
/// data-collection block stream.
fn light_client_file(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    if ctx.category != "light_client" {
        return None;
    }
    if ctx.suite == "data_collection" && ctx.filename.starts_with("block_") {
        return Some(TypeName::new("SignedBeaconBlock"));
    }
    if ctx.suite == "update_ranking"
        && (ctx.filename.starts_with("update_") || ctx.filename.starts_with("updates_"))
    {
        return Some(TypeName::new("LightClientUpdate"));
    }
    if matches!(ctx.suite, "sync" | "data_collection") {
        if ctx.filename.starts_with("update_") {
            return Some(TypeName::new("LightClientUpdate"));
        }
        if ctx.filename.starts_with("optimistic_update_") {
            return Some(TypeName::new("LightClientOptimisticUpdate"));
        }
        if ctx.filename.starts_with("finality_update_") {
            return Some(TypeName::new("LightClientFinalityUpdate"));
        }
        if ctx.filename.starts_with("bootstrap_") || ctx.filename == "bootstrap.ssz_snappy" {
            return Some(TypeName::new("LightClientBootstrap"));
        }
    }
    None
}

/// Rewards tests serialize paired reward/penalty sequences as `Deltas`.
fn rewards_deltas(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    (ctx.category == "rewards" && ctx.filename.ends_with("_deltas.ssz_snappy"))
        .then(|| TypeName::new("Deltas"))
}

/// Genesis inputs: deposit streams and the resulting state.
fn genesis_file(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    if ctx.category != "genesis" {
        return None;
    }
    if ctx.filename.starts_with("deposits_") {
        return Some(TypeName::new("Deposit"));
    }
    matches!(ctx.filename, "state.ssz_snappy" | "genesis.ssz_snappy")
        .then(|| TypeName::new("BeaconState"))
}

/// In the block-header and execution-payload-bid operation suites, `block`
/// denotes the unsigned block.
fn unsigned_block_suite(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    (ctx.category == "operations"
        && matches!(ctx.suite, "block_header" | "execution_payload_bid")
        && ctx.filename == "block.ssz_snappy")
        .then(|| TypeName::new("BeaconBlock"))
}

/// Everywhere else, `blocks_*` and `block` carry the signed wrapper.
fn generic_block(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    (ctx.filename.starts_with("blocks_") || ctx.filename == "block.ssz_snappy")
        .then(|| TypeName::new("SignedBeaconBlock"))
}

/// Operation suites whose name maps directly to an input type.
fn operations_suite(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    if ctx.category != "operations" {
        return None;
    }
    const SUITES: &[(&str, &str)] = &[
        ("attestation", "Attestation"),
        ("attester_slashing", "AttesterSlashing"),
        ("block_header", "BeaconBlock"),
        ("deposit", "Deposit"),
        ("proposer_slashing", "ProposerSlashing"),
        ("voluntary_exit", "SignedVoluntaryExit"),
        ("sync_aggregate", "SyncAggregate"),
        ("execution_payload", "ExecutionPayload"),
        ("withdrawals", "ExecutionPayload"),
        ("bls_to_execution_change", "SignedBLSToExecutionChange"),
    ];
    SUITES
        .iter()
        .find(|(suite, _)| ctx.suite == *suite)
        .map(|(_, type_name)| TypeName::new(*type_name))
}

/// Best-effort default: PascalCase the suite words.
fn suite_pascal_case(ctx: &RuleCtx<'_>) -> Option<TypeName> {
    if ctx.suite.is_empty() {
        return None;
    }
    let name: String = ctx
        .suite
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect();
    Some(TypeName::new(name))
}
