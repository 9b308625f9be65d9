//! Schema type registry.
//!
//! The source of schema definitions is an external collaborator; this module
//! owns only the lookup seam. [`TypeRegistry`] resolves `(fork, preset,
//! type name)` to an opaque schema handle or fails with
//! [`RegistryError::NotFound`], never a silent default. [`StaticCatalog`]
//! is the built-in implementation: a startup-time availability table
//! (each type name with the fork that introduced it and, where applicable,
//! the fork that retired it) standing in for the original's runtime
//! module reflection while keeping the same not-found semantics.

use thiserror::Error;

use crate::fixture::Preset;
use crate::forks::{ForkName, ForkSchedule};
use crate::resolve::TypeName;

/// Lookup failures from a type registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The requested combination does not exist.
    #[error("no schema for type '{type_name}' under fork '{fork}' (preset {preset})")]
    NotFound {
        /// The fork the lookup ran against.
        fork: ForkName,
        /// The preset the lookup ran against.
        preset: Preset,
        /// The requested type name.
        type_name: TypeName,
    },
}

/// Resolves schema handles for decode targets.
///
/// A `General`-preset target is aliased to `Mainnet` by the dispatcher
/// before it reaches this trait; implementations see only the two concrete
/// parameter sets.
pub trait TypeRegistry {
    /// Opaque schema handle consumed by the decoder.
    type Handle;

    /// Resolves a handle for `(fork, preset, type_name)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the combination does not
    /// exist; callers propagate this rather than guessing a schema.
    fn resolve(
        &self,
        fork: &ForkName,
        preset: Preset,
        type_name: &TypeName,
    ) -> Result<Self::Handle, RegistryError>;
}

/// Schema coordinates resolved by [`StaticCatalog`].
///
/// Opaque to this crate's callers; an external decoder keys its concrete
/// schema tables off these three fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    /// The fork whose schema revision applies.
    pub fork: ForkName,
    /// The parameter set.
    pub preset: Preset,
    /// The type name.
    pub type_name: TypeName,
}

/// `(type name, introduced, retired)` availability rows.
///
/// Covers the container set the corpus exercises. `Deltas` is a test-only
/// aggregate (two `uint64` lists bounded by the validator registry limit)
/// that exists under every fork.
const CATALOG: &[(&str, &str, Option<&str>)] = &[
    // phase0 core containers.
    ("AggregateAndProof", "phase0", None),
    ("Attestation", "phase0", None),
    ("AttestationData", "phase0", None),
    ("AttesterSlashing", "phase0", None),
    ("BeaconBlock", "phase0", None),
    ("BeaconBlockBody", "phase0", None),
    ("BeaconBlockHeader", "phase0", None),
    ("BeaconState", "phase0", None),
    ("Checkpoint", "phase0", None),
    ("Deltas", "phase0", None),
    ("Deposit", "phase0", None),
    ("DepositData", "phase0", None),
    ("DepositMessage", "phase0", None),
    ("Eth1Block", "phase0", None),
    ("Eth1Data", "phase0", None),
    ("Fork", "phase0", None),
    ("ForkData", "phase0", None),
    ("HistoricalBatch", "phase0", None),
    ("IndexedAttestation", "phase0", None),
    // Replaced by participation flags at the altair boundary.
    ("PendingAttestation", "phase0", Some("altair")),
    ("ProposerSlashing", "phase0", None),
    ("SignedAggregateAndProof", "phase0", None),
    ("SignedBeaconBlock", "phase0", None),
    ("SignedBeaconBlockHeader", "phase0", None),
    ("SignedVoluntaryExit", "phase0", None),
    ("SigningData", "phase0", None),
    ("Validator", "phase0", None),
    ("VoluntaryExit", "phase0", None),
    // altair: sync committees and the light-client protocol.
    ("ContributionAndProof", "altair", None),
    ("LightClientBootstrap", "altair", None),
    ("LightClientFinalityUpdate", "altair", None),
    ("LightClientHeader", "altair", None),
    ("LightClientOptimisticUpdate", "altair", None),
    ("LightClientUpdate", "altair", None),
    ("SignedContributionAndProof", "altair", None),
    ("SyncAggregate", "altair", None),
    ("SyncCommittee", "altair", None),
    ("SyncCommitteeContribution", "altair", None),
    ("SyncCommitteeMessage", "altair", None),
    // bellatrix: execution payloads.
    ("ExecutionPayload", "bellatrix", None),
    ("ExecutionPayloadHeader", "bellatrix", None),
    ("PowBlock", "bellatrix", None),
    // capella: withdrawals and credential changes.
    ("BLSToExecutionChange", "capella", None),
    ("HistoricalSummary", "capella", None),
    ("SignedBLSToExecutionChange", "capella", None),
    ("Withdrawal", "capella", None),
    // deneb: blob sidecars.
    ("BlobIdentifier", "deneb", None),
    ("BlobSidecar", "deneb", None),
    // electra: execution-layer requests and consolidations.
    ("ConsolidationRequest", "electra", None),
    ("DepositRequest", "electra", None),
    ("ExecutionRequests", "electra", None),
    ("PendingConsolidation", "electra", None),
    ("PendingDeposit", "electra", None),
    ("PendingPartialWithdrawal", "electra", None),
    ("SingleAttestation", "electra", None),
    ("WithdrawalRequest", "electra", None),
    // eip7805: inclusion lists.
    ("InclusionList", "eip7805", None),
    ("SignedInclusionList", "eip7805", None),
    // fulu: data columns.
    ("DataColumnSidecar", "fulu", None),
    ("MatrixEntry", "fulu", None),
    // gloas: enshrined payload attestations.
    ("ExecutionPayloadBid", "gloas", None),
    ("ExecutionPayloadEnvelope", "gloas", None),
    ("IndexedPayloadAttestation", "gloas", None),
    ("PayloadAttestation", "gloas", None),
    ("PayloadAttestationData", "gloas", None),
    ("PayloadAttestationMessage", "gloas", None),
    ("SignedExecutionPayloadBid", "gloas", None),
    ("SignedExecutionPayloadEnvelope", "gloas", None),
];

/// Startup-time schema availability table.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    schedule: ForkSchedule,
}

impl StaticCatalog {
    /// A catalog judging availability against `schedule`'s fork order.
    #[must_use]
    pub const fn new(schedule: ForkSchedule) -> Self {
        Self { schedule }
    }

    fn available(&self, type_name: &str, fork: &ForkName) -> bool {
        let Some(at) = self.schedule.position_of(fork) else {
            return false;
        };
        CATALOG.iter().any(|(name, introduced, retired)| {
            if *name != type_name {
                return false;
            }
            let Some(since) = self.schedule.position_of(&ForkName::new(introduced)) else {
                return false;
            };
            let until = retired
                .and_then(|r| self.schedule.position_of(&ForkName::new(r)))
                .unwrap_or(usize::MAX);
            since <= at && at < until
        })
    }
}

impl TypeRegistry for StaticCatalog {
    type Handle = SchemaDescriptor;

    fn resolve(
        &self,
        fork: &ForkName,
        preset: Preset,
        type_name: &TypeName,
    ) -> Result<Self::Handle, RegistryError> {
        if self.available(type_name.as_str(), fork) {
            Ok(SchemaDescriptor {
                fork: fork.clone(),
                preset,
                type_name: type_name.clone(),
            })
        } else {
            Err(RegistryError::NotFound {
                fork: fork.clone(),
                preset,
                type_name: type_name.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(ForkSchedule::builtin())
    }

    fn lookup(fork: &str, type_name: &str) -> Result<SchemaDescriptor, RegistryError> {
        catalog().resolve(
            &ForkName::new(fork),
            Preset::Mainnet,
            &TypeName::new(type_name),
        )
    }

    #[test]
    fn core_types_exist_from_genesis() {
        assert!(lookup("phase0", "BeaconState").is_ok());
        assert!(lookup("gloas", "BeaconState").is_ok());
        assert!(lookup("phase0", "Deltas").is_ok());
    }

    #[test]
    fn types_are_gated_on_their_introducing_fork() {
        assert!(lookup("phase0", "LightClientUpdate").is_err());
        assert!(lookup("altair", "LightClientUpdate").is_ok());
        assert!(lookup("deneb", "DataColumnSidecar").is_err());
        assert!(lookup("fulu", "DataColumnSidecar").is_ok());
    }

    #[test]
    fn retired_types_disappear() {
        assert!(lookup("phase0", "PendingAttestation").is_ok());
        assert!(lookup("altair", "PendingAttestation").is_err());
    }

    #[test]
    fn unknown_combinations_are_not_found() {
        let err = lookup("phase0", "Beaconstate").unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert!(lookup("unknownfork", "BeaconState").is_err());
    }
}
