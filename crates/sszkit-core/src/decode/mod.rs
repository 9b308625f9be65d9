//! Decode dispatch.
//!
//! The actual byte-level decode is an external collaborator behind the
//! [`Decoder`] trait; this module owns the dispatch around it: schema
//! lookup, the generic-preset alias, and the bounded retry-with-alternate-
//! fork policy for fork-ambiguous sync fixtures. Retries are invisible to
//! callers beyond the final outcome; [`Decoded`] records which fork
//! actually succeeded.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::fixture::Preset;
use crate::forks::ForkName;
use crate::registry::{RegistryError, TypeRegistry};
use crate::resolve::{ResolvedTarget, TypeName};

/// The external decoder rejected the bytes under the resolved schema.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct DecodeError {
    /// Collaborator-supplied failure detail.
    pub reason: String,
}

impl DecodeError {
    /// Wraps a failure reason from the external decoder.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External decode capability: raw bytes plus a schema handle in, a decoded
/// object out. The blob's compression is the collaborator's concern; it
/// receives the on-disk bytes untouched.
pub trait Decoder<H> {
    /// The decoded object type.
    type Object;

    /// Decodes `bytes` as the structure named by `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the bytes do not parse under the schema.
    fn decode(&self, bytes: &[u8], schema: &H) -> Result<Self::Object, DecodeError>;
}

/// Dispatch failures for a single fixture.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    /// The type registry has no schema for the target.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Decode failed (after exhausting any retry candidates, the failure of
    /// the *primary* attempt is reported).
    #[error("decode failed under fork '{fork}' for type '{type_name}': {source}")]
    Decode {
        /// The fork of the primary attempt.
        fork: ForkName,
        /// The schema type name.
        type_name: TypeName,
        /// The primary attempt's failure.
        #[source]
        source: DecodeError,
    },
}

/// A successful decode, recording the fork that produced it.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    /// The decoded object.
    pub object: T,
    /// The fork whose schema the bytes parsed under. Differs from the
    /// target's fork when a retry candidate succeeded.
    pub fork: ForkName,
}

/// Resolves schema handles and drives the external decoder.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a, R, D> {
    registry: &'a R,
    decoder: &'a D,
}

impl<'a, R, D> Dispatcher<'a, R, D>
where
    R: TypeRegistry,
    D: Decoder<R::Handle>,
{
    /// A dispatcher over the given registry and decoder.
    #[must_use]
    pub const fn new(registry: &'a R, decoder: &'a D) -> Self {
        Self { registry, decoder }
    }

    /// Decodes one fixture's bytes against its resolved target.
    ///
    /// On a primary failure, each of the target's fallback forks is tried
    /// once in order, stopping at the first success; candidates whose
    /// schema lookup fails are passed over. If every candidate fails, the
    /// primary failure is what surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Registry`] when the primary schema lookup
    /// fails, [`DispatchError::Decode`] when decoding does.
    pub fn resolve_and_decode(
        &self,
        target: &ResolvedTarget,
        bytes: &[u8],
    ) -> Result<Decoded<D::Object>, DispatchError> {
        let preset = effective_preset(target.preset);
        let handle = self
            .registry
            .resolve(&target.fork, preset, &target.type_name)?;
        debug!(
            fork = %target.fork,
            preset = %preset,
            type_name = %target.type_name,
            file = %target.filename,
            "schema resolved"
        );

        let primary = match self.decoder.decode(bytes, &handle) {
            Ok(object) => {
                return Ok(Decoded {
                    object,
                    fork: target.fork.clone(),
                });
            },
            Err(e) => e,
        };

        if !target.fallback_forks.is_empty() {
            warn!(
                fork = %target.fork,
                file = %target.filename,
                error = %primary,
                "primary decode failed, trying alternate forks"
            );
            for candidate in &target.fallback_forks {
                let handle = match self.registry.resolve(candidate, preset, &target.type_name) {
                    Ok(handle) => handle,
                    Err(e) => {
                        debug!(fork = %candidate, error = %e, "no schema under candidate fork");
                        continue;
                    },
                };
                match self.decoder.decode(bytes, &handle) {
                    Ok(object) => {
                        info!(
                            fork = %candidate,
                            file = %target.filename,
                            "decode succeeded under alternate fork"
                        );
                        return Ok(Decoded {
                            object,
                            fork: candidate.clone(),
                        });
                    },
                    Err(e) => {
                        debug!(fork = %candidate, error = %e, "alternate fork decode failed");
                    },
                }
            }
        }

        Err(DispatchError::Decode {
            fork: target.fork.clone(),
            type_name: target.type_name.clone(),
            source: primary,
        })
    }
}

/// The generic preset carries full-size type shapes; alias it to the
/// standard preset for schema lookup.
#[must_use]
pub const fn effective_preset(preset: Preset) -> Preset {
    match preset {
        Preset::General => Preset::Mainnet,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::forks::ForkSchedule;
    use crate::registry::{SchemaDescriptor, StaticCatalog};

    /// Decoder stub that succeeds only under the forks it is told to.
    struct ForkGatedDecoder {
        accept: Vec<ForkName>,
        attempts: RefCell<Vec<ForkName>>,
    }

    impl ForkGatedDecoder {
        fn accepting(forks: &[&str]) -> Self {
            Self {
                accept: forks.iter().map(ForkName::new).collect(),
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Decoder<SchemaDescriptor> for ForkGatedDecoder {
        type Object = String;

        fn decode(&self, _bytes: &[u8], schema: &SchemaDescriptor) -> Result<String, DecodeError> {
            self.attempts.borrow_mut().push(schema.fork.clone());
            if self.accept.contains(&schema.fork) {
                Ok(format!("decoded:{}", schema.fork))
            } else {
                Err(DecodeError::new("offset out of bounds"))
            }
        }
    }

    fn target(fork: &str, fallbacks: &[&str]) -> ResolvedTarget {
        ResolvedTarget {
            preset: Preset::Minimal,
            fork: ForkName::new(fork),
            type_name: TypeName::new("LightClientUpdate"),
            filename: "update_0xab.ssz_snappy".to_string(),
            fallback_forks: fallbacks.iter().map(ForkName::new).collect(),
        }
    }

    #[test]
    fn decodes_under_the_primary_fork() {
        let registry = StaticCatalog::new(ForkSchedule::builtin());
        let decoder = ForkGatedDecoder::accepting(&["altair"]);
        let dispatcher = Dispatcher::new(&registry, &decoder);

        let decoded = dispatcher
            .resolve_and_decode(&target("altair", &["bellatrix"]), b"")
            .unwrap();
        assert_eq!(decoded.fork, ForkName::new("altair"));
        assert_eq!(decoded.object, "decoded:altair");
    }

    #[test]
    fn retry_succeeds_under_alternate_fork_and_records_it() {
        let registry = StaticCatalog::new(ForkSchedule::builtin());
        let decoder = ForkGatedDecoder::accepting(&["bellatrix"]);
        let dispatcher = Dispatcher::new(&registry, &decoder);

        let decoded = dispatcher
            .resolve_and_decode(&target("altair", &["bellatrix"]), b"")
            .unwrap();
        assert_eq!(decoded.fork, ForkName::new("bellatrix"));
        assert_eq!(
            *decoder.attempts.borrow(),
            vec![ForkName::new("altair"), ForkName::new("bellatrix")]
        );
    }

    #[test]
    fn exhausted_retries_surface_the_primary_failure() {
        let registry = StaticCatalog::new(ForkSchedule::builtin());
        let decoder = ForkGatedDecoder::accepting(&[]);
        let dispatcher = Dispatcher::new(&registry, &decoder);

        let err = dispatcher
            .resolve_and_decode(&target("altair", &["bellatrix", "capella"]), b"")
            .unwrap_err();
        match err {
            DispatchError::Decode { fork, .. } => assert_eq!(fork, ForkName::new("altair")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(decoder.attempts.borrow().len(), 3);
    }

    #[test]
    fn no_fallbacks_means_no_retry() {
        let registry = StaticCatalog::new(ForkSchedule::builtin());
        let decoder = ForkGatedDecoder::accepting(&[]);
        let dispatcher = Dispatcher::new(&registry, &decoder);

        let err = dispatcher
            .resolve_and_decode(&target("altair", &[]), b"")
            .unwrap_err();
        assert!(matches!(err, DispatchError::Decode { .. }));
        assert_eq!(decoder.attempts.borrow().len(), 1);
    }

    #[test]
    fn candidates_without_a_schema_are_passed_over() {
        let registry = StaticCatalog::new(ForkSchedule::builtin());
        // LightClientUpdate has no phase0 schema; the candidate list still
        // reaches bellatrix.
        let decoder = ForkGatedDecoder::accepting(&["bellatrix"]);
        let dispatcher = Dispatcher::new(&registry, &decoder);

        let decoded = dispatcher
            .resolve_and_decode(&target("altair", &["phase0", "bellatrix"]), b"")
            .unwrap();
        assert_eq!(decoded.fork, ForkName::new("bellatrix"));
    }

    #[test]
    fn unknown_type_is_a_registry_error() {
        let registry = StaticCatalog::new(ForkSchedule::builtin());
        let decoder = ForkGatedDecoder::accepting(&["altair"]);
        let dispatcher = Dispatcher::new(&registry, &decoder);

        let mut t = target("altair", &[]);
        t.type_name = TypeName::new("Mystery");
        let err = dispatcher.resolve_and_decode(&t, b"").unwrap_err();
        assert!(matches!(err, DispatchError::Registry(_)));
    }

    #[test]
    fn general_preset_is_aliased_for_lookup() {
        assert_eq!(effective_preset(Preset::General), Preset::Mainnet);
        assert_eq!(effective_preset(Preset::Minimal), Preset::Minimal);
    }
}
