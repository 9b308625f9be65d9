//! Fixture corpus tooling for SSZ protocol test vectors.
//!
//! A corpus stores binary fixtures whose schema and protocol fork are not
//! recorded in the blob; both must be inferred from the directory layout,
//! sibling filenames, and small sidecar metadata files. This crate owns that
//! inference and the plumbing around it:
//!
//! - [`fixture`]: path decomposition into conventional segments;
//! - [`sidecar`]: per-test and per-directory metadata files;
//! - [`forks`]: fork identities and the process-wide transition schedule;
//! - [`resolve`]: type-name derivation and effective-fork resolution;
//! - [`registry`]: the schema lookup seam and its built-in catalog;
//! - [`decode`]: dispatch around the external decoder, with the bounded
//!   retry policy for fork-ambiguous sync fixtures;
//! - [`audit`]: the rendered-companion completeness report;
//! - [`batch`]: the per-fixture driver over companion-less blobs.
//!
//! The byte-level decoder, the blob compression, and the human-readable
//! serializer are external collaborators behind the [`decode::Decoder`],
//! [`registry::TypeRegistry`], and [`batch::Renderer`] traits.

#![forbid(unsafe_code)]

pub mod audit;
pub mod batch;
pub mod decode;
pub mod fixture;
pub mod forks;
pub mod registry;
pub mod resolve;
pub mod sidecar;

pub use audit::{AuditError, CompletenessReport, audit};
pub use decode::{DecodeError, Decoded, Decoder, DispatchError, Dispatcher};
pub use fixture::{FixturePath, PathError, Preset};
pub use forks::{ForkName, ForkSchedule, ScheduleError};
pub use registry::{RegistryError, SchemaDescriptor, StaticCatalog, TypeRegistry};
pub use resolve::{ResolveError, ResolvedTarget, Resolver, TypeName, Unresolvable};
pub use sidecar::{DirSidecars, Sidecar, SidecarError, SidecarSource};
