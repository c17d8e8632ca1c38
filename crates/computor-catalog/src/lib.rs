//! Example Catalog (EC), Version Resolver (VR), the `meta.yaml` model,
//! dependency-cycle bookkeeping, and the Catalog Synchronizer (CS).
//! See §3 and §4.3/§4.10.

pub mod constraint;
pub mod dependency;
pub mod entities;
pub mod meta;
pub mod resolver;
pub mod sync;

pub use constraint::{resolve as resolve_constraint, Constraint, VersionRow};
pub use dependency::DependencyGraph;
pub use meta::{Meta, MetaError, MetaProperties, TestDependencyEntry};
pub use resolver::resolve_version;
pub use sync::{synchronize_archive, ArchiveFile, SyncedExample};
