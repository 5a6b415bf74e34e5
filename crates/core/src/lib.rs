//! Domain models, configuration values, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    normalize_path, OrphanPolicy, ResolverConfig, DEFAULT_PACKAGE_MARKER, WORKSPACE_ROOT_ENV,
};
pub use error::{NixDepsError, NixDepsResult};
pub use types::{AccessRecord, DependencySet, ProcessCommand, TargetReference};
