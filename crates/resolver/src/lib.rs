//! Trace decoding, package partitioning, dependency classification, rule
//! generation, and data sinks.

pub mod batch;
pub mod classify;
pub mod decode;
pub mod discover;
pub mod filter;
pub mod partition;
pub mod resolver;
pub mod rules;
pub mod sink;
pub mod trie;

pub use batch::{resolve_batch, Resolution, DEFAULT_CONCURRENCY};
pub use discover::discover_entries;
pub use resolver::Resolver;
pub use rules::{export_rule, render, render_all, render_loads, ExportNix, NixpkgsPackage, Rule};
pub use trie::PackageTrie;
