//! Longest-prefix partitioning of candidate paths into package targets.

use crate::trie::PackageTrie;
use nixdeps_core::TargetReference;

/// Result of assigning every candidate to its deepest package root.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Exactly one target per claimed candidate.
    pub targets: Vec<TargetReference>,
    /// Candidates no root encloses.
    pub orphans: Vec<String>,
}

/// Partitions workspace-relative `candidates` over the roots in `trie`.
///
/// Each input yields exactly one target or one orphan; nothing is mutated
/// in place, so calling this twice on the same input gives the same result.
pub fn partition<'a, I>(trie: &PackageTrie, candidates: I) -> Partition
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Partition::default();

    for path in candidates {
        match trie.claim(path) {
            Some((package, name)) => out.targets.push(TargetReference::new(package, name)),
            None => out.orphans.push(path.to_string()),
        }
    }

    out
}
