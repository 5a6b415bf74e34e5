//! Direct / recursive classification.

use nixdeps_core::{DependencySet, TargetReference};

/// Splits partitioned targets by package.
///
/// `recursive` keeps every target; `direct` keeps those whose package is
/// exactly `root_label`. Both lists come back sorted by label.
pub fn classify(targets: Vec<TargetReference>, root_label: &str) -> DependencySet {
    let direct = targets
        .iter()
        .filter(|t| t.package_path == root_label)
        .cloned()
        .collect();

    let mut set = DependencySet {
        direct,
        recursive: targets,
    };
    set.sort();
    debug_assert!(set.is_consistent());
    set
}
