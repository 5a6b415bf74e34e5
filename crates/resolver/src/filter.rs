//! Reduces traced inputs to workspace-relative candidate paths.

use nixdeps_core::AccessRecord;
use std::collections::BTreeSet;

/// Strips `root` from `path` when `path` lies strictly below it.
///
/// Matching is per component: `/ws` contains `/ws/a` but not `/ws2/a`,
/// and not `/ws` itself. `root` carries no trailing separator.
pub fn relative_to<'p>(root: &str, path: &'p str) -> Option<&'p str> {
    let rest = path.strip_prefix(root)?;
    let rest = if root.ends_with('/') {
        rest
    } else {
        rest.strip_prefix('/')?
    };
    (!rest.is_empty()).then_some(rest)
}

/// Collects the candidate set for one resolution.
///
/// The entry file is always present, whether or not the tracer reported it.
/// Every other input is kept only if it lies under `root`; the result is
/// deduplicated and sorted.
pub fn candidate_paths(root: &str, entry_rel: &str, records: &[AccessRecord]) -> Vec<String> {
    let mut candidates: BTreeSet<&str> = BTreeSet::new();
    candidates.insert(entry_rel);

    let mut outside = 0usize;
    for record in records {
        for input in &record.inputs {
            match relative_to(root, input) {
                Some(rel) => {
                    candidates.insert(rel);
                }
                None => outside += 1,
            }
        }
    }

    tracing::trace!(
        kept = candidates.len(),
        outside,
        "filtered trace inputs"
    );
    candidates.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(inputs: &[&str]) -> AccessRecord {
        AccessRecord {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn relative_to_is_component_wise() {
        assert_eq!(relative_to("/ws", "/ws/a/x.txt"), Some("a/x.txt"));
        assert_eq!(relative_to("/ws", "/ws2/a/x.txt"), None);
        assert_eq!(relative_to("/ws", "/ws"), None);
        assert_eq!(relative_to("/ws", "/ws/"), None);
        assert_eq!(relative_to("/", "/etc/hosts"), Some("etc/hosts"));
        assert_eq!(relative_to("/ws", "/outside/z.txt"), None);
    }

    #[test]
    fn entry_always_present() {
        let paths = candidate_paths("/ws", "a/default.nix", &[]);
        assert_eq!(paths, vec!["a/default.nix"]);
    }

    #[test]
    fn entry_never_duplicated() {
        let records = [
            record(&["/ws/a/default.nix", "/ws/a/x.txt"]),
            record(&["/ws/a/default.nix"]),
        ];
        let paths = candidate_paths("/ws", "a/default.nix", &records);
        assert_eq!(paths, vec!["a/default.nix", "a/x.txt"]);
    }

    #[test]
    fn outside_paths_discarded() {
        let records = [record(&[
            "/outside/z.txt",
            "/nix/store/abc-nixpkgs/default.nix",
            "/ws2/evil.nix",
            "/ws/b/y.txt",
        ])];
        let paths = candidate_paths("/ws", "a/default.nix", &records);
        assert_eq!(paths, vec!["a/default.nix", "b/y.txt"]);
    }
}
