//! Machine-readable output for batch results.
//!
//! Two row schemas:
//! - [`ResolutionRow`]: one per resolved entry file
//! - [`FailureRow`]: one per entry whose resolution failed
//!
//! Rows are written as NDJSON by [`json_stream::JsonStreamSink`].

pub mod json_stream;

use crate::batch::Resolution;
use serde::Serialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Serializable row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionRow {
    pub entry: String,
    /// Workspace-relative package directory, empty for the root package.
    pub package: String,
    pub direct: Vec<String>,
    pub recursive: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureRow {
    pub entry: String,
    pub error: String,
    /// Captured tracer output, when the failure carries any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

// ---------------------------------------------------------------------------
// Builder: Resolution -> Rows
// ---------------------------------------------------------------------------

/// Flattens batch results into sink rows, keeping entry order.
pub fn to_rows(
    resolutions: &[Resolution],
    workspace_root: &Path,
) -> (Vec<ResolutionRow>, Vec<FailureRow>) {
    let mut resolved = Vec::new();
    let mut failed = Vec::new();

    for r in resolutions {
        let entry = r.entry.display().to_string();
        match &r.outcome {
            Ok(deps) => resolved.push(ResolutionRow {
                package: package_of(&r.entry, workspace_root),
                entry,
                direct: deps.direct_labels(),
                recursive: deps.recursive_labels(),
            }),
            Err(e) => failed.push(FailureRow {
                entry,
                error: e.to_string(),
                output: e.captured_output().map(str::to_string),
            }),
        }
    }

    (resolved, failed)
}

fn package_of(entry: &Path, workspace_root: &Path) -> String {
    entry
        .strip_prefix(workspace_root)
        .ok()
        .and_then(Path::parent)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nixdeps_core::{DependencySet, NixDepsError, TargetReference};
    use std::path::PathBuf;

    #[test]
    fn splits_successes_and_failures() {
        let deps = DependencySet {
            direct: vec![TargetReference::new("a/b", "default.nix")],
            recursive: vec![
                TargetReference::new("a/b", "default.nix"),
                TargetReference::new("lib", "default.nix"),
            ],
        };
        let resolutions = vec![
            Resolution {
                entry: PathBuf::from("/ws/a/b/default.nix"),
                outcome: Ok(deps),
            },
            Resolution {
                entry: PathBuf::from("/ws/c/default.nix"),
                outcome: Err(NixDepsError::SubprocessFailure {
                    entry: PathBuf::from("/ws/c/default.nix"),
                    status: "exit status: 1".into(),
                    output: "error: undefined variable 'x'".into(),
                }),
            },
        ];

        let (ok, failed) = to_rows(&resolutions, Path::new("/ws"));
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].package, "a/b");
        assert_eq!(ok[0].direct, vec!["//a/b:default.nix"]);
        assert_eq!(ok[0].recursive.len(), 2);

        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].entry, "/ws/c/default.nix");
        assert_eq!(
            failed[0].output.as_deref(),
            Some("error: undefined variable 'x'")
        );
    }

    #[test]
    fn root_package_is_empty() {
        assert_eq!(package_of(Path::new("/ws/default.nix"), Path::new("/ws")), "");
    }
}
