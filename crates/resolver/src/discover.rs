//! Entry-file discovery over a directory tree.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Finds every file named `marker` under `dir`, sorted.
///
/// `dir` is taken lexically normalized, so results carry no `.` segments.
/// Hidden entries and `bazel-*` output trees are skipped; symlinks are not
/// followed. Unreadable directories are logged and skipped.
pub fn discover_entries(dir: &Path, marker: &str) -> Vec<PathBuf> {
    let marker = OsStr::new(marker);
    let mut found = Vec::new();

    // `components()` drops interior `.` segments.
    let dir: PathBuf = dir.components().collect();
    let walker = WalkDir::new(&dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() && entry.file_name() == marker => {
                found.push(entry.into_path());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "skipping unreadable path"),
        }
    }

    found.sort();
    tracing::debug!(dir = %dir.display(), entries = found.len(), "discovered entry files");
    found
}

fn is_skipped(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with("bazel-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "{ }").unwrap();
    }

    #[test]
    fn finds_markers_and_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "default.nix");
        touch(dir.path(), "a/default.nix");
        touch(dir.path(), "a/b/default.nix");
        touch(dir.path(), "a/b/other.nix");
        touch(dir.path(), ".git/default.nix");
        touch(dir.path(), "bazel-out/default.nix");

        let found = discover_entries(dir.path(), "default.nix");
        let rel: Vec<PathBuf> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![
                PathBuf::from("a/b/default.nix"),
                PathBuf::from("a/default.nix"),
                PathBuf::from("default.nix"),
            ]
        );
    }

    #[test]
    fn dot_dir_yields_clean_paths() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a/default.nix");

        let found = discover_entries(&dir.path().join("."), "default.nix");
        assert_eq!(found, vec![dir.path().join("a/default.nix")]);
    }

    #[test]
    fn missing_dir_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_entries(&dir.path().join("absent"), "default.nix").is_empty());
    }
}
