//! Package boundary detection.
//!
//! Package roots live in a prefix tree keyed by workspace-relative path
//! segments. A lookup walks a file's directory segments and keeps the
//! deepest node flagged as a root, so nested packages always win over
//! their ancestors regardless of insertion order.

use std::collections::HashMap;

#[derive(Debug, Default)]
struct Node {
    children: HashMap<String, Node>,
    is_root: bool,
}

/// Set of package-root directories, relative to the workspace root.
/// The empty string denotes the workspace root itself.
#[derive(Debug, Default)]
pub struct PackageTrie {
    root: Node,
    len: usize,
}

impl PackageTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots = directories of every candidate whose basename is `marker`.
    pub fn from_candidates<'a, I>(candidates: I, marker: &str) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut trie = Self::new();
        for path in candidates {
            let (dir, name) = split_dir(path);
            if name == marker {
                trie.insert(dir);
            }
        }
        trie
    }

    /// Marks `dir` as a package root. Re-inserting is a no-op.
    pub fn insert(&mut self, dir: &str) {
        let mut node = &mut self.root;
        for segment in dir.split('/').filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
        if !node.is_root {
            node.is_root = true;
            self.len += 1;
        }
    }

    /// Splits `path` at its deepest enclosing package root.
    ///
    /// Returns `(package_dir, name_within_package)`, or `None` when no root
    /// encloses the path.
    pub fn claim<'p>(&self, path: &'p str) -> Option<(&'p str, &'p str)> {
        let mut node = &self.root;
        // Byte offset where the deepest root prefix ends.
        let mut deepest = node.is_root.then_some(0usize);
        let mut start = 0usize;

        // Only directory segments; the final segment is the file itself.
        while let Some(idx) = path[start..].find('/') {
            let end = start + idx;
            match node.children.get(&path[start..end]) {
                Some(child) => node = child,
                None => break,
            }
            if node.is_root {
                deepest = Some(end);
            }
            start = end + 1;
        }

        deepest.map(|end| {
            if end == 0 {
                ("", path)
            } else {
                (&path[..end], &path[end + 1..])
            }
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// `("a/b", "c.nix")` for `"a/b/c.nix"`, `("", "c.nix")` for `"c.nix"`.
pub fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_roots_from_markers() {
        let candidates = ["a/default.nix", "a/x.txt", "a/b/default.nix", "c/y.txt"];
        let trie = PackageTrie::from_candidates(candidates, "default.nix");
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.claim("a/b/z.nix"), Some(("a/b", "z.nix")));
        assert_eq!(trie.claim("a/z.nix"), Some(("a", "z.nix")));
        assert_eq!(trie.claim("c/z.nix"), None);
    }

    #[test]
    fn duplicate_roots_collapse() {
        let mut trie = PackageTrie::new();
        trie.insert("a");
        trie.insert("a");
        trie.insert("a/");
        assert_eq!(trie.len(), 1);
    }

    #[test]
    fn nested_root_claims_its_files() {
        let mut trie = PackageTrie::new();
        trie.insert("pkg");
        trie.insert("pkg/sub");
        assert_eq!(trie.claim("pkg/sub/x.txt"), Some(("pkg/sub", "x.txt")));
        assert_eq!(trie.claim("pkg/x.txt"), Some(("pkg", "x.txt")));
        assert_eq!(trie.claim("pkg/other/deep/x.txt"), Some(("pkg", "other/deep/x.txt")));
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut trie = PackageTrie::new();
        trie.insert("pkg/sub");
        trie.insert("pkg");
        assert_eq!(trie.claim("pkg/sub/x.txt"), Some(("pkg/sub", "x.txt")));
    }

    #[test]
    fn workspace_root_package() {
        let mut trie = PackageTrie::new();
        trie.insert("");
        assert_eq!(trie.claim("default.nix"), Some(("", "default.nix")));
        assert_eq!(trie.claim("lib/util.nix"), Some(("", "lib/util.nix")));
    }

    #[test]
    fn unclaimed_path() {
        let mut trie = PackageTrie::new();
        trie.insert("a");
        assert_eq!(trie.claim("b/x.txt"), None);
        // A sibling sharing a name prefix is not nested.
        assert_eq!(trie.claim("ab/x.txt"), None);
        // The root directory itself is not a file inside the package.
        assert_eq!(trie.claim("a"), None);
    }

    #[test]
    fn split_dir_cases() {
        assert_eq!(split_dir("a/b/c.nix"), ("a/b", "c.nix"));
        assert_eq!(split_dir("c.nix"), ("", "c.nix"));
    }
}
