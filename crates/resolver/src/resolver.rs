//! Trace-to-dependency-set resolution for one entry file.
//!
//! Pipeline: trace -> decode -> filter -> package roots -> partition -> classify.

use crate::classify::classify;
use crate::decode::decode_trace;
use crate::filter::{candidate_paths, relative_to};
use crate::partition::{partition, Partition};
use crate::trie::{split_dir, PackageTrie};
use nixdeps_core::error::{NixDepsError, NixDepsResult};
use nixdeps_core::{normalize_path, AccessRecord, DependencySet, OrphanPolicy, ResolverConfig};
use nixdeps_tracer::{TraceRequest, Tracer};
use std::path::Path;
use std::sync::Arc;
use tracing::{Instrument, Span};

/// Resolves entry files against one workspace.
///
/// Events are emitted inside the span handed over at construction, so the
/// caller decides where resolver logs attach.
///
/// ```ignore
/// let resolver = Resolver::new(config, Arc::new(FptraceTracer::new(path)));
/// let deps = resolver.resolve(Path::new("/ws/a/default.nix")).await?;
/// ```
pub struct Resolver {
    config: ResolverConfig,
    tracer: Arc<dyn Tracer>,
    span: Span,
}

impl Resolver {
    pub fn new(config: ResolverConfig, tracer: Arc<dyn Tracer>) -> Self {
        let span = tracing::info_span!(
            "resolver",
            workspace = %config.workspace_root().display()
        );
        Self {
            config,
            tracer,
            span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Traces `entry` and resolves its dependency set.
    pub async fn resolve(&self, entry: &Path) -> NixDepsResult<DependencySet> {
        let span = tracing::debug_span!(parent: &self.span, "resolve", entry = %entry.display());

        async {
            let entry = normalize_path(entry)?;
            let request = TraceRequest {
                entry: entry.clone(),
                prelude: self.config.prelude().map(str::to_string),
                workspace_root: self.config.workspace_root().to_path_buf(),
            };
            let payload = self.tracer.trace(&request).await?;
            let records = decode_trace(&entry, &payload)?;
            self.resolve_trace(&entry, &records)
        }
        .instrument(span)
        .await
    }

    /// Resolves an already captured tracer payload.
    pub fn resolve_payload(&self, entry: &Path, payload: &str) -> NixDepsResult<DependencySet> {
        self.span.in_scope(|| {
            let records = decode_trace(entry, payload)?;
            self.resolve_trace(entry, &records)
        })
    }

    /// Resolves decoded access records.
    pub fn resolve_records(
        &self,
        entry: &Path,
        records: &[AccessRecord],
    ) -> NixDepsResult<DependencySet> {
        self.span.in_scope(|| self.resolve_trace(entry, records))
    }

    fn resolve_trace(&self, entry: &Path, records: &[AccessRecord]) -> NixDepsResult<DependencySet> {
        let root = path_str(self.config.workspace_root())?;
        let entry = normalize_path(entry)?;
        let entry_str = path_str(&entry)?;
        let entry_rel = relative_to(root, entry_str).ok_or_else(|| {
            NixDepsError::InvalidInput(format!(
                "entry file {entry_str} is outside workspace root {root}"
            ))
        })?;
        let (root_label, _) = split_dir(entry_rel);

        let candidates = candidate_paths(root, entry_rel, records);

        let mut trie = PackageTrie::from_candidates(
            candidates.iter().map(String::as_str),
            self.config.marker(),
        );
        // The entry's own directory is a package even under a foreign marker.
        trie.insert(root_label);

        let Partition { targets, orphans } =
            partition(&trie, candidates.iter().map(String::as_str));
        self.handle_orphans(root, &orphans)?;

        let deps = classify(targets, root_label);

        tracing::debug!(
            package = root_label,
            packages = trie.len(),
            direct = deps.direct.len(),
            recursive = deps.recursive.len(),
            orphans = orphans.len(),
            "resolved"
        );
        Ok(deps)
    }

    fn handle_orphans(&self, root: &str, orphans: &[String]) -> NixDepsResult<()> {
        if orphans.is_empty() {
            return Ok(());
        }

        match self.config.orphan_policy() {
            OrphanPolicy::Drop => {
                tracing::debug!(orphans = orphans.len(), "dropped paths outside any package");
            }
            OrphanPolicy::Warn => {
                for orphan in orphans {
                    tracing::warn!(path = %join(root, orphan), "path belongs to no package, dropped");
                }
            }
            OrphanPolicy::Fail => {
                return Err(NixDepsError::OrphanPath {
                    path: join(root, &orphans[0]),
                });
            }
        }
        Ok(())
    }
}

fn path_str(path: &Path) -> NixDepsResult<&str> {
    path.to_str()
        .ok_or_else(|| NixDepsError::InvalidInput(format!("non UTF-8 path: {}", path.display())))
}

fn join(root: &str, rel: &str) -> String {
    if root.ends_with('/') {
        format!("{root}{rel}")
    } else {
        format!("{root}/{rel}")
    }
}
