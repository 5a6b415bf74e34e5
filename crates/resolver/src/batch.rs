//! Concurrent resolution of many entry files.
//!
//! Each entry gets its own task, tracer subprocess and trace file; tasks
//! share only the read-only [`Resolver`]. Per-entry failures are logged
//! and recorded, a fatal error aborts the remaining tasks.

use crate::resolver::Resolver;
use nixdeps_core::error::{NixDepsError, NixDepsResult};
use nixdeps_core::DependencySet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default max concurrent tracer subprocesses.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome for one entry file.
#[derive(Debug)]
pub struct Resolution {
    pub entry: PathBuf,
    pub outcome: NixDepsResult<DependencySet>,
}

impl Resolution {
    pub fn deps(&self) -> Option<&DependencySet> {
        self.outcome.as_ref().ok()
    }
}

/// Resolves `entries` with at most `max_concurrent` tracers running.
///
/// Results come back in `entries` order.
pub async fn resolve_batch(
    resolver: Arc<Resolver>,
    entries: Vec<PathBuf>,
    max_concurrent: usize,
) -> NixDepsResult<Vec<Resolution>> {
    let total = entries.len();
    let max_concurrent = max_concurrent.max(1);
    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_concurrent));

    tracing::info!(entries = total, concurrency = max_concurrent, "resolving batch");

    let mut tasks = tokio::task::JoinSet::new();
    let mut pending: HashMap<tokio::task::Id, (usize, PathBuf)> = HashMap::with_capacity(total);
    for (idx, entry) in entries.into_iter().enumerate() {
        let resolver = resolver.clone();
        let sem = semaphore.clone();
        let task_entry = entry.clone();
        let handle = tasks.spawn(async move {
            match sem.acquire().await {
                Ok(_permit) => resolver.resolve(&task_entry).await,
                Err(e) => Err(NixDepsError::Internal(format!("semaphore closed: {e}"))),
            }
        });
        pending.insert(handle.id(), (idx, entry));
    }

    let mut slots: Vec<Option<Resolution>> = (0..total).map(|_| None).collect();
    let mut resolved = 0usize;
    let mut failed = 0usize;

    while let Some(joined) = tasks.join_next_with_id().await {
        // A panicking task fails its own entry only.
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => (
                e.id(),
                Err(NixDepsError::Internal(format!("resolution task panicked: {e}"))),
            ),
        };
        let Some((idx, entry)) = pending.remove(&id) else {
            continue;
        };

        let outcome = match outcome {
            Err(e) if e.is_fatal() => {
                tracing::error!(entry = %entry.display(), error = %e, "aborting batch");
                return Err(e);
            }
            other => other,
        };

        match &outcome {
            Ok(deps) => {
                resolved += 1;
                tracing::debug!(
                    entry = %entry.display(),
                    direct = deps.direct.len(),
                    recursive = deps.recursive.len(),
                    "entry resolved"
                );
            }
            Err(e) => {
                failed += 1;
                log_failure(&entry, e);
            }
        }

        slots[idx] = Some(Resolution { entry, outcome });
    }

    tracing::info!(resolved, failed, "batch done");
    Ok(slots.into_iter().flatten().collect())
}

fn log_failure(entry: &Path, err: &NixDepsError) {
    tracing::error!(entry = %entry.display(), error = %err, "resolution failed, skipping entry");
    if let Some(output) = err.captured_output() {
        for line in output.lines() {
            tracing::error!(entry = %entry.display(), "{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nixdeps_core::ResolverConfig;
    use nixdeps_tracer::{FptraceTracer, RecordedTracer};

    fn resolver(tracer: impl nixdeps_tracer::Tracer + 'static) -> Arc<Resolver> {
        let config = ResolverConfig::new("/ws").unwrap();
        Arc::new(Resolver::new(config, Arc::new(tracer)))
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let r = resolver(RecordedTracer::new());
        assert!(resolve_batch(r, vec![], DEFAULT_CONCURRENCY)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn per_entry_failure_does_not_abort_siblings() {
        let tracer = RecordedTracer::new()
            .with_trace("/ws/a/default.nix", r#"[{"Inputs": ["/ws/a/x.txt"]}]"#)
            .with_trace("/ws/b/default.nix", "not json")
            .with_trace("/ws/c/default.nix", "[]");

        let entries = vec![
            PathBuf::from("/ws/a/default.nix"),
            PathBuf::from("/ws/b/default.nix"),
            PathBuf::from("/ws/c/default.nix"),
        ];
        let results = resolve_batch(resolver(tracer), entries.clone(), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        let order: Vec<&PathBuf> = results.iter().map(|r| &r.entry).collect();
        assert_eq!(order, entries.iter().collect::<Vec<_>>());

        assert_eq!(
            results[0].deps().unwrap().direct_labels(),
            vec!["//a:default.nix", "//a:x.txt"]
        );
        assert!(matches!(
            results[1].outcome,
            Err(NixDepsError::MalformedTrace { .. })
        ));
        assert!(results[2].deps().is_some());
    }

    /// Panics for one entry, serves an empty trace for the rest.
    struct PanicsOn(PathBuf);

    #[async_trait::async_trait]
    impl nixdeps_tracer::Tracer for PanicsOn {
        async fn trace(
            &self,
            request: &nixdeps_tracer::TraceRequest,
        ) -> NixDepsResult<String> {
            if request.entry == self.0 {
                panic!("tracer blew up on {}", request.entry.display());
            }
            Ok("[]".to_string())
        }
    }

    #[tokio::test]
    async fn panicking_task_fails_only_its_entry() {
        let entries = vec![
            PathBuf::from("/ws/a/default.nix"),
            PathBuf::from("/ws/b/default.nix"),
            PathBuf::from("/ws/c/default.nix"),
        ];
        let tracer = PanicsOn(PathBuf::from("/ws/b/default.nix"));
        let results = resolve_batch(resolver(tracer), entries.clone(), 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[1].entry, entries[1]);
        assert!(matches!(results[1].outcome, Err(NixDepsError::Internal(_))));
        assert!(results[0].deps().is_some());
        assert!(results[2].deps().is_some());
    }

    #[tokio::test]
    async fn missing_tool_aborts_batch() {
        let tracer = FptraceTracer::new("/nonexistent/nixdeps/fptrace");
        let entries = vec![
            PathBuf::from("/ws/a/default.nix"),
            PathBuf::from("/ws/b/default.nix"),
        ];
        let err = resolve_batch(resolver(tracer), entries, 1).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
