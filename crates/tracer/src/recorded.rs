//! Replays previously captured trace payloads instead of running a tracer.

use crate::{TraceRequest, Tracer};
use async_trait::async_trait;
use nixdeps_core::error::{NixDepsError, NixDepsResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Serves stored payloads keyed by entry file, with an optional fallback
/// for entries that have none.
#[derive(Debug, Clone, Default)]
pub struct RecordedTracer {
    traces: HashMap<PathBuf, String>,
    fallback: Option<String>,
}

impl RecordedTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `payload` for every entry.
    pub fn single(payload: impl Into<String>) -> Self {
        Self {
            traces: HashMap::new(),
            fallback: Some(payload.into()),
        }
    }

    /// Reads a payload saved from an earlier `fptrace -d` run.
    pub fn from_file(path: &Path) -> NixDepsResult<Self> {
        let payload = std::fs::read_to_string(path)?;
        Ok(Self::single(payload))
    }

    pub fn with_trace(mut self, entry: impl Into<PathBuf>, payload: impl Into<String>) -> Self {
        self.traces.insert(entry.into(), payload.into());
        self
    }
}

#[async_trait]
impl Tracer for RecordedTracer {
    async fn trace(&self, request: &TraceRequest) -> NixDepsResult<String> {
        self.traces
            .get(&request.entry)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                NixDepsError::InvalidInput(format!(
                    "no recorded trace for {}",
                    request.entry.display()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(entry: &str) -> TraceRequest {
        TraceRequest {
            entry: PathBuf::from(entry),
            prelude: None,
            workspace_root: PathBuf::from("/ws"),
        }
    }

    #[tokio::test]
    async fn per_entry_then_fallback() {
        let tracer = RecordedTracer::new().with_trace("/ws/a/default.nix", "[1]");
        assert_eq!(tracer.trace(&request("/ws/a/default.nix")).await.unwrap(), "[1]");
        assert!(tracer.trace(&request("/ws/b/default.nix")).await.is_err());

        let tracer = RecordedTracer::single("[]").with_trace("/ws/a/default.nix", "[1]");
        assert_eq!(tracer.trace(&request("/ws/b/default.nix")).await.unwrap(), "[]");
    }
}
