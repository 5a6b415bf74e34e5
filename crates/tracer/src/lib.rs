//! Tracer abstraction and auxiliary tool location for nixdeps.

pub mod fptrace;
pub mod locate;
pub mod recorded;

use async_trait::async_trait;
use nixdeps_core::NixDepsResult;
use std::path::PathBuf;

pub use fptrace::FptraceTracer;
pub use locate::{ToolLocator, FPTRACE_RUNFILE};
pub use recorded::RecordedTracer;

/// One tracer invocation: evaluate `entry` and record every file it touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRequest {
    /// Absolute path of the package description being evaluated.
    pub entry: PathBuf,
    /// Prelude wrapper relative to `workspace_root`, if any.
    pub prelude: Option<String>,
    pub workspace_root: PathBuf,
}

/// Abstraction for obtaining a raw access trace from any source.
///
/// Returns the tracer's JSON payload undecoded.
#[async_trait]
pub trait Tracer: Send + Sync {
    async fn trace(&self, request: &TraceRequest) -> NixDepsResult<String>;
}
