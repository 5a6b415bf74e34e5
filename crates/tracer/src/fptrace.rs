//! `fptrace` subprocess tracer.
//!
//! Runs `fptrace -d <trace.json> nix-instantiate ...` once per entry file.
//! The trace file is a `NamedTempFile`, removed when this call returns on
//! any path; the child is killed if its future is dropped.

use crate::{TraceRequest, Tracer};
use async_trait::async_trait;
use nixdeps_core::error::{NixDepsError, NixDepsResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Evaluator the tracer wraps.
const DEFAULT_EVALUATOR: &str = "nix-instantiate";

pub struct FptraceTracer {
    binary: PathBuf,
    evaluator: String,
    timeout: Option<Duration>,
}

impl FptraceTracer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            evaluator: DEFAULT_EVALUATOR.to_string(),
            timeout: None,
        }
    }

    /// Kill the tracer after `timeout` (default: wait forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl Into<String>) -> Self {
        self.evaluator = evaluator.into();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// `ToolNotFound` only when the tracer itself is missing. A present
    /// tracer whose interpreter is missing also spawns with `NotFound`;
    /// that stays a per-entry I/O failure.
    fn spawn_error(&self, e: std::io::Error) -> NixDepsError {
        if e.kind() == std::io::ErrorKind::NotFound && !self.binary.exists() {
            NixDepsError::ToolNotFound {
                tool: self.binary.display().to_string(),
            }
        } else {
            NixDepsError::Io(e)
        }
    }

    fn command_args(&self, request: &TraceRequest, trace_file: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-d".into(),
            trace_file.into(),
            self.evaluator.clone().into(),
        ];
        match &request.prelude {
            Some(prelude) => {
                args.push(request.workspace_root.join(prelude).into());
                args.push("--argstr".into());
                args.push("nix_file".into());
                args.push(request.entry.clone().into());
            }
            None => args.push(request.entry.clone().into()),
        }
        args
    }
}

#[async_trait]
impl Tracer for FptraceTracer {
    async fn trace(&self, request: &TraceRequest) -> NixDepsResult<String> {
        let trace_file = tempfile::Builder::new()
            .prefix("nix-gzl")
            .suffix(".json")
            .tempfile()?;

        let args = self.command_args(request, trace_file.path());

        tracing::debug!(
            tracer = %self.binary.display(),
            entry = %request.entry.display(),
            trace_file = %trace_file.path().display(),
            "spawning tracer"
        );

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(after) => match tokio::time::timeout(after, wait).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(
                        entry = %request.entry.display(),
                        timeout_ms = after.as_millis(),
                        "tracer timed out, killed"
                    );
                    return Err(NixDepsError::TracerTimeout {
                        entry: request.entry.clone(),
                        after,
                    });
                }
            },
            None => wait.await?,
        };

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(NixDepsError::SubprocessFailure {
                entry: request.entry.clone(),
                status: output.status.to_string(),
                output: captured,
            });
        }

        if !captured.is_empty() {
            tracing::trace!(entry = %request.entry.display(), output = %captured, "tracer output");
        }

        let payload = tokio::fs::read_to_string(trace_file.path()).await?;
        Ok(payload)
    }
}
