//! Locates auxiliary executables by their runfiles identifier.
//!
//! Lookup order: explicit override, `$RUNFILES_DIR`, the `<exe>.runfiles`
//! tree next to the running binary, then `PATH` by file name.

use nixdeps_core::error::{NixDepsError, NixDepsResult};
use std::path::{Path, PathBuf};

/// Runfiles identifier of the tracer binary.
pub const FPTRACE_RUNFILE: &str = "external/fptrace/bin/fptrace";

#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    explicit: Option<PathBuf>,
    runfiles_dir: Option<PathBuf>,
    exe_runfiles: Option<PathBuf>,
    search_path: bool,
}

impl ToolLocator {
    /// Locator seeded from the process environment.
    pub fn from_env() -> Self {
        let exe_runfiles = std::env::current_exe().ok().map(|exe| {
            let mut s = exe.into_os_string();
            s.push(".runfiles");
            PathBuf::from(s)
        });
        Self {
            explicit: None,
            runfiles_dir: std::env::var_os("RUNFILES_DIR").map(PathBuf::from),
            exe_runfiles,
            search_path: true,
        }
    }

    /// Use this path and nothing else.
    pub fn with_explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn with_runfiles_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.runfiles_dir = dir;
        self
    }

    pub fn with_path_search(mut self, enabled: bool) -> Self {
        self.search_path = enabled;
        self
    }

    pub fn locate(&self, relative: &str) -> NixDepsResult<PathBuf> {
        if let Some(explicit) = &self.explicit {
            return if explicit.is_file() {
                Ok(explicit.clone())
            } else {
                Err(NixDepsError::ToolNotFound {
                    tool: explicit.display().to_string(),
                })
            };
        }

        let runfile_roots = [self.runfiles_dir.as_deref(), self.exe_runfiles.as_deref()];
        for root in runfile_roots.into_iter().flatten() {
            let candidate = root.join(relative);
            if candidate.is_file() {
                tracing::debug!(tool = relative, path = %candidate.display(), "found runfile");
                return Ok(candidate);
            }
        }

        if self.search_path {
            if let Some(name) = Path::new(relative).file_name() {
                if let Ok(found) = which::which(name) {
                    tracing::debug!(tool = relative, path = %found.display(), "found on PATH");
                    return Ok(found);
                }
            }
        }

        Err(NixDepsError::ToolNotFound {
            tool: relative.to_string(),
        })
    }
}
