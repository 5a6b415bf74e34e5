//! Read-only configuration shared by every resolution in a run.

use crate::error::{NixDepsError, NixDepsResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Environment variable the host build tool sets to the workspace root.
pub const WORKSPACE_ROOT_ENV: &str = "BUILD_WORKSPACE_DIRECTORY";

/// Filename whose presence marks a directory as a package root.
pub const DEFAULT_PACKAGE_MARKER: &str = "default.nix";

/// What to do with a traced file that lies under no package root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Drop silently.
    #[default]
    Drop,
    /// Drop, but log each orphan.
    Warn,
    /// Fail the resolution of the entry file.
    Fail,
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(OrphanPolicy::Drop),
            "warn" => Ok(OrphanPolicy::Warn),
            "fail" => Ok(OrphanPolicy::Fail),
            other => Err(format!(
                "unknown orphan policy '{other}' (expected drop, warn or fail)"
            )),
        }
    }
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrphanPolicy::Drop => "drop",
            OrphanPolicy::Warn => "warn",
            OrphanPolicy::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// Resolver settings.
///
/// ```ignore
/// let cfg = ResolverConfig::new("/ws")?
///     .with_prelude("nix/prelude.nix")
///     .with_orphan_policy(OrphanPolicy::Warn);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    workspace_root: PathBuf,
    prelude: Option<String>,
    marker: String,
    orphan_policy: OrphanPolicy,
    tracer_timeout: Option<Duration>,
}

impl ResolverConfig {
    /// The workspace root must be absolute; a trailing separator is dropped.
    pub fn new(workspace_root: impl Into<PathBuf>) -> NixDepsResult<Self> {
        let workspace_root = workspace_root.into();
        if !workspace_root.is_absolute() {
            return Err(NixDepsError::InvalidInput(format!(
                "workspace root must be absolute: {}",
                workspace_root.display()
            )));
        }
        let workspace_root = normalize_path(&workspace_root)?;

        Ok(Self {
            workspace_root,
            prelude: None,
            marker: DEFAULT_PACKAGE_MARKER.to_string(),
            orphan_policy: OrphanPolicy::default(),
            tracer_timeout: None,
        })
    }

    /// Reads the workspace root from [`WORKSPACE_ROOT_ENV`].
    pub fn from_env() -> NixDepsResult<Self> {
        let root = std::env::var_os(WORKSPACE_ROOT_ENV).ok_or_else(|| {
            NixDepsError::InvalidInput(format!("{WORKSPACE_ROOT_ENV} is not set"))
        })?;
        Self::new(root)
    }

    /// Prelude wrapper, relative to the workspace root. Empty means none.
    pub fn with_prelude(mut self, prelude: impl Into<String>) -> Self {
        let prelude = prelude.into();
        self.prelude = (!prelude.is_empty()).then_some(prelude);
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.orphan_policy = policy;
        self
    }

    /// Deadline for one tracer run (default: unbounded).
    pub fn with_tracer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tracer_timeout = timeout;
        self
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn prelude(&self) -> Option<&str> {
        self.prelude.as_deref()
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    pub fn tracer_timeout(&self) -> Option<Duration> {
        self.tracer_timeout
    }
}

/// Lexically normalizes an absolute path: `.` segments and trailing
/// separators are dropped, `..` is rejected.
///
/// The filesystem is not consulted, so symlinks are left as they are.
pub fn normalize_path(path: &Path) -> NixDepsResult<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(NixDepsError::InvalidInput(format!(
                    "path must not contain '..': {}",
                    path.display()
                )));
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
