//! Domain types for the nixdeps resolver.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Trace records
// ---------------------------------------------------------------------------

/// Command metadata of one traced process.
///
/// Field names follow the tracer's wire format (`Cmd.ID`, `Cmd.Parent`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCommand {
    #[serde(rename = "ID", default)]
    pub id: i64,
    #[serde(rename = "Parent", default)]
    pub parent: i64,
    #[serde(rename = "Path", default)]
    pub path: String,
    #[serde(rename = "Args", default, deserialize_with = "null_as_empty")]
    pub args: Vec<String>,
    #[serde(rename = "Dir", default)]
    pub dir: String,
}

/// Files read and written by one traced process.
///
/// Only `Inputs` is required on the wire; everything else defaults and
/// unknown fields (`FDs`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    #[serde(rename = "Cmd", default)]
    pub command: ProcessCommand,
    #[serde(rename = "Inputs", deserialize_with = "null_as_empty")]
    pub inputs: Vec<String>,
    #[serde(rename = "Outputs", default, deserialize_with = "null_as_empty")]
    pub outputs: Vec<String>,
}

impl AccessRecord {
    pub fn process_id(&self) -> i64 {
        self.command.id
    }

    pub fn parent_id(&self) -> i64 {
        self.command.parent
    }
}

/// The tracer emits `null` for processes that touched no files.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Targets
// ---------------------------------------------------------------------------

/// One file inside one package, rendered `//package_path:relative_name`.
///
/// Ordering, equality and hashing all follow the rendered form, so sorting
/// a list of references is the same as sorting their label strings.
#[derive(Debug, Clone)]
pub struct TargetReference {
    /// Package directory relative to the workspace root; empty for the root.
    pub package_path: String,
    /// File path relative to the package directory.
    pub relative_name: String,
}

impl TargetReference {
    pub fn new(package_path: impl Into<String>, relative_name: impl Into<String>) -> Self {
        Self {
            package_path: package_path.into(),
            relative_name: relative_name.into(),
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }

    #[inline]
    fn label_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.package_path
            .bytes()
            .chain(std::iter::once(b':'))
            .chain(self.relative_name.bytes())
    }
}

impl fmt::Display for TargetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.package_path, self.relative_name)
    }
}

impl PartialEq for TargetReference {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TargetReference {}

impl PartialOrd for TargetReference {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TargetReference {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.label_bytes().cmp(other.label_bytes())
    }
}

impl Hash for TargetReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.label_bytes() {
            state.write_u8(b);
        }
    }
}

impl FromStr for TargetReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix("//")
            .ok_or_else(|| format!("label must start with '//': {s}"))?;
        let (package_path, relative_name) = body
            .split_once(':')
            .ok_or_else(|| format!("label has no ':' separator: {s}"))?;
        Ok(Self::new(package_path, relative_name))
    }
}

impl Serialize for TargetReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TargetReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Dependency sets
// ---------------------------------------------------------------------------

/// Resolver output for one entry file.
///
/// `direct` holds targets in the entry file's own package; `recursive` holds
/// every target touched during evaluation. `direct ⊆ recursive` always.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    pub direct: Vec<TargetReference>,
    pub recursive: Vec<TargetReference>,
}

impl DependencySet {
    /// Stable lexical order over the rendered labels.
    pub fn sort(&mut self) {
        self.direct.sort();
        self.recursive.sort();
    }

    pub fn is_consistent(&self) -> bool {
        self.direct.iter().all(|t| self.recursive.contains(t))
    }

    pub fn direct_labels(&self) -> Vec<String> {
        self.direct.iter().map(TargetReference::label).collect()
    }

    pub fn recursive_labels(&self) -> Vec<String> {
        self.recursive.iter().map(TargetReference::label).collect()
    }
}
