//! Build rules generated from resolved dependency sets.
//!
//! Construction and rendering are separate: [`export_rule`] and
//! [`NixpkgsPackage::from_export`] build [`Rule`] values, [`render`] turns
//! them into BUILD-file text.

use nixdeps_core::error::{NixDepsError, NixDepsResult};
use nixdeps_core::{DependencySet, ResolverConfig};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

pub const EXPORT_RULE: &str = "export_nix";
pub const PACKAGE_RULE: &str = "nixpkgs_package";

/// `.bzl` files defining each generated kind.
pub const EXPORT_RULE_BZL: &str = "@io_tweag_gazelle_nix//nix:defs.bzl";
pub const PACKAGE_RULE_BZL: &str = "@io_tweag_rules_nixpkgs//nixpkgs:nixpkgs.bzl";

/// Optional BUILD template living next to an entry file.
pub const BUILD_TEMPLATE: &str = "BUILD.bazel.tpl";

const AUTOGENERATED: &str = "# autogenerated";

/// Name of the rule generated for the workspace root package.
const ROOT_RULE_NAME: &str = "root";

/// Exports one package's nix file together with everything it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportNix {
    pub name: String,
    pub nix_file: String,
    /// Targets in the package itself.
    pub files: Vec<String>,
    /// Every target touched during evaluation.
    pub deps: Vec<String>,
    pub nixopts: Vec<String>,
    pub build_file: Option<String>,
}

/// Workspace-level repository rule derived from an [`ExportNix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NixpkgsPackage {
    pub name: String,
    pub nix_file: String,
    pub nixopts: Vec<String>,
    pub nix_file_deps: Vec<String>,
    pub build_file: Option<String>,
    pub repositories: BTreeMap<String, String>,
}

impl NixpkgsPackage {
    pub fn from_export(export: &ExportNix, repositories: &BTreeMap<String, String>) -> Self {
        Self {
            name: export.name.clone(),
            nix_file: export.nix_file.clone(),
            nixopts: export.nixopts.clone(),
            nix_file_deps: export.deps.clone(),
            build_file: export.build_file.clone(),
            repositories: repositories.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    ExportNix(ExportNix),
    NixpkgsPackage(NixpkgsPackage),
}

impl Rule {
    pub fn kind(&self) -> &'static str {
        match self {
            Rule::ExportNix(_) => EXPORT_RULE,
            Rule::NixpkgsPackage(_) => PACKAGE_RULE,
        }
    }

    /// Label of the `.bzl` file this kind must be loaded from.
    pub fn load_from(&self) -> &'static str {
        match self {
            Rule::ExportNix(_) => EXPORT_RULE_BZL,
            Rule::NixpkgsPackage(_) => PACKAGE_RULE_BZL,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Rule::ExportNix(r) => &r.name,
            Rule::NixpkgsPackage(r) => &r.name,
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Builds the `export_nix` rule for `entry` from its resolved dependencies.
///
/// With a prelude configured the rule evaluates the prelude and passes the
/// entry as `--argstr nix_file`; otherwise it points at the entry itself.
pub fn export_rule(
    config: &ResolverConfig,
    entry: &Path,
    deps: &DependencySet,
) -> NixDepsResult<ExportNix> {
    let invalid = || {
        NixDepsError::InvalidInput(format!(
            "entry file {} is not a UTF-8 path under {}",
            entry.display(),
            config.workspace_root().display()
        ))
    };
    let rel = entry
        .strip_prefix(config.workspace_root())
        .map_err(|_| invalid())?;
    let file_name = rel.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    let package = rel.parent().and_then(Path::to_str).ok_or_else(invalid)?;

    let name = if package.is_empty() {
        ROOT_RULE_NAME.to_string()
    } else {
        package.replace('/', ".")
    };

    let (nix_file, nixopts) = match config.prelude() {
        Some(prelude) => {
            let entry_arg = if package.is_empty() {
                file_name.to_string()
            } else {
                format!("{package}/{file_name}")
            };
            (
                format!("//:{prelude}"),
                vec!["--argstr".to_string(), "nix_file".to_string(), entry_arg],
            )
        }
        None => (format!("//{package}:{file_name}"), Vec::new()),
    };

    let mut files = deps.direct_labels();
    let template = entry.with_file_name(BUILD_TEMPLATE);
    let build_file = template.is_file().then(|| format!("//{package}:{BUILD_TEMPLATE}"));
    if let Some(label) = &build_file {
        files.push(label.clone());
    }
    files.sort();
    files.dedup();

    Ok(ExportNix {
        name,
        nix_file,
        files,
        deps: deps.recursive_labels(),
        nixopts,
        build_file,
    })
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Renders rules in BUILD-file syntax: `load()` statements for the kinds
/// present, then the rules sorted by kind and name.
pub fn render_all(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&Rule> = rules.iter().collect();
    sorted.sort_by(|a, b| a.kind().cmp(b.kind()).then_with(|| a.name().cmp(b.name())));

    let mut out = render_loads(rules);
    out.push('\n');
    out.push_str(
        &sorted
            .into_iter()
            .map(render)
            .collect::<Vec<_>>()
            .join("\n"),
    );
    out
}

/// One `load()` per `.bzl` file, sorted, each listing the kinds used from it.
pub fn render_loads(rules: &[Rule]) -> String {
    let mut loads: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for rule in rules {
        loads.entry(rule.load_from()).or_default().insert(rule.kind());
    }

    let mut out = String::new();
    for (bzl, kinds) in loads {
        out.push_str(&format!("load({}", quote(bzl)));
        for kind in kinds {
            out.push_str(&format!(", {}", quote(kind)));
        }
        out.push_str(")\n");
    }
    out
}

/// Renders one rule. Empty attributes are omitted.
pub fn render(rule: &Rule) -> String {
    let mut out = String::new();
    out.push_str(AUTOGENERATED);
    out.push('\n');
    out.push_str(rule.kind());
    out.push_str("(\n");

    match rule {
        Rule::ExportNix(r) => {
            attr_str(&mut out, "name", &r.name);
            attr_str(&mut out, "nix_file", &r.nix_file);
            attr_list(&mut out, "files", &r.files);
            attr_list(&mut out, "deps", &r.deps);
            attr_list(&mut out, "nixopts", &r.nixopts);
            if let Some(build_file) = &r.build_file {
                attr_str(&mut out, "build_file", build_file);
            }
        }
        Rule::NixpkgsPackage(r) => {
            attr_str(&mut out, "name", &r.name);
            attr_str(&mut out, "nix_file", &r.nix_file);
            attr_list(&mut out, "nixopts", &r.nixopts);
            attr_list(&mut out, "nix_file_deps", &r.nix_file_deps);
            attr_dict(&mut out, "repositories", &r.repositories);
            if let Some(build_file) = &r.build_file {
                attr_str(&mut out, "build_file", build_file);
            }
        }
    }

    out.push_str(")\n");
    out
}

fn attr_str(out: &mut String, key: &str, value: &str) {
    out.push_str(&format!("    {key} = {},\n", quote(value)));
}

fn attr_list(out: &mut String, key: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    out.push_str(&format!("    {key} = [\n"));
    for v in values {
        out.push_str(&format!("        {},\n", quote(v)));
    }
    out.push_str("    ],\n");
}

fn attr_dict(out: &mut String, key: &str, values: &BTreeMap<String, String>) {
    if values.is_empty() {
        return;
    }
    out.push_str(&format!("    {key} = {{\n"));
    for (k, v) in values {
        out.push_str(&format!("        {}: {},\n", quote(k), quote(v)));
    }
    out.push_str("    },\n");
}

fn quote(s: &str) -> String {
    let mut q = String::with_capacity(s.len() + 2);
    q.push('"');
    for c in s.chars() {
        match c {
            '"' => q.push_str("\\\""),
            '\\' => q.push_str("\\\\"),
            '\n' => q.push_str("\\n"),
            c => q.push(c),
        }
    }
    q.push('"');
    q
}
