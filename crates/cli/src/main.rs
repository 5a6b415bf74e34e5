//! CLI for the nixdeps trace dependency resolver.
//!
//! Pipeline: locate tracer -> trace entry files -> partition into packages
//! -> dependency sets -> rules / NDJSON rows.

use clap::{Args, Parser, Subcommand};
use nixdeps_core::{
    normalize_path, DependencySet, NixDepsResult, OrphanPolicy, ResolverConfig, WORKSPACE_ROOT_ENV,
};
use nixdeps_resolver::rules::{export_rule, render_all, NixpkgsPackage, Rule};
use nixdeps_resolver::sink::json_stream::JsonStreamSink;
use nixdeps_resolver::sink::{to_rows, FailureRow, ResolutionRow};
use nixdeps_resolver::{discover_entries, resolve_batch, Resolution, Resolver, DEFAULT_CONCURRENCY};
use nixdeps_tracer::{FptraceTracer, RecordedTracer, ToolLocator, Tracer, FPTRACE_RUNFILE};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(name = "nixdeps", version, about = "Nix evaluation dependency resolver")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Workspace root; defaults to the current directory.
    #[arg(long, global = true, env = WORKSPACE_ROOT_ENV)]
    workspace_root: Option<PathBuf>,

    /// Prelude file, relative to the workspace root, that wraps every entry.
    #[arg(long, global = true, env = "NIXDEPS_NIX_PRELUDE")]
    nix_prelude: Option<String>,

    /// File name that marks a package root.
    #[arg(long, global = true, default_value = nixdeps_core::DEFAULT_PACKAGE_MARKER)]
    marker: String,

    /// What to do with traced paths outside any package: drop, warn, fail.
    #[arg(long, global = true, default_value_t = OrphanPolicy::Drop)]
    orphans: OrphanPolicy,

    /// Tracer binary. Skips runfiles and PATH lookup.
    #[arg(long, global = true, env = "NIXDEPS_TRACER")]
    tracer: Option<PathBuf>,

    /// Kill a tracer that runs longer than this many seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the dependency set of one entry file.
    Resolve {
        entry: PathBuf,

        /// Use a recorded tracer payload instead of running the tracer.
        #[arg(long)]
        trace_file: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Discover entry files under DIR and generate rules for each.
    Generate {
        dir: Option<PathBuf>,

        /// Max concurrent tracer processes.
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        jobs: usize,

        /// Sink output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        sink: Option<String>,

        /// Repository mapping for workspace rules, as NAME=LABEL.
        #[arg(long = "repository", value_parser = parse_repository)]
        repositories: Vec<(String, String)>,

        /// Emit `nixpkgs_package` workspace rules instead of `export_nix`.
        #[arg(long, default_value_t = false)]
        workspace_rules: bool,
    },
}

fn parse_repository(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, label)) if !name.is_empty() && !label.is_empty() => {
            Ok((name.to_string(), label.to_string()))
        }
        _ => Err(format!("expected NAME=LABEL, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("NIXDEPS_LOG")
        .or_else(|_| tracing_subscriber::EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.common)?;

    match cli.command {
        Commands::Resolve {
            entry,
            trace_file,
            json,
        } => {
            let entry = absolute(config.workspace_root(), &entry)?;
            let tracer: Arc<dyn Tracer> = match trace_file {
                Some(path) => Arc::new(RecordedTracer::from_file(&path)?),
                None => Arc::new(fptrace(&cli.common, &config)?),
            };
            let resolver = Resolver::new(config, tracer);

            let deps = match resolver.resolve(&entry).await {
                Ok(deps) => deps,
                Err(e) => {
                    if let Some(output) = e.captured_output() {
                        for line in output.lines() {
                            tracing::error!(entry = %entry.display(), "{line}");
                        }
                    }
                    return Err(e.into());
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&deps)?);
            } else {
                print!("{}", render_deps(&deps));
            }
        }

        Commands::Generate {
            dir,
            jobs,
            sink,
            repositories,
            workspace_rules,
        } => {
            let t0 = Instant::now();
            let dir = match dir {
                Some(dir) => absolute(config.workspace_root(), &dir)?,
                None => config.workspace_root().to_path_buf(),
            };

            let entries = discover_entries(&dir, config.marker());
            tracing::info!(dir = %dir.display(), entries = entries.len(), "discovered entries");

            let tracer = fptrace(&cli.common, &config)?;
            let resolver = Arc::new(Resolver::new(config, Arc::new(tracer)));
            let results = resolve_batch(resolver.clone(), entries, jobs).await?;

            let repositories: BTreeMap<String, String> = repositories.into_iter().collect();
            let rules = build_rules(resolver.config(), &results, &repositories, workspace_rules)?;

            tracing::info!(
                rules = rules.len(),
                elapsed_ms = t0.elapsed().as_millis(),
                "generation complete"
            );

            if let Some(ref sink_spec) = sink {
                let (resolved, failed) = to_rows(&results, resolver.config().workspace_root());

                if sink_spec == "ndjson" {
                    let n = write_rows(JsonStreamSink::stdout(), &resolved, &failed, &rules)?;
                    tracing::info!(rows = n, "ndjson sink: wrote to stdout");
                } else if let Some(path) = sink_spec.strip_prefix("ndjson:") {
                    let file = std::fs::File::create(path)?;
                    let n = write_rows(JsonStreamSink::new(file), &resolved, &failed, &rules)?;
                    tracing::info!(rows = n, path, "ndjson sink: wrote to file");
                } else {
                    return Err(format!(
                        "unknown sink: {sink_spec}. Use 'ndjson' or 'ndjson:/path'"
                    )
                    .into());
                }

                eprint!("{}", render_all(&rules));
            } else {
                print!("{}", render_all(&rules));
            }
        }
    }

    Ok(())
}

fn build_config(args: &CommonArgs) -> Result<ResolverConfig, Box<dyn std::error::Error>> {
    let root = match &args.workspace_root {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let mut config = ResolverConfig::new(root)?
        .with_marker(args.marker.clone())
        .with_orphan_policy(args.orphans)
        .with_tracer_timeout(args.timeout_secs.map(Duration::from_secs));
    if let Some(prelude) = &args.nix_prelude {
        config = config.with_prelude(prelude.clone());
    }
    Ok(config)
}

fn fptrace(
    args: &CommonArgs,
    config: &ResolverConfig,
) -> Result<FptraceTracer, Box<dyn std::error::Error>> {
    let binary = ToolLocator::from_env()
        .with_explicit(args.tracer.clone())
        .locate(FPTRACE_RUNFILE)?;
    tracing::debug!(tracer = %binary.display(), "using tracer");
    Ok(FptraceTracer::new(binary).with_timeout(config.tracer_timeout()))
}

fn absolute(root: &Path, path: &Path) -> NixDepsResult<PathBuf> {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&root.join(path))
    }
}

fn build_rules(
    config: &ResolverConfig,
    results: &[Resolution],
    repositories: &BTreeMap<String, String>,
    workspace_rules: bool,
) -> Result<Vec<Rule>, Box<dyn std::error::Error>> {
    let mut rules = Vec::new();
    for r in results {
        let Some(deps) = r.deps() else { continue };
        let export = export_rule(config, &r.entry, deps)?;
        rules.push(if workspace_rules {
            Rule::NixpkgsPackage(NixpkgsPackage::from_export(&export, repositories))
        } else {
            Rule::ExportNix(export)
        });
    }
    Ok(rules)
}

fn write_rows<W: Write>(
    mut sink: JsonStreamSink<W>,
    resolved: &[ResolutionRow],
    failed: &[FailureRow],
    rules: &[Rule],
) -> std::io::Result<usize> {
    sink.write_resolutions(resolved)?;
    sink.write_failures(failed)?;
    sink.write_rules(rules)?;
    sink.finish()
}

fn render_deps(deps: &DependencySet) -> String {
    let mut out = String::new();
    out.push_str(&format!("direct ({}):\n", deps.direct.len()));
    for t in &deps.direct {
        out.push_str(&format!("  {t}\n"));
    }
    out.push_str(&format!("recursive ({}):\n", deps.recursive.len()));
    for t in &deps.recursive {
        out.push_str(&format!("  {t}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_workspace_root() {
        let root = Path::new("/ws");
        assert_eq!(absolute(root, Path::new(".")).unwrap(), Path::new("/ws"));
        assert_eq!(
            absolute(root, Path::new("./a/default.nix")).unwrap(),
            Path::new("/ws/a/default.nix")
        );
        assert_eq!(
            absolute(root, Path::new("/ws/./b")).unwrap(),
            Path::new("/ws/b")
        );
        assert!(absolute(root, Path::new("../elsewhere")).is_err());
    }

    #[test]
    fn repository_flag_parses() {
        assert_eq!(
            parse_repository("nixpkgs=@nixpkgs").unwrap(),
            ("nixpkgs".to_string(), "@nixpkgs".to_string())
        );
        assert!(parse_repository("nixpkgs").is_err());
        assert!(parse_repository("=@nixpkgs").is_err());
    }
}
