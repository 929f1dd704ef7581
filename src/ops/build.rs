//! Implementation of `buildcc build`, `targets` and `dump`.

use std::path::{Path, PathBuf};

use crate::core::errors::{BuildError, BuildResult};
use crate::core::project::Project;
use crate::util::context::GlobalContext;
use crate::util::process::{DryRunExecutor, PlannedStep, SystemExecutor};

/// Name of the per-directory configuration description.
pub const CONFIG_FILE_NAME: &str = "config.xml";

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Target to run (None = the description's default)
    pub target: Option<String>,

    /// Record commands instead of running them
    pub dry_run: bool,

    /// Number of objects compiled at once (None = from context)
    pub jobs: Option<usize>,
}

/// What a build did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Commands were executed
    Ran { target: String },
    /// Dry run: the commands that would have run, in order
    Planned {
        target: String,
        steps: Vec<PlannedStep>,
    },
}

/// One row of `buildcc targets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSummary {
    pub name: String,
    pub tasks: usize,
    pub is_default: bool,
}

/// `config.xml` files in the ancestors of `dir`, root first.
///
/// `dir` itself is not searched.
pub fn config_files(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = dir
        .ancestors()
        .skip(1)
        .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
        .filter(|file| file.is_file())
        .collect();
    found.reverse();
    found
}

/// Load a description together with the config files above it.
pub fn load_project(ctx: &GlobalContext, build_file: &Path) -> BuildResult<Project> {
    let build_file = ctx.resolve_path(build_file);
    let dir = build_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| ctx.cwd().to_path_buf());

    let mut project = Project::new(ctx, &dir);

    if ctx.discover_configs() {
        for file in config_files(&dir) {
            tracing::trace!("importing config file `{}`", file.display());
            match project.import_file(&file) {
                Ok(_) => {}
                Err(BuildError::NotABuildFile { path, tag }) => {
                    tracing::warn!(
                        "config file `{}` is not a buildcc file (root is `{}`), ignoring",
                        path.display(),
                        tag
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    project.parse_file(&build_file)?;
    tracing::trace!("resolved project:\n{}", project);

    Ok(project)
}

/// Run a target of a loaded project.
pub fn build(ctx: &GlobalContext, project: &Project, opts: &BuildOptions) -> BuildResult<BuildOutcome> {
    let target = project.target(opts.target.as_deref())?;
    let name = target.name.clone();
    let jobs = opts.jobs.unwrap_or_else(|| ctx.jobs());

    if opts.target.is_some() {
        tracing::info!("running target `{}`", name);
    } else {
        tracing::info!("running default target `{}`", name);
    }

    if opts.dry_run {
        let exec = DryRunExecutor::new();
        project.run(Some(&name), &exec, jobs)?;
        return Ok(BuildOutcome::Planned {
            target: name,
            steps: exec.steps(),
        });
    }

    project.run(Some(&name), &SystemExecutor, jobs)?;
    Ok(BuildOutcome::Ran { target: name })
}

/// Targets in declaration order.
pub fn list_targets(project: &Project) -> Vec<TargetSummary> {
    project
        .targets()
        .iter()
        .map(|t| TargetSummary {
            name: t.name.clone(),
            tasks: t.tasks.len(),
            is_default: project.default_target() == Some(t.name.as_str()),
        })
        .collect()
}
