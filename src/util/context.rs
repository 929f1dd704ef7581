//! Global context for buildcc operations.
//!
//! Everything the library needs from the outside world (verbosity, the
//! working directory, command-line property overrides and the loaded
//! configuration) travels in one explicit [`GlobalContext`] value.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::config::{self, Config};

/// Verbosity used when neither the command line nor the config sets one.
pub const DEFAULT_VERBOSITY: u8 = 1;

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Directory relative paths on the command line are resolved against
    cwd: PathBuf,

    /// 0 warn, 1 info, 2 debug, 3 trace
    verbosity: u8,

    /// `-p NAME=VALUE` overrides, in command-line order
    overrides: Vec<(String, String)>,

    /// Merged global and project configuration
    config: Config,

    /// Whether ancestor `config.xml` files are imported
    discover_configs: bool,

    /// Objects compiled at once within one binary
    jobs: usize,
}

impl GlobalContext {
    /// Create a GlobalContext rooted at the current directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            verbosity: DEFAULT_VERBOSITY,
            overrides: Vec::new(),
            config: Config::default(),
            discover_configs: true,
            jobs: 1,
        }
    }

    /// Load global and project configuration for a project directory.
    ///
    /// Verbosity and job count from the config become the new defaults.
    pub fn load_config(&mut self, project_root: &Path) {
        let global = config::global_config_path();
        let config = config::load_config(global.as_deref(), &config::project_config_path(project_root));
        self.set_config(config);
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: Config) {
        if let Some(v) = config.build.verbosity {
            self.verbosity = v.min(3);
        }
        if let Some(jobs) = config.build.jobs {
            self.jobs = jobs.max(1);
        }
        self.config = config;
    }

    /// Set the verbosity level (clamped to 0..=3).
    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.verbosity = verbosity.min(3);
    }

    /// Set the number of parallel compile jobs.
    pub fn set_jobs(&mut self, jobs: usize) {
        self.jobs = jobs.max(1);
    }

    /// Enable or disable `config.xml` discovery.
    pub fn set_discover_configs(&mut self, discover: bool) {
        self.discover_configs = discover;
    }

    /// Raise verbosity by `steps` above its current level.
    pub fn increase_verbosity(&mut self, steps: u8) {
        self.set_verbosity(self.verbosity.saturating_add(steps));
    }

    /// Add a property override. A later override of the same name replaces
    /// the earlier value.
    pub fn add_override(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.overrides.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.overrides.push((name, value)),
        }
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn discover_configs(&self) -> bool {
        self.discover_configs
    }

    pub fn overrides(&self) -> &[(String, String)] {
        &self.overrides
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve a command-line path against the working directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

/// Parse a `NAME[=VALUE]` property argument.
///
/// A bare `NAME` sets the empty string.
pub fn parse_property_arg(arg: &str) -> Result<(String, String)> {
    let (name, value) = match arg.split_once('=') {
        Some((name, value)) => (name, value),
        None => (arg, ""),
    };

    let valid = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    if name.is_empty() || !name.chars().all(valid) {
        bail!("invalid property name `{}` in `{}`", name, arg);
    }

    Ok((name.to_string(), value.to_string()))
}
