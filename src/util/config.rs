//! Configuration file support for buildcc.
//!
//! Two configuration file locations are read:
//! - Global: `~/.buildcc/config.toml` - User-wide defaults
//! - Project: `<project>/.buildcc/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. A missing file is the
//! same as an empty one; a malformed file is reported and skipped.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// buildcc configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Toolchain program overrides
    pub toolchain: ToolchainSettings,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default verbosity (0 warn, 1 info, 2 debug, 3 trace)
    pub verbosity: Option<u8>,

    /// Default number of objects compiled at once
    pub jobs: Option<usize>,
}

/// Where the toolchain programs live.
///
/// Unset entries fall back to the bare program name looked up on `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to clang
    pub clang: Option<PathBuf>,

    /// Path to clang++
    pub clangxx: Option<PathBuf>,

    /// Path to gcc
    pub gcc: Option<PathBuf>,

    /// Path to g++
    pub gxx: Option<PathBuf>,

    /// Path to the DOSBox emulator
    pub dosbox: Option<PathBuf>,

    /// Extra DOSBox arguments, placed before the generated ones
    pub dosbox_args: Vec<String>,

    /// Name of the Watcom driver inside the emulated machine
    pub wcl: Option<String>,
}

impl ToolchainSettings {
    /// Merge another settings block into this one (other takes precedence).
    pub fn merge(&mut self, other: ToolchainSettings) {
        if other.clang.is_some() {
            self.clang = other.clang;
        }
        if other.clangxx.is_some() {
            self.clangxx = other.clangxx;
        }
        if other.gcc.is_some() {
            self.gcc = other.gcc;
        }
        if other.gxx.is_some() {
            self.gxx = other.gxx;
        }
        if other.dosbox.is_some() {
            self.dosbox = other.dosbox;
        }
        if !other.dosbox_args.is_empty() {
            self.dosbox_args = other.dosbox_args;
        }
        if other.wcl.is_some() {
            self.wcl = other.wcl;
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.verbosity.is_some() {
            self.build.verbosity = other.build.verbosity;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        self.toolchain.merge(other.toolchain);
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.buildcc/config.toml)
/// 2. Global config (~/.buildcc/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }
    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global buildcc config directory (~/.buildcc).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".buildcc"))
}

/// Get the global config path (~/.buildcc/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.buildcc/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".buildcc").join("config.toml")
}
