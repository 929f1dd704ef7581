//! Compiler backends.
//!
//! A backend turns merged [`CompileParams`] into concrete toolchain
//! commands and runs them through an [`Executor`]. Two families exist:
//!
//! - [`GnuBackend`]: clang/gcc style drivers on the host.
//! - [`WatcomBackend`]: Open Watcom run inside DOSBox, which needs 8.3 paths
//!   (see [`dos_path`]).
//!
//! Backends are a closed set ([`BackendKind`]) looked up by name or
//! language tag through a [`BackendRegistry`].

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::{BuildError, BuildResult};
use crate::core::language::Language;
use crate::core::preset::CompileParams;
use crate::util::config::ToolchainSettings;
use crate::util::process::Executor;

pub mod dos_path;
mod gnu;
mod watcom;

pub use gnu::{GnuBackend, GnuFamily};
pub use watcom::WatcomBackend;

/// Link mode for binary tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMode {
    Executable,
    SharedLib,
}

impl LinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Executable => "executable",
            LinkMode::SharedLib => "shared-library",
        }
    }
}

/// A command to execute, with program, arguments, and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// The program to run (e.g., "clang", "dosbox")
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables to set
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
    /// Working directory, if different from the current one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    /// A command line run through the platform shell.
    pub fn shell(line: impl Into<String>) -> Self {
        if cfg!(windows) {
            CommandSpec::new("cmd").arg("/C").arg(line)
        } else {
            CommandSpec::new("sh").arg("-c").arg(line)
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Render the command line for logs and error messages.
    pub fn display(&self) -> String {
        let mut parts = vec![quote(&self.program.display().to_string())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }
}

fn quote(s: &str) -> String {
    if s.is_empty() || s.contains(char::is_whitespace) || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

/// Trait for compiler backends.
pub trait Backend: Send + Sync {
    /// The name used to select this backend (`compiler="..."`).
    fn name(&self) -> &str;

    /// The language this backend compiles (`lang="..."`).
    fn language(&self) -> Language;

    /// Compile one source file into an object file.
    fn create_object(
        &self,
        output: &Path,
        source: &Path,
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()>;

    /// Link objects into an executable.
    fn create_executable(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()>;

    /// Link objects into a shared library.
    fn create_shared_library(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()>;

    /// Object path used when an `<object>` task does not name one.
    fn default_object_path(&self, source: &Path) -> PathBuf;

    /// Whether several objects may be compiled at the same time.
    fn supports_parallel(&self) -> bool {
        true
    }

    /// Host program this backend launches.
    fn host_program(&self) -> &Path;
}

/// The closed set of backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Gnu(GnuBackend),
    Watcom(WatcomBackend),
}

impl BackendKind {
    fn inner(&self) -> &dyn Backend {
        match self {
            BackendKind::Gnu(b) => b,
            BackendKind::Watcom(b) => b,
        }
    }

    /// Dispatch to the creation step for a link mode.
    pub fn link(
        &self,
        mode: LinkMode,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        match mode {
            LinkMode::Executable => self.create_executable(output, objects, link_libs, params, exec),
            LinkMode::SharedLib => {
                self.create_shared_library(output, objects, link_libs, params, exec)
            }
        }
    }
}

impl Backend for BackendKind {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn language(&self) -> Language {
        self.inner().language()
    }

    fn create_object(
        &self,
        output: &Path,
        source: &Path,
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        self.inner().create_object(output, source, params, exec)
    }

    fn create_executable(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        self.inner()
            .create_executable(output, objects, link_libs, params, exec)
    }

    fn create_shared_library(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        self.inner()
            .create_shared_library(output, objects, link_libs, params, exec)
    }

    fn default_object_path(&self, source: &Path) -> PathBuf {
        self.inner().default_object_path(source)
    }

    fn supports_parallel(&self) -> bool {
        self.inner().supports_parallel()
    }

    fn host_program(&self) -> &Path {
        self.inner().host_program()
    }
}

/// Registry of the available backends, in lookup order.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<BackendKind>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        BackendRegistry::default()
    }

    /// The built-in backends.
    ///
    /// Order matters for language lookup: `c` selects `clang` and `cpp`
    /// selects `clang++`. The legacy backend mounts `mount_dir` as its
    /// working drive.
    pub fn builtin(settings: &ToolchainSettings, mount_dir: &Path) -> Self {
        let program = |configured: &Option<PathBuf>, default: &str| {
            configured.clone().unwrap_or_else(|| PathBuf::from(default))
        };

        let mut registry = BackendRegistry::new();
        registry.register(BackendKind::Gnu(GnuBackend::new(
            "clang++",
            Language::Cxx,
            GnuFamily::Clang,
            program(&settings.clangxx, "clang++"),
        )));
        registry.register(BackendKind::Gnu(GnuBackend::new(
            "clang",
            Language::C,
            GnuFamily::Clang,
            program(&settings.clang, "clang"),
        )));
        registry.register(BackendKind::Gnu(GnuBackend::new(
            "g++",
            Language::Cxx,
            GnuFamily::Gcc,
            program(&settings.gxx, "g++"),
        )));
        registry.register(BackendKind::Gnu(GnuBackend::new(
            "gcc",
            Language::C,
            GnuFamily::Gcc,
            program(&settings.gcc, "gcc"),
        )));
        registry.register(BackendKind::Watcom(WatcomBackend::new(
            program(&settings.dosbox, "dosbox"),
            settings.dosbox_args.clone(),
            settings.wcl.clone().unwrap_or_else(|| "wcl".to_string()),
            mount_dir.to_path_buf(),
        )));
        registry
    }

    /// Add a backend at the end of the lookup order.
    pub fn register(&mut self, backend: BackendKind) {
        self.backends.push(backend);
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendKind> {
        self.backends.iter()
    }

    /// Select a backend by exact name, or else by language tag.
    ///
    /// When a name is given it wins and the language is ignored.
    pub fn find(&self, name: Option<&str>, lang: Option<&str>) -> BuildResult<&BackendKind> {
        match (name, lang) {
            (Some(name), _) => self
                .backends
                .iter()
                .find(|b| b.name() == name)
                .ok_or_else(|| BuildError::UnknownCompiler {
                    query: format!("name `{}`", name),
                }),
            (None, Some(tag)) => {
                let unknown = || BuildError::UnknownCompiler {
                    query: format!("language `{}`", tag),
                };
                let lang: Language = tag.parse().map_err(|_| unknown())?;
                self.backends
                    .iter()
                    .find(|b| b.language() == lang)
                    .ok_or_else(unknown)
            }
            (None, None) => Err(BuildError::UnknownCompiler {
                query: "a task without `compiler` or `lang`".to_string(),
            }),
        }
    }

    /// Each backend with the resolved location of its host program, if found.
    pub fn availability(&self) -> Vec<(&str, Option<PathBuf>)> {
        self.backends
            .iter()
            .map(|b| (b.name(), which::which(b.host_program()).ok()))
            .collect()
    }
}

/// Directory and file name of a link library path.
pub(crate) fn split_library(path: &Path) -> (String, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    (dir.display().to_string(), file)
}
