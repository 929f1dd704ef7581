//! Open Watcom backend, run inside DOSBox.
//!
//! The working directory is mounted as drive `W:`. Every path handed to the
//! DOS side is made relative to that mount and converted to an 8.3 name.
//! `wcl` cannot write arbitrary long output names, so it always writes a
//! fixed file which is moved to the requested output once DOSBox returns.

use std::path::{Component, Path, PathBuf};

use crate::core::errors::{BuildError, BuildResult};
use crate::core::language::Language;
use crate::core::preset::CompileParams;
use crate::util::process::{run_checked, Executor};

use super::dos_path::mangle;
use super::{Backend, CommandSpec};

/// Drive letter the working directory is mounted as.
pub const DRIVE: &str = "W";
/// Fixed object name written by `wcl`.
pub const OBJECT_OUTPUT: &str = "OUT.OBJ";
/// Fixed executable name written by `wcl`.
pub const EXE_OUTPUT: &str = "OUT.EXE";

/// Open Watcom (tested against 1.9) under DOSBox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcomBackend {
    /// Path to the DOSBox binary on the host
    dosbox: PathBuf,
    /// Extra DOSBox arguments placed before the `-c` commands
    dosbox_args: Vec<String>,
    /// Name of the compile-and-link driver inside DOS
    wcl: String,
    /// Host directory mounted as the working drive
    mount_dir: PathBuf,
}

impl WatcomBackend {
    pub fn new(
        dosbox: impl Into<PathBuf>,
        dosbox_args: Vec<String>,
        wcl: impl Into<String>,
        mount_dir: impl Into<PathBuf>,
    ) -> Self {
        WatcomBackend {
            dosbox: dosbox.into(),
            dosbox_args,
            wcl: wcl.into(),
            mount_dir: mount_dir.into(),
        }
    }

    pub fn mount_dir(&self) -> &Path {
        &self.mount_dir
    }

    /// Convert a host path into a DOS path on the mounted drive.
    pub fn dos_path(&self, path: &Path) -> BuildResult<String> {
        let relative = if path.is_absolute() {
            pathdiff::diff_paths(path, &self.mount_dir).unwrap_or_else(|| path.to_path_buf())
        } else {
            path.to_path_buf()
        };

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(BuildError::IncompatiblePath {
                        path: path.display().to_string(),
                        reason: format!(
                            "not reachable from the mounted directory `{}`",
                            self.mount_dir.display()
                        ),
                    })
                }
            }
        }

        mangle(&segments.join("/"))
    }

    /// The DOS command line compiling `source` into [`OBJECT_OUTPUT`].
    pub fn object_command(&self, source: &Path, params: &CompileParams) -> BuildResult<String> {
        let mut parts = vec![
            self.wcl.clone(),
            "/c".to_string(),
            self.dos_path(source)?,
            format!("/fo={}", OBJECT_OUTPUT),
        ];

        if params.debug_symbols() {
            parts.push("/d2".to_string());
        }
        for define in &params.defines {
            parts.push(format!("/d{}", define));
        }
        for dir in &params.includes {
            parts.push(format!("/i={}", self.dos_path(Path::new(dir))?));
        }
        parts.extend(params.opts.iter().cloned());

        Ok(parts.join(" "))
    }

    /// The DOS command line linking `objects` into [`EXE_OUTPUT`].
    ///
    /// DOS has no runtime library search path, so each library file is
    /// linked directly by its full short path.
    pub fn executable_command(
        &self,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
    ) -> BuildResult<String> {
        let mut parts = vec![
            self.wcl.clone(),
            "/l=dos".to_string(),
            format!("/fe={}", EXE_OUTPUT),
        ];

        if params.debug_symbols() {
            parts.push("/d2".to_string());
        }
        for obj in objects {
            parts.push(self.dos_path(obj)?);
        }
        for lib in link_libs {
            parts.push(self.dos_path(lib)?);
        }
        parts.extend(params.opts.iter().cloned());

        Ok(parts.join(" "))
    }

    /// Wrap a DOS command line into a DOSBox invocation.
    pub fn dosbox_command(&self, dos_command: &str) -> CommandSpec {
        let commands = [
            format!("mount {} \"{}\"", DRIVE, self.mount_dir.display()),
            format!("{}:", DRIVE),
            dos_command.to_string(),
            "exit".to_string(),
        ];

        let mut cmd = CommandSpec::new(&self.dosbox)
            .args(self.dosbox_args.iter().cloned())
            .cwd(&self.mount_dir);
        for c in commands {
            cmd = cmd.arg("-c").arg(c);
        }
        cmd
    }

    fn run_in_dosbox(
        &self,
        dos_command: &str,
        fixed_output: &str,
        output: &Path,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        tracing::debug!("{}", dos_command);
        let cmd = self.dosbox_command(dos_command);
        tracing::trace!("DOSBox command: {}", cmd.display());

        run_checked(exec, &cmd)?;
        exec.move_file(&self.mount_dir.join(fixed_output), output)
    }
}

impl Backend for WatcomBackend {
    fn name(&self) -> &str {
        "watcom"
    }

    fn language(&self) -> Language {
        Language::C
    }

    fn create_object(
        &self,
        output: &Path,
        source: &Path,
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        let dos_command = self.object_command(source, params)?;
        self.run_in_dosbox(&dos_command, OBJECT_OUTPUT, output, exec)
    }

    fn create_executable(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        let dos_command = self.executable_command(objects, link_libs, params)?;
        self.run_in_dosbox(&dos_command, EXE_OUTPUT, output, exec)
    }

    fn create_shared_library(
        &self,
        _output: &Path,
        _objects: &[PathBuf],
        _link_libs: &[PathBuf],
        _params: &CompileParams,
        _exec: &dyn Executor,
    ) -> BuildResult<()> {
        Err(BuildError::UnsupportedOperation {
            backend: self.name().to_string(),
            operation: "create shared libraries".to_string(),
        })
    }

    fn default_object_path(&self, source: &Path) -> PathBuf {
        source.with_extension("obj")
    }

    fn supports_parallel(&self) -> bool {
        // Every invocation writes the same fixed output file
        false
    }

    fn host_program(&self) -> &Path {
        &self.dosbox
    }
}
