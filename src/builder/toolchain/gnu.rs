//! GCC/Clang backend.

use std::path::{Path, PathBuf};

use crate::core::errors::BuildResult;
use crate::core::language::Language;
use crate::core::preset::CompileParams;
use crate::util::process::{run_checked, Executor};

use super::{split_library, Backend, CommandSpec, LinkMode};

/// Compiler family of a GNU-style driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GnuFamily {
    Gcc,
    Clang,
}

/// A GNU-style compiler driver on the host (`clang`, `clang++`, `gcc`, `g++`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnuBackend {
    name: String,
    lang: Language,
    family: GnuFamily,
    /// Path to the compiler driver
    program: PathBuf,
}

impl GnuBackend {
    pub fn new(
        name: impl Into<String>,
        lang: Language,
        family: GnuFamily,
        program: impl Into<PathBuf>,
    ) -> Self {
        GnuBackend {
            name: name.into(),
            lang,
            family,
            program: program.into(),
        }
    }

    pub fn family(&self) -> GnuFamily {
        self.family
    }

    /// Generate an object compile command.
    pub fn object_command(&self, output: &Path, source: &Path, params: &CompileParams) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program)
            .arg("-o")
            .arg(output.display().to_string())
            .arg("-c");

        if params.debug_symbols() {
            cmd = cmd.arg("-g");
        }

        // Position independent code only matters for objects
        if params.for_shlib() {
            cmd = cmd.arg("-fPIC");
        }

        cmd = cmd.arg(source.display().to_string());
        cmd = self.preprocessor_args(cmd, params);

        cmd.args(params.opts.iter().cloned())
    }

    /// Generate a link command for an executable or shared library.
    pub fn link_command(
        &self,
        mode: LinkMode,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.program);

        if mode == LinkMode::SharedLib {
            cmd = cmd.arg("-shared");
        }

        if params.debug_symbols() {
            cmd = cmd.arg("-g");
        }

        cmd = cmd.arg("-o").arg(output.display().to_string());

        for obj in objects {
            cmd = cmd.arg(obj.display().to_string());
        }

        cmd = self.preprocessor_args(cmd, params);

        for lib in link_libs {
            let (dir, file) = split_library(lib);
            // Runtime search path so the artifact finds the library uninstalled
            cmd = cmd.arg(format!("-Wl,-rpath,{}", dir));
            cmd = cmd.arg("-L").arg(dir);
            // `-l:` links the exact file name, no lib prefix or suffix guessing
            cmd = cmd.arg(format!("-l:{}", file));
        }

        cmd.args(params.opts.iter().cloned())
    }

    fn preprocessor_args(&self, mut cmd: CommandSpec, params: &CompileParams) -> CommandSpec {
        for dir in &params.includes {
            cmd = cmd.arg("-I").arg(dir.as_str());
        }
        for define in &params.defines {
            cmd = cmd.arg("-D").arg(define.as_str());
        }
        cmd
    }
}

impl Backend for GnuBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn language(&self) -> Language {
        self.lang
    }

    fn create_object(
        &self,
        output: &Path,
        source: &Path,
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        run_checked(exec, &self.object_command(output, source, params))
    }

    fn create_executable(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        let cmd = self.link_command(LinkMode::Executable, output, objects, link_libs, params);
        run_checked(exec, &cmd)
    }

    fn create_shared_library(
        &self,
        output: &Path,
        objects: &[PathBuf],
        link_libs: &[PathBuf],
        params: &CompileParams,
        exec: &dyn Executor,
    ) -> BuildResult<()> {
        let cmd = self.link_command(LinkMode::SharedLib, output, objects, link_libs, params);
        run_checked(exec, &cmd)
    }

    fn default_object_path(&self, source: &Path) -> PathBuf {
        let mut path = source.as_os_str().to_owned();
        path.push(".o");
        PathBuf::from(path)
    }

    fn host_program(&self) -> &Path {
        &self.program
    }
}
