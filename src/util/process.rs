//! Subprocess execution.
//!
//! Backends never launch processes themselves. They hand a [`CommandSpec`]
//! to an [`Executor`], which reports the exit code. [`SystemExecutor`] runs
//! commands for real, [`DryRunExecutor`] only records them.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::Mutex;

use serde::Serialize;

use crate::builder::toolchain::CommandSpec;
use crate::core::errors::{BuildError, BuildResult};

/// The external capability used to run toolchain commands.
pub trait Executor: Sync {
    /// Run a command to completion and return its exit code.
    ///
    /// A process killed by a signal reports `-1`.
    fn execute(&self, command: &CommandSpec) -> BuildResult<i32>;

    /// Move a file produced by a command to its final location.
    fn move_file(&self, from: &Path, to: &Path) -> BuildResult<()> {
        if !from.exists() {
            return Err(BuildError::MissingOutput {
                path: from.to_path_buf(),
            });
        }
        std::fs::rename(from, to).map_err(|e| {
            BuildError::io(
                format!("failed to move `{}` to `{}`", from.display(), to.display()),
                e,
            )
        })
    }
}

/// Run a command and turn a non-zero exit code into an error.
pub fn run_checked(exec: &dyn Executor, command: &CommandSpec) -> BuildResult<()> {
    tracing::debug!("{}", command.display());

    let code = exec.execute(command)?;
    if code != 0 {
        return Err(BuildError::CommandFailed {
            command: command.display(),
            code,
        });
    }
    Ok(())
}

/// Executor that launches real processes, inheriting stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, command: &CommandSpec) -> BuildResult<i32> {
        let status = ProcessBuilder::from_spec(command).status()?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// One entry of a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlannedStep {
    Run(CommandSpec),
    Move { from: PathBuf, to: PathBuf },
}

/// Executor that records commands instead of running them.
#[derive(Debug, Default)]
pub struct DryRunExecutor {
    steps: Mutex<Vec<PlannedStep>>,
}

impl DryRunExecutor {
    pub fn new() -> Self {
        DryRunExecutor::default()
    }

    /// Every step recorded so far, in order.
    pub fn steps(&self) -> Vec<PlannedStep> {
        self.steps
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, step: PlannedStep) {
        match self.steps.lock() {
            Ok(mut steps) => steps.push(step),
            Err(poisoned) => poisoned.into_inner().push(step),
        }
    }
}

impl Executor for DryRunExecutor {
    fn execute(&self, command: &CommandSpec) -> BuildResult<i32> {
        self.record(PlannedStep::Run(command.clone()));
        Ok(0)
    }

    fn move_file(&self, from: &Path, to: &Path) -> BuildResult<()> {
        self.record(PlannedStep::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Create a process builder from a backend command.
    pub fn from_spec(spec: &CommandSpec) -> Self {
        let mut pb = ProcessBuilder::new(&spec.program).args(&spec.args);
        for (key, value) in &spec.env {
            pb = pb.env(key, value);
        }
        if let Some(cwd) = &spec.cwd {
            pb = pb.cwd(cwd);
        }
        pb
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute and wait for the exit status.
    pub fn status(&self) -> BuildResult<ExitStatus> {
        self.build_command()
            .status()
            .map_err(|source| BuildError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("clang").args(["-o", "out.o", "-c", "in.c"]);
        assert_eq!(pb.display_command(), "clang -o out.o -c in.c");
    }

    #[test]
    fn test_from_spec_copies_everything() {
        let spec = CommandSpec::new("dosbox")
            .args(["-c", "exit"])
            .env("SDL_VIDEODRIVER", "dummy")
            .cwd("/work");
        let pb = ProcessBuilder::from_spec(&spec);
        assert_eq!(pb.get_program(), Path::new("dosbox"));
        assert_eq!(pb.get_args(), ["-c", "exit"]);
        assert_eq!(pb.cwd.as_deref(), Some(Path::new("/work")));
        assert_eq!(pb.env.get("SDL_VIDEODRIVER").map(String::as_str), Some("dummy"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_executor_reports_exit_code() {
        let exec = SystemExecutor;
        assert_eq!(exec.execute(&CommandSpec::shell("exit 0")).unwrap(), 0);
        assert_eq!(exec.execute(&CommandSpec::shell("exit 3")).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_checked_surfaces_command_and_code() {
        let err = run_checked(&SystemExecutor, &CommandSpec::shell("exit 7")).unwrap_err();
        match err {
            BuildError::CommandFailed { command, code } => {
                assert_eq!(code, 7);
                assert_eq!(command, "sh -c \"exit 7\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_spawn_failure() {
        let err = SystemExecutor
            .execute(&CommandSpec::new("/definitely/not/a/compiler"))
            .unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    #[test]
    fn test_default_move_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let from = tmp.path().join("OUT.OBJ");
        let to = tmp.path().join("main.obj");

        let err = SystemExecutor.move_file(&from, &to).unwrap_err();
        assert!(matches!(err, BuildError::MissingOutput { .. }));

        std::fs::write(&from, b"obj").unwrap();
        SystemExecutor.move_file(&from, &to).unwrap();
        assert!(to.exists());
        assert!(!from.exists());
    }

    #[test]
    fn test_dry_run_records_in_order() {
        let exec = DryRunExecutor::new();
        run_checked(&exec, &CommandSpec::new("clang").arg("-c")).unwrap();
        exec.move_file(Path::new("OUT.EXE"), Path::new("app.exe")).unwrap();

        let steps = exec.steps();
        assert_eq!(steps.len(), 2);
        assert!(matches!(&steps[0], PlannedStep::Run(c) if c.args == ["-c"]));
        assert!(matches!(&steps[1], PlannedStep::Move { .. }));
    }
}
