//! Test utilities and mocks for buildcc unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use buildcc::test_support::MockExecutor;
//!
//! let exec = MockExecutor::new().fail_when("broken.c", 1);
//! // run a target against `exec`, then inspect `exec.recorded()`
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::builder::toolchain::CommandSpec;
use crate::core::errors::BuildResult;
use crate::util::process::Executor;

pub use fixtures::*;

/// Something the mock executor was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Run(CommandSpec),
    Move { from: PathBuf, to: PathBuf },
}

impl Recorded {
    /// The command, if this was a run.
    pub fn command(&self) -> Option<&CommandSpec> {
        match self {
            Recorded::Run(cmd) => Some(cmd),
            Recorded::Move { .. } => None,
        }
    }
}

/// Executor that records every call and fails on demand.
///
/// Commands succeed unless their rendered command line contains one of the
/// registered failure patterns.
#[derive(Debug, Default)]
pub struct MockExecutor {
    failures: Vec<(String, i32)>,
    recorded: Mutex<Vec<Recorded>>,
}

impl MockExecutor {
    /// Create a mock where every command succeeds.
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Exit with `code` for any command whose line contains `pattern`.
    pub fn fail_when(mut self, pattern: impl Into<String>, code: i32) -> Self {
        self.failures.push((pattern.into(), code));
        self
    }

    /// Everything recorded so far.
    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    /// Only the commands that were run.
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.recorded()
            .iter()
            .filter_map(|r| r.command().cloned())
            .collect()
    }

    /// Rendered command lines of everything that was run.
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(CommandSpec::display).collect()
    }
}

impl Executor for MockExecutor {
    fn execute(&self, command: &CommandSpec) -> BuildResult<i32> {
        self.recorded
            .lock()
            .unwrap()
            .push(Recorded::Run(command.clone()));

        let line = command.display();
        let code = self
            .failures
            .iter()
            .find(|(pattern, _)| line.contains(pattern.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(code)
    }

    fn move_file(&self, from: &Path, to: &Path) -> BuildResult<()> {
        self.recorded.lock().unwrap().push(Recorded::Move {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_records_and_fails() {
        let exec = MockExecutor::new().fail_when("bad.c", 2);

        assert_eq!(exec.execute(&CommandSpec::new("cc").arg("good.c")).unwrap(), 0);
        assert_eq!(exec.execute(&CommandSpec::new("cc").arg("bad.c")).unwrap(), 2);
        exec.move_file(Path::new("a"), Path::new("b")).unwrap();

        assert_eq!(exec.recorded().len(), 3);
        assert_eq!(exec.command_lines(), vec!["cc good.c", "cc bad.c"]);
    }
}
