//! Error types for description resolution and target execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Result alias used throughout the library.
pub type BuildResult<T> = Result<T, BuildError>;

/// Error raised while resolving a build description or running a target.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum BuildError {
    #[error("undefined property `{name}`")]
    #[diagnostic(
        code(buildcc::property::undefined),
        help("declare it with <property name=\"...\" value=\"...\"/> or pass `-p name=value`")
    )]
    UndefinedProperty { name: String },

    #[error("no preset named `{name}`")]
    #[diagnostic(code(buildcc::preset::unknown))]
    UnknownPreset { name: String },

    #[error("preset inheritance cycle: {}", chain.join(" -> "))]
    #[diagnostic(code(buildcc::preset::cycle))]
    PresetCycle { chain: Vec<String> },

    #[error("no compiler found for {query}")]
    #[diagnostic(code(buildcc::compiler::unknown))]
    UnknownCompiler { query: String },

    #[error("no target named `{name}`")]
    #[diagnostic(code(buildcc::target::unknown))]
    UnknownTarget { name: String, available: Vec<String> },

    #[error("no fileset named `{name}`")]
    #[diagnostic(code(buildcc::fileset::unknown))]
    UnknownFileset { name: String },

    #[error("{message}")]
    #[diagnostic(code(buildcc::parse))]
    Parse { message: String },

    #[error("file `{}` is not a buildcc file (root tag is `{tag}`)", path.display())]
    #[diagnostic(code(buildcc::parse::root))]
    NotABuildFile { path: PathBuf, tag: String },

    #[error("failed to parse `{}`: {message}", path.display())]
    #[diagnostic(code(buildcc::parse::xml))]
    Document { path: PathBuf, message: String },

    #[error("path `{path}` is incompatible with the legacy toolchain: {reason}")]
    #[diagnostic(
        code(buildcc::platform::path),
        help("DOS names allow one `.` per segment and must live under the mounted directory")
    )]
    IncompatiblePath { path: String, reason: String },

    #[error("the `{backend}` compiler cannot {operation}")]
    #[diagnostic(code(buildcc::platform::unsupported))]
    UnsupportedOperation { backend: String, operation: String },

    #[error("the following command exited with code {code}:\n\n{command}")]
    #[diagnostic(code(buildcc::exec::failed))]
    CommandFailed { command: String, code: i32 },

    #[error("expected output `{}` was not produced", path.display())]
    #[diagnostic(code(buildcc::exec::missing_output))]
    MissingOutput { path: PathBuf },

    #[error("failed to launch `{program}`")]
    #[diagnostic(code(buildcc::exec::spawn))]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("more than one object in this step writes to `{}`", path.display())]
    #[diagnostic(code(buildcc::task::collision))]
    OutputCollision { path: PathBuf },

    #[error("{context}")]
    #[diagnostic(code(buildcc::io))]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    /// Shorthand for a description error.
    pub fn parse(message: impl Into<String>) -> Self {
        BuildError::Parse {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with a short description of what was attempted.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether this error came from an external process rather than the description.
    pub fn is_process_failure(&self) -> bool {
        matches!(
            self,
            BuildError::CommandFailed { .. }
                | BuildError::MissingOutput { .. }
                | BuildError::Spawn { .. }
        )
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());

        match self {
            BuildError::UnknownTarget { available, .. } => {
                let listed = if available.is_empty() {
                    "(none)".to_string()
                } else {
                    available.join(", ")
                };
                diag.with_context(format!("available targets: {}", listed))
                    .with_suggestion(suggestions::TARGET_NOT_FOUND)
            }
            BuildError::UnknownPreset { .. } | BuildError::PresetCycle { .. } => {
                diag.with_suggestion(suggestions::CHECK_PRESETS)
            }
            BuildError::UnknownCompiler { .. } => diag.with_suggestion(suggestions::COMPILERS),
            BuildError::UndefinedProperty { name } => diag.with_suggestion(format!(
                "Declare `{}` in the description or pass `-p {}=<value>`",
                name, name
            )),
            BuildError::CommandFailed { .. } | BuildError::MissingOutput { .. } => {
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }
            BuildError::Spawn { source, .. } | BuildError::Io { source, .. } => {
                diag.with_context(source.to_string())
            }
            _ => diag,
        }
    }
}
