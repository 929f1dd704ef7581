//! Tasks and targets.
//!
//! Task nodes are turned into a closed [`Task`] enum through a table that
//! maps each tag to its factory. Everything a task needs is resolved here,
//! at parse time, except preset lookups, which happen when the task runs.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::toolchain::{Backend, BackendKind, BackendRegistry, LinkMode};
use crate::core::document::Node;
use crate::core::errors::{BuildError, BuildResult};
use crate::core::fileset::Fileset;
use crate::core::preset::CompileParams;
use crate::core::property::PropertyStore;

/// What task factories can see while a description is being read.
pub struct ParseScope<'a> {
    pub props: &'a PropertyStore,
    pub filesets: &'a HashMap<String, Fileset>,
    pub backends: &'a BackendRegistry,
    /// Directory relative paths are resolved against.
    pub base_dir: &'a Path,
}

impl ParseScope<'_> {
    fn path(&self, text: &str) -> BuildResult<PathBuf> {
        Ok(self.base_dir.join(self.props.expand(text)?))
    }

    fn backend(&self, node: &Node, inherited: Option<&BackendKind>) -> BuildResult<BackendKind> {
        let name = node.get("compiler");
        let lang = node.get("lang");

        match (name, lang, inherited) {
            (None, None, Some(backend)) => Ok(backend.clone()),
            _ => self.backends.find(name, lang).cloned(),
        }
    }
}

/// A single build step.
#[derive(Debug, Clone)]
pub enum Task {
    Echo(EchoTask),
    Exec(ExecTask),
    Object(ObjectTask),
    Executable(BinaryTask),
    SharedLibrary(BinaryTask),
}

/// Prints a line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoTask {
    pub text: String,
}

/// Runs a shell command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTask {
    pub command: String,
    /// Directory of the declaring file; the command runs there.
    pub cwd: PathBuf,
}

/// Compiles sources into objects, one object per source.
#[derive(Debug, Clone)]
pub struct ObjectTask {
    /// Absolute source paths, in declaration order.
    pub sources: Vec<PathBuf>,
    /// A prebuilt object; when set nothing is compiled.
    pub file: Option<PathBuf>,
    /// Object paths, one per source (or just `file`).
    pub outputs: Vec<PathBuf>,
    pub backend: BackendKind,
    pub preset: Option<String>,
    pub params: CompileParams,
    /// Forced on for objects owned by a shared library.
    pub for_shlib: bool,
}

impl ObjectTask {
    /// Read an `<object>` node.
    ///
    /// `inherited` is the owning binary's backend, used when the node names
    /// neither a compiler nor a language.
    pub fn from_node(
        node: &Node,
        scope: &ParseScope<'_>,
        inherited: Option<&BackendKind>,
    ) -> BuildResult<ObjectTask> {
        if node.has("source") {
            return Err(BuildError::parse(
                "`source` attribute is deprecated. Switch to `src`.",
            ));
        }
        if node.has("source-set") {
            return Err(BuildError::parse(
                "`source-set` attribute is deprecated. Switch to `src-set`.",
            ));
        }

        let sources = if let Some(src) = node.get("src") {
            vec![scope.path(src)?]
        } else if let Some(set) = node.get("src-set") {
            scope
                .filesets
                .get(set)
                .ok_or_else(|| BuildError::UnknownFileset {
                    name: set.to_string(),
                })?
                .files()?
        } else {
            Vec::new()
        };

        let file = node.get("file").map(|f| scope.path(f)).transpose()?;
        let backend = scope.backend(node, inherited)?;

        let outputs = if let Some(file) = &file {
            vec![file.clone()]
        } else if let Some(output) = node.get("output") {
            if sources.len() != 1 {
                return Err(BuildError::parse(format!(
                    "`output` on `<object>` needs exactly one source, found {}",
                    sources.len()
                )));
            }
            vec![scope.path(output)?]
        } else if sources.is_empty() && !node.has("src-set") {
            return Err(BuildError::parse(
                "`<object>` needs a `src`, `src-set` or `file` attribute",
            ));
        } else {
            sources
                .iter()
                .map(|s| backend.default_object_path(s))
                .collect()
        };

        Ok(ObjectTask {
            sources,
            file,
            outputs,
            backend,
            preset: node.get("preset").map(str::to_string),
            params: CompileParams::from_node(node, scope.props, scope.base_dir)?,
            for_shlib: false,
        })
    }

    /// Object files this task provides to a link step.
    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    /// `(source, output)` pairs to compile, in declaration order.
    pub fn compile_units(&self) -> Vec<(&Path, &Path)> {
        if self.file.is_some() {
            return Vec::new();
        }
        self.sources
            .iter()
            .zip(&self.outputs)
            .map(|(s, o)| (s.as_path(), o.as_path()))
            .collect()
    }
}

/// Compiles its objects, then links them into an executable or shared library.
#[derive(Debug, Clone)]
pub struct BinaryTask {
    pub mode: LinkMode,
    pub output: PathBuf,
    pub objects: Vec<ObjectTask>,
    /// Library files to link, in declaration order.
    pub link_libs: Vec<PathBuf>,
    pub backend: BackendKind,
    pub preset: Option<String>,
    pub params: CompileParams,
}

impl BinaryTask {
    pub fn from_node(node: &Node, scope: &ParseScope<'_>, mode: LinkMode) -> BuildResult<BinaryTask> {
        let output = scope.path(node.require("output")?)?;
        let backend = scope.backend(node, None)?;

        let mut objects = Vec::new();
        for child in node.children_named("object") {
            let mut obj = ObjectTask::from_node(child, scope, Some(&backend))?;
            if mode == LinkMode::SharedLib {
                obj.for_shlib = true;
            }
            objects.push(obj);
        }

        let link_libs = node
            .children_named("link")
            .map(|l| scope.path(l.require("libpath")?))
            .collect::<BuildResult<Vec<_>>>()?;

        Ok(BinaryTask {
            mode,
            output,
            objects,
            link_libs,
            backend,
            preset: node.get("preset").map(str::to_string),
            params: CompileParams::from_node(node, scope.props, scope.base_dir)?,
        })
    }

    /// All object files fed to the link step, in declaration order.
    pub fn object_files(&self) -> Vec<PathBuf> {
        self.objects
            .iter()
            .flat_map(|o| o.outputs().iter().cloned())
            .collect()
    }
}

type TaskFactory = fn(&Node, &ParseScope<'_>) -> BuildResult<Task>;

/// Tag to factory table for task nodes.
const TASK_FACTORIES: &[(&str, TaskFactory)] = &[
    ("echo", parse_echo),
    ("exec", parse_exec),
    ("object", parse_object),
    ("executable", parse_executable),
    ("shared-library", parse_shared_library),
];

fn parse_echo(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Task> {
    let text = scope.props.expand(node.text_content().unwrap_or_default())?;
    Ok(Task::Echo(EchoTask { text }))
}

fn parse_exec(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Task> {
    let command = scope.props.expand(node.text_content().unwrap_or_default())?;
    Ok(Task::Exec(ExecTask {
        command,
        cwd: scope.base_dir.to_path_buf(),
    }))
}

fn parse_object(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Task> {
    Ok(Task::Object(ObjectTask::from_node(node, scope, None)?))
}

fn parse_executable(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Task> {
    Ok(Task::Executable(BinaryTask::from_node(
        node,
        scope,
        LinkMode::Executable,
    )?))
}

fn parse_shared_library(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Task> {
    Ok(Task::SharedLibrary(BinaryTask::from_node(
        node,
        scope,
        LinkMode::SharedLib,
    )?))
}

/// Build a task from its node.
pub fn parse_task(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Task> {
    let factory = TASK_FACTORIES
        .iter()
        .find(|(tag, _)| *tag == node.tag())
        .map(|(_, factory)| factory)
        .ok_or_else(|| BuildError::parse(format!("unknown task `<{}>`", node.tag())))?;
    factory(node, scope)
}

/// Tags accepted inside `<target>`.
pub fn task_tags() -> impl Iterator<Item = &'static str> {
    TASK_FACTORIES.iter().map(|(tag, _)| *tag)
}

/// A named, ordered list of tasks.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    pub tasks: Vec<Task>,
}

impl Target {
    pub fn from_node(node: &Node, scope: &ParseScope<'_>) -> BuildResult<Target> {
        let name = node.require("name")?.to_string();
        let tasks = node
            .children()
            .iter()
            .map(|child| parse_task(child, scope))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(Target { name, tasks })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Echo(t) => write!(f, "echo(\"{}\")", t.text),
            Task::Exec(t) => write!(f, "exec(\"{}\")", t.command),
            Task::Object(o) => write!(f, "{}", ObjectDisplay(o)),
            Task::Executable(b) | Task::SharedLibrary(b) => {
                let objects: Vec<_> = b.object_files().iter().map(|p| p.display().to_string()).collect();
                write!(
                    f,
                    "{}([{}] -> {})",
                    b.mode.as_str(),
                    objects.join(", "),
                    b.output.display()
                )
            }
        }
    }
}

struct ObjectDisplay<'a>(&'a ObjectTask);

impl fmt::Display for ObjectDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.0.file {
            return write!(f, "{}", file.display());
        }
        let units: Vec<_> = self
            .0
            .compile_units()
            .iter()
            .map(|(s, o)| format!("{} -> {}", s.display(), o.display()))
            .collect();
        write!(f, "compile({})", units.join(", "))
    }
}
