//! A loaded build description.
//!
//! [`Project`] walks the node tree of a description file and everything it
//! imports. Within one file the sections are processed in a fixed order:
//! imports, properties, presets, filesets, targets. Properties and presets
//! keep their first declaration; filesets and targets are replaced by later
//! definitions of the same name.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::builder::executor::TargetExecutor;
use crate::builder::toolchain::BackendRegistry;
use crate::core::document::{self, Node, ROOT_TAG};
use crate::core::errors::{BuildError, BuildResult};
use crate::core::fileset::Fileset;
use crate::core::preset::{PresetDecl, PresetResolver};
use crate::core::property::PropertyStore;
use crate::core::task::{ParseScope, Target};
use crate::util::context::GlobalContext;
use crate::util::process::Executor;

const FILE_PROPS: [&str; 3] = ["_file.path", "_file.dir", "_file.name"];

/// Everything declared by a description and its imports.
#[derive(Debug)]
pub struct Project {
    name: Option<String>,
    default_target: Option<String>,
    props: PropertyStore,
    presets: PresetResolver,
    filesets: HashMap<String, Fileset>,
    targets: Vec<Target>,
    backends: BackendRegistry,
}

impl Project {
    /// An empty project.
    ///
    /// Command-line overrides are declared before the built-in properties so
    /// they shadow both those and anything a file declares. The legacy
    /// backend mounts `root_dir`.
    pub fn new(ctx: &GlobalContext, root_dir: &Path) -> Self {
        let mut props = PropertyStore::new();
        for (name, value) in ctx.overrides() {
            props.declare(name.as_str(), value.as_str());
        }
        for (name, value) in PropertyStore::with_builtins().iter() {
            props.declare(name, value);
        }

        Project {
            name: None,
            default_target: None,
            props,
            presets: PresetResolver::new(),
            filesets: HashMap::new(),
            targets: Vec::new(),
            backends: BackendRegistry::builtin(&ctx.config().toolchain, root_dir),
        }
    }

    /// Parse the main description. Its root supplies the project name and
    /// default target.
    pub fn parse_file(&mut self, path: &Path) -> BuildResult<()> {
        let root = self.import_file(path)?;
        self.name = root.get("name").map(str::to_string);
        self.default_target = root.get("default").map(str::to_string);
        Ok(())
    }

    /// Import a description file and return its root node.
    ///
    /// `_file.path`, `_file.dir` and `_file.name` describe `path` while it is
    /// being read and are restored afterwards.
    pub fn import_file(&mut self, path: &Path) -> BuildResult<Node> {
        let path = absolute(path)?;
        let root = document::load_document(&path)?;
        if root.tag() != ROOT_TAG {
            return Err(BuildError::NotABuildFile {
                path,
                tag: root.tag().to_string(),
            });
        }

        tracing::debug!("importing `{}`", path.display());

        let saved: Vec<Option<String>> = FILE_PROPS
            .iter()
            .map(|key| self.props.get(key).map(str::to_string))
            .collect();

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.props.set("_file.path", path.display().to_string());
        self.props.set("_file.dir", dir.display().to_string());
        self.props.set(
            "_file.name",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        let result = self.import_node(&root, &dir);

        for (key, value) in FILE_PROPS.iter().zip(saved) {
            match value {
                Some(value) => self.props.set(*key, value),
                None => {
                    self.props.remove(key);
                }
            }
        }

        result.map(|()| root)
    }

    /// Process the sections of an already loaded root node.
    ///
    /// Relative paths are resolved against `dir`.
    pub fn import_node(&mut self, root: &Node, dir: &Path) -> BuildResult<()> {
        for node in root.children_named("import") {
            let file = self.props.expand(node.require("file")?)?;
            self.import_file(&dir.join(file))?;
        }

        for node in root.children_named("property") {
            self.props.declare_node(node)?;
        }

        for node in root.children_named("preset") {
            let decl = PresetDecl::from_node(node, &self.props, dir)?;
            if !self.presets.declare(decl) {
                tracing::debug!(
                    "preset `{}` already declared, keeping the first",
                    node.get("name").unwrap_or_default()
                );
            }
        }

        for node in root.children_named("fileset") {
            let fileset = Fileset::from_node(node, &self.props, dir)?;
            self.filesets.insert(fileset.name.clone(), fileset);
        }

        for node in root.children_named("target") {
            let scope = ParseScope {
                props: &self.props,
                filesets: &self.filesets,
                backends: &self.backends,
                base_dir: dir,
            };
            let target = Target::from_node(node, &scope)?;
            self.add_target(target);
        }

        Ok(())
    }

    fn add_target(&mut self, target: Target) {
        match self.targets.iter_mut().find(|t| t.name == target.name) {
            Some(existing) => *existing = target,
            None => self.targets.push(target),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref()
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.props
    }

    pub fn presets(&self) -> &PresetResolver {
        &self.presets
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Targets in declaration order.
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn fileset(&self, name: &str) -> Option<&Fileset> {
        self.filesets.get(name)
    }

    /// Look up a target, or the default target when `name` is `None`.
    pub fn target(&self, name: Option<&str>) -> BuildResult<&Target> {
        let name = match name.or(self.default_target.as_deref()) {
            Some(name) => name,
            None => {
                return Err(BuildError::parse(
                    "no target given and the description has no `default` attribute",
                ))
            }
        };

        self.targets
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| BuildError::UnknownTarget {
                name: name.to_string(),
                available: self.targets.iter().map(|t| t.name.clone()).collect(),
            })
    }

    /// Run a target against an executor.
    pub fn run(&self, name: Option<&str>, exec: &dyn Executor, jobs: usize) -> BuildResult<()> {
        let target = self.target(name)?;
        TargetExecutor::new(&self.presets, exec)
            .jobs(jobs)
            .run_target(target)
    }
}

fn absolute(path: &Path) -> BuildResult<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| BuildError::io(format!("failed to resolve `{}`", path.display()), e))
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name:\t{}", self.name.as_deref().unwrap_or("(none)"))?;
        writeln!(
            f,
            "default:\t{}",
            self.default_target.as_deref().unwrap_or("(none)")
        )?;

        writeln!(f, "targets:")?;
        for target in &self.targets {
            writeln!(f, "\t{}", target.name)?;
            for task in &target.tasks {
                writeln!(f, "\t\t{}", task)?;
            }
        }

        writeln!(f, "presets:")?;
        for name in self.presets.names() {
            match self.presets.resolve(name) {
                Ok(params) => writeln!(f, "\t{}\t= {:?}", name, params)?,
                Err(e) => writeln!(f, "\t{}\t= <{}>", name, e)?,
            }
        }

        writeln!(f, "properties:")?;
        for (name, value) in self.props.iter() {
            writeln!(f, "\t{}\t= {}", name, value)?;
        }

        writeln!(f, "filesets:")?;
        let mut names: Vec<_> = self.filesets.keys().collect();
        names.sort();
        for name in names {
            writeln!(f, "\t{}\t= [", name)?;
            match self.filesets[name].files() {
                Ok(files) => {
                    for file in files {
                        writeln!(f, "\t\t{}", file.display())?;
                    }
                }
                Err(e) => writeln!(f, "\t\t<{}>", e)?,
            }
            writeln!(f, "\t]")?;
        }

        Ok(())
    }
}
