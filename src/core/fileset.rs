//! Named sets of source files.

use std::path::{Path, PathBuf};

use crate::core::document::Node;
use crate::core::errors::{BuildError, BuildResult};
use crate::core::property::PropertyStore;

/// One entry of a fileset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A single file, already absolute.
    File(PathBuf),
    /// An absolute glob pattern.
    Wildcard(String),
}

/// A named, ordered list of file sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fileset {
    pub name: String,
    pub sources: Vec<FileSource>,
}

impl Fileset {
    /// Read a `<fileset>` node. Relative paths are resolved against `base_dir`.
    pub fn from_node(node: &Node, props: &PropertyStore, base_dir: &Path) -> BuildResult<Fileset> {
        let mut sources = Vec::new();

        for child in node.children() {
            match child.tag() {
                "file" => {
                    let path = props.expand(child.require("path")?)?;
                    sources.push(FileSource::File(base_dir.join(path)));
                }
                "wildcard" => {
                    let pattern = props.expand(child.require("pattern")?)?;
                    let pattern = base_dir.join(pattern).to_string_lossy().into_owned();
                    sources.push(FileSource::Wildcard(pattern));
                }
                other => {
                    return Err(BuildError::parse(format!(
                        "unexpected `<{}>` inside `<fileset>`",
                        other
                    )))
                }
            }
        }

        Ok(Fileset {
            name: node.require("name")?.to_string(),
            sources,
        })
    }

    /// Expand the fileset into absolute paths, in declaration order.
    ///
    /// Matches of one wildcard come back sorted by path.
    pub fn files(&self) -> BuildResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for source in &self.sources {
            match source {
                FileSource::File(path) => files.push(path.clone()),
                FileSource::Wildcard(pattern) => {
                    let entries = glob::glob(pattern).map_err(|e| {
                        BuildError::parse(format!("invalid wildcard `{}`: {}", pattern, e))
                    })?;
                    for entry in entries {
                        let path = entry.map_err(|e| {
                            let context = format!(
                                "failed to expand wildcard `{}` at `{}`",
                                pattern,
                                e.path().display()
                            );
                            BuildError::io(context, e.into_error())
                        })?;
                        files.push(path);
                    }
                }
            }
        }

        Ok(files)
    }
}
