//! Build description documents.
//!
//! The resolution engine never sees XML directly. Files are read with
//! `roxmltree` and converted into an owned tree of [`Node`]s, which only
//! exposes tags, attributes, element children and text. Because the tree
//! is owned, a node can never appear as its own child.

use std::path::Path;

use crate::core::errors::{BuildError, BuildResult};

/// Root tag every build description must use.
pub const ROOT_TAG: &str = "buildcc";

/// An element of a parsed build description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
    text: Option<String>,
}

impl Node {
    /// Create an empty element with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Node {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Add an attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Add a child element.
    pub fn child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Set the text content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Look up an attribute value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Look up an attribute that must be present.
    pub fn require(&self, name: &str) -> BuildResult<&str> {
        self.get(name).ok_or_else(|| {
            BuildError::parse(format!(
                "`<{}>` element is missing the `{}` attribute",
                self.tag, name
            ))
        })
    }

    /// All element children, in document order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Element children with the given tag, in document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Text content, if any.
    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Parse a document from source text. `path` is only used for messages.
pub fn parse_document(source: &str, path: &Path) -> BuildResult<Node> {
    let doc = roxmltree::Document::parse(source).map_err(|e| BuildError::Document {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(convert(doc.root_element()))
}

/// Read and parse a document from disk.
pub fn load_document(path: &Path) -> BuildResult<Node> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| BuildError::io(format!("failed to read `{}`", path.display()), e))?;
    parse_document(&source, path)
}

fn convert(node: roxmltree::Node<'_, '_>) -> Node {
    let attrs = node
        .attributes()
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect();

    let children = node
        .children()
        .filter(|c| c.is_element())
        .map(convert)
        .collect();

    let text = node
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Node {
        tag: node.tag_name().name().to_string(),
        attrs,
        children,
        text,
    }
}
