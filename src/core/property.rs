//! Properties and `${name}` templates.
//!
//! A [`PropertyStore`] is a flat mapping of dot-segmented keys to strings.
//! Declarations use "declare if absent" semantics: the first writer of a key
//! wins, which lets command-line overrides and outer config files shadow the
//! values declared by the build file itself.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::document::Node;
use crate::core::errors::{BuildError, BuildResult};

static TEMPLATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9._-]+)\}").expect("template pattern is valid"));

/// Flat, ordered key/value store of properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    values: BTreeMap<String, String>,
}

impl PropertyStore {
    pub fn new() -> Self {
        PropertyStore::default()
    }

    /// A store seeded with `user.home` and `user.name`.
    pub fn with_builtins() -> Self {
        let mut store = PropertyStore::new();

        if let Some(dirs) = directories::BaseDirs::new() {
            store.declare("user.home", dirs.home_dir().display().to_string());
        }

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_default();
        store.declare("user.name", user);

        store
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Declare a property unless it already exists.
    ///
    /// Returns `true` when the value was stored.
    pub fn declare(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.values.contains_key(&name) {
            tracing::trace!("property `{}` already declared, keeping first value", name);
            return false;
        }
        self.values.insert(name, value.into());
        true
    }

    /// Set a property unconditionally.
    ///
    /// Only used for the per-file `_file.*` properties, which track the file
    /// currently being imported.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Remove a property, returning its old value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute every `${name}` in `text` with its value.
    pub fn expand(&self, text: &str) -> BuildResult<String> {
        expand(text, self)
    }

    /// Declare the properties of a `<property>` node and its nested children.
    ///
    /// Nested nodes produce dotted keys (`outer.inner`). A node without a
    /// `value` attribute is a pure namespace. Nodes whose conditional does
    /// not hold are skipped together with their children.
    pub fn declare_node(&mut self, node: &Node) -> BuildResult<()> {
        self.declare_node_with_prefix(node, "")
    }

    fn declare_node_with_prefix(&mut self, node: &Node, prefix: &str) -> BuildResult<()> {
        if !condition_holds(node, self)? {
            return Ok(());
        }

        let name = format!("{}{}", prefix, node.require("name")?);

        if let Some(value) = node.get("value") {
            if !self.contains(&name) {
                let value = self.expand(value)?;
                self.declare(name.clone(), value);
            }
        }

        let nested_prefix = format!("{}.", name);
        for child in node.children_named("property") {
            self.declare_node_with_prefix(child, &nested_prefix)?;
        }

        Ok(())
    }
}

/// Substitute every `${name}` in `text` with the value from `properties`.
///
/// Names may contain letters, digits, `.`, `-` and `_`. A reference to an
/// undeclared property is an error. Text without references is returned
/// unchanged.
pub fn expand(text: &str, properties: &PropertyStore) -> BuildResult<String> {
    let mut missing = None;

    let expanded = TEMPLATE.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match properties.get(name) {
            Some(value) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(BuildError::UndefinedProperty { name }),
        None => Ok(expanded.into_owned()),
    }
}

/// Evaluate the `if` / `eq` / `neq` attributes of a node.
///
/// - `if="p"` holds when `p` is declared;
/// - `if="p" eq="v"` holds when `p` equals `v`;
/// - `if="p" neq="v"` holds when `p` differs from `v`.
///
/// Comparing against an undeclared property is an error.
pub fn condition_holds(node: &Node, properties: &PropertyStore) -> BuildResult<bool> {
    let Some(name) = node.get("if") else {
        return Ok(true);
    };

    let lookup = || {
        properties
            .get(name)
            .ok_or_else(|| BuildError::UndefinedProperty {
                name: name.to_string(),
            })
    };

    if let Some(expected) = node.get("eq") {
        Ok(lookup()? == expected)
    } else if let Some(unexpected) = node.get("neq") {
        Ok(lookup()? != unexpected)
    } else {
        Ok(properties.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str)]) -> PropertyStore {
        let mut props = PropertyStore::new();
        for (k, v) in pairs {
            props.declare(*k, *v);
        }
        props
    }

    #[test]
    fn test_expand_single_reference() {
        let props = store(&[("p", "value")]);
        assert_eq!(expand("${p}", &props).unwrap(), "value");
    }

    #[test]
    fn test_expand_is_identity_without_references() {
        let props = store(&[("p", "value")]);
        for text in ["", "plain", "$p", "{p}", "$ {p}", "cost: $5"] {
            assert_eq!(expand(text, &props).unwrap(), text);
        }
    }

    #[test]
    fn test_expand_multiple_and_dotted_names() {
        let props = store(&[("dir.out", "/tmp/out"), ("app-name_2", "demo")]);
        assert_eq!(
            expand("${dir.out}/${app-name_2}.exe", &props).unwrap(),
            "/tmp/out/demo.exe"
        );
    }

    #[test]
    fn test_expand_undefined_property_fails() {
        let props = store(&[("known", "x")]);
        let err = expand("${known} ${unknown}", &props).unwrap_err();
        match err {
            BuildError::UndefinedProperty { name } => assert_eq!(name, "unknown"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_declare_first_writer_wins() {
        let mut props = PropertyStore::new();
        assert!(props.declare("cc", "clang"));
        assert!(!props.declare("cc", "gcc"));
        assert_eq!(props.get("cc"), Some("clang"));
    }

    #[test]
    fn test_declare_nested_node() {
        let node = Node::new("property")
            .attr("name", "dirs")
            .child(Node::new("property").attr("name", "src").attr("value", "src"))
            .child(
                Node::new("property")
                    .attr("name", "out")
                    .attr("value", "${dirs.src}/../out")
                    .child(Node::new("property").attr("name", "obj").attr("value", "obj")),
            );

        let mut props = PropertyStore::new();
        props.declare_node(&node).unwrap();

        assert!(!props.contains("dirs"));
        assert_eq!(props.get("dirs.src"), Some("src"));
        assert_eq!(props.get("dirs.out"), Some("src/../out"));
        assert_eq!(props.get("dirs.out.obj"), Some("obj"));
    }

    #[test]
    fn test_declare_node_keeps_existing_value_without_expanding() {
        let mut props = store(&[("cc", "gcc")]);
        let node = Node::new("property")
            .attr("name", "cc")
            .attr("value", "${not.declared}");
        props.declare_node(&node).unwrap();
        assert_eq!(props.get("cc"), Some("gcc"));
    }

    #[test]
    fn test_conditionals() {
        let props = store(&[("os", "dos")]);

        let exists = Node::new("property").attr("if", "os");
        let missing = Node::new("property").attr("if", "arch");
        let eq = Node::new("property").attr("if", "os").attr("eq", "dos");
        let neq = Node::new("property").attr("if", "os").attr("neq", "dos");

        assert!(condition_holds(&exists, &props).unwrap());
        assert!(!condition_holds(&missing, &props).unwrap());
        assert!(condition_holds(&eq, &props).unwrap());
        assert!(!condition_holds(&neq, &props).unwrap());

        let eq_missing = Node::new("property").attr("if", "arch").attr("eq", "x86");
        assert!(condition_holds(&eq_missing, &props).is_err());
    }

    #[test]
    fn test_false_conditional_skips_children() {
        let node = Node::new("property")
            .attr("name", "dos")
            .attr("if", "target")
            .attr("eq", "dos")
            .child(Node::new("property").attr("name", "cc").attr("value", "watcom"));

        let mut props = store(&[("target", "linux")]);
        props.declare_node(&node).unwrap();
        assert!(!props.contains("dos.cc"));
    }
}
