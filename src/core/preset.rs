//! Presets: named, inheritable bundles of compile/link parameters.
//!
//! Merging always builds a new [`CompileParams`]. Resolved presets are
//! cached behind `Arc`s and are only ever merge *sources*, so a task that
//! extends a shared preset never changes what other tasks see.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::core::document::Node;
use crate::core::errors::{BuildError, BuildResult};
use crate::core::property::PropertyStore;

/// Merged compile/link parameters for one step.
///
/// Scalars are `None` until explicitly set, so that an unset value in a
/// child keeps the parent's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileParams {
    pub debug_symbols: Option<bool>,
    pub for_shlib: Option<bool>,
    pub includes: Vec<String>,
    pub defines: Vec<String>,
    pub opts: Vec<String>,
}

impl CompileParams {
    /// Whether debug information is requested.
    pub fn debug_symbols(&self) -> bool {
        self.debug_symbols.unwrap_or(false)
    }

    /// Whether objects are built for a shared library.
    pub fn for_shlib(&self) -> bool {
        self.for_shlib.unwrap_or(false)
    }

    /// Merge `child` on top of `self`.
    ///
    /// Scalars set in the child overwrite; lists concatenate parent first.
    pub fn merged_with(&self, child: &CompileParams) -> CompileParams {
        merge(self, child)
    }

    /// A copy with `for-shlib` forced on.
    pub fn forced_for_shlib(&self) -> CompileParams {
        CompileParams {
            for_shlib: Some(true),
            ..self.clone()
        }
    }

    /// Read the inline parameters declared on a node.
    ///
    /// Recognizes the `debug-symbols` and `for-shlib` attributes and the
    /// `include(dir)`, `define(key)` and `opt(value)` children. Text is
    /// template-expanded against `props`; relative include directories are
    /// anchored at `base_dir`, the directory of the declaring file.
    pub fn from_node(
        node: &Node,
        props: &PropertyStore,
        base_dir: &Path,
    ) -> BuildResult<CompileParams> {
        let mut params = CompileParams {
            debug_symbols: parse_flag(node, "debug-symbols")?,
            for_shlib: parse_flag(node, "for-shlib")?,
            ..Default::default()
        };

        for include in node.children_named("include") {
            let dir = base_dir.join(props.expand(include.require("dir")?)?);
            params.includes.push(dir.to_string_lossy().into_owned());
        }
        for define in node.children_named("define") {
            params.defines.push(props.expand(define.require("key")?)?);
        }
        for opt in node.children_named("opt") {
            params.opts.push(props.expand(opt.require("value")?)?);
        }

        Ok(params)
    }
}

fn parse_flag(node: &Node, name: &str) -> BuildResult<Option<bool>> {
    match node.get(name) {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => Err(BuildError::parse(format!(
            "`{}` on `<{}>` must be `true` or `false`, found `{}`",
            name,
            node.tag(),
            other
        ))),
    }
}

/// Merge `child` on top of `parent` into a new value.
pub fn merge(parent: &CompileParams, child: &CompileParams) -> CompileParams {
    let concat = |a: &[String], b: &[String]| a.iter().chain(b).cloned().collect::<Vec<_>>();

    CompileParams {
        debug_symbols: child.debug_symbols.or(parent.debug_symbols),
        for_shlib: child.for_shlib.or(parent.for_shlib),
        includes: concat(&parent.includes, &child.includes),
        defines: concat(&parent.defines, &child.defines),
        opts: concat(&parent.opts, &child.opts),
    }
}

/// A preset as declared, before inheritance is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetDecl {
    pub name: String,
    pub parent: Option<String>,
    pub params: CompileParams,
}

impl PresetDecl {
    pub fn from_node(node: &Node, props: &PropertyStore, base_dir: &Path) -> BuildResult<PresetDecl> {
        Ok(PresetDecl {
            name: node.require("name")?.to_string(),
            parent: node.get("parent").map(str::to_string),
            params: CompileParams::from_node(node, props, base_dir)?,
        })
    }
}

/// Resolves preset names into merged parameters, memoizing the results.
#[derive(Debug, Default)]
pub struct PresetResolver {
    decls: HashMap<String, PresetDecl>,
    order: Vec<String>,
    cache: RefCell<HashMap<String, Arc<CompileParams>>>,
}

impl PresetResolver {
    pub fn new() -> Self {
        PresetResolver::default()
    }

    /// Register a declaration. The first declaration of a name wins.
    pub fn declare(&mut self, decl: PresetDecl) -> bool {
        if self.decls.contains_key(&decl.name) {
            tracing::debug!("preset `{}` already declared, ignoring redefinition", decl.name);
            return false;
        }
        self.order.push(decl.name.clone());
        self.decls.insert(decl.name.clone(), decl);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    /// Declaration names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn declaration(&self, name: &str) -> Option<&PresetDecl> {
        self.decls.get(name)
    }

    /// Resolve a preset, applying its parent chain.
    pub fn resolve(&self, name: &str) -> BuildResult<Arc<CompileParams>> {
        let mut chain = Vec::new();
        self.resolve_inner(name, &mut chain)
    }

    fn resolve_inner(&self, name: &str, chain: &mut Vec<String>) -> BuildResult<Arc<CompileParams>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Ok(Arc::clone(cached));
        }

        if chain.iter().any(|n| n == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(BuildError::PresetCycle { chain: cycle });
        }

        let decl = self
            .decls
            .get(name)
            .ok_or_else(|| BuildError::UnknownPreset {
                name: name.to_string(),
            })?;

        chain.push(name.to_string());
        let resolved = match &decl.parent {
            Some(parent) => {
                let base = self.resolve_inner(parent, chain)?;
                merge(&base, &decl.params)
            }
            None => merge(&CompileParams::default(), &decl.params),
        };
        chain.pop();

        let resolved = Arc::new(resolved);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Combine an optional task-level preset with the task's inline params.
    ///
    /// The preset acts as parent, the inline params as child.
    pub fn apply(&self, preset: Option<&str>, inline: &CompileParams) -> BuildResult<CompileParams> {
        match preset {
            Some(name) => {
                let base = self.resolve(name)?;
                Ok(merge(&base, inline))
            }
            None => Ok(inline.clone()),
        }
    }
}
