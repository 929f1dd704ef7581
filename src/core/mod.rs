//! Core data structures for buildcc.
//!
//! - The document tree and its loader
//! - Properties, presets and filesets
//! - Tasks, targets and the project that owns them

pub mod document;
pub mod errors;
pub mod fileset;
pub mod language;
pub mod preset;
pub mod project;
pub mod property;
pub mod task;

pub use document::Node;
pub use errors::{BuildError, BuildResult};
pub use fileset::Fileset;
pub use language::Language;
pub use preset::{CompileParams, PresetResolver};
pub use project::Project;
pub use property::PropertyStore;
pub use task::{Target, Task};
