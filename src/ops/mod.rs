//! High-level operations.
//!
//! This module contains the implementation of buildcc commands.

pub mod build;
pub mod objtags;

pub use build::{build, config_files, list_targets, load_project, BuildOptions, BuildOutcome, TargetSummary};
pub use objtags::object_tags;
