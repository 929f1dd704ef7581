//! buildcc - declarative builds for C and C++
//!
//! This crate reads XML build descriptions (properties, presets with
//! inheritance, filesets and targets) and drives host compilers or the
//! Open Watcom toolchain running inside DOSBox.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and mocks for buildcc unit tests.
///
/// Only available when compiling tests. Provides a recording executor and
/// on-disk project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::errors::{BuildError, BuildResult};
pub use core::project::Project;
pub use util::context::GlobalContext;
