//! C/C++ build execution.
//!
//! Compiler backends and the executor that runs targets against them.

pub mod executor;
pub mod toolchain;

pub use executor::TargetExecutor;
pub use toolchain::{Backend, BackendKind, BackendRegistry, CommandSpec, LinkMode};
