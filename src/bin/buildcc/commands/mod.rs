//! Command implementations

pub mod build;
pub mod dump;
pub mod objtags;
pub mod targets;
