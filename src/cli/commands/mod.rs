//! Command implementations.

pub mod completions;
pub mod config;
pub mod issue;
pub mod version;
pub mod workflow;
