//! CLI command implementations.

pub mod config;
pub mod merge;
pub mod replay;
