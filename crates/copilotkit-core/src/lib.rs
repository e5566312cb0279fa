//! # copilotkit-core
//!
//! Core types shared by the CopilotKit runtime crates.
//!
//! This crate provides:
//! - The message sum type and history helpers
//! - Tool definitions and availability mapping
//! - Layered configuration
//! - Common error types

pub mod config;
pub mod error;
pub mod message;
pub mod tool;

pub use config::{Config, LoggingConfig, RegistryReads, RunConfig, DEFAULT_MAX_FOLLOW_UPS};
pub use error::{format_error_with_suggestion, Error, Result};
pub use message::{Message, MessageBody, MessageKind, Role};
pub use tool::{empty_parameters, follows_up, Availability, ToolDefinition, WILDCARD_TOOL_NAME};
