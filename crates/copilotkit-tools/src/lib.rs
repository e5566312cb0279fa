//! # copilotkit-tools
//!
//! Frontend tools, the registry they live in, and the helpers that decide
//! which tool definitions an agent gets to see.
//!
//! ## Architecture
//!
//! Tools are [`FrontendTool`] records keyed by `(name, agent_id)`. Reads go
//! through [`ToolLookup`], writes through [`ToolRegistry`]. A run either reads
//! the shared [`InMemoryToolRegistry`] live or works from a [`ToolSnapshot`]
//! taken when it starts.
//!
//! ## Example
//!
//! ```ignore
//! use copilotkit_tools::{handler_fn, FrontendTool, InMemoryToolRegistry, ToolRegistry};
//! use futures::FutureExt;
//!
//! let registry = InMemoryToolRegistry::new();
//! registry.upsert(
//!     FrontendTool::new("greet", "Say hello")
//!         .with_handler(handler_fn(|args| async move { Ok(args) }.boxed()))
//!         .with_follow_up(false),
//! );
//! let tools = registry.definitions_for(None);
//! ```

use thiserror::Error;

pub mod legacy;
pub mod merge;
pub mod registry;

pub use legacy::{process_actions_for_runtime_request, ActionInput, LegacyAction};
pub use merge::{flatten_tools_no_duplicates, merge_server_side_tools};
pub use registry::{
    handler_fn, FrontendTool, InMemoryToolRegistry, ToolCallRef, ToolHandler, ToolLookup,
    ToolRegistry, ToolSnapshot,
};

/// Errors that can occur while resolving or executing a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool-call arguments could not be parsed.
    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The handler reported a failure.
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    /// Create an invalid arguments error.
    pub fn invalid_args(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an execution error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }
}
