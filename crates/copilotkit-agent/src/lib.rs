//! # copilotkit-agent
//!
//! Runs agents to completion, executing frontend tools in between.
//!
//! This crate provides:
//! - The [`Agent`] capability trait
//! - [`ToolExecutor`] for running a single tool call
//! - [`AgentRunner`], the follow-up loop
//! - Run events via [`RunEventHandler`]

pub mod agent;
pub mod events;
pub mod executor;
pub mod runner;

pub use agent::{Agent, ContextEntry, RunAgentInput, RunAgentResult};
pub use events::{
    ErrorCode, ErrorEvent, NoOpEventHandler, RunEventHandler, ToolExecutionEnd,
    ToolExecutionStart, TracingEventHandler,
};
pub use executor::{ToolExecutor, ToolOutcome};
pub use runner::{AgentRunner, RunError, RunOptions, RunnerBuilder, RunnerConfig};
