//! Run events.
//!
//! Implement [`RunEventHandler`] to observe a run. Every method has a no-op
//! default, so handlers only override what they care about.

use copilotkit_tools::ToolCallRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Machine-readable classification of a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The agent invocation failed
    AgentRunFailed,
    /// Tool-call arguments were not valid JSON
    ToolArgumentParseFailed,
    /// A tool handler returned an error
    ToolHandlerFailed,
    /// The run asked for more follow-ups than allowed
    FollowUpLimitExceeded,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AgentRunFailed => "agent_run_failed",
            ErrorCode::ToolArgumentParseFailed => "tool_argument_parse_failed",
            ErrorCode::ToolHandlerFailed => "tool_handler_failed",
            ErrorCode::FollowUpLimitExceeded => "follow_up_limit_exceeded",
        }
    }
}

/// An error reported during a run, with whatever context was available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Raw arguments, set for parse failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_arguments: Option<String>,
}

impl ErrorEvent {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            agent_id: None,
            tool_call_id: None,
            tool_name: None,
            raw_arguments: None,
        }
    }

    pub fn with_agent(mut self, agent_id: Option<&str>) -> Self {
        self.agent_id = agent_id.map(str::to_owned);
        self
    }

    pub fn with_tool_call(mut self, call: ToolCallRef<'_>) -> Self {
        self.tool_call_id = Some(call.id.to_owned());
        self.tool_name = Some(call.name.to_owned());
        self
    }

    pub fn with_raw_arguments(mut self, raw: impl Into<String>) -> Self {
        self.raw_arguments = Some(raw.into());
        self
    }
}

/// A tool handler is about to run.
#[derive(Debug, Clone)]
pub struct ToolExecutionStart<'a> {
    pub tool_call_id: &'a str,
    pub tool_name: &'a str,
    pub agent_id: Option<&'a str>,
    /// Arguments passed to the handler; `None` if they failed to parse
    pub args: Option<&'a Value>,
}

/// A tool handler finished.
#[derive(Debug, Clone)]
pub struct ToolExecutionEnd<'a> {
    pub tool_call_id: &'a str,
    pub tool_name: &'a str,
    pub agent_id: Option<&'a str>,
    /// Rendered result; empty when `error` is set
    pub result: &'a str,
    pub error: Option<&'a str>,
}

/// Observer for run events.
pub trait RunEventHandler: Send + Sync {
    /// Called before each agent invocation. `iteration` starts at 1.
    fn on_run_start(&self, _agent_id: Option<&str>, _iteration: usize) {}

    /// Called before a tool handler runs.
    fn on_tool_execution_start(&self, _event: &ToolExecutionStart<'_>) {}

    /// Called after a tool handler ran, whether it succeeded or not.
    fn on_tool_execution_end(&self, _event: &ToolExecutionEnd<'_>) {}

    /// Called when an error occurs.
    fn on_error(&self, _event: &ErrorEvent) {}

    /// Called once the loop terminates successfully.
    fn on_run_complete(&self, _agent_id: Option<&str>, _iterations: usize) {}
}

/// Default event handler that does nothing.
pub struct NoOpEventHandler;

impl RunEventHandler for NoOpEventHandler {}

/// Event handler that forwards everything to `tracing`.
pub struct TracingEventHandler;

impl RunEventHandler for TracingEventHandler {
    fn on_run_start(&self, agent_id: Option<&str>, iteration: usize) {
        debug!(agent = ?agent_id, iteration, "Invoking agent");
    }

    fn on_tool_execution_start(&self, event: &ToolExecutionStart<'_>) {
        debug!(
            tool = %event.tool_name,
            call_id = %event.tool_call_id,
            agent = ?event.agent_id,
            "Tool execution started"
        );
    }

    fn on_tool_execution_end(&self, event: &ToolExecutionEnd<'_>) {
        match event.error {
            Some(error) => warn!(
                tool = %event.tool_name,
                call_id = %event.tool_call_id,
                error = %error,
                "Tool execution failed"
            ),
            None => debug!(
                tool = %event.tool_name,
                call_id = %event.tool_call_id,
                result_len = event.result.len(),
                "Tool execution finished"
            ),
        }
    }

    fn on_error(&self, event: &ErrorEvent) {
        warn!(
            code = event.code.as_str(),
            agent = ?event.agent_id,
            tool = ?event.tool_name,
            "{}",
            event.message
        );
    }

    fn on_run_complete(&self, agent_id: Option<&str>, iterations: usize) {
        info!(agent = ?agent_id, iterations, "Run complete");
    }
}
