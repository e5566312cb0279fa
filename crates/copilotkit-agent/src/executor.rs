//! Execution of a single frontend tool call.
//!
//! [`ToolExecutor`] parses the raw arguments, invokes the handler, renders the
//! result and reports what happened to the run's [`RunEventHandler`]. It never
//! touches the agent history; the runner decides where the result goes.

use std::sync::Arc;

use copilotkit_core::Message;
use copilotkit_tools::{FrontendTool, ToolCallRef, ToolError};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::events::{ErrorCode, ErrorEvent, RunEventHandler, ToolExecutionEnd, ToolExecutionStart};

/// What executing one tool call produced.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    /// Tool-result message answering the call
    pub message: Message,
    /// Whether the agent must run again
    pub follow_up: bool,
}

/// Runs frontend tools on behalf of the runner.
pub struct ToolExecutor {
    events: Arc<dyn RunEventHandler>,
}

impl ToolExecutor {
    /// Create an executor that reports to `events`.
    pub fn new(events: Arc<dyn RunEventHandler>) -> Self {
        Self { events }
    }

    /// Execute `tool` for `call`.
    ///
    /// Unparseable arguments are the only failure; they are reported and
    /// returned as [`ToolError::InvalidArguments`]. A failing handler instead
    /// produces an `"Error: ..."` result that does not request a follow-up.
    pub async fn execute(
        &self,
        tool: &FrontendTool,
        call: ToolCallRef<'_>,
        agent_id: Option<&str>,
    ) -> Result<ToolOutcome, ToolError> {
        let mut content = String::new();
        let mut error: Option<String> = None;

        if let Some(handler) = &tool.handler {
            info!(tool = %call.name, call_id = %call.id, "Executing tool call");

            let parsed: Value = match serde_json::from_str(call.arguments) {
                Ok(value) => value,
                Err(e) => return Err(self.argument_error(call, agent_id, e)),
            };

            let args = if tool.is_wildcard() {
                json!({ "toolName": call.name, "args": parsed })
            } else {
                parsed
            };

            self.events.on_tool_execution_start(&ToolExecutionStart {
                tool_call_id: call.id,
                tool_name: call.name,
                agent_id,
                args: Some(&args),
            });

            match handler.call(args, call).await {
                Ok(value) => content = render_result(value),
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool handler failed");
                    self.events.on_error(
                        &ErrorEvent::new(ErrorCode::ToolHandlerFailed, e.to_string())
                            .with_agent(agent_id)
                            .with_tool_call(call),
                    );
                    error = Some(e.to_string());
                }
            }

            self.events.on_tool_execution_end(&ToolExecutionEnd {
                tool_call_id: call.id,
                tool_name: call.name,
                agent_id,
                result: if error.is_some() { "" } else { content.as_str() },
                error: error.as_deref(),
            });
        } else {
            debug!(tool = %call.name, "Tool has no handler, answering with an empty result");
        }

        if let Some(message) = &error {
            content = format!("Error: {}", message);
        }

        let follow_up = error.is_none() && tool.follows_up();
        let message = Message::tool_result(call.id, call.name, content).with_parent(call.id);

        Ok(ToolOutcome { message, follow_up })
    }

    fn argument_error(
        &self,
        call: ToolCallRef<'_>,
        agent_id: Option<&str>,
        source: serde_json::Error,
    ) -> ToolError {
        let message = source.to_string();
        warn!(tool = %call.name, call_id = %call.id, error = %message, "Invalid tool arguments");

        self.events.on_error(
            &ErrorEvent::new(ErrorCode::ToolArgumentParseFailed, message.clone())
                .with_agent(agent_id)
                .with_tool_call(call)
                .with_raw_arguments(call.arguments),
        );
        self.events.on_tool_execution_start(&ToolExecutionStart {
            tool_call_id: call.id,
            tool_name: call.name,
            agent_id,
            args: None,
        });
        self.events.on_tool_execution_end(&ToolExecutionEnd {
            tool_call_id: call.id,
            tool_name: call.name,
            agent_id,
            result: "",
            error: Some(&message),
        });

        ToolError::invalid_args(call.name, message)
    }
}

/// Render a handler's return value as tool-result content.
pub(crate) fn render_result(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
