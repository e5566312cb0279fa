//! The agent capability consumed by the runner.

use async_trait::async_trait;
use copilotkit_core::{Message, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A piece of application context forwarded to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub description: String,
    pub value: String,
}

impl ContextEntry {
    pub fn new(description: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            value: value.into(),
        }
    }
}

/// Input for a single agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentInput {
    /// Tools the agent may call
    pub tools: Vec<ToolDefinition>,
    /// Application context
    #[serde(default)]
    pub context: Vec<ContextEntry>,
    /// Opaque properties passed through to the agent
    #[serde(default)]
    pub forwarded_props: Value,
}

/// Output of a single agent invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAgentResult {
    /// Messages produced by this invocation
    pub new_messages: Vec<Message>,
}

impl RunAgentResult {
    pub fn new(new_messages: Vec<Message>) -> Self {
        Self { new_messages }
    }
}

/// An externally owned execution unit.
///
/// The agent owns its history. It is expected to append what it produces to
/// [`messages_mut`](Agent::messages_mut); the runner inserts tool results
/// there, right after the tool call they answer.
#[async_trait]
pub trait Agent: Send {
    /// Identifier used to select agent-scoped tools.
    fn agent_id(&self) -> Option<&str>;

    /// Accumulated history.
    fn messages(&self) -> &[Message];

    /// Mutable access to the history.
    fn messages_mut(&mut self) -> &mut Vec<Message>;

    /// Run once over the current history.
    async fn run(&mut self, input: RunAgentInput) -> anyhow::Result<RunAgentResult>;
}
