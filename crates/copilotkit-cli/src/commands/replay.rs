//! Replay a scripted agent through the follow-up loop.
//!
//! A script lists the tools to register and the batches of messages the agent
//! produces on each invocation:
//!
//! ```json
//! {
//!   "agentId": "researcher",
//!   "tools": [{ "name": "lookup", "followUp": true, "result": {"hits": 3} }],
//!   "turns": [
//!     [{ "kind": "toolCall", "id": "c1", "name": "lookup", "arguments": "{}" }],
//!     [{ "kind": "text", "role": "assistant", "content": "Found 3 hits" }]
//!   ]
//! }
//! ```

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use copilotkit_agent::{
    Agent, AgentRunner, RunAgentInput, RunAgentResult, RunnerConfig, TracingEventHandler,
};
use copilotkit_core::message::{collapse_agent_state_messages, validate_history};
use copilotkit_core::{format_error_with_suggestion, Availability, Message, RegistryReads};
use copilotkit_tools::{handler_fn, FrontendTool, InMemoryToolRegistry, ToolError};
use futures::FutureExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::AppContext;

/// A tool as declared in a script.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub follow_up: Option<bool>,
    #[serde(default)]
    pub available: Availability,
    /// Value every call returns
    #[serde(default)]
    pub result: Option<Value>,
    /// Error every call fails with; wins over `result`
    #[serde(default)]
    pub error: Option<String>,
}

impl ScriptTool {
    fn into_frontend_tool(self) -> FrontendTool {
        let mut tool = FrontendTool::new(self.name, self.description)
            .with_availability(self.available);
        tool.follow_up = self.follow_up;
        tool.agent_id = self.agent_id;
        if let Some(schema) = self.parameters {
            tool = tool.with_parameters(schema);
        }

        match (self.error, self.result) {
            (Some(error), _) => tool.with_handler(handler_fn(move |_| {
                let error = error.clone();
                async move { Err(ToolError::execution(error)) }.boxed()
            })),
            (None, Some(result)) => tool.with_handler(handler_fn(move |_| {
                let result = result.clone();
                async move { Ok(result) }.boxed()
            })),
            (None, None) => tool,
        }
    }
}

/// A replay script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayScript {
    #[serde(default)]
    pub agent_id: Option<String>,
    /// History the agent starts with
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<ScriptTool>,
    /// One batch of new messages per invocation
    #[serde(default)]
    pub turns: Vec<Vec<Message>>,
}

/// Agent that plays back the turns of a script.
pub struct ScriptedAgent {
    agent_id: Option<String>,
    messages: Vec<Message>,
    turns: VecDeque<Vec<Message>>,
}

impl ScriptedAgent {
    pub fn new(agent_id: Option<String>, messages: Vec<Message>, turns: Vec<Vec<Message>>) -> Self {
        Self {
            agent_id,
            messages,
            turns: turns.into(),
        }
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    async fn run(&mut self, input: RunAgentInput) -> anyhow::Result<RunAgentResult> {
        let batch = self.turns.pop_front().unwrap_or_default();
        info!(
            tools = input.tools.len(),
            new_messages = batch.len(),
            remaining = self.turns.len(),
            "Scripted agent turn"
        );
        self.messages.extend(batch.iter().cloned());
        Ok(RunAgentResult::new(batch))
    }
}

/// Command-line overrides of the `run` configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub max_follow_ups: Option<usize>,
    pub unbounded: bool,
    pub live: bool,
}

impl Overrides {
    fn apply(self, mut config: RunnerConfig) -> RunnerConfig {
        if self.unbounded {
            config.max_follow_ups = None;
        } else if let Some(max) = self.max_follow_ups {
            config.max_follow_ups = Some(max);
        }
        if self.live {
            config.registry_reads = RegistryReads::Live;
        }
        config
    }
}

/// What a replay produced.
#[derive(Debug)]
pub struct ReplayOutput {
    /// Messages of the final invocation
    pub new_messages: Vec<Message>,
    /// Full agent history after the run
    pub history: Vec<Message>,
}

pub async fn run(
    script_path: &Path,
    overrides: Overrides,
    history: bool,
    ctx: &AppContext,
) -> anyhow::Result<()> {
    let raw = fs::read_to_string(script_path)
        .with_context(|| format!("failed to read {}", script_path.display()))?;
    let script: ReplayScript = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", script_path.display()))?;

    let config = overrides.apply(RunnerConfig::from(&ctx.config.run));
    let output = replay(script, config).await?;

    let shown = if history {
        output.history
    } else {
        output.new_messages
    };
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

/// Register the script's tools and run its agent to completion.
pub async fn replay(script: ReplayScript, config: RunnerConfig) -> anyhow::Result<ReplayOutput> {
    let registry = Arc::new(InMemoryToolRegistry::with_tools(
        script.tools.into_iter().map(ScriptTool::into_frontend_tool),
    ));
    let runner = AgentRunner::builder()
        .registry(registry)
        .config(config)
        .event_handler(Arc::new(TracingEventHandler))
        .build();

    let mut agent = ScriptedAgent::new(script.agent_id, script.messages, script.turns);
    let result = runner.run_agent(&mut agent).await?;

    validate_history(agent.messages())
        .map_err(|e| anyhow::anyhow!(format_error_with_suggestion(&e)))?;

    Ok(ReplayOutput {
        new_messages: collapse_agent_state_messages(&result.new_messages),
        history: agent.messages,
    })
}
