//! The follow-up loop.
//!
//! [`AgentRunner`] invokes an [`Agent`], executes the frontend tools it called
//! and invokes it again for as long as at least one executed tool asks for a
//! follow-up. The caller gets the messages of the final invocation only.
//!
//! ## Loop
//!
//! ```text
//! run_agent
//!   ├── cancelled?            -> RunError::Cancelled
//!   ├── agent.run(input)      -> RunError::Agent on failure
//!   ├── for each tool call in new_messages
//!   │     ├── already answered in the batch -> skip
//!   │     ├── resolve (scoped, global, "*") -> skip if none
//!   │     └── execute, insert result after the call
//!   ├── any follow-up?  no    -> return new_messages
//!   └── over the cap?         -> RunError::FollowUpLimitExceeded
//! ```

use std::sync::Arc;

use copilotkit_core::message::has_tool_result;
use copilotkit_core::{Message, RegistryReads, RunConfig, ToolDefinition};
use copilotkit_tools::{
    FrontendTool, InMemoryToolRegistry, ToolCallRef, ToolError, ToolLookup, ToolRegistry,
    ToolSnapshot,
};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::agent::{Agent, ContextEntry, RunAgentInput, RunAgentResult};
use crate::events::{ErrorCode, ErrorEvent, NoOpEventHandler, RunEventHandler};
use crate::executor::ToolExecutor;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The agent failed; the error is passed through untouched.
    #[error(transparent)]
    Agent(anyhow::Error),

    /// A tool call could not be executed.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// The agent kept requesting follow-ups past the configured cap.
    #[error("Follow-up limit exceeded: more than {limit} follow-up runs requested")]
    FollowUpLimitExceeded { limit: usize },

    /// The run was cancelled.
    #[error("Run cancelled")]
    Cancelled,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum follow-up invocations per run; `None` disables the cap.
    pub max_follow_ups: Option<usize>,
    /// Snapshot the registry at run start or read it live.
    pub registry_reads: RegistryReads,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for RunnerConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            max_follow_ups: config.max_follow_ups,
            registry_reads: config.registry_reads,
        }
    }
}

/// Per-run inputs forwarded to every invocation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub context: Vec<ContextEntry>,
    pub forwarded_props: Value,
}

// ============================================================================
// Registry access
// ============================================================================

/// The registry as seen by one run.
enum RunTools<'a> {
    Snapshot(ToolSnapshot),
    Live(&'a dyn ToolRegistry),
}

impl RunTools<'_> {
    fn resolve(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>> {
        match self {
            RunTools::Snapshot(snapshot) => snapshot.resolve(name, agent_id),
            RunTools::Live(registry) => registry.resolve(name, agent_id),
        }
    }

    fn definitions_for(&self, agent_id: Option<&str>) -> Vec<ToolDefinition> {
        match self {
            RunTools::Snapshot(snapshot) => snapshot.definitions_for(agent_id),
            RunTools::Live(registry) => registry.definitions_for(agent_id),
        }
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Runs agents to completion, including follow-ups.
pub struct AgentRunner {
    registry: Arc<dyn ToolRegistry>,
    executor: ToolExecutor,
    config: RunnerConfig,
    event_handler: Arc<dyn RunEventHandler>,
    /// Externally owned token; cancelling it stops every run for good.
    shared_token: Option<CancellationToken>,
    /// Token handed to runs started from now on.
    cancel_token: Mutex<CancellationToken>,
}

impl AgentRunner {
    /// Create a runner over `registry` with default configuration.
    pub fn new(registry: Arc<dyn ToolRegistry>) -> Self {
        RunnerBuilder::new().registry(registry).build()
    }

    /// Start building a runner.
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::new()
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<dyn ToolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel the runs currently in progress. They stop before their next
    /// invocation; runs started afterwards are unaffected.
    pub fn cancel(&self) {
        let fresh = fresh_token(self.shared_token.as_ref());
        let previous = std::mem::replace(&mut *self.cancel_token.lock(), fresh);
        previous.cancel();
    }

    /// Whether a run started now would be cancelled straight away.
    ///
    /// Only true once a token passed to [`RunnerBuilder::cancel_token`] is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.lock().is_cancelled()
    }

    /// The token the next run will check before every invocation.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.lock().clone()
    }

    // ========================================================================
    // Core Loop
    // ========================================================================

    /// Run `agent` until no executed tool asks for a follow-up.
    ///
    /// Returns the result of the last invocation.
    pub async fn run_agent(&self, agent: &mut dyn Agent) -> Result<RunAgentResult, RunError> {
        self.run_agent_with(agent, RunOptions::default()).await
    }

    /// Like [`run_agent`](Self::run_agent), forwarding `options` to every invocation.
    pub async fn run_agent_with(
        &self,
        agent: &mut dyn Agent,
        options: RunOptions,
    ) -> Result<RunAgentResult, RunError> {
        let agent_id = agent.agent_id().map(str::to_owned);
        let agent_id = agent_id.as_deref();
        let cancel_token = self.cancel_token();

        let tools = match self.config.registry_reads {
            RegistryReads::Snapshot => RunTools::Snapshot(self.registry.snapshot()),
            RegistryReads::Live => RunTools::Live(self.registry.as_ref()),
        };

        info!(agent = ?agent_id, "Starting agent run");

        let mut iteration = 0usize;
        loop {
            if cancel_token.is_cancelled() {
                info!(agent = ?agent_id, iteration, "Run cancelled");
                return Err(RunError::Cancelled);
            }

            iteration += 1;
            self.event_handler.on_run_start(agent_id, iteration);

            let input = RunAgentInput {
                tools: tools.definitions_for(agent_id),
                context: options.context.clone(),
                forwarded_props: options.forwarded_props.clone(),
            };

            let result = match agent.run(input).await {
                Ok(result) => result,
                Err(e) => {
                    error!(agent = ?agent_id, iteration, error = %e, "Agent run failed");
                    self.event_handler.on_error(
                        &ErrorEvent::new(ErrorCode::AgentRunFailed, e.to_string())
                            .with_agent(agent_id),
                    );
                    return Err(RunError::Agent(e));
                }
            };

            debug!(
                agent = ?agent_id,
                iteration,
                new_messages = result.new_messages.len(),
                "Agent produced messages"
            );

            let needs_follow_up = self
                .execute_tool_calls(agent, &tools, &result.new_messages, agent_id)
                .await?;

            if !needs_follow_up {
                self.event_handler.on_run_complete(agent_id, iteration);
                return Ok(result);
            }

            // `iteration - 1` follow-ups have run so far; the next would be number `iteration`.
            if let Some(limit) = self.config.max_follow_ups {
                if iteration > limit {
                    warn!(agent = ?agent_id, limit, "Follow-up limit exceeded");
                    self.event_handler.on_error(
                        &ErrorEvent::new(
                            ErrorCode::FollowUpLimitExceeded,
                            format!("more than {} follow-up runs requested", limit),
                        )
                        .with_agent(agent_id),
                    );
                    return Err(RunError::FollowUpLimitExceeded { limit });
                }
            }

            debug!(agent = ?agent_id, iteration, "Tool requested follow-up");
        }
    }

    /// Execute every unanswered, resolvable tool call in `new_messages`.
    ///
    /// Returns whether any of them requested a follow-up. All calls run, even
    /// once the answer is known.
    async fn execute_tool_calls(
        &self,
        agent: &mut dyn Agent,
        tools: &RunTools<'_>,
        new_messages: &[Message],
        agent_id: Option<&str>,
    ) -> Result<bool, RunError> {
        let mut needs_follow_up = false;

        for message in new_messages {
            let Some((name, arguments)) = message.as_tool_call() else {
                continue;
            };

            if has_tool_result(new_messages, &message.id) {
                debug!(tool = %name, call_id = %message.id, "Tool call already answered");
                continue;
            }

            let Some(tool) = tools.resolve(name, agent_id) else {
                debug!(tool = %name, agent = ?agent_id, "No frontend tool registered, skipping");
                continue;
            };

            let call = ToolCallRef {
                id: &message.id,
                name,
                arguments,
            };
            let outcome = self.executor.execute(&tool, call, agent_id).await?;

            insert_after(agent.messages_mut(), &message.id, outcome.message);
            needs_follow_up |= outcome.follow_up;
        }

        Ok(needs_follow_up)
    }
}

/// A per-generation token, tied to the shared one when there is one.
fn fresh_token(shared: Option<&CancellationToken>) -> CancellationToken {
    match shared {
        Some(token) => token.child_token(),
        None => CancellationToken::new(),
    }
}

/// Insert `message` right after the message with id `after`, or append it.
fn insert_after(messages: &mut Vec<Message>, after: &str, message: Message) {
    match messages.iter().position(|m| m.id == after) {
        Some(idx) => messages.insert(idx + 1, message),
        None => messages.push(message),
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for constructing an [`AgentRunner`].
#[derive(Default)]
pub struct RunnerBuilder {
    registry: Option<Arc<dyn ToolRegistry>>,
    config: RunnerConfig,
    event_handler: Option<Arc<dyn RunEventHandler>>,
    cancel_token: Option<CancellationToken>,
}

impl RunnerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tool registry. Defaults to an empty one.
    pub fn registry(mut self, registry: Arc<dyn ToolRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the follow-up cap.
    pub fn max_follow_ups(mut self, max: Option<usize>) -> Self {
        self.config.max_follow_ups = max;
        self
    }

    /// Set the registry read policy.
    pub fn registry_reads(mut self, reads: RegistryReads) -> Self {
        self.config.registry_reads = reads;
        self
    }

    /// Set the event handler.
    pub fn event_handler(mut self, handler: Arc<dyn RunEventHandler>) -> Self {
        self.event_handler = Some(handler);
        self
    }

    /// Use an externally owned cancellation token. Cancelling it stops the
    /// runs in progress and every later one.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Build the runner.
    pub fn build(self) -> AgentRunner {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(InMemoryToolRegistry::new()));
        let event_handler = self
            .event_handler
            .unwrap_or_else(|| Arc::new(NoOpEventHandler));

        AgentRunner {
            registry,
            executor: ToolExecutor::new(Arc::clone(&event_handler)),
            config: self.config,
            event_handler,
            cancel_token: Mutex::new(fresh_token(self.cancel_token.as_ref())),
            shared_token: self.cancel_token,
        }
    }
}
