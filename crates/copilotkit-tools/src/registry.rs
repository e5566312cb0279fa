//! Tool registry for managing frontend tools.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use copilotkit_core::{follows_up, Availability, ToolDefinition, WILDCARD_TOOL_NAME};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::ToolError;

/// Borrowed view of the tool-call message being executed.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallRef<'a> {
    /// ID of the tool-call message
    pub id: &'a str,
    /// Name the agent called
    pub name: &'a str,
    /// Raw JSON arguments
    pub arguments: &'a str,
}

/// Executes a tool call on behalf of the agent.
///
/// The returned value becomes the content of the tool-result message:
/// `null` renders as an empty string, strings verbatim, anything else as JSON.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value, call: ToolCallRef<'_>) -> Result<Value, ToolError>;
}

type HandlerFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;

struct FnHandler {
    f: Box<HandlerFn>,
}

#[async_trait]
impl ToolHandler for FnHandler {
    async fn call(&self, args: Value, _call: ToolCallRef<'_>) -> Result<Value, ToolError> {
        (self.f)(args).await
    }
}

/// Wrap a closure returning a boxed future as a [`ToolHandler`].
pub fn handler_fn<F>(f: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f: Box::new(f) })
}

/// A tool registered by the application.
#[derive(Clone)]
pub struct FrontendTool {
    /// Definition offered to agents
    pub definition: ToolDefinition,
    /// Restrict the tool to one agent; `None` makes it global
    pub agent_id: Option<String>,
    /// Executes the call; without one the result is empty
    pub handler: Option<Arc<dyn ToolHandler>>,
    /// Whether the agent must run again after this tool; unset means yes
    pub follow_up: Option<bool>,
    /// Whether the tool is offered at all
    pub availability: Availability,
}

impl FrontendTool {
    /// Create a global tool without a handler.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::from_definition(ToolDefinition::new(name, description))
    }

    /// Wrap an existing definition.
    pub fn from_definition(definition: ToolDefinition) -> Self {
        Self {
            definition,
            agent_id: None,
            handler: None,
            follow_up: None,
            availability: Availability::Enabled,
        }
    }

    /// Create the catch-all tool used for calls to unregistered names.
    pub fn wildcard() -> Self {
        Self::new(WILDCARD_TOOL_NAME, "Handles calls to tools that are not registered")
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.definition.parameters = schema;
        self
    }

    pub fn for_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn with_follow_up(mut self, follow_up: bool) -> Self {
        self.follow_up = Some(follow_up);
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    /// Tool name.
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Resolved follow-up flag.
    pub fn follows_up(&self) -> bool {
        follows_up(self.follow_up)
    }

    /// Whether this is the catch-all tool.
    pub fn is_wildcard(&self) -> bool {
        self.definition.is_wildcard()
    }

    fn same_key(&self, name: &str, agent_id: Option<&str>) -> bool {
        self.name() == name && self.agent_id.as_deref() == agent_id
    }
}

impl fmt::Debug for FrontendTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrontendTool")
            .field("name", &self.definition.name)
            .field("agent_id", &self.agent_id)
            .field("has_handler", &self.handler.is_some())
            .field("follow_up", &self.follow_up)
            .field("availability", &self.availability)
            .finish()
    }
}

/// Agent-scoped entry first, then the global one.
fn find_tool(
    tools: &[Arc<FrontendTool>],
    name: &str,
    agent_id: Option<&str>,
) -> Option<Arc<FrontendTool>> {
    if let Some(agent) = agent_id {
        if let Some(tool) = tools.iter().find(|t| t.same_key(name, Some(agent))) {
            return Some(Arc::clone(tool));
        }
    }
    tools.iter().find(|t| t.same_key(name, None)).cloned()
}

/// Read side of a tool registry.
pub trait ToolLookup: Send + Sync {
    /// Get a tool by name.
    ///
    /// With an agent ID the agent-scoped tool wins over the global one.
    /// Without one only global tools are visible.
    fn get(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>>;

    /// All tools in registration order.
    fn tools(&self) -> Vec<Arc<FrontendTool>>;

    /// Like [`get`](Self::get), falling back to the wildcard tool.
    fn resolve(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>> {
        self.get(name, agent_id)
            .or_else(|| self.get(WILDCARD_TOOL_NAME, agent_id))
    }

    /// Definitions to offer an agent: enabled, global or scoped to it, no wildcard.
    ///
    /// A global tool shadowed by a tool of the same name scoped to `agent_id`
    /// is left out.
    fn definitions_for(&self, agent_id: Option<&str>) -> Vec<ToolDefinition> {
        let tools = self.tools();
        let scoped = |name: &str| {
            agent_id.is_some()
                && tools
                    .iter()
                    .any(|t| t.name() == name && t.agent_id.as_deref() == agent_id)
        };

        tools
            .iter()
            .filter(|t| t.availability.is_enabled() && !t.is_wildcard())
            .filter(|t| match t.agent_id.as_deref() {
                Some(owner) => Some(owner) == agent_id,
                None => !scoped(t.name()),
            })
            .map(|t| t.definition.clone())
            .collect()
    }
}

/// Write side of a tool registry.
pub trait ToolRegistry: ToolLookup {
    /// Insert a tool, replacing any entry with the same name and agent scope.
    ///
    /// Returns the replaced entry.
    fn upsert(&self, tool: FrontendTool) -> Option<Arc<FrontendTool>>;

    /// Remove the tool with exactly this name and agent scope.
    fn remove(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>>;

    /// Copy the current contents.
    fn snapshot(&self) -> ToolSnapshot {
        ToolSnapshot::new(self.tools())
    }
}

/// Shared, mutable registry. Last write wins.
#[derive(Default)]
pub struct InMemoryToolRegistry {
    tools: RwLock<Vec<Arc<FrontendTool>>>,
}

impl InMemoryToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `tools`.
    pub fn with_tools(tools: impl IntoIterator<Item = FrontendTool>) -> Self {
        let registry = Self::new();
        for tool in tools {
            registry.upsert(tool);
        }
        registry
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl ToolLookup for InMemoryToolRegistry {
    fn get(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>> {
        find_tool(&self.tools.read(), name, agent_id)
    }

    fn tools(&self) -> Vec<Arc<FrontendTool>> {
        self.tools.read().clone()
    }
}

impl ToolRegistry for InMemoryToolRegistry {
    fn upsert(&self, tool: FrontendTool) -> Option<Arc<FrontendTool>> {
        let mut tools = self.tools.write();
        let agent_id = tool.agent_id.clone();
        let position = tools
            .iter()
            .position(|t| t.same_key(tool.name(), agent_id.as_deref()));

        match position {
            Some(idx) => {
                debug!(tool = %tool.name(), agent = ?agent_id, "Replacing registered tool");
                Some(std::mem::replace(&mut tools[idx], Arc::new(tool)))
            }
            None => {
                debug!(tool = %tool.name(), agent = ?agent_id, "Registering tool");
                tools.push(Arc::new(tool));
                None
            }
        }
    }

    fn remove(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>> {
        let mut tools = self.tools.write();
        let idx = tools.iter().position(|t| t.same_key(name, agent_id))?;
        debug!(tool = %name, agent = ?agent_id, "Removing tool");
        Some(tools.remove(idx))
    }
}

/// Immutable copy of a registry.
#[derive(Debug, Clone, Default)]
pub struct ToolSnapshot {
    tools: Vec<Arc<FrontendTool>>,
}

impl ToolSnapshot {
    pub fn new(tools: Vec<Arc<FrontendTool>>) -> Self {
        Self { tools }
    }
}

impl ToolLookup for ToolSnapshot {
    fn get(&self, name: &str, agent_id: Option<&str>) -> Option<Arc<FrontendTool>> {
        find_tool(&self.tools, name, agent_id)
    }

    fn tools(&self) -> Vec<Arc<FrontendTool>> {
        self.tools.clone()
    }
}
