//! Message primitives exchanged between agents, tools and callers.
//!
//! Every message carries an id, an optional back-reference to the message it
//! belongs to and a creation timestamp. The payload is a tagged union whose
//! `kind` discriminant is serialized explicitly, so consumers match on
//! [`MessageBody`] instead of probing for fields.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Role of a text or image message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// User input
    User,
    /// Assistant output
    Assistant,
}

/// Fieldless discriminant of a [`MessageBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Text,
    ToolCall,
    ToolResult,
    AgentState,
    Image,
}

/// Message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MessageBody {
    /// Plain text from a user, the assistant or the system.
    Text { role: Role, content: String },

    /// The agent asks for a named tool to be invoked.
    ///
    /// `arguments` is the raw JSON text emitted by the model. It is only
    /// parsed when a handler actually runs.
    #[serde(rename_all = "camelCase")]
    ToolCall { name: String, arguments: String },

    /// Output of a previously requested tool call.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        action_execution_id: String,
        action_name: String,
        result: String,
    },

    /// Snapshot of an agent's internal state.
    #[serde(rename_all = "camelCase")]
    AgentState {
        thread_id: String,
        agent_name: String,
        #[serde(default)]
        node_name: String,
        #[serde(default)]
        run_id: String,
        active: bool,
        running: bool,
        role: Role,
        #[serde(default)]
        state: serde_json::Value,
    },

    /// Base64-encoded image.
    Image {
        role: Role,
        format: String,
        bytes: String,
    },
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID, generated when missing on input
    #[serde(default = "new_id")]
    pub id: String,
    /// Message this one belongs to (back-reference, not ownership)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<String>,
    /// Creation timestamp, defaults to now when missing on input
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Payload
    #[serde(flatten)]
    pub body: MessageBody,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    fn new(body: MessageBody) -> Self {
        Self {
            id: new_id(),
            parent_message_id: None,
            created_at: Utc::now(),
            body,
        }
    }

    /// Create a text message with an explicit role.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self::new(MessageBody::Text {
            role,
            content: content.into(),
        })
    }

    /// Create a user text message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Create an assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Create a tool-call message.
    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::new(MessageBody::ToolCall {
            name: name.into(),
            arguments: arguments.into(),
        })
    }

    /// Create a tool-result message answering the tool call `action_execution_id`.
    pub fn tool_result(
        action_execution_id: impl Into<String>,
        action_name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self::new(MessageBody::ToolResult {
            action_execution_id: action_execution_id.into(),
            action_name: action_name.into(),
            result: result.into(),
        })
    }

    /// Create an agent-state message.
    pub fn agent_state(
        thread_id: impl Into<String>,
        agent_name: impl Into<String>,
        state: serde_json::Value,
    ) -> Self {
        Self::new(MessageBody::AgentState {
            thread_id: thread_id.into(),
            agent_name: agent_name.into(),
            node_name: String::new(),
            run_id: String::new(),
            active: true,
            running: true,
            role: Role::Assistant,
            state,
        })
    }

    /// Create an image message.
    pub fn image(role: Role, format: impl Into<String>, bytes: impl Into<String>) -> Self {
        Self::new(MessageBody::Image {
            role,
            format: format.into(),
            bytes: bytes.into(),
        })
    }

    /// Set the parent message ID.
    pub fn with_parent(mut self, parent_message_id: impl Into<String>) -> Self {
        self.parent_message_id = Some(parent_message_id.into());
        self
    }

    /// Set the message ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Get the discriminant of this message.
    pub fn kind(&self) -> MessageKind {
        match self.body {
            MessageBody::Text { .. } => MessageKind::Text,
            MessageBody::ToolCall { .. } => MessageKind::ToolCall,
            MessageBody::ToolResult { .. } => MessageKind::ToolResult,
            MessageBody::AgentState { .. } => MessageKind::AgentState,
            MessageBody::Image { .. } => MessageKind::Image,
        }
    }

    /// Tool name and raw arguments if this is a tool-call message.
    pub fn as_tool_call(&self) -> Option<(&str, &str)> {
        match &self.body {
            MessageBody::ToolCall { name, arguments } => Some((name, arguments)),
            _ => None,
        }
    }

    /// ID of the answered tool call if this is a tool-result message.
    pub fn action_execution_id(&self) -> Option<&str> {
        match &self.body {
            MessageBody::ToolResult {
                action_execution_id,
                ..
            } => Some(action_execution_id),
            _ => None,
        }
    }
}

/// Check whether `messages` already contain a result for the tool call `call_id`.
pub fn has_tool_result(messages: &[Message], call_id: &str) -> bool {
    messages
        .iter()
        .any(|m| m.action_execution_id() == Some(call_id))
}

/// Validate that every tool-result message answers an earlier tool call.
pub fn validate_history(messages: &[Message]) -> Result<()> {
    let mut calls: HashSet<&str> = HashSet::new();

    for message in messages {
        match &message.body {
            MessageBody::ToolCall { .. } => {
                calls.insert(message.id.as_str());
            }
            MessageBody::ToolResult {
                action_execution_id,
                ..
            } => {
                if !calls.contains(action_execution_id.as_str()) {
                    return Err(Error::Validation(format!(
                        "tool result '{}' references unknown tool call '{}'",
                        message.id, action_execution_id
                    )));
                }
            }
            MessageBody::Text { .. }
            | MessageBody::AgentState { .. }
            | MessageBody::Image { .. } => {}
        }
    }

    Ok(())
}

/// Drop all agent-state messages.
pub fn filter_agent_state_messages(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .filter(|m| m.kind() != MessageKind::AgentState)
        .cloned()
        .collect()
}

/// Keep a single agent-state message per agent.
///
/// The surviving message sits where that agent's first state message was and
/// carries the latest payload. Other messages keep their relative order.
pub fn collapse_agent_state_messages(messages: &[Message]) -> Vec<Message> {
    let mut collapsed: Vec<Message> = Vec::with_capacity(messages.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for message in messages {
        match &message.body {
            MessageBody::AgentState { agent_name, .. } => match positions.get(agent_name) {
                Some(&idx) => collapsed[idx] = message.clone(),
                None => {
                    positions.insert(agent_name.clone(), collapsed.len());
                    collapsed.push(message.clone());
                }
            },
            _ => collapsed.push(message.clone()),
        }
    }

    collapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_discriminant_is_serialized() {
        let msg = Message::tool_call("search", r#"{"q":"rust"}"#);
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["kind"], "toolCall");
        assert_eq!(value["name"], "search");
        assert!(value.get("parentMessageId").is_none());

        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.kind(), MessageKind::ToolCall);
    }

    #[test]
    fn test_tool_result_wire_shape() {
        let msg = Message::tool_result("call-1", "search", "ok").with_parent("call-1");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["kind"], "toolResult");
        assert_eq!(value["actionExecutionId"], "call-1");
        assert_eq!(value["parentMessageId"], "call-1");
    }

    #[test]
    fn test_missing_id_and_timestamp_are_filled() {
        let parsed: Message =
            serde_json::from_str(r#"{"kind":"text","role":"user","content":"hi"}"#).unwrap();
        assert!(!parsed.id.is_empty());
        assert_eq!(parsed.kind(), MessageKind::Text);
    }

    #[test]
    fn test_validate_history_accepts_answered_calls() {
        let call = Message::tool_call("search", "{}");
        let result = Message::tool_result(&call.id, "search", "done");
        let history = vec![Message::user("hi"), call, result];

        assert!(validate_history(&history).is_ok());
    }

    #[test]
    fn test_validate_history_rejects_dangling_result() {
        let history = vec![
            Message::user("hi"),
            Message::tool_result("missing", "search", "done"),
        ];

        let err = validate_history(&history).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validate_history_rejects_result_before_call() {
        let call = Message::tool_call("search", "{}");
        let result = Message::tool_result(&call.id, "search", "done");

        assert!(validate_history(&[result, call]).is_err());
    }

    #[test]
    fn test_has_tool_result() {
        let call = Message::tool_call("search", "{}");
        let messages = vec![call.clone(), Message::tool_result(&call.id, "search", "")];

        assert!(has_tool_result(&messages, &call.id));
        assert!(!has_tool_result(&messages, "other"));
    }

    #[test]
    fn test_filter_agent_state_messages() {
        let messages = vec![
            Message::user("hi"),
            Message::agent_state("t1", "planner", json!({"step": 1})),
            Message::assistant("hello"),
        ];

        let filtered = filter_agent_state_messages(&messages);
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|m| m.kind() != MessageKind::AgentState));
    }

    #[test]
    fn test_collapse_keeps_latest_state_at_first_position() {
        let messages = vec![
            Message::agent_state("t1", "planner", json!({"step": 1})),
            Message::assistant("working"),
            Message::agent_state("t1", "researcher", json!({"step": 1})),
            Message::agent_state("t1", "planner", json!({"step": 2})),
        ];

        let collapsed = collapse_agent_state_messages(&messages);
        assert_eq!(collapsed.len(), 3);
        assert_eq!(collapsed[0].id, messages[3].id);
        assert_eq!(collapsed[1].kind(), MessageKind::Text);
        assert_eq!(collapsed[2].id, messages[2].id);
    }
}
