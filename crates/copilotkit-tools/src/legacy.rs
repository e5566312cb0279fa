//! Legacy action records and their translation into runtime action inputs.
//!
//! Older clients describe tools as actions carrying an `available` string and a
//! separate `disabled` flag. Before such actions reach the runtime, anything
//! the runtime must not see is dropped and the rest are flattened into
//! [`ActionInput`]s with a serialized JSON schema.

use copilotkit_core::{empty_parameters, Availability, ToolDefinition, WILDCARD_TOOL_NAME};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An action as declared by a legacy client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the parameters
    #[serde(default)]
    pub parameters: Option<Value>,
    /// `"enabled"`, `"disabled"`, `"remote"` or `"frontend"`
    #[serde(default)]
    pub available: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    /// Name of an action rendered in place of this one
    #[serde(default)]
    pub paired_action: Option<String>,
}

impl LegacyAction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Resolved availability.
    pub fn availability(&self) -> Availability {
        Availability::from_legacy(self.available.as_deref(), self.disabled)
    }

    fn reaches_runtime(&self) -> bool {
        let availability = self.availability();
        availability != Availability::Disabled
            && availability != Availability::Frontend
            && self.name != WILDCARD_TOOL_NAME
            && self.paired_action.is_none()
    }
}

/// Action description sent to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub name: String,
    pub description: String,
    /// Parameters schema as JSON text
    pub json_schema: String,
    pub available: Availability,
}

impl ActionInput {
    /// Convert into a tool definition for merging.
    ///
    /// A schema that fails to parse falls back to an empty object schema.
    pub fn into_definition(self) -> ToolDefinition {
        let definition = ToolDefinition::new(self.name, self.description);
        match serde_json::from_str::<Value>(&self.json_schema) {
            Ok(schema) => definition.with_parameters(schema),
            Err(_) => definition,
        }
    }
}

/// Filter and translate legacy actions for a runtime request.
///
/// Disabled, frontend-only, paired and wildcard actions are dropped.
pub fn process_actions_for_runtime_request(actions: &[LegacyAction]) -> Vec<ActionInput> {
    actions
        .iter()
        .filter(|a| a.reaches_runtime())
        .map(|a| {
            let schema = a.parameters.clone().unwrap_or_else(empty_parameters);
            ActionInput {
                name: a.name.clone(),
                description: a.description.clone(),
                json_schema: schema.to_string(),
                available: a.availability(),
            }
        })
        .collect()
}
