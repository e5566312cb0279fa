//! Tool definitions and availability.

use serde::{Deserialize, Serialize};

/// Name reserved for the catch-all tool.
pub const WILDCARD_TOOL_NAME: &str = "*";

/// Definition of a tool as presented to an agent or model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (unique identifier)
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for parameters
    #[serde(default = "empty_parameters")]
    pub parameters: serde_json::Value,
}

/// Parameters schema of a tool that takes no arguments.
pub fn empty_parameters() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {}
    })
}

impl ToolDefinition {
    /// Create a new tool definition with an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_parameters(),
        }
    }

    /// Set the parameters schema.
    pub fn with_parameters(mut self, schema: serde_json::Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Whether this is the catch-all tool.
    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD_TOOL_NAME
    }
}

/// Resolve a tri-state follow-up flag. Unset means follow up.
pub fn follows_up(follow_up: Option<bool>) -> bool {
    follow_up.unwrap_or(true)
}

/// Where and whether a tool may be offered.
///
/// Two representations coexist: the legacy string field (`"enabled"`,
/// `"disabled"`, `"remote"`, `"frontend"`) plus a separate `disabled` flag, and
/// a plain boolean. Both map onto this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    /// Offered everywhere
    #[default]
    Enabled,
    /// Never offered
    Disabled,
    /// Offered to remote agents only
    Remote,
    /// Executed in the client only, never sent to the runtime
    Frontend,
}

impl Availability {
    /// Map the legacy `available` string and `disabled` flag.
    ///
    /// `disabled == true` wins. Missing or unknown strings mean enabled.
    pub fn from_legacy(available: Option<&str>, disabled: bool) -> Self {
        if disabled {
            return Availability::Disabled;
        }
        match available {
            Some("disabled") => Availability::Disabled,
            Some("remote") => Availability::Remote,
            Some("frontend") => Availability::Frontend,
            _ => Availability::Enabled,
        }
    }

    /// The legacy string form.
    pub fn as_legacy_str(&self) -> &'static str {
        match self {
            Availability::Enabled => "enabled",
            Availability::Disabled => "disabled",
            Availability::Remote => "remote",
            Availability::Frontend => "frontend",
        }
    }

    /// Boolean form: everything except `Disabled` is available.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Availability::Disabled)
    }
}

impl From<bool> for Availability {
    fn from(enabled: bool) -> Self {
        if enabled {
            Availability::Enabled
        } else {
            Availability::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_schema() {
        let def = ToolDefinition::new("search", "Search the web");
        assert_eq!(def.parameters["type"], "object");

        let parsed: ToolDefinition = serde_json::from_str(r#"{"name":"bare"}"#).unwrap();
        assert_eq!(parsed.description, "");
        assert_eq!(parsed.parameters, def.parameters);
    }

    #[test]
    fn test_follow_up_defaults_to_true() {
        assert!(follows_up(None));
        assert!(follows_up(Some(true)));
        assert!(!follows_up(Some(false)));
    }

    #[test]
    fn test_legacy_availability_mapping() {
        assert_eq!(Availability::from_legacy(None, false), Availability::Enabled);
        assert_eq!(
            Availability::from_legacy(Some("disabled"), false),
            Availability::Disabled
        );
        assert_eq!(
            Availability::from_legacy(Some("remote"), false),
            Availability::Remote
        );
        assert_eq!(
            Availability::from_legacy(Some("remote"), true),
            Availability::Disabled
        );
        assert_eq!(
            Availability::from_legacy(Some("always"), false),
            Availability::Enabled
        );
    }

    #[test]
    fn test_boolean_availability_mapping() {
        assert_eq!(Availability::from(true), Availability::Enabled);
        assert_eq!(Availability::from(false), Availability::Disabled);
        assert!(Availability::Remote.is_enabled());
        assert!(!Availability::Disabled.is_enabled());
        assert_eq!(Availability::Frontend.as_legacy_str(), "frontend");
    }
}
