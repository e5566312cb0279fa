//! Merge tool definitions from a server file and a client file.

use std::fs;
use std::path::Path;

use anyhow::Context;
use copilotkit_core::ToolDefinition;
use copilotkit_tools::{merge_server_side_tools, process_actions_for_runtime_request, LegacyAction};
use serde::de::DeserializeOwned;

pub fn run(server: &Path, client: Option<&Path>, legacy_client: bool) -> anyhow::Result<()> {
    let merged = merge_files(server, client, legacy_client)?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

/// Read both files and merge them, server first.
pub fn merge_files(
    server: &Path,
    client: Option<&Path>,
    legacy_client: bool,
) -> anyhow::Result<Vec<ToolDefinition>> {
    let server_tools: Vec<ToolDefinition> = read_json(server)?;

    let client_tools = match client {
        Some(path) if legacy_client => {
            let actions: Vec<LegacyAction> = read_json(path)?;
            let inputs = process_actions_for_runtime_request(&actions);
            tracing::debug!(
                actions = actions.len(),
                kept = inputs.len(),
                "Processed legacy client actions"
            );
            Some(inputs.into_iter().map(|a| a.into_definition()).collect::<Vec<_>>())
        }
        Some(path) => Some(read_json::<Vec<ToolDefinition>>(path)?),
        None => None,
    };

    Ok(merge_server_side_tools(&server_tools, client_tools.as_deref()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_merge_server_and_client_files() {
        let server = json_file(r#"[{"name":"a","description":"server"}]"#);
        let client = json_file(r#"[{"name":"a","description":"client"},{"name":"b"}]"#);

        let merged = merge_files(server.path(), Some(client.path()), false).unwrap();

        let names: Vec<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(merged[0].description, "server");
    }

    #[test]
    fn test_server_only() {
        let server = json_file(r#"[{"name":"a"},{"name":"b"}]"#);
        let merged = merge_files(server.path(), None, false).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_legacy_client_actions_are_filtered() {
        let server = json_file(r#"[{"name":"search"}]"#);
        let client = json_file(
            r#"[
                {"name":"search","description":"client copy"},
                {"name":"notify","parameters":{"type":"object","properties":{"text":{"type":"string"}}}},
                {"name":"hidden","available":"disabled"},
                {"name":"local","available":"frontend"},
                {"name":"*"}
            ]"#,
        );

        let merged = merge_files(server.path(), Some(client.path()), true).unwrap();

        let names: Vec<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search", "notify"]);
        assert_eq!(merged[1].parameters["properties"]["text"]["type"], "string");
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let server = json_file("not json");
        let err = merge_files(server.path(), None, false).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }
}
