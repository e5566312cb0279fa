//! Combining tool definitions from several sources.

use std::collections::HashSet;

use copilotkit_core::ToolDefinition;
use tracing::debug;

/// Merge server-declared and client-declared tools.
///
/// Server tools come first in their given order, followed by every client tool
/// whose name is not already declared by the server. Colliding client tools are
/// dropped untouched.
pub fn merge_server_side_tools(
    server: &[ToolDefinition],
    client: Option<&[ToolDefinition]>,
) -> Vec<ToolDefinition> {
    let client = match client {
        Some(client) if !client.is_empty() => client,
        _ => return server.to_vec(),
    };

    let server_names: HashSet<&str> = server.iter().map(|t| t.name.as_str()).collect();
    let mut merged = server.to_vec();

    for tool in client {
        if server_names.contains(tool.name.as_str()) {
            debug!(tool = %tool.name, "Client tool shadowed by server tool");
            continue;
        }
        merged.push(tool.clone());
    }

    merged
}

/// Flatten tool lists given in priority order, keeping the first tool of each name.
pub fn flatten_tools_no_duplicates<'a, I>(tools_by_priority: I) -> Vec<ToolDefinition>
where
    I: IntoIterator<Item = &'a ToolDefinition>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    tools_by_priority
        .into_iter()
        .filter(|t| seen.insert(t.name.as_str()))
        .cloned()
        .collect()
}
