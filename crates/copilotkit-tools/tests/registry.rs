//! Registry behaviour across threads and through trait objects.

use std::sync::Arc;
use std::thread;

use copilotkit_core::{Availability, ToolDefinition};
use copilotkit_tools::{
    flatten_tools_no_duplicates, merge_server_side_tools, process_actions_for_runtime_request,
    FrontendTool, InMemoryToolRegistry, LegacyAction, ToolLookup, ToolRegistry,
};

#[test]
fn test_concurrent_upserts_last_write_wins() {
    let registry: Arc<dyn ToolRegistry> = Arc::new(InMemoryToolRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for round in 0..50 {
                    registry.upsert(FrontendTool::new("shared", format!("{}-{}", i, round)));
                    registry.upsert(FrontendTool::new(format!("own-{}", i), ""));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let tools = registry.tools();
    assert_eq!(tools.len(), 9);
    assert_eq!(tools.iter().filter(|t| t.name() == "shared").count(), 1);
    assert!(registry
        .get("shared", None)
        .unwrap()
        .definition
        .description
        .ends_with("-49"));
}

#[test]
fn test_snapshot_taken_while_writers_run_is_consistent() {
    let registry = Arc::new(InMemoryToolRegistry::with_tools([FrontendTool::new("base", "")]));

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for i in 0..200 {
                registry.upsert(FrontendTool::new(format!("tool-{}", i), ""));
            }
        })
    };

    let snapshot = registry.snapshot();
    let seen = snapshot.tools().len();
    writer.join().unwrap();

    assert!(snapshot.get("base", None).is_some());
    assert_eq!(snapshot.tools().len(), seen);
    assert_eq!(registry.len(), 201);
}

#[test]
fn test_registry_feeds_merger() {
    let registry = InMemoryToolRegistry::with_tools([
        FrontendTool::new("search", "client"),
        FrontendTool::new("render_chart", "client"),
        FrontendTool::new("retired", "").with_availability(Availability::Disabled),
    ]);
    let server = vec![ToolDefinition::new("search", "server")];

    let client = registry.definitions_for(None);
    let merged = merge_server_side_tools(&server, Some(&client));

    let names: Vec<&str> = merged.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["search", "render_chart"]);
    assert_eq!(merged[0].description, "server");
}

#[test]
fn test_legacy_and_current_clients_fold_together() {
    let legacy = process_actions_for_runtime_request(&[
        LegacyAction::new("notify"),
        LegacyAction {
            available: Some("frontend".into()),
            ..LegacyAction::new("confirm")
        },
    ]);
    let legacy: Vec<ToolDefinition> = legacy.into_iter().map(|a| a.into_definition()).collect();
    let current = vec![ToolDefinition::new("notify", "newer"), ToolDefinition::new("plan", "")];

    let flat = flatten_tools_no_duplicates(current.iter().chain(&legacy));

    let names: Vec<&str> = flat.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["notify", "plan"]);
    assert_eq!(flat[0].description, "newer");
}
