//! Context lookup from a relative working directory.
//!
//! Kept in its own test binary because it changes the process working
//! directory.

use rigging_orchestrator::{load_context, ContextEmitter};
use rigging_types::{DeploymentContext, DeploymentOutputs, OutputName, CONTEXT_FILE_NAME};
use std::path::Path;

fn context() -> DeploymentContext {
    let outputs = DeploymentOutputs::from_pairs([
        (OutputName::WebAppName, "app-expenses"),
        (OutputName::WebAppHostname, "app-expenses.azurewebsites.net"),
        (OutputName::SqlServerFqdn, "sql-expenses.database.windows.net"),
        (OutputName::DatabaseName, "Northwind"),
        (
            OutputName::ManagedIdentityClientId,
            "12345678-1234-1234-1234-123456789012",
        ),
        (OutputName::ManagedIdentityName, "mid-expenses"),
        (OutputName::AppInsightsConnectionString, "InstrumentationKey=abc"),
    ]);
    DeploymentContext::from_outputs("rg-expenses", &outputs, false).unwrap()
}

#[test]
fn test_dot_inside_subfolder_finds_parent_context() {
    let dir = tempfile::tempdir().unwrap();
    ContextEmitter::new(dir.path()).emit(&context()).unwrap();
    let sub = dir.path().join("src");
    std::fs::create_dir(&sub).unwrap();

    std::env::set_current_dir(&sub).unwrap();
    let (found, loaded) = load_context(Path::new(".")).unwrap();

    assert_eq!(
        found.canonicalize().unwrap(),
        dir.path().join(CONTEXT_FILE_NAME).canonicalize().unwrap()
    );
    assert_eq!(loaded.resource_group, "rg-expenses");
}
