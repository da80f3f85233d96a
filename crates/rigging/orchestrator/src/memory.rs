//! In-memory collaborators for development, dry runs and tests

use crate::control_plane::{
    ControlPlane, DeploymentRequest, FirewallRule, SignedInUser, SubmissionOutcome,
};
use crate::error::{OrchestratorError, Result};
use crate::network::AddressLookup;
use crate::scripts::{ScriptInvocation, ScriptRunner};
use async_trait::async_trait;
use parking_lot::Mutex;
use rigging_types::{
    AppSettingKey, ConnectionStringKey, DeploymentParameters, DeploymentRecord, ProvisioningState,
    ResourceGroup, SettingsBatch,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Every call made against [`InMemoryControlPlane`], in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlPlaneCall {
    SignedInUser,
    GetResourceGroup(String),
    CreateResourceGroup(ResourceGroup),
    SubmitDeployment {
        resource_group: String,
        deployment_name: String,
        plan: Vec<String>,
        parameters: DeploymentParameters,
    },
    ListDeployments(String),
    DeploymentOutputs {
        resource_group: String,
        deployment_name: String,
    },
    CreateFirewallRule {
        resource_group: String,
        server_name: String,
        rule: FirewallRule,
    },
    SetConnectionStrings {
        resource_group: String,
        app_name: String,
        assignments: Vec<String>,
    },
    SetAppSettings {
        resource_group: String,
        app_name: String,
        assignments: Vec<String>,
    },
    PublishPackage {
        resource_group: String,
        app_name: String,
        package: PathBuf,
    },
}

impl ControlPlaneCall {
    /// Operation name, matching the trait method
    pub fn operation(&self) -> &'static str {
        match self {
            ControlPlaneCall::SignedInUser => "signed_in_user",
            ControlPlaneCall::GetResourceGroup(_) => "get_resource_group",
            ControlPlaneCall::CreateResourceGroup(_) => "create_resource_group",
            ControlPlaneCall::SubmitDeployment { .. } => "submit_deployment",
            ControlPlaneCall::ListDeployments(_) => "list_deployments",
            ControlPlaneCall::DeploymentOutputs { .. } => "deployment_outputs",
            ControlPlaneCall::CreateFirewallRule { .. } => "create_firewall_rule",
            ControlPlaneCall::SetConnectionStrings { .. } => "set_connection_strings",
            ControlPlaneCall::SetAppSettings { .. } => "set_app_settings",
            ControlPlaneCall::PublishPackage { .. } => "publish_package",
        }
    }
}

struct HistoryEntry {
    record: DeploymentRecord,
    outputs: serde_json::Value,
}

/// Control plane simulated in memory.
///
/// Submissions pop scripted outcomes first; once the script is exhausted every
/// submission completes with outputs derived from its parameters and is added
/// to the resource group's history.
pub struct InMemoryControlPlane {
    signed_in_user: Option<SignedInUser>,
    groups: Mutex<BTreeMap<String, ResourceGroup>>,
    scripted: Mutex<VecDeque<SubmissionOutcome>>,
    history: Mutex<BTreeMap<String, Vec<HistoryEntry>>>,
    failing: BTreeSet<&'static str>,
    calls: Mutex<Vec<ControlPlaneCall>>,
}

impl InMemoryControlPlane {
    pub fn new() -> Self {
        Self {
            signed_in_user: None,
            groups: Mutex::new(BTreeMap::new()),
            scripted: Mutex::new(VecDeque::new()),
            history: Mutex::new(BTreeMap::new()),
            failing: BTreeSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_signed_in_user(mut self, user: SignedInUser) -> Self {
        self.signed_in_user = Some(user);
        self
    }

    pub fn with_resource_group(self, group: ResourceGroup) -> Self {
        self.groups.lock().insert(group.name.clone(), group);
        self
    }

    /// Queue the answer for the next submission
    pub fn with_submission_outcome(self, outcome: SubmissionOutcome) -> Self {
        self.scripted.lock().push_back(outcome);
        self
    }

    /// Seed the deployment history of a resource group
    pub fn with_history_entry(
        self,
        resource_group: &str,
        record: DeploymentRecord,
        outputs: serde_json::Value,
    ) -> Self {
        self.history
            .lock()
            .entry(resource_group.to_string())
            .or_default()
            .push(HistoryEntry { record, outputs });
        self
    }

    /// Make an operation (trait method name) return a control-plane error
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<ControlPlaneCall> {
        self.calls.lock().clone()
    }

    /// Calls of one operation
    pub fn calls_to(&self, operation: &str) -> Vec<ControlPlaneCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.operation() == operation)
            .cloned()
            .collect()
    }

    pub fn resource_group(&self, name: &str) -> Option<ResourceGroup> {
        self.groups.lock().get(name).cloned()
    }

    fn record(&self, call: ControlPlaneCall) -> Result<()> {
        let operation = call.operation();
        self.calls.lock().push(call);
        if self.failing.contains(operation) {
            return Err(OrchestratorError::control_plane(
                operation,
                "simulated failure",
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

/// Output document a real template would produce for `parameters`
pub fn simulated_outputs(parameters: &DeploymentParameters) -> serde_json::Value {
    let base = &parameters.base_name;
    let mut outputs = json!({
        "webAppName": { "type": "String", "value": format!("app-{}", base) },
        "webAppHostname": { "type": "String", "value": format!("app-{}.azurewebsites.net", base) },
        "sqlServerFqdn": { "type": "String", "value": format!("sql-{}.database.windows.net", base) },
        "databaseName": { "type": "String", "value": "Northwind" },
        "managedIdentityClientId": { "type": "String", "value": "12345678-1234-1234-1234-123456789012" },
        "managedIdentityPrincipalId": { "type": "String", "value": "87654321-4321-4321-4321-210987654321" },
        "managedIdentityName": { "type": "String", "value": format!("mid-{}", base) },
        "appInsightsConnectionString": {
            "type": "String",
            "value": "InstrumentationKey=00000000-0000-0000-0000-000000000000;IngestionEndpoint=https://eastus-0.in.applicationinsights.azure.com/"
        }
    });

    if parameters.enable_extended_features {
        if let Some(map) = outputs.as_object_mut() {
            map.insert(
                "openAIEndpoint".into(),
                json!({ "type": "String", "value": format!("https://oai-{}.openai.azure.com/", base) }),
            );
            map.insert(
                "openAIModelName".into(),
                json!({ "type": "String", "value": "gpt-4o" }),
            );
            map.insert(
                "searchEndpoint".into(),
                json!({ "type": "String", "value": format!("https://srch-{}.search.windows.net", base) }),
            );
        }
    }

    outputs
}

#[async_trait]
impl ControlPlane for InMemoryControlPlane {
    async fn signed_in_user(&self) -> Result<Option<SignedInUser>> {
        self.record(ControlPlaneCall::SignedInUser)?;
        Ok(self.signed_in_user.clone())
    }

    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>> {
        self.record(ControlPlaneCall::GetResourceGroup(name.to_string()))?;
        Ok(self.resource_group(name))
    }

    async fn create_resource_group(&self, group: &ResourceGroup) -> Result<()> {
        self.record(ControlPlaneCall::CreateResourceGroup(group.clone()))?;
        self.groups
            .lock()
            .entry(group.name.clone())
            .or_insert_with(|| group.clone());
        Ok(())
    }

    async fn submit_deployment(&self, request: &DeploymentRequest) -> Result<SubmissionOutcome> {
        self.record(ControlPlaneCall::SubmitDeployment {
            resource_group: request.resource_group.clone(),
            deployment_name: request.deployment_name.clone(),
            plan: request.plan.names().iter().map(|n| n.to_string()).collect(),
            parameters: request.parameters.clone(),
        })?;

        if let Some(outcome) = self.scripted.lock().pop_front() {
            return Ok(outcome);
        }

        let outputs = simulated_outputs(&request.parameters);
        self.history
            .lock()
            .entry(request.resource_group.clone())
            .or_default()
            .push(HistoryEntry {
                record: DeploymentRecord {
                    name: request.deployment_name.clone(),
                    status: ProvisioningState::Succeeded,
                    timestamp: chrono::Utc::now(),
                },
                outputs: outputs.clone(),
            });
        Ok(SubmissionOutcome::Completed { outputs })
    }

    async fn list_deployments(&self, resource_group: &str) -> Result<Vec<DeploymentRecord>> {
        self.record(ControlPlaneCall::ListDeployments(resource_group.to_string()))?;
        Ok(self
            .history
            .lock()
            .get(resource_group)
            .map(|entries| entries.iter().map(|e| e.record.clone()).collect())
            .unwrap_or_default())
    }

    async fn deployment_outputs(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<serde_json::Value> {
        self.record(ControlPlaneCall::DeploymentOutputs {
            resource_group: resource_group.to_string(),
            deployment_name: deployment_name.to_string(),
        })?;
        self.history
            .lock()
            .get(resource_group)
            .and_then(|entries| {
                entries
                    .iter()
                    .rev()
                    .find(|e| e.record.name == deployment_name)
                    .map(|e| e.outputs.clone())
            })
            .ok_or_else(|| {
                OrchestratorError::control_plane(
                    "deployment_outputs",
                    format!("deployment {} not found", deployment_name),
                )
            })
    }

    async fn create_firewall_rule(
        &self,
        resource_group: &str,
        server_name: &str,
        rule: &FirewallRule,
    ) -> Result<()> {
        self.record(ControlPlaneCall::CreateFirewallRule {
            resource_group: resource_group.to_string(),
            server_name: server_name.to_string(),
            rule: rule.clone(),
        })
    }

    async fn set_connection_strings(
        &self,
        resource_group: &str,
        app_name: &str,
        batch: &SettingsBatch<ConnectionStringKey>,
    ) -> Result<()> {
        self.record(ControlPlaneCall::SetConnectionStrings {
            resource_group: resource_group.to_string(),
            app_name: app_name.to_string(),
            assignments: batch.to_assignments(),
        })
    }

    async fn set_app_settings(
        &self,
        resource_group: &str,
        app_name: &str,
        batch: &SettingsBatch<AppSettingKey>,
    ) -> Result<()> {
        self.record(ControlPlaneCall::SetAppSettings {
            resource_group: resource_group.to_string(),
            app_name: app_name.to_string(),
            assignments: batch.to_assignments(),
        })
    }

    async fn publish_package(
        &self,
        resource_group: &str,
        app_name: &str,
        package: &Path,
    ) -> Result<()> {
        self.record(ControlPlaneCall::PublishPackage {
            resource_group: resource_group.to_string(),
            app_name: app_name.to_string(),
            package: package.to_path_buf(),
        })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// What a [`RecordingScriptRunner`] saw for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedScript {
    pub invocation: ScriptInvocation,
    /// Whether the path existed when the runner was called
    pub existed: bool,
    /// File content at call time
    pub content: String,
}

/// Script runner that reads the file it is handed and reports a fixed exit code
pub struct RecordingScriptRunner {
    exit_code: i32,
    runs: Mutex<Vec<RecordedScript>>,
}

impl RecordingScriptRunner {
    pub fn new() -> Self {
        Self::with_exit_code(0)
    }

    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<RecordedScript> {
        self.runs.lock().clone()
    }
}

impl Default for RecordingScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptRunner for RecordingScriptRunner {
    async fn run(&self, invocation: &ScriptInvocation) -> Result<i32> {
        let existed = invocation.script_path.is_file();
        let content = std::fs::read_to_string(&invocation.script_path).unwrap_or_default();
        self.runs.lock().push(RecordedScript {
            invocation: invocation.clone(),
            existed,
            content,
        });
        Ok(self.exit_code)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Address lookup with a fixed answer
pub struct StaticAddressLookup {
    address: Option<IpAddr>,
}

impl StaticAddressLookup {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address: Some(address),
        }
    }

    /// Lookup that always fails
    pub fn unreachable() -> Self {
        Self { address: None }
    }
}

#[async_trait]
impl AddressLookup for StaticAddressLookup {
    async fn public_address(&self) -> Result<IpAddr> {
        self.address.ok_or_else(|| {
            OrchestratorError::control_plane("public_address", "lookup service unreachable")
        })
    }
}
