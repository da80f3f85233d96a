//! Control plane backed by the `az` command-line tool

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rigging_orchestrator::{
    ControlPlane, DeploymentRequest, FirewallRule, OrchestratorError, Result, SignedInUser,
    SubmissionOutcome,
};
use rigging_types::{
    AppSettingKey, ConnectionStringKey, DeploymentRecord, ProvisioningState, ResourceGroup,
    SettingsBatch,
};
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Captured result of one `az` invocation
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// `az` adapter
pub struct AzCli {
    program: String,
}

impl AzCli {
    pub fn new() -> Self {
        Self {
            program: "az".to_string(),
        }
    }

    async fn run(&self, operation: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(operation, args = ?args, "Invoking az");
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                OrchestratorError::control_plane(operation, format!("cannot run az: {}", e))
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run and require a zero exit
    async fn run_checked(&self, operation: &str, args: &[String]) -> Result<CommandOutput> {
        let output = self.run(operation, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(OrchestratorError::control_plane(
                operation,
                output.stderr.trim().to_string(),
            ))
        }
    }
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new()
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// `{id, name}` document of the signed-in user
pub fn parse_signed_in_user(stdout: &str) -> Result<Option<SignedInUser>> {
    #[derive(Deserialize)]
    struct Raw {
        id: Option<String>,
        name: Option<String>,
    }

    if stdout.trim().is_empty() {
        return Ok(None);
    }
    let raw: Raw = serde_json::from_str(stdout)?;
    Ok(match (raw.id, raw.name) {
        (Some(id), Some(name)) if !id.is_empty() => Some(SignedInUser { id, name }),
        (Some(id), _) if !id.is_empty() => Some(SignedInUser {
            name: id.clone(),
            id,
        }),
        _ => None,
    })
}

/// `az group show` document
pub fn parse_resource_group(stdout: &str) -> Result<ResourceGroup> {
    #[derive(Deserialize)]
    struct Raw {
        name: String,
        location: String,
    }

    let raw: Raw = serde_json::from_str(stdout)?;
    Ok(ResourceGroup::new(raw.name, raw.location))
}

/// Whether `az group show` failed because the group does not exist
pub fn is_not_found(stderr: &str) -> bool {
    stderr.contains("ResourceGroupNotFound") || stderr.contains("could not be found")
}

/// Projected `az deployment group list` output; entries without a timestamp are dropped
pub fn parse_deployment_list(stdout: &str) -> Result<Vec<DeploymentRecord>> {
    #[derive(Deserialize)]
    struct Raw {
        name: String,
        status: Option<String>,
        timestamp: Option<DateTime<Utc>>,
    }

    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<Raw> = serde_json::from_str(stdout)?;
    Ok(raw
        .into_iter()
        .filter_map(|r| {
            Some(DeploymentRecord {
                timestamp: r.timestamp?,
                status: ProvisioningState::from(r.status.unwrap_or_default()),
                name: r.name,
            })
        })
        .collect())
}

/// Classify the answer to `az deployment group create`
pub fn parse_submission(output: &CommandOutput) -> SubmissionOutcome {
    if !output.success() {
        return SubmissionOutcome::Failed {
            exit_code: output.exit_code,
            message: output.stderr.trim().to_string(),
        };
    }

    match serde_json::from_str::<serde_json::Value>(output.stdout.trim()) {
        Ok(serde_json::Value::Object(map)) if !map.is_empty() => SubmissionOutcome::Completed {
            outputs: serde_json::Value::Object(map),
        },
        _ => SubmissionOutcome::Empty,
    }
}

fn deployment_args(request: &DeploymentRequest) -> Vec<String> {
    let mut list = args([
        "deployment",
        "group",
        "create",
        "--resource-group",
        &request.resource_group,
        "--name",
        &request.deployment_name,
        "--template-file",
        &*request.template_path.to_string_lossy(),
        "--query",
        "properties.outputs",
        "--output",
        "json",
        "--parameters",
    ]);
    list.extend(
        request
            .parameters
            .to_template_pairs()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v)),
    );
    list
}

#[async_trait]
impl ControlPlane for AzCli {
    async fn signed_in_user(&self) -> Result<Option<SignedInUser>> {
        let output = self
            .run(
                "signed_in_user",
                &args([
                    "ad",
                    "signed-in-user",
                    "show",
                    "--query",
                    "{id:id, name:userPrincipalName}",
                    "--output",
                    "json",
                ]),
            )
            .await?;
        if !output.success() {
            debug!(stderr = %output.stderr.trim(), "No signed-in user");
            return Ok(None);
        }
        parse_signed_in_user(&output.stdout)
    }

    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>> {
        let output = self
            .run(
                "get_resource_group",
                &args(["group", "show", "--name", name, "--output", "json"]),
            )
            .await?;
        if output.success() {
            return parse_resource_group(&output.stdout).map(Some);
        }
        if is_not_found(&output.stderr) {
            return Ok(None);
        }
        Err(OrchestratorError::control_plane(
            "get_resource_group",
            output.stderr.trim().to_string(),
        ))
    }

    async fn create_resource_group(&self, group: &ResourceGroup) -> Result<()> {
        self.run_checked(
            "create_resource_group",
            &args([
                "group",
                "create",
                "--name",
                &group.name,
                "--location",
                &group.region,
                "--output",
                "none",
            ]),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(deployment = %request.deployment_name))]
    async fn submit_deployment(&self, request: &DeploymentRequest) -> Result<SubmissionOutcome> {
        debug!(plan = ?request.plan.names(), "Module order");
        let output = self
            .run("submit_deployment", &deployment_args(request))
            .await?;
        Ok(parse_submission(&output))
    }

    async fn list_deployments(&self, resource_group: &str) -> Result<Vec<DeploymentRecord>> {
        let output = self
            .run_checked(
                "list_deployments",
                &args([
                    "deployment",
                    "group",
                    "list",
                    "--resource-group",
                    resource_group,
                    "--query",
                    "[].{name:name, status:properties.provisioningState, timestamp:properties.timestamp}",
                    "--output",
                    "json",
                ]),
            )
            .await?;
        parse_deployment_list(&output.stdout)
    }

    async fn deployment_outputs(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<serde_json::Value> {
        let output = self
            .run_checked(
                "deployment_outputs",
                &args([
                    "deployment",
                    "group",
                    "show",
                    "--resource-group",
                    resource_group,
                    "--name",
                    deployment_name,
                    "--query",
                    "properties.outputs",
                    "--output",
                    "json",
                ]),
            )
            .await?;
        if output.stdout.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&output.stdout)?)
    }

    async fn create_firewall_rule(
        &self,
        resource_group: &str,
        server_name: &str,
        rule: &FirewallRule,
    ) -> Result<()> {
        self.run_checked(
            "create_firewall_rule",
            &args([
                "sql",
                "server",
                "firewall-rule",
                "create",
                "--resource-group",
                resource_group,
                "--server",
                server_name,
                "--name",
                &rule.name,
                "--start-ip-address",
                &rule.start.to_string(),
                "--end-ip-address",
                &rule.end.to_string(),
                "--output",
                "none",
            ]),
        )
        .await?;
        Ok(())
    }

    async fn set_connection_strings(
        &self,
        resource_group: &str,
        app_name: &str,
        batch: &SettingsBatch<ConnectionStringKey>,
    ) -> Result<()> {
        let mut list = args([
            "webapp",
            "config",
            "connection-string",
            "set",
            "--resource-group",
            resource_group,
            "--name",
            app_name,
            "--connection-string-type",
            "SQLAzure",
            "--output",
            "none",
            "--settings",
        ]);
        list.extend(batch.to_assignments());
        self.run_checked("set_connection_strings", &list).await?;
        Ok(())
    }

    async fn set_app_settings(
        &self,
        resource_group: &str,
        app_name: &str,
        batch: &SettingsBatch<AppSettingKey>,
    ) -> Result<()> {
        let mut list = args([
            "webapp",
            "config",
            "appsettings",
            "set",
            "--resource-group",
            resource_group,
            "--name",
            app_name,
            "--output",
            "none",
            "--settings",
        ]);
        list.extend(batch.to_assignments());
        self.run_checked("set_app_settings", &list).await?;
        Ok(())
    }

    async fn publish_package(
        &self,
        resource_group: &str,
        app_name: &str,
        package: &Path,
    ) -> Result<()> {
        self.run_checked(
            "publish_package",
            &args([
                "webapp",
                "deploy",
                "--resource-group",
                resource_group,
                "--name",
                app_name,
                "--src-path",
                &*package.to_string_lossy(),
                "--type",
                "zip",
                "--output",
                "none",
            ]),
        )
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "az"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rigging_orchestrator::{standard_graph, DependencyGraphCompiler};
    use rigging_types::{DeploymentParameters, RunContext};

    fn output(exit_code: i32, stdout: &str, stderr: &str) -> CommandOutput {
        CommandOutput {
            exit_code: Some(exit_code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn test_parse_signed_in_user() {
        let user = parse_signed_in_user(r#"{"id": "abc", "name": "ops@contoso.com"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(user.id, "abc");
        assert_eq!(user.name, "ops@contoso.com");

        assert!(parse_signed_in_user("").unwrap().is_none());
        assert!(parse_signed_in_user(r#"{"id": null, "name": null}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_parse_resource_group() {
        let group =
            parse_resource_group(r#"{"name": "rg-expenses", "location": "eastus", "tags": null}"#)
                .unwrap();
        assert_eq!(group, ResourceGroup::new("rg-expenses", "eastus"));
        assert!(is_not_found(
            "ERROR: (ResourceGroupNotFound) Resource group 'rg' could not be found."
        ));
    }

    #[test]
    fn test_parse_deployment_list() {
        let records = parse_deployment_list(
            r#"[
                {"name": "expensemgmt-20260301120000", "status": "Succeeded", "timestamp": "2026-03-01T12:04:11.5+00:00"},
                {"name": "PolicyDeployment_1", "status": "Failed", "timestamp": "2026-03-01T12:05:00Z"},
                {"name": "no-timestamp", "status": "Running", "timestamp": null}
            ]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, ProvisioningState::Succeeded);
        assert_eq!(records[1].status, ProvisioningState::Failed);
    }

    #[test]
    fn test_submission_classification() {
        let completed = parse_submission(&output(
            0,
            r#"{"webAppName": {"type": "String", "value": "app-x"}}"#,
            "",
        ));
        assert!(matches!(completed, SubmissionOutcome::Completed { .. }));

        assert!(matches!(
            parse_submission(&output(0, "", "")),
            SubmissionOutcome::Empty
        ));
        assert!(matches!(
            parse_submission(&output(0, "null", "")),
            SubmissionOutcome::Empty
        ));

        match parse_submission(&output(1, "", "ERROR: RequestDisallowedByPolicy\n")) {
            SubmissionOutcome::Failed { exit_code, message } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(message, "ERROR: RequestDisallowedByPolicy");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_deployment_args_carry_parameters() {
        let run = RunContext::automated("cid", "pipeline");
        let request = DeploymentRequest {
            resource_group: "rg".into(),
            deployment_name: "expensemgmt-1".into(),
            template_path: "infra/main.bicep".into(),
            plan: DependencyGraphCompiler::new()
                .compile(&standard_graph(false))
                .unwrap(),
            parameters: DeploymentParameters::new("eastus", "expensemgmt", &run, false),
        };

        let list = deployment_args(&request);
        let params = list.iter().position(|a| a == "--parameters").unwrap();
        assert!(list[params + 1..].contains(&"adminPrincipalType=Application".to_string()));
        assert!(list[params + 1..].contains(&"deployGenAI=false".to_string()));
        assert!(list.contains(&"infra/main.bicep".to_string()));
    }
}
