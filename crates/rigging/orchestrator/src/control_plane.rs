//! Control plane seam
//!
//! Everything the orchestrator asks of the cloud provider goes through this
//! trait. The CLI backs it with the provider's command-line tool; tests use
//! [`crate::memory::InMemoryControlPlane`].

use crate::error::Result;
use async_trait::async_trait;
use rigging_types::{
    AppSettingKey, ConnectionStringKey, DeploymentParameters, DeploymentRecord, ExecutionPlan,
    ResourceGroup, SettingsBatch,
};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Identity of the authenticated operator session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInUser {
    /// Directory object id
    pub id: String,
    /// Sign-in name
    pub name: String,
}

/// Everything needed to submit one deployment
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    /// Target resource group
    pub resource_group: String,
    /// Name of this attempt in the deployment history
    pub deployment_name: String,
    /// Template entry point
    pub template_path: PathBuf,
    /// Compiled module order
    pub plan: ExecutionPlan,
    /// Template parameters
    pub parameters: DeploymentParameters,
}

/// Immediate answer to a submission
#[derive(Debug, Clone)]
pub enum SubmissionOutcome {
    /// Terminal success with the template's output document
    Completed { outputs: serde_json::Value },
    /// The call returned nothing usable
    Empty,
    /// The call reported failure; policy evaluation may still be converging
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
}

/// Single-range firewall rule on the database server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    pub name: String,
    pub start: IpAddr,
    pub end: IpAddr,
}

/// Control-plane operations used by the pipelines
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Currently authenticated user, if any
    async fn signed_in_user(&self) -> Result<Option<SignedInUser>>;

    /// Look up a resource group
    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>>;

    /// Create a resource group
    async fn create_resource_group(&self, group: &ResourceGroup) -> Result<()>;

    /// Submit a deployment and block until the call returns
    async fn submit_deployment(&self, request: &DeploymentRequest) -> Result<SubmissionOutcome>;

    /// Deployment history of a resource group
    async fn list_deployments(&self, resource_group: &str) -> Result<Vec<DeploymentRecord>>;

    /// Output document of a past deployment
    async fn deployment_outputs(
        &self,
        resource_group: &str,
        deployment_name: &str,
    ) -> Result<serde_json::Value>;

    /// Open a firewall range on a database server
    async fn create_firewall_rule(
        &self,
        resource_group: &str,
        server_name: &str,
        rule: &FirewallRule,
    ) -> Result<()>;

    /// Push a batch to the compute resource's connection-string store
    async fn set_connection_strings(
        &self,
        resource_group: &str,
        app_name: &str,
        batch: &SettingsBatch<ConnectionStringKey>,
    ) -> Result<()>;

    /// Push a batch to the compute resource's key/value settings store
    async fn set_app_settings(
        &self,
        resource_group: &str,
        app_name: &str,
        batch: &SettingsBatch<AppSettingKey>,
    ) -> Result<()>;

    /// Publish an application package to the compute resource
    async fn publish_package(
        &self,
        resource_group: &str,
        app_name: &str,
        package: &Path,
    ) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
