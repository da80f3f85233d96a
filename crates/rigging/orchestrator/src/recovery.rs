//! Policy-timing recovery
//!
//! Some policy evaluations on the control plane run asynchronously, so a
//! submission can come back empty or failed while the deployment itself goes
//! on to succeed. Recovery looks at the deployment history once, after a grace
//! period, instead of resubmitting.

use crate::config::OrchestratorConfig;
use crate::control_plane::ControlPlane;
use crate::error::Result;
use rigging_types::{DeploymentOutputs, DeploymentRecord};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A deployment found by reconciliation
#[derive(Debug, Clone)]
pub struct RecoveredDeployment {
    pub record: DeploymentRecord,
    pub outputs: DeploymentOutputs,
}

/// One-shot reconciliation against the deployment history
#[derive(Debug, Clone)]
pub struct PolicyTimingRecovery {
    grace_period: Duration,
    noise_prefixes: Vec<String>,
}

impl PolicyTimingRecovery {
    pub fn new(grace_period: Duration, noise_prefixes: Vec<String>) -> Self {
        Self {
            grace_period,
            noise_prefixes: noise_prefixes
                .into_iter()
                .map(|p| p.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.recovery_grace, config.noise_prefixes.clone())
    }

    /// Deployments the platform creates on its own (policy, anomaly rules)
    pub fn is_noise(&self, deployment_name: &str) -> bool {
        let name = deployment_name.to_ascii_lowercase();
        self.noise_prefixes.iter().any(|p| name.starts_with(p))
    }

    /// Most recent non-noise deployment in terminal success
    pub fn select<'a>(&self, records: &'a [DeploymentRecord]) -> Option<&'a DeploymentRecord> {
        records
            .iter()
            .filter(|r| !self.is_noise(&r.name))
            .filter(|r| r.status.is_terminal_success())
            .max_by_key(|r| r.timestamp)
    }

    /// Wait out the grace period, then look for a successful deployment.
    ///
    /// `Ok(None)` means nothing qualified; the caller treats that as fatal.
    #[instrument(skip(self, control_plane), fields(grace_secs = self.grace_period.as_secs()))]
    pub async fn reconcile(
        &self,
        control_plane: &dyn ControlPlane,
        resource_group: &str,
        submitted_name: &str,
    ) -> Result<Option<RecoveredDeployment>> {
        if !self.grace_period.is_zero() {
            info!("Waiting for asynchronous policy evaluation to settle");
            tokio::time::sleep(self.grace_period).await;
        }

        let records = control_plane.list_deployments(resource_group).await?;
        let Some(record) = self.select(&records) else {
            warn!(
                candidates = records.len(),
                "No successful deployment found during reconciliation"
            );
            return Ok(None);
        };

        if record.name != submitted_name {
            warn!(
                selected = %record.name,
                submitted = %submitted_name,
                "Reconciled onto a different deployment than the one just submitted"
            );
        }

        let document = control_plane
            .deployment_outputs(resource_group, &record.name)
            .await?;
        info!(deployment = %record.name, "Recovered successful deployment");

        Ok(Some(RecoveredDeployment {
            record: record.clone(),
            outputs: DeploymentOutputs::from_template_json(&document),
        }))
    }
}
