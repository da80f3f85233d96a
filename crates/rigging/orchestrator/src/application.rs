//! Application deployment stage
//!
//! Runs as its own process after provisioning. Everything it knows about the
//! infrastructure comes from the deployment context file.

use crate::control_plane::ControlPlane;
use crate::error::OrchestratorError;
use crate::handoff::load_context;
use crate::report::{ApplicationReport, RunFailure, Step, StepLog};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What to deploy and where the caller expects it to go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRequest {
    pub resource_group: String,
    pub region: String,
    pub extended_features: bool,
    /// Application package to publish
    pub package: PathBuf,
    /// Directory the context search starts from
    pub search_dir: PathBuf,
}

pub struct ApplicationDeployer {
    control_plane: Arc<dyn ControlPlane>,
}

impl ApplicationDeployer {
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    #[instrument(skip(self, request), fields(resource_group = %request.resource_group))]
    pub async fn deploy(
        &self,
        request: &ApplicationRequest,
    ) -> std::result::Result<ApplicationReport, RunFailure> {
        let mut steps = StepLog::default();

        // 1. Load the handoff
        let (context_path, context) =
            load_context(&request.search_dir).map_err(|e| RunFailure::new(Step::LoadContext, e))?;
        steps.completed_with(Step::LoadContext, context_path.display().to_string());

        // 2. Check it describes the requested environment
        if context.resource_group != request.resource_group {
            return Err(RunFailure::new(
                Step::VerifyResourceGroup,
                OrchestratorError::ContextMismatch(format!(
                    "context was written for {}, not {}",
                    context.resource_group, request.resource_group
                )),
            ));
        }
        let group = self
            .control_plane
            .get_resource_group(&request.resource_group)
            .await
            .map_err(|e| RunFailure::new(Step::VerifyResourceGroup, e))?
            .ok_or_else(|| {
                RunFailure::new(
                    Step::VerifyResourceGroup,
                    OrchestratorError::ContextMismatch(format!(
                        "resource group {} does not exist; provision it first",
                        request.resource_group
                    )),
                )
            })?;
        if !group.same_region(&request.region) {
            warn!(
                actual_region = %group.region,
                requested = %request.region,
                "Resource group is in a different region than requested"
            );
        }
        if context.deployed_gen_ai != request.extended_features {
            warn!(
                deployed = context.deployed_gen_ai,
                requested = request.extended_features,
                "Extended-feature flag differs from what was provisioned; using the provisioned set"
            );
        }
        steps.completed_with(Step::VerifyResourceGroup, group.region.clone());

        // 3. Publish
        if !request.package.is_file() {
            return Err(RunFailure::new(
                Step::PublishPackage,
                OrchestratorError::Configuration(format!(
                    "application package {} not found",
                    request.package.display()
                )),
            ));
        }
        self.control_plane
            .publish_package(&context.resource_group, &context.web_app_name, &request.package)
            .await
            .map_err(|e| RunFailure::new(Step::PublishPackage, e))?;
        steps.completed_with(Step::PublishPackage, context.web_app_name.clone());

        info!(
            app = %context.web_app_name,
            url = %format!("https://{}", context.web_app_hostname),
            "Application deployed"
        );

        Ok(ApplicationReport {
            resource_group: context.resource_group,
            web_app_name: context.web_app_name,
            web_app_hostname: context.web_app_hostname,
            context_path,
            package: request.package.clone(),
            steps,
        })
    }
}
