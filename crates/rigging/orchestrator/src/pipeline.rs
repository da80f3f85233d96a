//! Provisioning pipeline
//!
//! Runs the provisioning steps strictly in sequence. Each step feeds the next,
//! and a fatal failure stops the run with the name of the step that failed.
//! Best-effort steps (network access, principal binding, script import) only
//! degrade the run.

use crate::compiler::{standard_graph, DependencyGraphCompiler};
use crate::config::OrchestratorConfig;
use crate::configuration::ConfigurationWriter;
use crate::control_plane::{ControlPlane, DeploymentRequest};
use crate::credentials::CredentialResolver;
use crate::environment::{EnvSource, EnvironmentDetector};
use crate::executor::{DeploymentExecutor, ExecutionReport};
use crate::handoff::ContextEmitter;
use crate::identity::PrincipalBinder;
use crate::network::{AddressLookup, NetworkAccess, NetworkAccessConfigurer};
use crate::readiness::ReadinessWaiter;
use crate::recovery::PolicyTimingRecovery;
use crate::report::{ProvisionReport, RunFailure, Step, StepLog};
use crate::resource_group::{ensure_resource_group, EnsureOutcome};
use crate::scripts::{
    discover_scripts, ScriptImporter, ScriptKind, ScriptRunner, ScriptTarget, SqlAuthMethod,
};
use chrono::{DateTime, Utc};
use rigging_types::{
    DeploymentContext, DeploymentParameters, OutputName, ResourceGroup, RunContext,
    WorkloadIdentity,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Default resource-name prefix
pub const DEFAULT_BASE_NAME: &str = "expensemgmt";

/// What to provision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub resource_group: String,
    pub region: String,
    pub base_name: String,
    pub extended_features: bool,
}

impl ProvisionRequest {
    pub fn new(resource_group: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            region: region.into(),
            base_name: DEFAULT_BASE_NAME.to_string(),
            extended_features: false,
        }
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn with_extended_features(mut self, enabled: bool) -> Self {
        self.extended_features = enabled;
        self
    }
}

/// Name of one submission in the deployment history
pub fn deployment_name(base_name: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", base_name, at.format("%Y%m%d%H%M%S"))
}

/// Database coordinates taken from validated outputs
struct DatabaseEndpoint {
    server_fqdn: String,
    name: String,
}

/// Provisions infrastructure and hands off a deployment context
pub struct ProvisioningOrchestrator {
    /// Settings and delays
    config: OrchestratorConfig,
    /// Cloud provider
    control_plane: Arc<dyn ControlPlane>,
    /// Database script tool
    script_runner: Arc<dyn ScriptRunner>,
    /// Public address discovery for interactive runs
    address_lookup: Arc<dyn AddressLookup>,
    /// Process environment
    env: Arc<dyn EnvSource>,
    detector: EnvironmentDetector,
}

impl ProvisioningOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        control_plane: Arc<dyn ControlPlane>,
        script_runner: Arc<dyn ScriptRunner>,
        address_lookup: Arc<dyn AddressLookup>,
        env: Arc<dyn EnvSource>,
    ) -> Self {
        Self {
            config,
            control_plane,
            script_runner,
            address_lookup,
            env,
            detector: EnvironmentDetector::default(),
        }
    }

    /// Use `detector` instead of the default pipeline markers
    pub fn with_detector(mut self, detector: EnvironmentDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Run every provisioning step
    #[instrument(skip(self, request), fields(
        resource_group = %request.resource_group,
        region = %request.region,
        base_name = %request.base_name,
    ))]
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> std::result::Result<ProvisionReport, RunFailure> {
        let control_plane = self.control_plane.as_ref();
        let mut steps = StepLog::default();

        // 1. Detect environment
        let mode = self.detector.detect(self.env.as_ref());
        steps.completed_with(Step::DetectEnvironment, mode.to_string());

        // 2. Resolve the acting principal
        let run = CredentialResolver::new(self.env.as_ref(), control_plane)
            .resolve(mode)
            .await
            .map_err(|e| RunFailure::new(Step::ResolveCredentials, e))?;
        steps.completed_with(Step::ResolveCredentials, run.acting_principal_name().to_string());

        // 3. Ensure resource group
        let group = ResourceGroup::new(&request.resource_group, &request.region);
        match ensure_resource_group(control_plane, &group)
            .await
            .map_err(|e| RunFailure::new(Step::EnsureResourceGroup, e))?
        {
            EnsureOutcome::Created => steps.completed_with(Step::EnsureResourceGroup, "created"),
            EnsureOutcome::Existing => steps.completed_with(Step::EnsureResourceGroup, "existing"),
            EnsureOutcome::RegionMismatch { actual_region } => steps.completed_with(
                Step::EnsureResourceGroup,
                format!("existing in {}, requested {}", actual_region, request.region),
            ),
        }

        // 4. Compile module graph
        let plan = DependencyGraphCompiler::new()
            .compile(&standard_graph(request.extended_features))
            .map_err(|e| RunFailure::new(Step::CompilePlan, e))?;
        steps.completed_with(Step::CompilePlan, plan.names().join(" -> "));

        // 5. Submit and reconcile
        let (execution, database) = self.execute(request, &run, plan).await?;
        steps.completed_with(
            Step::ExecuteDeployment,
            if execution.recovered() {
                format!("{} (recovered)", execution.deployment_name)
            } else {
                execution.deployment_name.clone()
            },
        );
        let outputs = &execution.outputs;

        // 6. Let the database come up
        let waiter = ReadinessWaiter::new(self.config.readiness_delay);
        waiter.wait().await;
        steps.completed_with(
            Step::WaitForReadiness,
            format!("{}s", waiter.delay().as_secs()),
        );

        // 7. Open the database to this machine
        let access = NetworkAccessConfigurer::new(control_plane, self.address_lookup.as_ref())
            .configure(mode, &request.resource_group, &database.server_fqdn)
            .await;
        match access {
            NetworkAccess::Skipped => steps.skipped(Step::ConfigureNetwork, "automated run"),
            NetworkAccess::Opened(rule) => steps.completed_with(
                Step::ConfigureNetwork,
                format!("{} ({})", rule.name, rule.start),
            ),
            NetworkAccess::Failed(reason) => steps.degraded(Step::ConfigureNetwork, reason),
        }

        let importer = ScriptImporter::new(
            self.script_runner.as_ref(),
            ScriptTarget {
                server: database.server_fqdn,
                database: database.name,
                auth: SqlAuthMethod::for_mode(mode),
            },
        );

        // 8. Bind workload identity to a database principal
        match WorkloadIdentity::from_outputs(outputs) {
            Ok(identity) => {
                let outcome = PrincipalBinder::new(&importer).bind(&identity).await;
                if outcome.succeeded() {
                    steps.completed_with(Step::BindPrincipal, identity.name.clone());
                } else {
                    steps.degraded(
                        Step::BindPrincipal,
                        outcome
                            .error
                            .unwrap_or_else(|| format!("exit code {:?}", outcome.exit_code)),
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Workload identity outputs unusable; principal not bound");
                steps.degraded(Step::BindPrincipal, e.to_string());
            }
        }

        // 9. Import schema, then procedures
        self.import_scripts(&importer, &mut steps).await;

        // 10. Push application configuration
        ConfigurationWriter::new(control_plane)
            .write(&request.resource_group, outputs, request.extended_features)
            .await
            .map_err(|e| RunFailure::new(Step::WriteConfiguration, e))?;
        steps.completed(Step::WriteConfiguration);

        // 11. Hand off to the application stage
        let context = DeploymentContext::from_outputs(
            &request.resource_group,
            outputs,
            request.extended_features,
        )
        .map_err(|e| RunFailure::new(Step::EmitContext, e))?;
        let context_path = ContextEmitter::new(&self.config.context_dir)
            .emit(&context)
            .map_err(|e| RunFailure::new(Step::EmitContext, e))?;
        steps.completed_with(Step::EmitContext, context_path.display().to_string());

        info!(
            deployment = %execution.deployment_name,
            recovered = execution.recovered(),
            degraded = steps.is_degraded(),
            "Provisioning finished"
        );

        Ok(ProvisionReport {
            run_mode: mode.to_string(),
            acting_principal: run.acting_principal_name().to_string(),
            resource_group: request.resource_group.clone(),
            deployment_name: execution.deployment_name.clone(),
            recovered: execution.recovered(),
            context_path,
            context,
            steps,
        })
    }

    async fn execute(
        &self,
        request: &ProvisionRequest,
        run: &RunContext,
        plan: rigging_types::ExecutionPlan,
    ) -> std::result::Result<(ExecutionReport, DatabaseEndpoint), RunFailure> {
        let deployment = DeploymentRequest {
            resource_group: request.resource_group.clone(),
            deployment_name: deployment_name(&request.base_name, Utc::now()),
            template_path: self.config.template_path.clone(),
            plan,
            parameters: DeploymentParameters::new(
                &request.region,
                &request.base_name,
                run,
                request.extended_features,
            ),
        };

        let executor = DeploymentExecutor::new(
            self.control_plane.as_ref(),
            PolicyTimingRecovery::from_config(&self.config),
        );
        let report = executor
            .execute(&deployment)
            .await
            .map_err(|e| RunFailure::new(Step::ExecuteDeployment, e))?;

        let outputs = &report.outputs;
        let database = outputs
            .validate(request.extended_features)
            .and_then(|()| {
                Ok(DatabaseEndpoint {
                    server_fqdn: outputs.require(OutputName::SqlServerFqdn)?.to_string(),
                    name: outputs.require(OutputName::DatabaseName)?.to_string(),
                })
            })
            .map_err(|e| RunFailure::new(Step::ExecuteDeployment, e))?;
        Ok((report, database))
    }

    async fn import_scripts(&self, importer: &ScriptImporter<'_>, steps: &mut StepLog) {
        let discovered = discover_scripts(&self.config.schema_scripts_dir, ScriptKind::Schema)
            .and_then(|schema| {
                discover_scripts(&self.config.procedure_scripts_dir, ScriptKind::Procedures)
                    .map(|procedures| (schema, procedures))
            });

        let (schema, procedures) = match discovered {
            Ok(sets) => sets,
            Err(e) => {
                warn!(error = %e, "Script sets could not be read");
                steps.degraded(Step::ImportScripts, e.to_string());
                return;
            }
        };

        if schema.is_empty() && procedures.is_empty() {
            steps.skipped(Step::ImportScripts, "no scripts found");
            return;
        }

        let summary = importer.import_sets(&schema, &procedures).await;
        let failed = summary.failed().count();
        if failed == 0 {
            steps.completed_with(
                Step::ImportScripts,
                format!("{} scripts", summary.outcomes.len()),
            );
        } else {
            steps.degraded(
                Step::ImportScripts,
                format!("{} of {} scripts failed", failed, summary.outcomes.len()),
            );
        }
    }
}
