//! Orchestrator configuration

use std::path::PathBuf;
use std::time::Duration;

/// Deployment names created by the platform itself rather than by us
pub const DEFAULT_NOISE_PREFIXES: [&str; 2] = ["PolicyDeployment_", "Failure-Anomalies-Alert-Rules-"];

/// Settings shared by the provisioning and application pipelines
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Template entry point handed to the control plane
    pub template_path: PathBuf,
    /// Directory of schema-definition scripts
    pub schema_scripts_dir: PathBuf,
    /// Directory of stored-procedure scripts
    pub procedure_scripts_dir: PathBuf,
    /// Directory the deployment context is written to
    pub context_dir: PathBuf,
    /// Wait before listing deployments after an inconclusive submission
    pub recovery_grace: Duration,
    /// Fixed delay before the database is first touched
    pub readiness_delay: Duration,
    /// Deployment-name prefixes ignored during reconciliation
    pub noise_prefixes: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("infra/main.bicep"),
            schema_scripts_dir: PathBuf::from("database/schema"),
            procedure_scripts_dir: PathBuf::from("database/procedures"),
            context_dir: PathBuf::from("."),
            recovery_grace: Duration::from_secs(15),
            readiness_delay: Duration::from_secs(30),
            noise_prefixes: DEFAULT_NOISE_PREFIXES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults with every wait removed
    pub fn without_delays() -> Self {
        Self {
            recovery_grace: Duration::ZERO,
            readiness_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_context_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.context_dir = dir.into();
        self
    }

    pub fn with_script_dirs(
        mut self,
        schema: impl Into<PathBuf>,
        procedures: impl Into<PathBuf>,
    ) -> Self {
        self.schema_scripts_dir = schema.into();
        self.procedure_scripts_dir = procedures.into();
        self
    }
}
