//! CLI configuration

use crate::error::{CliError, CliResult};
use rigging_orchestrator::{EnvironmentDetector, OrchestratorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public-address lookup used when none is configured
pub const DEFAULT_ADDRESS_LOOKUP_URL: &str = "https://api.ipify.org";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RiggingConfig {
    /// Template entry point
    pub template_path: Option<PathBuf>,

    /// Schema-definition scripts directory
    pub schema_scripts_dir: Option<PathBuf>,

    /// Stored-procedure scripts directory
    pub procedure_scripts_dir: Option<PathBuf>,

    /// Delay before the database is first used, in seconds
    pub readiness_delay_secs: Option<u64>,

    /// Wait before reconciling an inconclusive deployment, in seconds
    pub recovery_grace_secs: Option<u64>,

    /// Service answering with the caller's public address as plain text
    pub address_lookup_url: Option<String>,

    /// Application package published by `deploy-application`
    pub package_path: Option<PathBuf>,

    /// Environment variables whose presence marks an automated run
    pub pipeline_markers: Option<Vec<String>>,
}

impl RiggingConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> CliResult<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let config: RiggingConfig =
                toml::from_str(&contents).map_err(|e| CliError::Config(e.to_string()))?;
            Ok(config)
        } else {
            Ok(RiggingConfig::default())
        }
    }

    /// Get the default configuration file path
    fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::Config("Cannot find config directory".into()))?;
        Ok(config_dir.join("rigging").join("config.toml"))
    }

    pub fn address_lookup_url(&self) -> &str {
        self.address_lookup_url
            .as_deref()
            .unwrap_or(DEFAULT_ADDRESS_LOOKUP_URL)
    }

    pub fn package_path(&self) -> PathBuf {
        self.package_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("app.zip"))
    }

    pub fn detector(&self) -> EnvironmentDetector {
        match &self.pipeline_markers {
            Some(markers) => EnvironmentDetector::with_markers(markers.iter().cloned()),
            None => EnvironmentDetector::default(),
        }
    }

    /// Library settings rooted at `workdir`
    pub fn orchestrator_config(&self, workdir: &Path) -> OrchestratorConfig {
        let defaults = OrchestratorConfig::default();
        let resolve = |configured: &Option<PathBuf>, default: PathBuf| {
            workdir.join(configured.clone().unwrap_or(default))
        };

        OrchestratorConfig {
            template_path: resolve(&self.template_path, defaults.template_path.clone()),
            schema_scripts_dir: resolve(
                &self.schema_scripts_dir,
                defaults.schema_scripts_dir.clone(),
            ),
            procedure_scripts_dir: resolve(
                &self.procedure_scripts_dir,
                defaults.procedure_scripts_dir.clone(),
            ),
            context_dir: workdir.to_path_buf(),
            recovery_grace: self
                .recovery_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.recovery_grace),
            readiness_delay: self
                .readiness_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.readiness_delay),
            noise_prefixes: defaults.noise_prefixes,
        }
    }
}
