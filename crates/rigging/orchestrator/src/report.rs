//! Run reports and step-level failures

use crate::error::{ErrorClass, OrchestratorError};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline steps, in the order they can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    DetectEnvironment,
    ResolveCredentials,
    EnsureResourceGroup,
    CompilePlan,
    ExecuteDeployment,
    WaitForReadiness,
    ConfigureNetwork,
    BindPrincipal,
    ImportScripts,
    WriteConfiguration,
    EmitContext,
    LoadContext,
    VerifyResourceGroup,
    PublishPackage,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::DetectEnvironment => "detect-environment",
            Step::ResolveCredentials => "resolve-credentials",
            Step::EnsureResourceGroup => "ensure-resource-group",
            Step::CompilePlan => "compile-plan",
            Step::ExecuteDeployment => "execute-deployment",
            Step::WaitForReadiness => "wait-for-readiness",
            Step::ConfigureNetwork => "configure-network",
            Step::BindPrincipal => "bind-principal",
            Step::ImportScripts => "import-scripts",
            Step::WriteConfiguration => "write-configuration",
            Step::EmitContext => "emit-context",
            Step::LoadContext => "load-context",
            Step::VerifyResourceGroup => "verify-resource-group",
            Step::PublishPackage => "publish-package",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    /// Not applicable to this run
    Skipped,
    /// Best-effort step failed; the run went on
    Degraded,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Completed => write!(f, "completed"),
            StepOutcome::Skipped => write!(f, "skipped"),
            StepOutcome::Degraded => write!(f, "degraded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A fatal failure, tagged with the step that stopped the run
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct RunFailure {
    pub step: Step,
    #[source]
    pub source: OrchestratorError,
}

impl RunFailure {
    pub fn new(step: Step, source: impl Into<OrchestratorError>) -> Self {
        Self {
            step,
            source: source.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.source.class()
    }
}

/// Steps taken by a run, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepLog {
    records: Vec<StepRecord>,
}

impl StepLog {
    pub fn completed(&mut self, step: Step) {
        self.push(step, StepOutcome::Completed, None);
    }

    pub fn completed_with(&mut self, step: Step, detail: impl Into<String>) {
        self.push(step, StepOutcome::Completed, Some(detail.into()));
    }

    pub fn skipped(&mut self, step: Step, detail: impl Into<String>) {
        self.push(step, StepOutcome::Skipped, Some(detail.into()));
    }

    pub fn degraded(&mut self, step: Step, detail: impl Into<String>) {
        self.push(step, StepOutcome::Degraded, Some(detail.into()));
    }

    fn push(&mut self, step: Step, outcome: StepOutcome, detail: Option<String>) {
        self.records.push(StepRecord {
            step,
            outcome,
            detail,
        });
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn outcome_of(&self, step: Step) -> Option<StepOutcome> {
        self.records
            .iter()
            .find(|r| r.step == step)
            .map(|r| r.outcome)
    }

    pub fn is_degraded(&self) -> bool {
        self.records
            .iter()
            .any(|r| r.outcome == StepOutcome::Degraded)
    }
}

/// Result of a provisioning run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionReport {
    pub run_mode: String,
    pub acting_principal: String,
    pub resource_group: String,
    pub deployment_name: String,
    /// Outputs came from reconciliation rather than the submission itself
    pub recovered: bool,
    pub context_path: PathBuf,
    pub context: rigging_types::DeploymentContext,
    pub steps: StepLog,
}

/// Result of an application deployment run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReport {
    pub resource_group: String,
    pub web_app_name: String,
    pub web_app_hostname: String,
    pub context_path: PathBuf,
    pub package: PathBuf,
    pub steps: StepLog,
}
