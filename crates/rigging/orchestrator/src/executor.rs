//! Deployment executor
//!
//! Submits the compiled plan and drives the
//! `Submitted -> Inconclusive -> Reconciling -> {Succeeded, Failed}` state
//! machine. Reconciliation happens at most once; there is no retry loop.

use crate::control_plane::{ControlPlane, DeploymentRequest, SubmissionOutcome};
use crate::error::{OrchestratorError, Result};
use crate::recovery::PolicyTimingRecovery;
use rigging_types::{DeploymentOutputs, ExecutionPhase};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Outcome of a deployment that reached terminal success
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Deployment whose outputs are used downstream
    pub deployment_name: String,
    /// Outputs of that deployment
    pub outputs: DeploymentOutputs,
    /// Phases visited, in order
    pub phases: Vec<ExecutionPhase>,
}

impl ExecutionReport {
    /// Whether reconciliation produced the result
    pub fn recovered(&self) -> bool {
        self.phases.contains(&ExecutionPhase::Reconciling)
    }
}

struct PhaseTracker {
    phases: Vec<ExecutionPhase>,
}

impl PhaseTracker {
    fn start() -> Self {
        Self {
            phases: vec![ExecutionPhase::Submitted],
        }
    }

    fn current(&self) -> ExecutionPhase {
        self.phases
            .last()
            .copied()
            .unwrap_or(ExecutionPhase::Submitted)
    }

    fn advance(&mut self, next: ExecutionPhase) {
        debug_assert!(
            self.current().can_transition_to(next),
            "illegal transition {} -> {}",
            self.current(),
            next
        );
        debug!(from = %self.current(), to = %next, "Execution phase transition");
        self.phases.push(next);
    }
}

/// Submits deployments and resolves inconclusive answers
pub struct DeploymentExecutor<'a> {
    control_plane: &'a dyn ControlPlane,
    recovery: PolicyTimingRecovery,
}

impl<'a> DeploymentExecutor<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane, recovery: PolicyTimingRecovery) -> Self {
        Self {
            control_plane,
            recovery,
        }
    }

    /// Submit and block until a terminal phase
    #[instrument(skip(self, request), fields(
        resource_group = %request.resource_group,
        deployment = %request.deployment_name,
    ))]
    pub async fn execute(&self, request: &DeploymentRequest) -> Result<ExecutionReport> {
        let mut tracker = PhaseTracker::start();
        info!(
            modules = request.plan.len(),
            backend = self.control_plane.name(),
            "Submitting deployment"
        );

        let reason = match self.control_plane.submit_deployment(request).await {
            Ok(SubmissionOutcome::Completed { outputs }) => {
                let outputs = DeploymentOutputs::from_template_json(&outputs);
                if !outputs.is_empty() {
                    tracker.advance(ExecutionPhase::Succeeded);
                    info!(outputs = outputs.len(), "Deployment succeeded");
                    return Ok(ExecutionReport {
                        deployment_name: request.deployment_name.clone(),
                        outputs,
                        phases: tracker.phases,
                    });
                }
                "deployment reported success without outputs".to_string()
            }
            Ok(SubmissionOutcome::Empty) => "empty response from control plane".to_string(),
            Ok(SubmissionOutcome::Failed { exit_code, message }) => {
                format!("exit code {:?}: {}", exit_code, message.trim())
            }
            Err(e) => e.to_string(),
        };

        tracker.advance(ExecutionPhase::Inconclusive);
        warn!(reason = %reason, "Deployment result inconclusive; reconciling");

        tracker.advance(ExecutionPhase::Reconciling);
        let recovered = self
            .recovery
            .reconcile(
                self.control_plane,
                &request.resource_group,
                &request.deployment_name,
            )
            .await;

        match recovered {
            Ok(Some(found)) => {
                tracker.advance(ExecutionPhase::Succeeded);
                Ok(ExecutionReport {
                    deployment_name: found.record.name,
                    outputs: found.outputs,
                    phases: tracker.phases,
                })
            }
            Ok(None) => {
                tracker.advance(ExecutionPhase::Failed);
                Err(OrchestratorError::DeploymentFailed {
                    reason: format!(
                        "{}; no successful deployment found in {}",
                        reason, request.resource_group
                    ),
                })
            }
            Err(e) => {
                tracker.advance(ExecutionPhase::Failed);
                Err(OrchestratorError::DeploymentFailed {
                    reason: format!("{}; reconciliation failed: {}", reason, e),
                })
            }
        }
    }
}
