//! Deployment submission and history types

use crate::run::{PrincipalKind, RunContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter set passed to the template compiler alongside the plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentParameters {
    /// Target region
    pub region: String,
    /// Prefix every resource name derives from
    pub base_name: String,
    /// Principal granted admin on the database server
    pub acting_principal_id: String,
    /// Display name of that principal
    pub acting_principal_name: String,
    /// User or Application
    pub principal_kind: PrincipalKind,
    /// Deploy the generative-AI tier
    pub enable_extended_features: bool,
}

impl DeploymentParameters {
    pub fn new(
        region: impl Into<String>,
        base_name: impl Into<String>,
        run: &RunContext,
        enable_extended_features: bool,
    ) -> Self {
        Self {
            region: region.into(),
            base_name: base_name.into(),
            acting_principal_id: run.acting_principal_id().to_string(),
            acting_principal_name: run.acting_principal_name().to_string(),
            principal_kind: run.principal_kind(),
            enable_extended_features,
        }
    }

    /// Parameters as the templates name them, in a stable order
    pub fn to_template_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("location", self.region.clone()),
            ("baseName", self.base_name.clone()),
            ("adminObjectId", self.acting_principal_id.clone()),
            ("adminLogin", self.acting_principal_name.clone()),
            ("adminPrincipalType", self.principal_kind.as_str().to_string()),
            ("deployGenAI", self.enable_extended_features.to_string()),
        ]
    }
}

/// Provisioning state reported by the control plane for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProvisioningState {
    Accepted,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl ProvisioningState {
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, ProvisioningState::Succeeded)
    }
}

impl From<String> for ProvisioningState {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "accepted" => ProvisioningState::Accepted,
            "running" => ProvisioningState::Running,
            "succeeded" => ProvisioningState::Succeeded,
            "failed" => ProvisioningState::Failed,
            "canceled" | "cancelled" => ProvisioningState::Canceled,
            _ => ProvisioningState::Other(value),
        }
    }
}

impl From<ProvisioningState> for String {
    fn from(value: ProvisioningState) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisioningState::Accepted => write!(f, "Accepted"),
            ProvisioningState::Running => write!(f, "Running"),
            ProvisioningState::Succeeded => write!(f, "Succeeded"),
            ProvisioningState::Failed => write!(f, "Failed"),
            ProvisioningState::Canceled => write!(f, "Canceled"),
            ProvisioningState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One deployment attempt in a resource group's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Deployment name
    pub name: String,
    /// Provisioning state
    pub status: ProvisioningState,
    /// Last state change
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Executor state machine
///
/// `Submitted -> Succeeded` on a conclusive answer,
/// `Submitted -> Inconclusive -> Reconciling -> {Succeeded, Failed}` otherwise.
/// Reconciling is entered at most once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Submitted,
    Inconclusive,
    Reconciling,
    Succeeded,
    Failed,
}

impl ExecutionPhase {
    /// Whether `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: ExecutionPhase) -> bool {
        use ExecutionPhase::*;
        matches!(
            (self, next),
            (Submitted, Succeeded)
                | (Submitted, Inconclusive)
                | (Inconclusive, Reconciling)
                | (Reconciling, Succeeded)
                | (Reconciling, Failed)
        )
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionPhase::Submitted => "submitted",
            ExecutionPhase::Inconclusive => "inconclusive",
            ExecutionPhase::Reconciling => "reconciling",
            ExecutionPhase::Succeeded => "succeeded",
            ExecutionPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_pairs_carry_principal_kind() {
        let run = RunContext::automated("sp-id", "sp-name");
        let params = DeploymentParameters::new("eastus", "expensemgmt", &run, false);
        let pairs = params.to_template_pairs();

        assert!(pairs.contains(&("adminPrincipalType", "Application".to_string())));
        assert!(pairs.contains(&("deployGenAI", "false".to_string())));
        assert_eq!(pairs[0], ("location", "eastus".to_string()));
    }

    #[test]
    fn test_provisioning_state_parsing() {
        let state: ProvisioningState = serde_json::from_str("\"succeeded\"").unwrap();
        assert!(state.is_terminal_success());

        let state: ProvisioningState = serde_json::from_str("\"Deleting\"").unwrap();
        assert_eq!(state, ProvisioningState::Other("Deleting".into()));
        assert!(!state.is_terminal_success());
    }

    #[test]
    fn test_reconciliation_is_one_shot() {
        use ExecutionPhase::*;
        assert!(Submitted.can_transition_to(Inconclusive));
        assert!(Reconciling.can_transition_to(Failed));
        assert!(!Reconciling.can_transition_to(Reconciling));
        assert!(!Failed.can_transition_to(Submitted));
        assert!(!Reconciling.can_transition_to(Submitted));
    }
}
