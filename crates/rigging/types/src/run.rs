//! Run context - who is provisioning, and how
//!
//! Built once at startup and never mutated. Every later step that must pick an
//! authentication strategy reads [`RunMode`] from here instead of re-inspecting
//! the process environment.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a human operator or an unattended pipeline is driving the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Operator at a terminal with an authenticated CLI session
    Interactive,
    /// CI pipeline with a pre-supplied service principal
    Automated,
}

impl RunMode {
    pub fn is_interactive(&self) -> bool {
        matches!(self, RunMode::Interactive)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Interactive => write!(f, "interactive"),
            RunMode::Automated => write!(f, "automated"),
        }
    }
}

/// Kind of the acting principal, passed to resource creation as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalKind {
    User,
    Application,
}

impl PrincipalKind {
    /// Parameter value understood by the templates
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::User => "User",
            PrincipalKind::Application => "Application",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of the acting principal for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    mode: RunMode,
    acting_principal_id: String,
    acting_principal_name: String,
    principal_kind: PrincipalKind,
}

impl RunContext {
    /// Context for an operator session
    pub fn interactive(principal_id: impl Into<String>, principal_name: impl Into<String>) -> Self {
        Self {
            mode: RunMode::Interactive,
            acting_principal_id: principal_id.into(),
            acting_principal_name: principal_name.into(),
            principal_kind: PrincipalKind::User,
        }
    }

    /// Context for a pipeline run; the principal is always an application
    pub fn automated(principal_id: impl Into<String>, principal_name: impl Into<String>) -> Self {
        Self {
            mode: RunMode::Automated,
            acting_principal_id: principal_id.into(),
            acting_principal_name: principal_name.into(),
            principal_kind: PrincipalKind::Application,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn acting_principal_id(&self) -> &str {
        &self.acting_principal_id
    }

    pub fn acting_principal_name(&self) -> &str {
        &self.acting_principal_name
    }

    pub fn principal_kind(&self) -> PrincipalKind {
        self.principal_kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automated_context_is_application() {
        let ctx = RunContext::automated("0000-1111", "deploy-bot");
        assert_eq!(ctx.mode(), RunMode::Automated);
        assert_eq!(ctx.principal_kind(), PrincipalKind::Application);
        assert!(!ctx.mode().is_interactive());
    }

    #[test]
    fn test_interactive_context_is_user() {
        let ctx = RunContext::interactive("abcd", "ops@example.com");
        assert_eq!(ctx.principal_kind(), PrincipalKind::User);
        assert_eq!(ctx.acting_principal_name(), "ops@example.com");
    }
}
