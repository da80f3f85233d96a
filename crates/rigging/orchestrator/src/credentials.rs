//! Credential resolution - who is the acting principal

use crate::control_plane::ControlPlane;
use crate::environment::{EnvSource, PRINCIPAL_ID_VAR, PRINCIPAL_NAME_VAR};
use crate::error::{OrchestratorError, Result};
use rigging_types::{RunContext, RunMode};
use tracing::{info, instrument};

/// Builds the [`RunContext`] for a detected [`RunMode`]
pub struct CredentialResolver<'a> {
    env: &'a dyn EnvSource,
    control_plane: &'a dyn ControlPlane,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(env: &'a dyn EnvSource, control_plane: &'a dyn ControlPlane) -> Self {
        Self { env, control_plane }
    }

    /// Resolve the acting principal.
    ///
    /// Automated runs read the principal from the environment and never touch
    /// the control plane; interactive runs ask it who is signed in.
    #[instrument(skip(self))]
    pub async fn resolve(&self, mode: RunMode) -> Result<RunContext> {
        let context = match mode {
            RunMode::Automated => {
                let id = self.env.var(PRINCIPAL_ID_VAR).ok_or_else(|| {
                    OrchestratorError::Configuration(format!(
                        "{} must be set when running in a pipeline",
                        PRINCIPAL_ID_VAR
                    ))
                })?;
                let name = self.env.var(PRINCIPAL_NAME_VAR).unwrap_or_else(|| id.clone());
                RunContext::automated(id, name)
            }
            RunMode::Interactive => {
                let user = self
                    .control_plane
                    .signed_in_user()
                    .await?
                    .ok_or(OrchestratorError::NotAuthenticated)?;
                RunContext::interactive(user.id, user.name)
            }
        };

        info!(
            mode = %context.mode(),
            principal = %context.acting_principal_name(),
            kind = %context.principal_kind(),
            "Acting principal resolved"
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::SignedInUser;
    use crate::environment::MapEnv;
    use crate::memory::InMemoryControlPlane;
    use rigging_types::PrincipalKind;

    #[tokio::test]
    async fn test_automated_reads_environment() {
        let env = MapEnv::new()
            .with(PRINCIPAL_ID_VAR, "11111111-2222-3333-4444-555555555555")
            .with(PRINCIPAL_NAME_VAR, "github-deployer");
        let plane = InMemoryControlPlane::new();

        let ctx = CredentialResolver::new(&env, &plane)
            .resolve(RunMode::Automated)
            .await
            .unwrap();

        assert_eq!(ctx.principal_kind(), PrincipalKind::Application);
        assert_eq!(ctx.acting_principal_name(), "github-deployer");
        assert_eq!(plane.calls().len(), 0);
    }

    #[tokio::test]
    async fn test_automated_without_principal_is_configuration_error() {
        let env = MapEnv::new();
        let plane = InMemoryControlPlane::new();

        let err = CredentialResolver::new(&env, &plane)
            .resolve(RunMode::Automated)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_automated_name_falls_back_to_id() {
        let env = MapEnv::new().with(PRINCIPAL_ID_VAR, "sp-object-id");
        let plane = InMemoryControlPlane::new();

        let ctx = CredentialResolver::new(&env, &plane)
            .resolve(RunMode::Automated)
            .await
            .unwrap();
        assert_eq!(ctx.acting_principal_name(), "sp-object-id");
    }

    #[tokio::test]
    async fn test_interactive_queries_session() {
        let env = MapEnv::new();
        let plane = InMemoryControlPlane::new().with_signed_in_user(SignedInUser {
            id: "user-oid".into(),
            name: "ops@contoso.com".into(),
        });

        let ctx = CredentialResolver::new(&env, &plane)
            .resolve(RunMode::Interactive)
            .await
            .unwrap();
        assert_eq!(ctx.principal_kind(), PrincipalKind::User);
        assert_eq!(ctx.acting_principal_id(), "user-oid");
    }

    #[tokio::test]
    async fn test_interactive_without_session_fails() {
        let env = MapEnv::new();
        let plane = InMemoryControlPlane::new();

        let err = CredentialResolver::new(&env, &plane)
            .resolve(RunMode::Interactive)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::NotAuthenticated));
    }
}
