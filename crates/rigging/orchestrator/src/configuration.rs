//! Configuration writer
//!
//! Pushes the resolved identity, database and telemetry settings into the
//! compute resource's runtime configuration. The connection-string store and
//! the key/value store each receive exactly one batch.

use crate::control_plane::ControlPlane;
use crate::error::Result;
use rigging_types::{
    AppSettingKey, ConnectionStringKey, DeploymentOutputs, OutputName, SettingsBatch,
};
use tracing::{info, instrument};

/// Connection string authenticating as the workload identity; carries no secret
pub fn database_connection_string(server_fqdn: &str, database: &str, client_id: &str) -> String {
    format!(
        "Server=tcp:{},1433;Database={};Authentication=Active Directory Managed Identity;User Id={};",
        server_fqdn, database, client_id
    )
}

/// Batches built from one deployment's outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationBatches {
    pub connection_strings: SettingsBatch<ConnectionStringKey>,
    pub app_settings: SettingsBatch<AppSettingKey>,
}

impl ConfigurationBatches {
    pub fn from_outputs(outputs: &DeploymentOutputs, extended_features: bool) -> Result<Self> {
        let client_id = outputs.require(OutputName::ManagedIdentityClientId)?;

        let mut connection_strings = SettingsBatch::new();
        connection_strings.set(
            ConnectionStringKey::DefaultConnection,
            database_connection_string(
                outputs.require(OutputName::SqlServerFqdn)?,
                outputs.require(OutputName::DatabaseName)?,
                client_id,
            ),
        );

        let mut app_settings = SettingsBatch::new();
        for key in AppSettingKey::ALL {
            if key.is_extended() && !extended_features {
                continue;
            }
            app_settings.set(key, outputs.require(key.source())?);
        }

        Ok(Self {
            connection_strings,
            app_settings,
        })
    }
}

pub struct ConfigurationWriter<'a> {
    control_plane: &'a dyn ControlPlane,
}

impl<'a> ConfigurationWriter<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane) -> Self {
        Self { control_plane }
    }

    /// Build and push both batches; returns what was written
    #[instrument(skip(self, outputs))]
    pub async fn write(
        &self,
        resource_group: &str,
        outputs: &DeploymentOutputs,
        extended_features: bool,
    ) -> Result<ConfigurationBatches> {
        let app_name = outputs.require(OutputName::WebAppName)?;
        let batches = ConfigurationBatches::from_outputs(outputs, extended_features)?;

        self.control_plane
            .set_connection_strings(resource_group, app_name, &batches.connection_strings)
            .await?;
        self.control_plane
            .set_app_settings(resource_group, app_name, &batches.app_settings)
            .await?;

        info!(
            app = app_name,
            connection_strings = batches.connection_strings.len(),
            app_settings = batches.app_settings.len(),
            "Application configuration written"
        );
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{simulated_outputs, ControlPlaneCall, InMemoryControlPlane};
    use rigging_types::{DeploymentParameters, RunContext};

    fn outputs(extended: bool) -> DeploymentOutputs {
        let run = RunContext::automated("id", "pipeline");
        let params = DeploymentParameters::new("eastus", "expenses", &run, extended);
        DeploymentOutputs::from_template_json(&simulated_outputs(&params))
    }

    #[test]
    fn test_connection_string_uses_identity_not_secret() {
        let cs = database_connection_string("sql-x.database.windows.net", "Northwind", "cid");
        assert_eq!(
            cs,
            "Server=tcp:sql-x.database.windows.net,1433;Database=Northwind;Authentication=Active Directory Managed Identity;User Id=cid;"
        );
        assert!(!cs.to_lowercase().contains("password"));
    }

    #[test]
    fn test_client_id_written_under_both_keys() {
        let batches = ConfigurationBatches::from_outputs(&outputs(false), false).unwrap();
        let id = "12345678-1234-1234-1234-123456789012";

        assert_eq!(
            batches.app_settings.get(AppSettingKey::ManagedIdentityClientId),
            Some(id)
        );
        assert_eq!(batches.app_settings.get(AppSettingKey::AzureClientId), Some(id));
        assert!(batches
            .app_settings
            .contains(AppSettingKey::ApplicationInsightsConnectionString));
        assert!(!batches.app_settings.iter().any(|(k, _)| k.is_extended()));
    }

    #[test]
    fn test_extended_keys_only_when_enabled() {
        let batches = ConfigurationBatches::from_outputs(&outputs(true), true).unwrap();
        assert_eq!(
            batches.app_settings.get(AppSettingKey::OpenAiModelName),
            Some("gpt-4o")
        );
        assert!(batches.app_settings.contains(AppSettingKey::SearchEndpoint));
    }

    #[test]
    fn test_extended_enabled_without_outputs_fails() {
        assert!(ConfigurationBatches::from_outputs(&outputs(false), true).is_err());
    }

    #[tokio::test]
    async fn test_one_batch_per_store() {
        let plane = InMemoryControlPlane::new();
        ConfigurationWriter::new(&plane)
            .write("rg-expenses", &outputs(true), true)
            .await
            .unwrap();

        assert_eq!(plane.calls_to("set_connection_strings").len(), 1);
        let settings = plane.calls_to("set_app_settings");
        assert_eq!(settings.len(), 1);
        match &settings[0] {
            ControlPlaneCall::SetAppSettings {
                app_name,
                assignments,
                ..
            } => {
                assert_eq!(app_name, "app-expenses");
                assert_eq!(assignments.len(), 6);
                assert!(assignments.contains(&"OpenAI__DeploymentName=gpt-4o".to_string()));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }
}
