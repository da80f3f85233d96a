//! Deployment context - handoff between provisioning and application deployment
//!
//! Written once at the end of every successful provisioning run (overwriting
//! the previous one) and read by the application deployment stage only.
//! Extended-feature fields are absent from the document, not null, when the
//! generative-AI tier was not deployed.

use crate::error::{Result, TypesError};
use crate::outputs::{DeploymentOutputs, OutputName};
use serde::{Deserialize, Serialize};

/// Well-known file name, relative to the repository root
pub const CONTEXT_FILE_NAME: &str = ".deployment-context.json";

/// Flat record of everything the application deployment stage needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentContext {
    pub resource_group: String,
    pub web_app_name: String,
    pub web_app_hostname: String,
    pub sql_server_fqdn: String,
    pub database_name: String,
    pub managed_identity_client_id: String,
    pub managed_identity_name: String,
    pub app_insights_connection_string: String,

    #[serde(rename = "deployedGenAI")]
    pub deployed_gen_ai: bool,

    #[serde(
        rename = "openAIEndpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub open_ai_endpoint: Option<String>,

    #[serde(
        rename = "openAIModelName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub open_ai_model_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_endpoint: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl DeploymentContext {
    /// Assemble the context from a terminal-success deployment
    pub fn from_outputs(
        resource_group: impl Into<String>,
        outputs: &DeploymentOutputs,
        deployed_gen_ai: bool,
    ) -> Result<Self> {
        let extended = |name: OutputName| -> Result<Option<String>> {
            if deployed_gen_ai {
                Ok(Some(outputs.require(name)?.to_string()))
            } else {
                Ok(None)
            }
        };

        let context = Self {
            resource_group: resource_group.into(),
            web_app_name: outputs.require(OutputName::WebAppName)?.to_string(),
            web_app_hostname: outputs.require(OutputName::WebAppHostname)?.to_string(),
            sql_server_fqdn: outputs.require(OutputName::SqlServerFqdn)?.to_string(),
            database_name: outputs.require(OutputName::DatabaseName)?.to_string(),
            managed_identity_client_id: outputs
                .require(OutputName::ManagedIdentityClientId)?
                .to_string(),
            managed_identity_name: outputs
                .require(OutputName::ManagedIdentityName)?
                .to_string(),
            app_insights_connection_string: outputs
                .require(OutputName::AppInsightsConnectionString)?
                .to_string(),
            deployed_gen_ai,
            open_ai_endpoint: extended(OutputName::OpenAiEndpoint)?,
            open_ai_model_name: extended(OutputName::OpenAiModelName)?,
            search_endpoint: extended(OutputName::SearchEndpoint)?,
            created_at: chrono::Utc::now(),
        };

        context.validate()?;
        Ok(context)
    }

    /// Check internal consistency after loading from disk
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("resourceGroup", &self.resource_group),
            ("webAppName", &self.web_app_name),
            ("webAppHostname", &self.web_app_hostname),
            ("sqlServerFqdn", &self.sql_server_fqdn),
            ("databaseName", &self.database_name),
            ("managedIdentityClientId", &self.managed_identity_client_id),
            ("managedIdentityName", &self.managed_identity_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(TypesError::InvalidContext(format!("{} is empty", field)));
            }
        }

        let extended = [
            self.open_ai_endpoint.is_some(),
            self.open_ai_model_name.is_some(),
            self.search_endpoint.is_some(),
        ];
        if self.deployed_gen_ai && extended.contains(&false) {
            return Err(TypesError::InvalidContext(
                "deployedGenAI is true but extended endpoints are missing".into(),
            ));
        }
        if !self.deployed_gen_ai && extended.contains(&true) {
            return Err(TypesError::InvalidContext(
                "extended endpoints present while deployedGenAI is false".into(),
            ));
        }
        Ok(())
    }

    /// Same deployment, ignoring when the record was written
    pub fn same_resources(&self, other: &DeploymentContext) -> bool {
        let mut a = self.clone();
        a.created_at = other.created_at;
        a == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core_outputs() -> DeploymentOutputs {
        DeploymentOutputs::from_pairs([
            (OutputName::WebAppName, "app-expenses"),
            (OutputName::WebAppHostname, "app-expenses.azurewebsites.net"),
            (OutputName::SqlServerFqdn, "sql-expenses.database.windows.net"),
            (OutputName::DatabaseName, "Northwind"),
            (
                OutputName::ManagedIdentityClientId,
                "12345678-1234-1234-1234-123456789012",
            ),
            (
                OutputName::ManagedIdentityPrincipalId,
                "87654321-4321-4321-4321-210987654321",
            ),
            (OutputName::ManagedIdentityName, "mid-expenses"),
            (OutputName::AppInsightsConnectionString, "InstrumentationKey=abc"),
        ])
    }

    #[test]
    fn test_extended_fields_absent_when_disabled() {
        let ctx = DeploymentContext::from_outputs("rg-expenses", &core_outputs(), false).unwrap();
        let json = serde_json::to_value(&ctx).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["deployedGenAI"], serde_json::Value::Bool(false));
        assert!(!obj.contains_key("openAIEndpoint"));
        assert!(!obj.contains_key("openAIModelName"));
        assert!(!obj.contains_key("searchEndpoint"));
        assert_eq!(obj["resourceGroup"], "rg-expenses");
        assert!(obj.contains_key("createdAt"));
    }

    #[test]
    fn test_extended_fields_required_when_enabled() {
        let err = DeploymentContext::from_outputs("rg", &core_outputs(), true).unwrap_err();
        assert!(matches!(
            err,
            TypesError::MissingOutput(OutputName::OpenAiEndpoint)
        ));
    }

    #[test]
    fn test_validate_rejects_inconsistent_flag() {
        let mut ctx = DeploymentContext::from_outputs("rg", &core_outputs(), false).unwrap();
        ctx.open_ai_endpoint = Some("https://oai.example".into());
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_same_resources_ignores_timestamp() {
        let a = DeploymentContext::from_outputs("rg", &core_outputs(), false).unwrap();
        let mut b = a.clone();
        b.created_at = a.created_at + chrono::Duration::minutes(5);
        assert!(a.same_resources(&b));

        b.web_app_name = "other".into();
        assert!(!a.same_resources(&b));
    }
}
