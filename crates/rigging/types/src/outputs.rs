//! Deployment outputs
//!
//! Values exist only after the executor reaches terminal success (either
//! directly or through reconciliation). The map is immutable once built and is
//! passed by reference to every downstream step.

use crate::error::{Result, TypesError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Template outputs consumed downstream of the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OutputName {
    WebAppName,
    WebAppHostname,
    SqlServerFqdn,
    DatabaseName,
    ManagedIdentityClientId,
    ManagedIdentityPrincipalId,
    ManagedIdentityName,
    AppInsightsConnectionString,
    OpenAiEndpoint,
    OpenAiModelName,
    SearchEndpoint,
}

impl OutputName {
    /// Outputs every successful deployment must carry
    pub const CORE: [OutputName; 8] = [
        OutputName::WebAppName,
        OutputName::WebAppHostname,
        OutputName::SqlServerFqdn,
        OutputName::DatabaseName,
        OutputName::ManagedIdentityClientId,
        OutputName::ManagedIdentityPrincipalId,
        OutputName::ManagedIdentityName,
        OutputName::AppInsightsConnectionString,
    ];

    /// Outputs of the generative-AI tier
    pub const EXTENDED: [OutputName; 3] = [
        OutputName::OpenAiEndpoint,
        OutputName::OpenAiModelName,
        OutputName::SearchEndpoint,
    ];

    /// Output name as declared by the templates
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputName::WebAppName => "webAppName",
            OutputName::WebAppHostname => "webAppHostname",
            OutputName::SqlServerFqdn => "sqlServerFqdn",
            OutputName::DatabaseName => "databaseName",
            OutputName::ManagedIdentityClientId => "managedIdentityClientId",
            OutputName::ManagedIdentityPrincipalId => "managedIdentityPrincipalId",
            OutputName::ManagedIdentityName => "managedIdentityName",
            OutputName::AppInsightsConnectionString => "appInsightsConnectionString",
            OutputName::OpenAiEndpoint => "openAIEndpoint",
            OutputName::OpenAiModelName => "openAIModelName",
            OutputName::SearchEndpoint => "searchEndpoint",
        }
    }
}

impl fmt::Display for OutputName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named values produced by a terminal-success deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentOutputs {
    values: BTreeMap<String, String>,
}

impl DeploymentOutputs {
    /// Build from the control plane's output document.
    ///
    /// Accepts both the wrapped form (`{"name": {"type": "String", "value": "x"}}`)
    /// and a flat `{"name": "x"}` map. Scalars are kept as strings; structured
    /// outputs are not consumed downstream and are dropped.
    pub fn from_template_json(document: &serde_json::Value) -> Self {
        let mut values = BTreeMap::new();

        if let Some(map) = document.as_object() {
            for (name, raw) in map {
                let value = match raw.as_object() {
                    Some(wrapped) => wrapped.get("value").unwrap_or(&serde_json::Value::Null),
                    None => raw,
                };
                if let Some(text) = scalar_to_string(value) {
                    values.insert(name.clone(), text);
                }
            }
        }

        Self { values }
    }

    /// Build from typed pairs
    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (OutputName, V)>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(name, value)| (name.as_str().to_string(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: OutputName) -> Option<&str> {
        self.values
            .get(name.as_str())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: OutputName) -> Result<&str> {
        self.get(name).ok_or(TypesError::MissingOutput(name))
    }

    /// Fail on the first absent core output (and extended ones when requested)
    pub fn validate(&self, extended_features: bool) -> Result<()> {
        for name in OutputName::CORE {
            self.require(name)?;
        }
        if extended_features {
            for name in OutputName::EXTENDED {
                self.require(name)?;
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Iterate raw name/value pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
