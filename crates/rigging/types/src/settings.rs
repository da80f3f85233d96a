//! Configuration keys read by the deployed application
//!
//! The application looks these up by exact name. Keeping them in enums means a
//! misspelt key is a compile error rather than a runtime lookup miss.

use crate::outputs::OutputName;
use serde::Serialize;
use std::fmt;

/// Key/value settings pushed to the compute resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AppSettingKey {
    /// Identity client id as read by the application's data layer
    ManagedIdentityClientId,
    /// Identity client id as read by the credential chain
    AzureClientId,
    ApplicationInsightsConnectionString,
    OpenAiEndpoint,
    OpenAiModelName,
    SearchEndpoint,
}

impl AppSettingKey {
    pub const ALL: [AppSettingKey; 6] = [
        AppSettingKey::ManagedIdentityClientId,
        AppSettingKey::AzureClientId,
        AppSettingKey::ApplicationInsightsConnectionString,
        AppSettingKey::OpenAiEndpoint,
        AppSettingKey::OpenAiModelName,
        AppSettingKey::SearchEndpoint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppSettingKey::ManagedIdentityClientId => "ManagedIdentityClientId",
            AppSettingKey::AzureClientId => "AZURE_CLIENT_ID",
            AppSettingKey::ApplicationInsightsConnectionString => {
                "APPLICATIONINSIGHTS_CONNECTION_STRING"
            }
            AppSettingKey::OpenAiEndpoint => "OpenAI__Endpoint",
            AppSettingKey::OpenAiModelName => "OpenAI__DeploymentName",
            AppSettingKey::SearchEndpoint => "AzureSearch__Endpoint",
        }
    }

    /// Deployment output this setting is copied from
    pub fn source(&self) -> OutputName {
        match self {
            AppSettingKey::ManagedIdentityClientId | AppSettingKey::AzureClientId => {
                OutputName::ManagedIdentityClientId
            }
            AppSettingKey::ApplicationInsightsConnectionString => {
                OutputName::AppInsightsConnectionString
            }
            AppSettingKey::OpenAiEndpoint => OutputName::OpenAiEndpoint,
            AppSettingKey::OpenAiModelName => OutputName::OpenAiModelName,
            AppSettingKey::SearchEndpoint => OutputName::SearchEndpoint,
        }
    }

    /// Only set when the generative-AI tier was deployed
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            AppSettingKey::OpenAiEndpoint
                | AppSettingKey::OpenAiModelName
                | AppSettingKey::SearchEndpoint
        )
    }
}

impl fmt::Display for AppSettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entries of the connection-string store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConnectionStringKey {
    DefaultConnection,
}

impl ConnectionStringKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStringKey::DefaultConnection => "DefaultConnection",
        }
    }
}

impl fmt::Display for ConnectionStringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Batch of settings pushed in one call to one store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsBatch<K> {
    entries: Vec<(K, String)>,
}

impl<K> Default for SettingsBatch<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq + fmt::Display> SettingsBatch<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key, replacing any earlier value for it
    pub fn set(&mut self, key: K, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: K) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, String)> {
        self.entries.iter()
    }

    /// `KEY=value` arguments in insertion order
    pub fn to_assignments(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let mut names: Vec<_> = AppSettingKey::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), AppSettingKey::ALL.len());
    }

    #[test]
    fn test_extended_keys_read_extended_outputs() {
        for key in AppSettingKey::ALL {
            assert_eq!(key.is_extended(), OutputName::EXTENDED.contains(&key.source()));
        }
    }

    #[test]
    fn test_batch_set_replaces() {
        let mut batch = SettingsBatch::new();
        batch
            .set(AppSettingKey::AzureClientId, "a")
            .set(AppSettingKey::AzureClientId, "b");

        assert_eq!(batch.len(), 1);
        assert_eq!(batch.to_assignments(), vec!["AZURE_CLIENT_ID=b".to_string()]);
    }
}
