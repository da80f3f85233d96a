//! Environment detection
//!
//! The run is automated when any pipeline marker is present in the environment,
//! interactive otherwise.

use rigging_types::RunMode;
use std::collections::BTreeMap;
use tracing::debug;

/// Markers set by the supported pipeline hosts
pub const PIPELINE_MARKERS: [&str; 2] = ["GITHUB_ACTIONS", "TF_BUILD"];

/// Variable holding the pipeline principal's id
pub const PRINCIPAL_ID_VAR: &str = "AZURE_CLIENT_ID";

/// Optional variable holding the pipeline principal's display name
pub const PRINCIPAL_NAME_VAR: &str = "AZURE_PRINCIPAL_NAME";

/// Read access to environment variables
pub trait EnvSource: Send + Sync {
    /// Value of `key`; empty values count as absent
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed variable set
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|v| !v.trim().is_empty()).cloned()
    }
}

/// Decides between interactive and automated runs
#[derive(Debug, Clone)]
pub struct EnvironmentDetector {
    markers: Vec<String>,
}

impl Default for EnvironmentDetector {
    fn default() -> Self {
        Self {
            markers: PIPELINE_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl EnvironmentDetector {
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn detect(&self, env: &dyn EnvSource) -> RunMode {
        match self.markers.iter().find(|m| env.var(m).is_some()) {
            Some(marker) => {
                debug!(marker = %marker, "Pipeline marker found");
                RunMode::Automated
            }
            None => RunMode::Interactive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers_is_interactive() {
        let env = MapEnv::new().with("HOME", "/home/ops");
        assert_eq!(EnvironmentDetector::default().detect(&env), RunMode::Interactive);
    }

    #[test]
    fn test_any_marker_is_automated() {
        let detector = EnvironmentDetector::default();
        assert_eq!(
            detector.detect(&MapEnv::new().with("GITHUB_ACTIONS", "true")),
            RunMode::Automated
        );
        assert_eq!(
            detector.detect(&MapEnv::new().with("TF_BUILD", "True")),
            RunMode::Automated
        );
    }

    #[test]
    fn test_empty_marker_is_ignored() {
        let env = MapEnv::new().with("GITHUB_ACTIONS", "  ");
        assert_eq!(EnvironmentDetector::default().detect(&env), RunMode::Interactive);
    }

    #[test]
    fn test_custom_markers() {
        let detector = EnvironmentDetector::with_markers(["CI"]);
        assert_eq!(detector.detect(&MapEnv::new().with("CI", "1")), RunMode::Automated);
    }
}
