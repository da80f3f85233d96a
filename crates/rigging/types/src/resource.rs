//! Provisioned resource descriptors

use crate::error::{Result, TypesError};
use crate::outputs::{DeploymentOutputs, OutputName};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Logical container for every resource of one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    /// Resource group name
    pub name: String,
    /// Region the group lives in
    pub region: String,
}

impl ResourceGroup {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }

    /// Regions compare case- and whitespace-insensitively ("East US" == "eastus")
    pub fn same_region(&self, other: &str) -> bool {
        normalize_region(&self.region) == normalize_region(other)
    }
}

fn normalize_region(region: &str) -> String {
    region
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Non-human credential the compute resource runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadIdentity {
    /// Client (application) id; the database principal SID derives from it
    pub client_id: Uuid,
    /// Object id in the directory
    pub principal_id: Uuid,
    /// Display name, also used as the database principal name
    pub name: String,
}

impl WorkloadIdentity {
    /// Read the identity triple from a successful deployment
    pub fn from_outputs(outputs: &DeploymentOutputs) -> Result<Self> {
        let client_id = parse_guid(
            "managedIdentityClientId",
            outputs.require(OutputName::ManagedIdentityClientId)?,
        )?;
        let principal_id = parse_guid(
            "managedIdentityPrincipalId",
            outputs.require(OutputName::ManagedIdentityPrincipalId)?,
        )?;
        let name = outputs.require(OutputName::ManagedIdentityName)?.to_string();

        Ok(Self {
            client_id,
            principal_id,
            name,
        })
    }
}

fn parse_guid(field: &'static str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| TypesError::InvalidGuid {
        field,
        value: value.to_string(),
    })
}
