//! Network access configurer
//!
//! Interactive runs open a single-address firewall rule from the operator's
//! public address to the database server so scripts can be imported from the
//! operator's machine. Pipelines reach the server through their own network
//! path and skip this step.

use crate::control_plane::{ControlPlane, FirewallRule};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rigging_types::RunMode;
use std::net::IpAddr;
use tracing::{info, instrument, warn};

/// Prefix of generated firewall rule names
pub const RULE_PREFIX: &str = "ClientIP-";

/// Discovers the caller's public network address
#[async_trait]
pub trait AddressLookup: Send + Sync {
    async fn public_address(&self) -> Result<IpAddr>;
}

/// Result of the network step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkAccess {
    /// Not an interactive run
    Skipped,
    /// Rule created
    Opened(FirewallRule),
    /// Lookup or rule creation failed; logged and ignored
    Failed(String),
}

/// Rule name unique per invocation
pub fn rule_name(at: DateTime<Utc>) -> String {
    format!("{}{}", RULE_PREFIX, at.format("%Y%m%d%H%M%S"))
}

/// Server name is the first label of its fully-qualified domain name
pub fn server_name_from_fqdn(fqdn: &str) -> &str {
    fqdn.split('.').next().unwrap_or(fqdn)
}

pub struct NetworkAccessConfigurer<'a> {
    control_plane: &'a dyn ControlPlane,
    lookup: &'a dyn AddressLookup,
}

impl<'a> NetworkAccessConfigurer<'a> {
    pub fn new(control_plane: &'a dyn ControlPlane, lookup: &'a dyn AddressLookup) -> Self {
        Self {
            control_plane,
            lookup,
        }
    }

    /// Open the operator's address on `server_fqdn`; never fails the run
    #[instrument(skip(self))]
    pub async fn configure(
        &self,
        mode: RunMode,
        resource_group: &str,
        server_fqdn: &str,
    ) -> NetworkAccess {
        if !mode.is_interactive() {
            return NetworkAccess::Skipped;
        }

        match self.open(resource_group, server_fqdn).await {
            Ok(rule) => {
                info!(rule = %rule.name, address = %rule.start, "Firewall rule created");
                NetworkAccess::Opened(rule)
            }
            Err(e) => {
                warn!(error = %e, "Could not open firewall for this machine; continuing");
                NetworkAccess::Failed(e.to_string())
            }
        }
    }

    async fn open(&self, resource_group: &str, server_fqdn: &str) -> Result<FirewallRule> {
        let address = self.lookup.public_address().await?;
        let rule = FirewallRule {
            name: rule_name(Utc::now()),
            start: address,
            end: address,
        };
        self.control_plane
            .create_firewall_rule(resource_group, server_name_from_fqdn(server_fqdn), &rule)
            .await?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ControlPlaneCall, InMemoryControlPlane, StaticAddressLookup};
    use chrono::TimeZone;

    #[test]
    fn test_rule_name_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 5, 9).unwrap();
        assert_eq!(rule_name(at), "ClientIP-20261019080509");
    }

    #[test]
    fn test_server_name_from_fqdn() {
        assert_eq!(
            server_name_from_fqdn("sql-expenses.database.windows.net"),
            "sql-expenses"
        );
        assert_eq!(server_name_from_fqdn("localhost"), "localhost");
    }

    #[tokio::test]
    async fn test_automated_runs_skip() {
        let plane = InMemoryControlPlane::new();
        let lookup = StaticAddressLookup::new("203.0.113.7".parse().unwrap());

        let result = NetworkAccessConfigurer::new(&plane, &lookup)
            .configure(RunMode::Automated, "rg", "sql-x.database.windows.net")
            .await;
        assert_eq!(result, NetworkAccess::Skipped);
        assert!(plane.calls().is_empty());
    }

    #[tokio::test]
    async fn test_interactive_opens_single_address() {
        let plane = InMemoryControlPlane::new();
        let lookup = StaticAddressLookup::new("203.0.113.7".parse().unwrap());

        let result = NetworkAccessConfigurer::new(&plane, &lookup)
            .configure(RunMode::Interactive, "rg", "sql-x.database.windows.net")
            .await;

        let NetworkAccess::Opened(rule) = result else {
            panic!("expected rule, got {:?}", result);
        };
        assert_eq!(rule.start, rule.end);
        assert!(rule.name.starts_with(RULE_PREFIX));

        match &plane.calls()[0] {
            ControlPlaneCall::CreateFirewallRule { server_name, .. } => {
                assert_eq!(server_name, "sql-x")
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_absorbed() {
        let plane = InMemoryControlPlane::new();
        let lookup = StaticAddressLookup::unreachable();

        let result = NetworkAccessConfigurer::new(&plane, &lookup)
            .configure(RunMode::Interactive, "rg", "sql-x.database.windows.net")
            .await;
        assert!(matches!(result, NetworkAccess::Failed(_)));
        assert!(plane.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rule_creation_failure_is_absorbed() {
        let plane = InMemoryControlPlane::new().failing("create_firewall_rule");
        let lookup = StaticAddressLookup::new("198.51.100.4".parse().unwrap());

        let result = NetworkAccessConfigurer::new(&plane, &lookup)
            .configure(RunMode::Interactive, "rg", "sql-x.database.windows.net")
            .await;
        assert!(matches!(result, NetworkAccess::Failed(_)));
    }
}
