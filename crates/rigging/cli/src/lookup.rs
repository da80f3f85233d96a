//! Public address lookup over HTTP

use async_trait::async_trait;
use reqwest::Client;
use rigging_orchestrator::{AddressLookup, OrchestratorError, Result};
use std::net::IpAddr;

/// Asks a plain-text echo service for the caller's public address
pub struct HttpAddressLookup {
    client: Client,
    url: String,
}

impl HttpAddressLookup {
    pub fn new(url: &str) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

/// Body of the lookup response
pub fn parse_address(body: &str) -> Result<IpAddr> {
    body.trim().parse().map_err(|_| {
        OrchestratorError::control_plane(
            "public_address",
            format!("unexpected lookup response: {:?}", body.trim()),
        )
    })
}

#[async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn public_address(&self) -> Result<IpAddr> {
        let lookup_error =
            |e: reqwest::Error| OrchestratorError::control_plane("public_address", e.to_string());

        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(lookup_error)?
            .text()
            .await
            .map_err(lookup_error)?;
        parse_address(&body)
    }
}
