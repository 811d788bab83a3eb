//! Managed identity token acquisition via the Azure Instance Metadata
//! Service (IMDS).
//!
//! One unauthenticated GET against the link-local metadata endpoint with the
//! mandatory `Metadata: true` header. The request is bounded by a short
//! timeout because the address is only routable from inside the Azure
//! compute fabric; anywhere else it must fail fast. Tokens are short-lived
//! and never cached here; callers refetch per connection attempt.

use crate::constants::{
    AZURE_SQL_RESOURCE, IMDS_API_VERSION, IMDS_TOKEN_ENDPOINT, METADATA_REQUEST_TIMEOUT,
};
use crate::error::ProviderError;
use serde::Deserialize;
use tracing::debug;

/// A bearer token for Azure SQL Database.
///
/// Opaque newtype so the secret never leaks through `Debug` output or logs.
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for handing to the driver.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Token response body from IMDS. Other fields (expiry, resource, token
/// type) are present in real responses but unused here.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Fetches managed identity tokens from the instance-metadata endpoint.
pub struct ImdsCredentialSource {
    client: reqwest::Client,
    endpoint: String,
}

impl ImdsCredentialSource {
    /// Credential source against the well-known link-local endpoint.
    pub fn new() -> Self {
        Self::with_endpoint(IMDS_TOKEN_ENDPOINT)
    }

    /// Credential source against a custom endpoint. Used by tests to point
    /// at a mock metadata server.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(METADATA_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Fetch a fresh bearer token for Azure SQL Database.
    ///
    /// A single attempt; any transport error, non-2xx status, or malformed
    /// body is terminal for this resolution cycle. A well-formed body
    /// without a usable `access_token` is [`ProviderError::MissingToken`].
    pub async fn fetch_token(&self) -> Result<AccessToken, ProviderError> {
        debug!(endpoint = %self.endpoint, "requesting managed identity token");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api-version", IMDS_API_VERSION),
                ("resource", AZURE_SQL_RESOURCE),
            ])
            // Required marker header; IMDS rejects requests without it.
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| {
                ProviderError::credential_fetch_with_source(
                    "metadata service request failed",
                    e,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::credential_fetch(format!(
                "metadata service returned status {status}"
            )));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::credential_fetch_with_source(
                "malformed metadata service response",
                e,
            )
        })?;

        match body.access_token {
            Some(token) if !token.is_empty() => {
                debug!("managed identity token acquired");
                Ok(AccessToken::new(token))
            }
            _ => Err(ProviderError::MissingToken),
        }
    }
}

impl Default for ImdsCredentialSource {
    fn default() -> Self {
        Self::new()
    }
}
