// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID provider discovery
//!
//! The provider metadata is fetched from
//! `{issuer}/.well-known/openid-configuration` on first use and kept for the
//! lifetime of the process. A failed fetch is retried on the next request.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::security::error::AuthError;

/// Path appended to the issuer to locate the discovery document
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// Subset of the OpenID provider metadata this server relies on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
}

/// Lazily discovered metadata of one issuer
pub struct ProviderDiscovery {
    issuer: String,
    http: reqwest::Client,
    metadata: OnceCell<ProviderMetadata>,
}

fn same_issuer(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

impl ProviderDiscovery {
    pub fn new(issuer: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            issuer: issuer.into(),
            http,
            metadata: OnceCell::new(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn discovery_url(&self) -> String {
        format!("{}{}", self.issuer.trim_end_matches('/'), WELL_KNOWN_PATH)
    }

    /// Provider metadata, fetched on first call.
    pub async fn metadata(&self) -> Result<&ProviderMetadata, AuthError> {
        self.metadata.get_or_try_init(|| self.fetch()).await
    }

    async fn fetch(&self) -> Result<ProviderMetadata, AuthError> {
        let url = self.discovery_url();
        debug!("Fetching OpenID provider configuration from {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            AuthError::UpstreamProvider(format!("Unable to reach {}: {}", url, e))
        })?;
        if !response.status().is_success() {
            return Err(AuthError::UpstreamProvider(format!(
                "Discovery endpoint {} returned status {}",
                url,
                response.status()
            )));
        }
        let metadata: ProviderMetadata = response.json().await.map_err(|e| {
            AuthError::UpstreamProvider(format!("Invalid discovery document at {}: {}", url, e))
        })?;

        if !same_issuer(&metadata.issuer, &self.issuer) {
            return Err(AuthError::UpstreamProvider(format!(
                "Discovered issuer {} does not match configured issuer {}",
                metadata.issuer, self.issuer
            )));
        }

        info!(
            "Discovered OpenID provider {} (jwks: {})",
            metadata.issuer, metadata.jwks_uri
        );
        Ok(metadata)
    }
}
