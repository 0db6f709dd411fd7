// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use jsonwebtoken::Algorithm;
use log::{debug, warn};
use url::Url;

use super::Config;

/// JSON schema the YAML configuration is validated against
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_oidc_hello --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

fn check_url(value: &str, what: &str) -> Result<Url> {
    Url::parse(value).with_context(|| format!("{} is not a valid URL: {}", what, value))
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **TLS**: certificate and key are provided together and are valid base64
/// - **Secret key**: valid base64 encoding at least 32 bytes
/// - **URLs**: issuer, endpoints and public base URL parse as absolute URLs
/// - **Algorithms**: every accepted JWS algorithm is known and asymmetric
/// - **Resource server**: has an issuer or an explicit JWKS location
/// - **Registrations**: each one can locate its provider endpoints
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let server = &config.server;
    match (&server.cert, &server.key) {
        (Some(cert), Some(key)) => {
            base64::engine::general_purpose::STANDARD
                .decode(cert)
                .context("SSL certificate is not valid base64")?;
            base64::engine::general_purpose::STANDARD
                .decode(key)
                .context("SSL key is not valid base64")?;
        }
        (Some(_), None) => anyhow::bail!("SSL certificate provided without a key"),
        (None, Some(_)) => anyhow::bail!("SSL key provided without a certificate"),
        (None, None) => {}
    }

    let secret = base64::engine::general_purpose::STANDARD
        .decode(&server.secret_key)
        .context("Secret key is not valid base64")?;
    if secret.len() < 32 {
        anyhow::bail!(
            "Secret key must be at least 32 bytes, got {} bytes",
            secret.len()
        );
    }

    if server.port == 0 {
        anyhow::bail!("Invalid port number: {}", server.port);
    }

    if !is_valid_ip_address(&server.address) {
        // Host names are accepted by Rocket, only worth a warning
        warn!("Potentially invalid address format: {}", server.address);
    }

    if let Some(base_url) = &server.public_base_url {
        check_url(base_url, "Public base URL")?;
    }

    let jwt = &config.oauth2.resourceserver.jwt;
    if jwt.issuer_uri.is_none() && jwt.jwk_set_uri.is_none() {
        anyhow::bail!("Resource server needs an issuer_uri or a jwk_set_uri");
    }
    if let Some(issuer) = &jwt.issuer_uri {
        check_url(issuer, "Resource server issuer")?;
    }
    if let Some(jwks) = &jwt.jwk_set_uri {
        check_url(jwks, "Resource server JWKS URI")?;
    }
    if jwt.jws_algorithms.is_empty() {
        anyhow::bail!("At least one JWS algorithm must be accepted");
    }
    for name in &jwt.jws_algorithms {
        let algorithm: Algorithm = name
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown JWS algorithm: {}", name))?;
        if matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            anyhow::bail!("Symmetric JWS algorithm {} cannot be validated with a JWKS", name);
        }
    }

    for (id, registration) in &config.oauth2.client.registration {
        if registration.client_id.is_empty() {
            anyhow::bail!("Client registration {} has an empty client_id", id);
        }
        if !registration.scope.iter().any(|s| s == "openid") {
            anyhow::bail!("Client registration {} must request the openid scope", id);
        }
        let provider = &registration.provider;
        if provider.issuer_uri.is_none()
            && (provider.authorization_uri.is_none()
                || provider.token_uri.is_none()
                || provider.jwk_set_uri.is_none())
        {
            anyhow::bail!(
                "Client registration {} needs an issuer_uri or explicit authorization, token and JWKS URIs",
                id
            );
        }
        for (what, uri) in [
            ("issuer", &provider.issuer_uri),
            ("authorization URI", &provider.authorization_uri),
            ("token URI", &provider.token_uri),
            ("JWKS URI", &provider.jwk_set_uri),
            ("userinfo URI", &provider.user_info_uri),
        ] {
            if let Some(uri) = uri {
                check_url(uri, &format!("Client registration {} {}", id, what))?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_addresses() {
        assert!(is_valid_ip_address("127.0.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("not an address"));
    }

    #[test]
    fn default_config_passes_specific_rules() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn short_secret_key_is_rejected() {
        let mut config = Config::default();
        config.server.secret_key = base64::engine::general_purpose::STANDARD.encode([0u8; 8]);
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn hmac_algorithms_are_rejected() {
        let mut config = Config::default();
        config.oauth2.resourceserver.jwt.jws_algorithms = vec!["HS256".to_string()];
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn resource_server_needs_a_key_source() {
        let mut config = Config::default();
        config.oauth2.resourceserver.jwt.issuer_uri = None;
        assert!(validate_specific_rules(&config).is_err());
        config.oauth2.resourceserver.jwt.jwk_set_uri =
            Some("http://localhost:8081/certs".to_string());
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn cert_without_key_is_rejected() {
        let mut config = Config::default();
        config.server.cert = Some("Zm9v".to_string());
        assert!(validate_specific_rules(&config).is_err());
    }
}
