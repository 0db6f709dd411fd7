// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OAuth2 / OpenID Connect configuration
//!
//! Two independent sections:
//!
//! - `client.registration.<id>`: OAuth2 clients used by the browser login
//!   (authorization code flow). The registration id appears in the login
//!   URLs, e.g. `/oauth2/authorization/keycloak`.
//! - `resourceserver.jwt`: how bearer tokens presented to `/api/**` are
//!   validated.
//!
//! ```yaml
//! oauth2:
//!   client:
//!     registration:
//!       keycloak:
//!         client_id: hello-app
//!         client_secret: change-me
//!         provider:
//!           issuer_uri: http://localhost:8081/realms/demo
//!   resourceserver:
//!     jwt:
//!       issuer_uri: http://localhost:8081/realms/demo
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Placeholder replaced by the externally visible base URL of the server
pub const BASE_URL_PLACEHOLDER: &str = "{baseUrl}";
/// Placeholder replaced by the registration id
pub const REGISTRATION_ID_PLACEHOLDER: &str = "{registrationId}";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuth2Config {
    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub resourceserver: ResourceServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Client registrations keyed by registration id
    #[serde(default = "default_registrations")]
    pub registration: BTreeMap<String, ClientRegistration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            registration: default_registrations(),
        }
    }
}

fn default_registrations() -> BTreeMap<String, ClientRegistration> {
    let mut registrations = BTreeMap::new();
    registrations.insert("keycloak".to_string(), ClientRegistration::default());
    registrations
}

/// An OAuth2 client registered at an OpenID provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,

    /// Confidential clients authenticate with HTTP Basic at the token
    /// endpoint. Public clients leave this empty and rely on PKCE alone.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Name shown on the login page. Defaults to the registration id.
    #[serde(default)]
    pub client_name: Option<String>,

    #[serde(default = "default_scope")]
    pub scope: Vec<String>,

    /// Redirect URI template, `{baseUrl}` and `{registrationId}` are expanded.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Claim used as principal name for browser logins
    #[serde(default = "default_user_name_attribute")]
    pub user_name_attribute: String,

    /// Merge the userinfo endpoint claims into the ID token claims
    #[serde(default = "default_fetch_userinfo")]
    pub fetch_userinfo: bool,

    #[serde(default)]
    pub provider: ProviderConfig,
}

impl ClientRegistration {
    pub fn display_name<'a>(&'a self, registration_id: &'a str) -> &'a str {
        self.client_name.as_deref().unwrap_or(registration_id)
    }

    /// Expand the redirect URI template
    pub fn expand_redirect_uri(&self, base_url: &str, registration_id: &str) -> String {
        self.redirect_uri
            .replace(BASE_URL_PLACEHOLDER, base_url.trim_end_matches('/'))
            .replace(REGISTRATION_ID_PLACEHOLDER, registration_id)
    }
}

impl Default for ClientRegistration {
    fn default() -> Self {
        Self {
            client_id: "hello-app".to_string(),
            client_secret: None,
            client_name: Some("Keycloak".to_string()),
            scope: default_scope(),
            redirect_uri: default_redirect_uri(),
            user_name_attribute: default_user_name_attribute(),
            fetch_userinfo: default_fetch_userinfo(),
            provider: ProviderConfig::default(),
        }
    }
}

fn default_scope() -> Vec<String> {
    vec!["openid".to_string(), "profile".to_string(), "email".to_string()]
}

fn default_redirect_uri() -> String {
    format!(
        "{}/login/oauth2/code/{}",
        BASE_URL_PLACEHOLDER, REGISTRATION_ID_PLACEHOLDER
    )
}

fn default_user_name_attribute() -> String {
    "sub".to_string()
}

fn default_fetch_userinfo() -> bool {
    true
}

/// Location of the OpenID provider.
///
/// With only `issuer_uri` set, the endpoints come from the provider's
/// discovery document. Explicit endpoints take precedence over discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_issuer_uri")]
    pub issuer_uri: Option<String>,

    #[serde(default)]
    pub authorization_uri: Option<String>,

    #[serde(default)]
    pub token_uri: Option<String>,

    #[serde(default)]
    pub jwk_set_uri: Option<String>,

    #[serde(default)]
    pub user_info_uri: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            issuer_uri: default_issuer_uri(),
            authorization_uri: None,
            token_uri: None,
            jwk_set_uri: None,
            user_info_uri: None,
        }
    }
}

fn default_issuer_uri() -> Option<String> {
    Some("http://localhost:8081/realms/demo".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceServerConfig {
    #[serde(default)]
    pub jwt: JwtResourceServerConfig,
}

/// Bearer token validation settings for the API chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtResourceServerConfig {
    /// Expected `iss`; also used to discover the JWKS location
    #[serde(default = "default_issuer_uri")]
    pub issuer_uri: Option<String>,

    /// Explicit JWKS location, skips discovery
    #[serde(default)]
    pub jwk_set_uri: Option<String>,

    /// Accepted `aud` values. Empty means the audience is not checked.
    #[serde(default)]
    pub audiences: Vec<String>,

    /// Claim used as principal name for API callers
    #[serde(default = "default_user_name_attribute")]
    pub principal_claim_name: String,

    #[serde(default = "default_jws_algorithms")]
    pub jws_algorithms: Vec<String>,

    /// Tolerance applied to `exp` and `nbf`
    #[serde(default = "default_clock_skew_secs")]
    pub clock_skew_secs: u64,

    /// Minimum age of the cached key set before it is fetched again
    #[serde(default = "default_jwks_refresh_secs")]
    pub jwks_refresh_secs: u64,

    /// Timeout of every call to the provider
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for JwtResourceServerConfig {
    fn default() -> Self {
        Self {
            issuer_uri: default_issuer_uri(),
            jwk_set_uri: None,
            audiences: Vec::new(),
            principal_claim_name: default_user_name_attribute(),
            jws_algorithms: default_jws_algorithms(),
            clock_skew_secs: default_clock_skew_secs(),
            jwks_refresh_secs: default_jwks_refresh_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_jws_algorithms() -> Vec<String> {
    vec!["RS256".to_string()]
}

fn default_clock_skew_secs() -> u64 {
    60
}

fn default_jwks_refresh_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_uri_template_is_expanded() {
        let registration = ClientRegistration::default();
        assert_eq!(
            registration.expand_redirect_uri("http://localhost:8080/", "keycloak"),
            "http://localhost:8080/login/oauth2/code/keycloak"
        );
    }

    #[test]
    fn minimal_registration_gets_defaults() {
        let registration: ClientRegistration =
            serde_yml::from_str("client_id: demo\n").expect("valid yaml");
        assert_eq!(registration.client_id, "demo");
        assert_eq!(registration.scope, vec!["openid", "profile", "email"]);
        assert_eq!(registration.user_name_attribute, "sub");
        assert_eq!(registration.display_name("other"), "other");
        assert!(registration.client_secret.is_none());
    }
}
