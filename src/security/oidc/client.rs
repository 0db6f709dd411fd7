// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authorization code flow for one client registration
//!
//! ```text
//! browser ── GET /oauth2/authorization/{id} ──▶ authorization_request()
//!         ◀─ 302 provider authorize endpoint (state, nonce, code_challenge)
//! browser ── GET /login/oauth2/code/{id}?code&state ──▶ authenticate()
//!                 ├─ token endpoint (code + code_verifier)
//!                 ├─ ID token validation (signature, iss, aud, exp, nonce)
//!                 └─ userinfo endpoint (optional, same subject)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use super::discovery::ProviderDiscovery;
use super::pkce::{Pkce, CODE_CHALLENGE_METHOD};
use crate::config::ClientRegistration;
use crate::security::error::AuthError;
use crate::security::identity::{AuthenticatedIdentity, AuthorizedClientToken};
use crate::security::jwt::{Claims, JwtDecoder};
use crate::security::random_token;
use crate::security::session::PendingAuthorization;

/// Authority granted to every browser login
pub const OIDC_USER_AUTHORITY: &str = "OIDC_USER";

/// Successful token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Expiry instant of a token issued `now` for `expires_in` seconds.
///
/// A lifetime that does not fit a timestamp is treated as no expiry.
pub fn token_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    let secs = expires_in?;
    let expiry =
        Duration::try_seconds(secs).and_then(|lifetime| now.checked_add_signed(lifetime));
    if expiry.is_none() {
        warn!("Ignoring out of range expires_in {}", secs);
    }
    expiry
}

/// Error body of the token endpoint (RFC 6749 section 5.2)
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Resolved provider endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub authorization: String,
    pub token: String,
    pub userinfo: Option<String>,
}

/// Outcome of a completed login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub identity: AuthenticatedIdentity,
    pub authorized_client: AuthorizedClientToken,
    pub id_token: String,
}

pub struct OidcClient {
    registration_id: String,
    registration: ClientRegistration,
    discovery: Option<Arc<ProviderDiscovery>>,
    http: reqwest::Client,
    id_token_decoder: JwtDecoder,
}

impl OidcClient {
    pub fn new(
        registration_id: impl Into<String>,
        registration: ClientRegistration,
        discovery: Option<Arc<ProviderDiscovery>>,
        http: reqwest::Client,
        id_token_decoder: JwtDecoder,
    ) -> Self {
        Self {
            registration_id: registration_id.into(),
            registration,
            discovery,
            http,
            id_token_decoder,
        }
    }

    pub fn registration_id(&self) -> &str {
        &self.registration_id
    }

    pub fn registration(&self) -> &ClientRegistration {
        &self.registration
    }

    /// Configured endpoints win over discovered ones.
    pub async fn endpoints(&self) -> Result<Endpoints, AuthError> {
        let provider = &self.registration.provider;
        if let (Some(authorization), Some(token)) =
            (&provider.authorization_uri, &provider.token_uri)
        {
            return Ok(Endpoints {
                authorization: authorization.clone(),
                token: token.clone(),
                userinfo: provider.user_info_uri.clone(),
            });
        }

        let discovery = self.discovery.as_ref().ok_or_else(|| {
            AuthError::UpstreamProvider(format!(
                "No provider endpoints for registration {}",
                self.registration_id
            ))
        })?;
        let metadata = discovery.metadata().await?;
        Ok(Endpoints {
            authorization: provider
                .authorization_uri
                .clone()
                .unwrap_or_else(|| metadata.authorization_endpoint.clone()),
            token: provider
                .token_uri
                .clone()
                .unwrap_or_else(|| metadata.token_endpoint.clone()),
            userinfo: provider
                .user_info_uri
                .clone()
                .or_else(|| metadata.userinfo_endpoint.clone()),
        })
    }

    /// Start a login: returns the pending request to store and the provider URL.
    pub async fn authorization_request(
        &self,
        base_url: &str,
        continue_to: Option<String>,
        ttl: Duration,
    ) -> Result<(PendingAuthorization, String), AuthError> {
        let endpoints = self.endpoints().await?;
        let pkce = Pkce::generate();
        let pending = PendingAuthorization {
            state: random_token(32),
            registration_id: self.registration_id.clone(),
            nonce: random_token(32),
            code_verifier: pkce.verifier,
            redirect_uri: self
                .registration
                .expand_redirect_uri(base_url, &self.registration_id),
            continue_to,
            expires_at: Utc::now() + ttl,
        };

        let mut url = Url::parse(&endpoints.authorization).map_err(|e| {
            AuthError::UpstreamProvider(format!(
                "Invalid authorization endpoint {}: {}",
                endpoints.authorization, e
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.registration.client_id)
            .append_pair("scope", &self.registration.scope.join(" "))
            .append_pair("state", &pending.state)
            .append_pair("redirect_uri", &pending.redirect_uri)
            .append_pair("nonce", &pending.nonce)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);

        Ok((pending, url.to_string()))
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let endpoints = self.endpoints().await?;
        let mut params: Vec<(&str, &str)> = form.to_vec();
        let mut request = self.http.post(&endpoints.token);
        match &self.registration.client_secret {
            Some(secret) => {
                request = request.basic_auth(&self.registration.client_id, Some(secret));
            }
            None => params.push(("client_id", self.registration.client_id.as_str())),
        }

        let body = serde_urlencoded::to_string(&params).map_err(|e| {
            AuthError::AuthenticationFailed(format!("Unable to encode token request: {}", e))
        })?;
        let response = request
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                AuthError::UpstreamProvider(format!(
                    "Unable to reach token endpoint {}: {}",
                    endpoints.token, e
                ))
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AuthError::UpstreamProvider(format!(
                "Token endpoint returned status {}",
                status
            )));
        }
        if !status.is_success() {
            let detail = match response.json::<TokenErrorResponse>().await {
                Ok(error) => format!(
                    "[{}] {}",
                    error.error,
                    error.error_description.unwrap_or_default()
                ),
                Err(_) => format!("Token endpoint returned status {}", status),
            };
            return Err(AuthError::AuthenticationFailed(detail));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            AuthError::UpstreamProvider(format!("Invalid token response: {}", e))
        })
    }

    /// Exchange the authorization code (with the PKCE verifier) for tokens.
    pub async fn exchange_code(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<TokenResponse, AuthError> {
        debug!(
            "Exchanging authorization code for registration {}",
            self.registration_id
        );
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", pending.redirect_uri.as_str()),
            ("code_verifier", pending.code_verifier.as_str()),
        ])
        .await
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<Map<String, Value>, AuthError> {
        let response = self
            .http
            .get(endpoint)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                AuthError::UpstreamProvider(format!("Unable to reach userinfo endpoint: {}", e))
            })?;
        if !response.status().is_success() {
            return Err(AuthError::UpstreamProvider(format!(
                "Userinfo endpoint returned status {}",
                response.status()
            )));
        }
        response.json::<Map<String, Value>>().await.map_err(|e| {
            AuthError::UpstreamProvider(format!("Invalid userinfo response: {}", e))
        })
    }

    /// Complete the login started by `pending` with the returned `code`.
    pub async fn authenticate(
        &self,
        pending: &PendingAuthorization,
        code: &str,
    ) -> Result<LoginResult, AuthError> {
        let tokens = self.exchange_code(pending, code).await?;

        let id_token = tokens.id_token.clone().ok_or_else(|| {
            AuthError::AuthenticationFailed("Token response has no id_token".to_string())
        })?;
        let claims = self
            .id_token_decoder
            .decode(&id_token)
            .await
            .map_err(|e| match e {
                AuthError::InvalidToken(reason) => {
                    AuthError::AuthenticationFailed(format!("Invalid ID token: {}", reason))
                }
                other => other,
            })?;

        if claims.nonce().as_deref() != Some(pending.nonce.as_str()) {
            return Err(AuthError::AuthenticationFailed(
                "ID token nonce does not match the authorization request".to_string(),
            ));
        }

        let mut merged = claims.0.clone();
        if self.registration.fetch_userinfo {
            if let Some(endpoint) = self.endpoints().await?.userinfo {
                let userinfo = self.fetch_userinfo(&endpoint, &tokens.access_token).await?;
                let userinfo_subject = Claims(userinfo.clone()).subject();
                if userinfo_subject.is_none() || userinfo_subject != claims.subject() {
                    return Err(AuthError::AuthenticationFailed(
                        "Userinfo subject does not match the ID token subject".to_string(),
                    ));
                }
                for (name, value) in userinfo {
                    merged.insert(name, value);
                }
            }
        }

        let scopes: Vec<String> = match &tokens.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.registration.scope.clone(),
        };

        let claims = Claims(merged);
        let name = claims
            .get_string(&self.registration.user_name_attribute)
            .ok_or_else(|| {
                AuthError::AuthenticationFailed(format!(
                    "Missing {} claim for the user name",
                    self.registration.user_name_attribute
                ))
            })?;
        let mut authorities = vec![OIDC_USER_AUTHORITY.to_string()];
        authorities.extend(scopes.iter().map(|s| format!("SCOPE_{}", s)));

        let authorized_client = AuthorizedClientToken {
            registration_id: self.registration_id.clone(),
            principal_name: name.clone(),
            access_token: tokens.access_token,
            token_type: tokens.token_type,
            expires_at: token_expiry(Utc::now(), tokens.expires_in),
            refresh_token: tokens.refresh_token,
            scopes,
        };

        Ok(LoginResult {
            identity: AuthenticatedIdentity {
                name,
                token: None,
                authorities,
                claims: claims.0,
            },
            authorized_client,
            id_token,
        })
    }

    /// Obtain a new access token with the refresh token of `current`.
    pub async fn refresh(
        &self,
        current: &AuthorizedClientToken,
    ) -> Result<AuthorizedClientToken, AuthError> {
        let refresh_token = current.refresh_token.as_deref().ok_or_else(|| {
            AuthError::AuthenticationFailed("No refresh token available".to_string())
        })?;
        let scope = current.scopes.join(" ");
        let tokens = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ])
            .await
            .inspect_err(|e| warn!("Refresh for {} failed: {}", self.registration_id, e))?;

        Ok(AuthorizedClientToken {
            registration_id: current.registration_id.clone(),
            principal_name: current.principal_name.clone(),
            access_token: tokens.access_token,
            token_type: tokens.token_type,
            expires_at: token_expiry(Utc::now(), tokens.expires_in),
            // Providers that do not rotate refresh tokens omit it
            refresh_token: tokens
                .refresh_token
                .or_else(|| current.refresh_token.clone()),
            scopes: match tokens.scope {
                Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
                None => current.scopes.clone(),
            },
        })
    }
}
