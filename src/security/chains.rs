// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! The two security chains and their evaluation
//!
//! ### Evaluation order
//!
//! 1. the firewall rejects non canonical paths (400), raw and decoded
//! 2. the classifier selects the API or the Web chain from the decoded path
//! 3. the selected chain authenticates the request and applies its policy
//!
//! ### API chain
//!
//! Stateless. A bearer token, when present, is always validated, even on
//! permitted paths; an invalid token is never silently ignored. Sessions and
//! CSRF tokens are not consulted.
//!
//! ### Web chain
//!
//! Looks up the server-side session named by the session cookie. Unsafe
//! methods must prove knowledge of the session CSRF token, either in the
//! `X-CSRF-TOKEN` header (checked here) or in the `_csrf` form field (checked
//! by the handler that parses the form).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use jsonwebtoken::Algorithm;
use log::{debug, trace};
use rocket::http::Method;

use super::csrf;
use super::error::{AuthError, TOKEN_VERIFICATION_UNAVAILABLE};
use super::firewall;
use super::identity::AuthenticatedIdentity;
use super::jwt::{parse_algorithms, resolve_bearer_token, JwksCache, JwksLocation, JwtDecoder};
use super::matcher::{ChainKind, RequestClassifier};
use super::oidc::{AuthorizedClientManager, ClientRegistry, OidcClient, ProviderDiscovery};
use super::policy::SecurityPolicy;
use super::session::{Session, SessionStore};
use crate::config::Config;

/// What the handlers see of a request once it passed its chain
#[derive(Debug, Clone)]
pub enum Access {
    /// Permitted path, no credential
    Anonymous,
    /// API chain, validated bearer token
    Bearer(AuthenticatedIdentity),
    /// Web chain, live session
    Session(Session),
}

impl Access {
    pub fn identity(&self) -> Option<&AuthenticatedIdentity> {
        match self {
            Access::Anonymous => None,
            Access::Bearer(identity) => Some(identity),
            Access::Session(session) => Some(&session.identity),
        }
    }
}

/// CSRF state of a Web chain request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsrfStatus {
    /// Safe method or API chain
    NotRequired,
    /// The header carried the session token
    Verified,
    /// Unsafe method without the header, the form field must still be checked
    Pending,
}

/// The request attributes the chains look at
#[derive(Debug, Clone)]
pub struct RequestParts<'a> {
    pub method: Method,
    /// Path as received, still percent-encoded
    pub raw_path: &'a str,
    /// Percent-decoded path, the one routes are matched against
    pub path: &'a str,
    pub query: Option<&'a str>,
    /// Every `Authorization` header value
    pub authorization: Vec<&'a str>,
    /// Session id from the session cookie
    pub session_id: Option<&'a str>,
    /// `X-CSRF-TOKEN` header
    pub csrf_header: Option<&'a str>,
}

impl RequestParts<'_> {
    fn path_and_query(&self) -> String {
        match self.query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.raw_path, query),
            _ => self.raw_path.to_string(),
        }
    }
}

/// Result of running a request through its chain
#[derive(Debug, Clone)]
pub struct SecurityDecision {
    pub chain: ChainKind,
    pub outcome: Result<Access, AuthError>,
    pub csrf: CsrfStatus,
    /// Login entry point for an unauthenticated browser
    pub login_location: Option<String>,
}

/// Bearer token chain for `/api/**`
pub struct ApiChain {
    policy: SecurityPolicy,
    decoder: Arc<JwtDecoder>,
    principal_claim: String,
}

impl ApiChain {
    pub fn new(policy: SecurityPolicy, decoder: Arc<JwtDecoder>, principal_claim: String) -> Self {
        Self {
            policy,
            decoder,
            principal_claim,
        }
    }

    pub fn permit(&self, path: &str) -> bool {
        self.policy.permit(path)
    }

    pub async fn authorize(&self, parts: &RequestParts<'_>) -> Result<Access, AuthError> {
        let token = match resolve_bearer_token(&parts.authorization)? {
            Some(token) => token,
            None if self.permit(parts.path) => return Ok(Access::Anonymous),
            None => return Err(AuthError::Unauthenticated),
        };

        let claims = self.decoder.decode(&token).await.map_err(|e| match e {
            AuthError::UpstreamProvider(reason) => {
                debug!("Unable to verify bearer token: {}", reason);
                AuthError::InvalidToken(TOKEN_VERIFICATION_UNAVAILABLE.to_string())
            }
            other => other,
        })?;
        let identity = claims.into_identity(&self.principal_claim, Some(token))?;
        trace!("Bearer token accepted for {}", identity.name);
        Ok(Access::Bearer(identity))
    }
}

/// Session chain for everything outside `/api/**`
pub struct WebChain {
    policy: SecurityPolicy,
    store: Arc<SessionStore>,
    clients: Arc<ClientRegistry>,
    authorized_clients: AuthorizedClientManager,
}

impl WebChain {
    pub fn new(policy: SecurityPolicy, store: Arc<SessionStore>, clients: Arc<ClientRegistry>) -> Self {
        let authorized_clients = AuthorizedClientManager::new(clients.clone(), store.clone());
        Self {
            policy,
            store,
            clients,
            authorized_clients,
        }
    }

    pub fn permit(&self, path: &str) -> bool {
        self.policy.permit(path)
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    pub fn authorized_clients(&self) -> &AuthorizedClientManager {
        &self.authorized_clients
    }

    fn session(&self, parts: &RequestParts<'_>) -> Option<Session> {
        parts.session_id.and_then(|id| self.store.get(id))
    }

    fn check_csrf(
        &self,
        parts: &RequestParts<'_>,
        session: Option<&Session>,
    ) -> Result<CsrfStatus, AuthError> {
        if csrf::is_safe_method(parts.method) {
            return Ok(CsrfStatus::NotRequired);
        }
        match parts.csrf_header {
            Some(presented) => {
                csrf::verify(session.map(|s| s.csrf_token.as_str()), Some(presented))?;
                Ok(CsrfStatus::Verified)
            }
            None => Ok(CsrfStatus::Pending),
        }
    }

    pub fn authorize(&self, parts: &RequestParts<'_>) -> (Result<Access, AuthError>, CsrfStatus) {
        let session = self.session(parts);

        let csrf = match self.check_csrf(parts, session.as_ref()) {
            Ok(status) => status,
            Err(e) => return (Err(e), CsrfStatus::NotRequired),
        };

        let outcome = match session {
            Some(session) => Ok(Access::Session(session)),
            None if self.permit(parts.path) => Ok(Access::Anonymous),
            None => Err(AuthError::Unauthenticated),
        };
        (outcome, csrf)
    }

    /// Redirect target for a browser that must log in first.
    ///
    /// Only `GET` requests are replayed after login.
    pub fn login_location(&self, parts: &RequestParts<'_>) -> String {
        let continue_to = if parts.method == Method::Get {
            Some(parts.path_and_query())
        } else {
            None
        };
        self.clients.login_entry_point(continue_to.as_deref())
    }
}

/// Both chains plus the classifier choosing between them
pub struct SecurityChains {
    pub classifier: RequestClassifier,
    pub api: ApiChain,
    pub web: WebChain,
}

impl SecurityChains {
    pub fn new(classifier: RequestClassifier, api: ApiChain, web: WebChain) -> Self {
        Self {
            classifier,
            api,
            web,
        }
    }

    /// Wire the chains from the configuration.
    ///
    /// Nothing is fetched from the provider here; discovery and key sets are
    /// loaded on first use so the server starts even when the provider is down.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let jwt = &config.oauth2.resourceserver.jwt;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(jwt.http_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let refresh = Duration::from_secs(jwt.jwks_refresh_secs);

        let mut discoveries: HashMap<String, Arc<ProviderDiscovery>> = HashMap::new();
        let mut discovery_for = |issuer: &str| {
            discoveries
                .entry(issuer.to_string())
                .or_insert_with(|| Arc::new(ProviderDiscovery::new(issuer, http.clone())))
                .clone()
        };
        let mut key_sets: HashMap<String, Arc<JwksCache>> = HashMap::new();
        let mut key_set_for = |key: String, location: JwksLocation| {
            key_sets
                .entry(key)
                .or_insert_with(|| Arc::new(JwksCache::new(location, http.clone(), refresh)))
                .clone()
        };

        let api_jwks = match (&jwt.jwk_set_uri, &jwt.issuer_uri) {
            (Some(uri), _) => key_set_for(format!("uri:{}", uri), JwksLocation::Uri(uri.clone())),
            (None, Some(issuer)) => key_set_for(
                format!("issuer:{}", issuer),
                JwksLocation::Discovered(discovery_for(issuer)),
            ),
            (None, None) => anyhow::bail!("Resource server needs an issuer_uri or a jwk_set_uri"),
        };
        let api_decoder = JwtDecoder::new(
            api_jwks,
            parse_algorithms(&jwt.jws_algorithms)?,
            jwt.issuer_uri.clone(),
            jwt.audiences.clone(),
            jwt.clock_skew_secs,
        );
        let api = ApiChain::new(
            SecurityPolicy::api(),
            Arc::new(api_decoder),
            jwt.principal_claim_name.clone(),
        );

        let mut clients = ClientRegistry::new();
        for (id, registration) in &config.oauth2.client.registration {
            let provider = &registration.provider;
            let discovery = provider.issuer_uri.as_deref().map(&mut discovery_for);
            let jwks = match (&provider.jwk_set_uri, &discovery) {
                (Some(uri), _) => {
                    key_set_for(format!("uri:{}", uri), JwksLocation::Uri(uri.clone()))
                }
                (None, Some(discovery)) => key_set_for(
                    format!("issuer:{}", discovery.issuer()),
                    JwksLocation::Discovered(discovery.clone()),
                ),
                (None, None) => anyhow::bail!(
                    "Client registration {} needs an issuer_uri or a jwk_set_uri",
                    id
                ),
            };
            let id_token_decoder = JwtDecoder::new(
                jwks,
                vec![Algorithm::RS256],
                provider.issuer_uri.clone(),
                vec![registration.client_id.clone()],
                jwt.clock_skew_secs,
            );
            debug!("Registered OAuth2 client {} ({})", id, registration.client_id);
            clients.register(OidcClient::new(
                id.clone(),
                registration.clone(),
                discovery,
                http.clone(),
                id_token_decoder,
            ));
        }

        let store = Arc::new(SessionStore::from_config(&config.session));
        let web = WebChain::new(SecurityPolicy::web(), store, Arc::new(clients));

        Ok(Self::new(RequestClassifier::default(), api, web))
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        self.web.store()
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        self.web.clients()
    }

    /// Run a request through the firewall and its chain.
    pub async fn evaluate(&self, parts: &RequestParts<'_>) -> SecurityDecision {
        let chain = self.classifier.classify(parts.path);

        let checked =
            firewall::check_path(parts.raw_path).and_then(|_| firewall::check_path(parts.path));
        if let Err(e) = checked {
            debug!("Firewall rejected {}: {}", parts.raw_path, e);
            return SecurityDecision {
                chain,
                outcome: Err(e),
                csrf: CsrfStatus::NotRequired,
                login_location: None,
            };
        }

        let decision = match chain {
            ChainKind::Api => SecurityDecision {
                chain,
                outcome: self.api.authorize(parts).await,
                csrf: CsrfStatus::NotRequired,
                login_location: None,
            },
            ChainKind::Web => {
                let (outcome, csrf) = self.web.authorize(parts);
                let login_location = match &outcome {
                    Err(e) if e.is_unauthenticated() => Some(self.web.login_location(parts)),
                    _ => None,
                };
                SecurityDecision {
                    chain,
                    outcome,
                    csrf,
                    login_location,
                }
            }
        };

        if let Err(e) = &decision.outcome {
            debug!("{} chain refused {} {}: {}", chain, parts.method, parts.path, e);
        }
        decision
    }
}
