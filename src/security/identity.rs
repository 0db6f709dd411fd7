// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Resolved identities handed to the endpoint handlers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity of the caller once a chain has authenticated the request.
///
/// The API chain fills `token` with the raw bearer token; the Web chain leaves
/// it empty and keeps the ID token claims instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    /// Principal name (the configured name claim, `sub` by default)
    pub name: String,
    /// Raw bearer token, API chain only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Granted authorities such as `SCOPE_profile`
    pub authorities: Vec<String>,
    /// All claims of the token the identity was built from
    pub claims: Map<String, Value>,
}

impl AuthenticatedIdentity {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }

    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(Value::as_str)
    }
}

/// Access token obtained for a client registration on behalf of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedClientToken {
    pub registration_id: String,
    pub principal_name: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub refresh_token: Option<String>,
    pub scopes: Vec<String>,
}

impl AuthorizedClientToken {
    /// A token is treated as expired slightly ahead of time so it is not
    /// handed out seconds before the resource server would refuse it.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + skew >= expires_at,
            None => false,
        }
    }
}
