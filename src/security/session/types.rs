// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session records

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::security::identity::{AuthenticatedIdentity, AuthorizedClientToken};

/// A logged-in browser
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub identity: AuthenticatedIdentity,
    /// Synchronizer token for state changing requests
    pub csrf_token: String,
    /// Tokens obtained at login, keyed by registration id
    pub authorized_clients: HashMap<String, AuthorizedClientToken>,
    /// Raw ID token of the login
    pub id_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Slide the idle expiry forward
    pub fn touch(&mut self, now: DateTime<Utc>, timeout: Duration) {
        self.last_accessed = now;
        self.expires_at = now + timeout;
    }

    pub fn authorized_client(&self, registration_id: &str) -> Option<&AuthorizedClientToken> {
        self.authorized_clients.get(registration_id)
    }
}

/// Authorization request waiting for its callback, keyed by `state`
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub state: String,
    pub registration_id: String,
    pub nonce: String,
    pub code_verifier: String,
    /// Redirect URI sent to the provider, must be repeated at the token endpoint
    pub redirect_uri: String,
    /// Local path to return to after login
    pub continue_to: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl PendingAuthorization {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
