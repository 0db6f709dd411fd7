// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Access tokens obtained at login, refreshed when they expire

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info};

use super::ClientRegistry;
use crate::security::error::AuthError;
use crate::security::identity::AuthorizedClientToken;
use crate::security::session::{Session, SessionStore};

/// Tokens are refreshed this long before they actually expire
pub const REFRESH_SKEW_SECS: i64 = 60;

pub struct AuthorizedClientManager {
    clients: Arc<ClientRegistry>,
    store: Arc<SessionStore>,
}

impl AuthorizedClientManager {
    pub fn new(clients: Arc<ClientRegistry>, store: Arc<SessionStore>) -> Self {
        Self { clients, store }
    }

    /// Usable access token of `registration_id` for the session.
    ///
    /// An expired token is refreshed and written back to the session. Any
    /// failure is reported as [`AuthError::Unauthenticated`] so the caller
    /// sends the browser through the login again.
    pub async fn authorize(
        &self,
        session: &Session,
        registration_id: &str,
    ) -> Result<AuthorizedClientToken, AuthError> {
        let current = session
            .authorized_client(registration_id)
            .ok_or(AuthError::Unauthenticated)?;

        if !current.is_expired(Utc::now(), Duration::seconds(REFRESH_SKEW_SECS)) {
            return Ok(current.clone());
        }

        if current.refresh_token.is_none() {
            debug!(
                "Access token for {} expired and no refresh token is held",
                registration_id
            );
            return Err(AuthError::Unauthenticated);
        }

        let client = self
            .clients
            .get(registration_id)
            .ok_or(AuthError::Unauthenticated)?;
        let refreshed = client
            .refresh(current)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        if !self
            .store
            .update_authorized_client(&session.id, refreshed.clone())
        {
            return Err(AuthError::Unauthenticated);
        }
        info!(
            "Refreshed access token of {} for {}",
            registration_id, session.identity.name
        );
        Ok(refreshed)
    }
}
