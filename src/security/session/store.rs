// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory session store
//!
//! Sessions are only created by a completed login, removed by logout or
//! expiry, and updated when an authorized client token is refreshed.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{Duration, Utc};
use log::{debug, trace};

use super::types::{PendingAuthorization, Session};
use crate::config::SessionConfig;
use crate::security::csrf;
use crate::security::identity::{AuthenticatedIdentity, AuthorizedClientToken};
use crate::security::random_token;

/// Pending logins held at once before the oldest are dropped
pub const MAX_PENDING_AUTHORIZATIONS: usize = 10_000;

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    pending: RwLock<HashMap<String, PendingAuthorization>>,
    timeout: Duration,
    pending_ttl: Duration,
    max_pending: usize,
}

impl SessionStore {
    pub fn new(timeout: Duration, pending_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pending: RwLock::new(HashMap::new()),
            timeout,
            pending_ttl,
            max_pending: MAX_PENDING_AUTHORIZATIONS,
        }
    }

    pub fn with_pending_limit(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            Duration::seconds(config.timeout_secs as i64),
            Duration::seconds(config.authorization_request_ttl_secs as i64),
        )
    }

    pub fn pending_ttl(&self) -> Duration {
        self.pending_ttl
    }

    /// Create a session under a fresh id.
    pub fn create(
        &self,
        identity: AuthenticatedIdentity,
        authorized_client: Option<AuthorizedClientToken>,
        id_token: Option<String>,
    ) -> Session {
        let now = Utc::now();
        let mut authorized_clients = HashMap::new();
        if let Some(client) = authorized_client {
            authorized_clients.insert(client.registration_id.clone(), client);
        }
        let session = Session {
            id: random_token(32),
            identity,
            csrf_token: csrf::generate_token(),
            authorized_clients,
            id_token,
            created_at: now,
            last_accessed: now,
            expires_at: now + self.timeout,
        };
        debug!("Created session for {}", session.identity.name);
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id.clone(), session.clone());
        session
    }

    /// Fetch a live session and refresh its idle expiry.
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get_mut(id)?;
        if session.is_expired(now) {
            trace!("Session for {} expired", session.identity.name);
            sessions.remove(id);
            return None;
        }
        session.touch(now, self.timeout);
        Some(session.clone())
    }

    /// Replace the authorized client token of a live session.
    pub fn update_authorized_client(&self, id: &str, token: AuthorizedClientToken) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        match sessions.get_mut(id) {
            Some(session) if !session.is_expired(Utc::now()) => {
                session
                    .authorized_clients
                    .insert(token.registration_id.clone(), token);
                true
            }
            _ => false,
        }
    }

    pub fn delete(&self, id: &str) -> Option<Session> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(session) = &removed {
            debug!("Deleted session for {}", session.identity.name);
        }
        removed
    }

    /// Store a pending authorization, dropping the oldest ones when the table is full.
    pub fn save_pending(&self, pending: PendingAuthorization) {
        let mut table = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        if table.len() >= self.max_pending {
            let now = Utc::now();
            table.retain(|_, p| !p.is_expired(now));
        }
        while table.len() >= self.max_pending {
            let oldest = table
                .values()
                .min_by_key(|p| p.expires_at)
                .map(|p| p.state.clone());
            match oldest {
                Some(state) => {
                    debug!("Pending authorization table full, dropping the oldest entry");
                    table.remove(&state);
                }
                None => break,
            }
        }
        table.insert(pending.state.clone(), pending);
    }

    /// Forget a pending authorization that will never be completed.
    pub fn remove_pending(&self, state: &str) -> bool {
        self.pending
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)
            .is_some()
    }

    /// Remove and return a pending authorization. A state can only be used once.
    pub fn take_pending(&self, state: &str) -> Option<PendingAuthorization> {
        let pending = self
            .pending
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(state)?;
        if pending.is_expired(Utc::now()) {
            debug!("Authorization request for {} expired", pending.registration_id);
            return None;
        }
        Some(pending)
    }

    /// Drop expired sessions and pending authorizations, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut evicted = 0;
        {
            let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            let before = sessions.len();
            sessions.retain(|_, session| !session.is_expired(now));
            evicted += before - sessions.len();
        }
        {
            let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
            let before = pending.len();
            pending.retain(|_, p| !p.is_expired(now));
            evicted += before - pending.len();
        }
        evicted
    }

    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
