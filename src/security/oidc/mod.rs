// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! OpenID Connect login for browsers

pub mod authorized_client;
pub mod client;
pub mod discovery;
pub mod pkce;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use authorized_client::AuthorizedClientManager;
pub use client::{LoginResult, OidcClient, TokenResponse};
pub use discovery::{ProviderDiscovery, ProviderMetadata};

/// All client registrations, keyed by registration id
#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, Arc<OidcClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: OidcClient) {
        self.clients
            .insert(client.registration_id().to_string(), Arc::new(client));
    }

    pub fn get(&self, registration_id: &str) -> Option<Arc<OidcClient>> {
        self.clients.get(registration_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// `(registration id, display name)` pairs for the login page
    pub fn entries(&self) -> Vec<(String, String)> {
        self.clients
            .iter()
            .map(|(id, client)| (id.clone(), client.registration().display_name(id).to_string()))
            .collect()
    }

    /// Where an unauthenticated browser is sent to log in.
    ///
    /// With a single registration the login page is skipped.
    pub fn login_entry_point(&self, continue_to: Option<&str>) -> String {
        let base = match (self.clients.len(), self.clients.keys().next()) {
            (1, Some(id)) => format!("/oauth2/authorization/{}", id),
            _ => "/login".to_string(),
        };
        match continue_to {
            Some(target) => {
                let query = serde_urlencoded::to_string(&[("continue", target)])
                    .unwrap_or_default();
                format!("{}?{}", base, query)
            }
            None => base,
        }
    }
}

/// A `continue` target is only honoured for local absolute paths.
pub fn safe_continue_target(target: Option<&str>) -> Option<String> {
    let target = target?;
    if target.starts_with('/') && !target.starts_with("//") && !target.contains('\\') {
        Some(target.to_string())
    } else {
        None
    }
}
