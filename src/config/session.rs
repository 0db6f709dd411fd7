// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Browser session settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle timeout in seconds, refreshed on every authenticated request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the session cookie
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,

    /// Interval of the background task evicting expired sessions
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Lifetime of a pending authorization request (login started, callback not yet received)
    #[serde(default = "default_authorization_request_ttl_secs")]
    pub authorization_request_ttl_secs: u64,
}

fn default_timeout_secs() -> u64 {
    1800
}

fn default_cookie_name() -> String {
    "SESSION".to_string()
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_authorization_request_ttl_secs() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            cookie_name: default_cookie_name(),
            secure_cookie: false,
            cleanup_interval_secs: default_cleanup_interval_secs(),
            authorization_request_ttl_secs: default_authorization_request_ttl_secs(),
        }
    }
}
