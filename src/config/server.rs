// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web server configuration
//!
//! Network binding, TLS material and the key Rocket uses to encrypt private
//! cookies.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Configuration of the HTTP server.
///
/// For HTTPS both `cert` and `key` must be provided as Base64-encoded PEM
/// files. If either is missing the server runs plain HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The TCP port the server listens on. Default is 8080.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the server binds to. Default is "127.0.0.1".
    #[serde(default = "default_address")]
    pub address: String,

    /// The server name reported in the `Server` header.
    #[serde(default = "default_name")]
    pub name: String,

    /// Base64 encoded key (at least 32 bytes) for private cookie encryption.
    ///
    /// Session ids and pending login bindings live in private cookies, so
    /// changing this key logs every browser out.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// SSL/TLS certificate chain in PEM format, Base64 encoded.
    #[serde(default)]
    pub cert: Option<String>,

    /// SSL/TLS private key in PEM format, Base64 encoded.
    #[serde(default)]
    pub key: Option<String>,

    /// Externally visible base URL, e.g. `https://hello.example.com`.
    ///
    /// Used to build the OAuth2 `redirect_uri`. When absent it is derived
    /// from the `Host` header of each request.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    format!("RustOidcHello/{}", env!("CARGO_PKG_VERSION"))
}

/// A new random 256 bit key every time a default configuration is generated
fn default_secret_key() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let secret: [u8; 32] = rng.random();
    base64::engine::general_purpose::STANDARD.encode(secret)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
            secret_key: default_secret_key(),
            cert: None,
            key: None,
            public_base_url: None,
        }
    }
}
