// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Provider signing keys
//!
//! The JSON Web Key Set is fetched lazily, cached by `kid`, and fetched again
//! when the cache is older than the refresh interval or when a token names a
//! `kid` the cache does not know (key rotation). Unknown `kid` refreshes are
//! rate limited so forged tokens cannot make the server hammer the provider.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::security::error::AuthError;
use crate::security::oidc::discovery::ProviderDiscovery;

/// Minimum delay between two fetches triggered by an unknown `kid`
pub const MIN_REFRESH_GAP: Duration = Duration::from_secs(10);

/// Where the key set comes from
#[derive(Clone)]
pub enum JwksLocation {
    /// Explicit `jwk_set_uri`
    Uri(String),
    /// `jwks_uri` of the discovered provider metadata
    Discovered(Arc<ProviderDiscovery>),
}

/// JWKS document
#[derive(Debug, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// A single JSON Web Key, only the members needed to verify signatures
#[derive(Debug, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub kid: Option<String>,
    pub alg: Option<String>,
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
    pub crv: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl Jwk {
    fn to_decoding_key(&self) -> anyhow::Result<DecodingKey> {
        let missing = |member: &str| anyhow::anyhow!("{} key missing '{}'", self.kty, member);
        match self.kty.as_str() {
            "RSA" => {
                let n = self.n.as_deref().ok_or_else(|| missing("n"))?;
                let e = self.e.as_deref().ok_or_else(|| missing("e"))?;
                Ok(DecodingKey::from_rsa_components(n, e)?)
            }
            "EC" => {
                let x = self.x.as_deref().ok_or_else(|| missing("x"))?;
                let y = self.y.as_deref().ok_or_else(|| missing("y"))?;
                Ok(DecodingKey::from_ec_components(x, y)?)
            }
            "OKP" => {
                let x = self.x.as_deref().ok_or_else(|| missing("x"))?;
                Ok(DecodingKey::from_ed_components(x)?)
            }
            other => Err(anyhow::anyhow!("Unsupported key type {}", other)),
        }
    }
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

/// Cache of the provider signing keys
pub struct JwksCache {
    location: JwksLocation,
    http: reqwest::Client,
    refresh_interval: Duration,
    cache: RwLock<CachedKeys>,
    refresh_lock: Mutex<()>,
}

impl JwksCache {
    pub fn new(location: JwksLocation, http: reqwest::Client, refresh_interval: Duration) -> Self {
        Self {
            location,
            http,
            refresh_interval,
            cache: RwLock::new(CachedKeys {
                keys: HashMap::new(),
                fetched_at: None,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    fn age(&self) -> Option<Duration> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .fetched_at
            .map(|at| at.elapsed())
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        match kid {
            Some(kid) => cache.keys.get(kid).cloned(),
            // Without a kid the key set must be unambiguous
            None if cache.keys.len() == 1 => cache.keys.values().next().cloned(),
            None => None,
        }
    }

    pub fn key_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys
            .len()
    }

    /// Decoding key for a token header `kid`.
    ///
    /// Provider failures surface as [`AuthError::UpstreamProvider`], a key that
    /// is still unknown after a refresh as [`AuthError::InvalidToken`].
    pub async fn key_for(&self, kid: Option<&str>) -> Result<DecodingKey, AuthError> {
        match self.age() {
            Some(age) if age < self.refresh_interval => {}
            _ => self.refresh(None).await?,
        }

        if let Some(key) = self.lookup(kid) {
            return Ok(key);
        }

        debug!("Signing key {:?} not in cache, refreshing key set", kid);
        self.refresh(Some(MIN_REFRESH_GAP)).await?;

        self.lookup(kid).ok_or_else(|| match kid {
            Some(kid) => AuthError::InvalidToken(format!("Signing key {} is not trusted", kid)),
            None => AuthError::InvalidToken(
                "Token has no kid and the key set holds several keys".to_string(),
            ),
        })
    }

    /// Fetch the key set unless another caller did so within `min_age`.
    async fn refresh(&self, min_age: Option<Duration>) -> Result<(), AuthError> {
        let _guard = self.refresh_lock.lock().await;

        if let (Some(age), Some(min_age)) = (self.age(), min_age) {
            if age < min_age {
                debug!("Key set fetched {:?} ago, skipping refresh", age);
                return Ok(());
            }
        }
        // Another task may have refreshed while this one waited for the lock
        if min_age.is_none() {
            if let Some(age) = self.age() {
                if age < self.refresh_interval {
                    return Ok(());
                }
            }
        }

        let keys = self.fetch().await?;
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.keys = keys;
        cache.fetched_at = Some(Instant::now());
        Ok(())
    }

    async fn jwks_url(&self) -> Result<String, AuthError> {
        match &self.location {
            JwksLocation::Uri(uri) => Ok(uri.clone()),
            JwksLocation::Discovered(discovery) => {
                Ok(discovery.metadata().await?.jwks_uri.clone())
            }
        }
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        let url = self.jwks_url().await?;
        debug!("Fetching JWKS from {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            AuthError::UpstreamProvider(format!("Unable to fetch JWKS from {}: {}", url, e))
        })?;
        if !response.status().is_success() {
            return Err(AuthError::UpstreamProvider(format!(
                "JWKS endpoint {} returned status {}",
                url,
                response.status()
            )));
        }
        let jwks: Jwks = response.json().await.map_err(|e| {
            AuthError::UpstreamProvider(format!("Invalid JWKS document at {}: {}", url, e))
        })?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if jwk.key_use.as_deref() == Some("enc") {
                continue;
            }
            match jwk.to_decoding_key() {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_default();
                    debug!("Loaded {} key {:?} ({:?})", jwk.kty, jwk.kid, jwk.alg);
                    keys.insert(kid, key);
                }
                Err(e) => warn!("Skipping unusable JWK {:?}: {}", jwk.kid, e),
            }
        }

        if keys.is_empty() {
            return Err(AuthError::UpstreamProvider(format!(
                "No usable signing key in JWKS at {}",
                url
            )));
        }

        info!("JWKS cache refreshed from {} ({} keys)", url, keys.len());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JWKS: &str = include_str!("../../../tests/fixtures/jwks.json");

    async fn server_with_jwks(expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(JWKS, "application/json"))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    fn cache(server: &MockServer) -> JwksCache {
        JwksCache::new(
            JwksLocation::Uri(format!("{}/certs", server.uri())),
            reqwest::Client::new(),
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn encryption_keys_are_skipped() {
        let server = server_with_jwks(1).await;
        let cache = cache(&server);
        assert!(cache.key_for(Some("provider-key-1")).await.is_ok());
        assert_eq!(cache.key_count(), 1);
    }

    #[tokio::test]
    async fn keys_are_cached() {
        let server = server_with_jwks(1).await;
        let cache = cache(&server);
        for _ in 0..3 {
            assert!(cache.key_for(Some("provider-key-1")).await.is_ok());
        }
    }

    #[tokio::test]
    async fn unknown_kid_refresh_is_rate_limited() {
        // One fetch on first use; the unknown kid lookup right after falls
        // inside the minimum gap and does not fetch again.
        let server = server_with_jwks(1).await;
        let cache = cache(&server);
        let result = cache.key_for(Some("rotated-key")).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn single_key_set_accepts_token_without_kid() {
        let server = server_with_jwks(1).await;
        let cache = cache(&server);
        assert!(cache.key_for(None).await.is_ok());
    }

    #[tokio::test]
    async fn provider_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/certs"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let cache = cache(&server);
        assert!(matches!(
            cache.key_for(Some("provider-key-1")).await,
            Err(AuthError::UpstreamProvider(_))
        ));
    }
}
