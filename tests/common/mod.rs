// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared fixtures: a mock OpenID provider and a server wired to it
#![allow(dead_code)]

use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rocket::config::LogLevel;
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rust_oidc_hello::config::Config;
use rust_oidc_hello::web::{build_rocket, server_figment};

pub const JWKS: &str = include_str!("../fixtures/jwks.json");
pub const PROVIDER_KEY: &[u8] = include_bytes!("../fixtures/provider_rsa.pem");
pub const FOREIGN_KEY: &[u8] = include_bytes!("../fixtures/foreign_rsa.pem");
pub const PROVIDER_KID: &str = "provider-key-1";
pub const CLIENT_ID: &str = "hello-app";
pub const BASE_URL: &str = "http://localhost:8080";

/// Wiremock server answering like a Keycloak realm
pub struct MockProvider {
    pub server: MockServer,
    pub issuer: String,
}

impl MockProvider {
    /// Start the provider with its discovery document and key set mounted.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let issuer = format!("{}/realms/demo", server.uri());

        Mock::given(method("GET"))
            .and(path("/realms/demo/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{}/protocol/openid-connect/auth", issuer),
                "token_endpoint": format!("{}/protocol/openid-connect/token", issuer),
                "jwks_uri": format!("{}/protocol/openid-connect/certs", issuer),
                "userinfo_endpoint": format!("{}/protocol/openid-connect/userinfo", issuer),
                "end_session_endpoint": format!("{}/protocol/openid-connect/logout", issuer),
                "id_token_signing_alg_values_supported": ["RS256"],
                "code_challenge_methods_supported": ["plain", "S256"]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/realms/demo/protocol/openid-connect/certs"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(JWKS.as_bytes().to_vec(), "application/json"),
            )
            .mount(&server)
            .await;

        Self { server, issuer }
    }

    pub fn authorization_endpoint(&self) -> String {
        format!("{}/protocol/openid-connect/auth", self.issuer)
    }

    /// Answer the next code exchanges with `body`.
    pub async fn mount_token_response(&self, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/realms/demo/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Answer refresh grants presenting `refresh_token` with `body`,
    /// expecting exactly `calls` of them.
    pub async fn mount_refresh_response(
        &self,
        refresh_token: &str,
        status: u16,
        body: Value,
        calls: u64,
    ) {
        Mock::given(method("POST"))
            .and(path("/realms/demo/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains(format!("refresh_token={}", refresh_token)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_userinfo(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path("/realms/demo/protocol/openid-connect/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Claims of a token issued by this provider to `subject`.
    pub fn claims(&self, subject: &str, lifetime_secs: i64) -> Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": self.issuer,
            "sub": subject,
            "aud": CLIENT_ID,
            "iat": now,
            "exp": now + lifetime_secs,
            "scope": "openid profile"
        })
    }

    pub fn access_token(&self, subject: &str) -> String {
        sign(&self.claims(subject, 300), PROVIDER_KEY, PROVIDER_KID)
    }

    pub fn id_token(&self, subject: &str, nonce: &str) -> String {
        let mut claims = self.claims(subject, 300);
        claims["nonce"] = json!(nonce);
        sign(&claims, PROVIDER_KEY, PROVIDER_KID)
    }
}

pub fn sign(claims: &Value, pem: &[u8], kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(
        &header,
        claims,
        &EncodingKey::from_rsa_pem(pem).expect("valid fixture key"),
    )
    .expect("signed token")
}

/// Configuration pointing every registration at `provider`
pub fn test_config(provider: &MockProvider) -> Config {
    let mut config = Config::default();
    config.server.public_base_url = Some(BASE_URL.to_string());
    config.oauth2.resourceserver.jwt.issuer_uri = Some(provider.issuer.clone());
    for registration in config.oauth2.client.registration.values_mut() {
        registration.client_id = CLIENT_ID.to_string();
        registration.provider.issuer_uri = Some(provider.issuer.clone());
    }
    config
}

/// Issuer on a local port nothing listens on
pub fn unreachable_issuer() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("free port");
    let port = listener.local_addr().expect("local address").port();
    drop(listener);
    format!("http://127.0.0.1:{}/realms/demo", port)
}

pub async fn client_for(config: Config) -> Client {
    let figment = server_figment(&config, LogLevel::Critical).expect("figment");
    let rocket = build_rocket(figment, Arc::new(config)).expect("rocket");
    Client::tracked(rocket).await.expect("valid rocket instance")
}

/// Value of `name` in the query of `url`
pub fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
