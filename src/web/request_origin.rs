// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Externally visible base URL of the server
//!
//! The OAuth2 `redirect_uri` must be an absolute URL the browser can reach.
//! It comes from `server.public_base_url` when configured, otherwise from the
//! `Host` header and whether TLS is enabled.

use std::sync::Arc;

use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};

use crate::config::Config;

/// Request guard resolving the base URL, e.g. `https://hello.example.com:8443`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub base_url: String,
}

fn default_port(scheme: &str) -> u16 {
    if scheme == "https" {
        443
    } else {
        80
    }
}

impl RequestOrigin {
    fn from_host(scheme: &str, domain: &str, port: Option<u16>) -> Self {
        let base_url = match port {
            Some(port) if port != default_port(scheme) => {
                format!("{}://{}:{}", scheme, domain, port)
            }
            _ => format!("{}://{}", scheme, domain),
        };
        Self {
            scheme: scheme.to_string(),
            base_url,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestOrigin {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Outcome::Success(config) = req.guard::<&State<Arc<Config>>>().await {
            if let Some(base_url) = &config.server.public_base_url {
                let scheme = base_url.split("://").next().unwrap_or("http").to_string();
                return Outcome::Success(RequestOrigin {
                    scheme,
                    base_url: base_url.trim_end_matches('/').to_string(),
                });
            }
        }

        let scheme = if req.rocket().config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let origin = match req.host() {
            Some(host) => RequestOrigin::from_host(scheme, host.domain().as_str(), host.port()),
            None => {
                let config = req.rocket().config();
                RequestOrigin::from_host(scheme, &config.address.to_string(), Some(config.port))
            }
        };
        Outcome::Success(origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_are_omitted() {
        assert_eq!(
            RequestOrigin::from_host("http", "localhost", Some(80)).base_url,
            "http://localhost"
        );
        assert_eq!(
            RequestOrigin::from_host("https", "example.com", Some(443)).base_url,
            "https://example.com"
        );
        assert_eq!(
            RequestOrigin::from_host("http", "localhost", Some(8080)).base_url,
            "http://localhost:8080"
        );
        assert_eq!(
            RequestOrigin::from_host("https", "example.com", None).base_url,
            "https://example.com"
        );
    }
}
