// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT validation backed by the provider JWKS

pub mod claims;
pub mod decoder;
pub mod jwks;

pub use claims::Claims;
pub use decoder::JwtDecoder;
pub use jwks::{JwksCache, JwksLocation};

use jsonwebtoken::Algorithm;

use crate::security::error::AuthError;

/// Parse configured algorithm names, e.g. `["RS256", "ES256"]`.
pub fn parse_algorithms(names: &[String]) -> anyhow::Result<Vec<Algorithm>> {
    names
        .iter()
        .map(|name| {
            name.parse::<Algorithm>()
                .map_err(|_| anyhow::anyhow!("Unknown JWS algorithm: {}", name))
        })
        .collect()
}

/// Resolve the bearer token of a request from its `Authorization` headers (RFC 6750).
///
/// Returns `Ok(None)` when no header is present.
pub fn resolve_bearer_token(authorization: &[&str]) -> Result<Option<String>, AuthError> {
    let header = match authorization {
        [] => return Ok(None),
        [header] => *header,
        _ => {
            return Err(AuthError::InvalidRequest(
                "Found multiple bearer tokens in the request".to_string(),
            ))
        }
    };

    let (scheme, token) = match header.split_once(' ') {
        Some((scheme, token)) => (scheme, token.trim()),
        None => (header, ""),
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        // Another scheme (Basic...) is not a bearer credential
        return Ok(None);
    }
    if !is_b64token(token) {
        return Err(AuthError::InvalidToken("Bearer token is malformed".to_string()));
    }
    Ok(Some(token.to_string()))
}

/// `b64token` grammar of RFC 6750 section 2.1
fn is_b64token(token: &str) -> bool {
    let body = token.trim_end_matches('=');
    !body.is_empty()
        && body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~' | '+' | '/'))
}
