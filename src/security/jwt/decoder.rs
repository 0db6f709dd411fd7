// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JWT validation against the provider key set
//!
//! [`JwtDecoder`] validates the bearer tokens of the API chain and the ID
//! tokens returned at the end of a browser login. The validation covers:
//!
//! 1. the header algorithm is one of the accepted algorithms
//! 2. the signature verifies with the provider key named by `kid`
//! 3. `exp` and `nbf` with the configured clock skew
//! 4. `iss` when an issuer is configured
//! 5. `aud` when audiences are configured

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use log::debug;
use serde_json::{Map, Value};

use super::claims::Claims;
use super::jwks::JwksCache;
use crate::security::error::AuthError;

pub struct JwtDecoder {
    jwks: Arc<JwksCache>,
    algorithms: Vec<Algorithm>,
    issuer: Option<String>,
    audiences: Vec<String>,
    leeway_secs: u64,
}

impl JwtDecoder {
    pub fn new(
        jwks: Arc<JwksCache>,
        algorithms: Vec<Algorithm>,
        issuer: Option<String>,
        audiences: Vec<String>,
        leeway_secs: u64,
    ) -> Self {
        Self {
            jwks,
            algorithms,
            issuer,
            audiences,
            leeway_secs,
        }
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_nbf = true;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if self.audiences.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.audiences);
        }
        validation
    }

    /// Validate a compact JWS and return its claims.
    pub async fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::InvalidToken(format!("Malformed token: {}", e)))?;

        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::InvalidToken(format!(
                "Unsupported algorithm {:?}",
                header.alg
            )));
        }

        let key = self.jwks.key_for(header.kid.as_deref()).await?;

        let data = decode::<Map<String, Value>>(token, &key, &self.validation(header.alg))
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                AuthError::InvalidToken(describe(e.kind()))
            })?;

        Ok(Claims(data.claims))
    }
}

fn describe(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::ExpiredSignature => "Jwt expired".to_string(),
        ErrorKind::ImmatureSignature => "Jwt used before its nbf time".to_string(),
        ErrorKind::InvalidSignature => "Invalid signature".to_string(),
        ErrorKind::InvalidIssuer => "The iss claim is not valid".to_string(),
        ErrorKind::InvalidAudience => "The aud claim is not valid".to_string(),
        ErrorKind::InvalidAlgorithm => "Algorithm does not match the signing key".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("Missing required claim {}", claim),
        _ => "Malformed token".to_string(),
    }
}
