// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication and authorization failures
//!
//! Every failure produced while evaluating a security chain is an [`AuthError`].
//! The variants map onto three families:
//!
//! | Family | Variants | API chain | Web chain |
//! |--------|----------|-----------|-----------|
//! | Unauthenticated | `Unauthenticated`, `InvalidRequest`, `InvalidToken`, `AuthenticationFailed` | 401 + `WWW-Authenticate` | redirect into login |
//! | Unauthorized | `Unauthorized` | 403 | 403 |
//! | Upstream provider | `UpstreamProvider` | 401 (token treated as invalid) | failure page (502) |
//!
//! `RequestRejected` is raised by the request firewall before any chain runs.

use rocket::http::Status;
use thiserror::Error;

/// Error URI advertised in bearer challenges.
pub const BEARER_ERROR_URI: &str = "https://tools.ietf.org/html/rfc6750#section-3.1";

/// Description sent when the provider keys cannot be loaded; the detail is only logged
pub const TOKEN_VERIFICATION_UNAVAILABLE: &str = "Unable to verify the token";

/// Failure raised while authenticating or authorizing a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was presented at all
    #[error("Full authentication is required to access this resource")]
    Unauthenticated,

    /// The bearer token request itself is malformed (RFC 6750 `invalid_request`)
    #[error("Invalid bearer token request: {0}")]
    InvalidRequest(String),

    /// The bearer token is malformed, expired or not trusted (RFC 6750 `invalid_token`)
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The interactive login could not be completed
    #[error("Login failed: {0}")]
    AuthenticationFailed(String),

    /// The credential is valid but the request is not allowed
    #[error("Access denied: {0}")]
    Unauthorized(String),

    /// The identity provider is unreachable or answered with garbage
    #[error("Identity provider error: {0}")]
    UpstreamProvider(String),

    /// The request was refused by the firewall before evaluation
    #[error("Request rejected: {0}")]
    RequestRejected(String),
}

impl AuthError {
    /// True for every variant that means "who are you?" rather than "no".
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthenticated
                | AuthError::InvalidRequest(_)
                | AuthError::InvalidToken(_)
                | AuthError::AuthenticationFailed(_)
        )
    }

    /// HTTP status used when the error is answered directly.
    pub fn status(&self) -> Status {
        match self {
            AuthError::Unauthenticated
            | AuthError::InvalidRequest(_)
            | AuthError::InvalidToken(_)
            | AuthError::AuthenticationFailed(_) => Status::Unauthorized,
            AuthError::Unauthorized(_) => Status::Forbidden,
            AuthError::UpstreamProvider(_) => Status::BadGateway,
            AuthError::RequestRejected(_) => Status::BadRequest,
        }
    }

    /// Value of the `WWW-Authenticate` header sent by the API chain.
    ///
    /// A request without any token only gets the bare `Bearer` scheme, as
    /// required by RFC 6750 section 3.1.
    pub fn bearer_challenge(&self) -> String {
        let (code, description) = match self {
            AuthError::InvalidRequest(description) => ("invalid_request", description.as_str()),
            AuthError::InvalidToken(description) => ("invalid_token", description.as_str()),
            AuthError::UpstreamProvider(_) => ("invalid_token", TOKEN_VERIFICATION_UNAVAILABLE),
            _ => return "Bearer".to_string(),
        };
        format!(
            "Bearer error=\"{}\", error_description=\"{}\", error_uri=\"{}\"",
            code,
            description.replace('"', "'"),
            BEARER_ERROR_URI
        )
    }
}
