// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Echo endpoints
//!
//! | Path | Chain | Requirement |
//! |------|-------|-------------|
//! | `/public` | Web | none |
//! | `/private` | Web | session |
//! | `/token` | Web | session + authorized client `keycloak` |
//! | `/api/public` | API | none |
//! | `/api/private` | API | bearer token |
//!
//! Every route takes the [`SecurityContext`] so that no response is produced
//! before the chain has approved the request. Unmatched paths go through the
//! same check before the 404.

use rocket::http::Status;
use rocket::{delete, get, patch, post, put};

use super::challenge::Challenge;
use super::guards::SecurityContext;
use crate::security::AuthenticatedIdentity;

/// Registration whose access token `/token` returns
pub const TOKEN_REGISTRATION_ID: &str = "keycloak";

pub fn public_message() -> &'static str {
    "OK (public)"
}

pub fn private_message(identity: &AuthenticatedIdentity) -> String {
    format!("Hello (OIDC login), {}", identity.name)
}

pub fn api_public_message() -> &'static str {
    "OK (API public)"
}

pub fn api_private_message(identity: &AuthenticatedIdentity) -> String {
    format!("Hello (API JWT), {}", identity.name)
}

#[get("/public")]
pub fn public(security: SecurityContext<'_>) -> Result<&'static str, Challenge> {
    security.authorize()?;
    Ok(public_message())
}

#[get("/private")]
pub fn private(security: SecurityContext<'_>) -> Result<String, Challenge> {
    let identity = security.principal()?;
    Ok(private_message(identity))
}

// Any logged-in user can read the access token held for their own session.
#[get("/token")]
pub async fn token(security: SecurityContext<'_>) -> Result<String, Challenge> {
    security.principal()?;
    let client = security
        .authorized_client(TOKEN_REGISTRATION_ID, "/token")
        .await?;
    Ok(client.access_token)
}

#[get("/api/public")]
pub fn api_public(security: SecurityContext<'_>) -> Result<&'static str, Challenge> {
    security.authorize()?;
    Ok(api_public_message())
}

#[get("/api/private")]
pub fn api_private(security: SecurityContext<'_>) -> Result<String, Challenge> {
    let identity = security.principal()?;
    Ok(api_private_message(identity))
}

fn not_found(security: &SecurityContext<'_>) -> Result<Status, Challenge> {
    security.require_csrf(None)?;
    security.authorize()?;
    Ok(Status::NotFound)
}

#[get("/<_..>", rank = 100)]
pub fn fallback_get(security: SecurityContext<'_>) -> Result<Status, Challenge> {
    not_found(&security)
}

#[post("/<_..>", rank = 100)]
pub fn fallback_post(security: SecurityContext<'_>) -> Result<Status, Challenge> {
    not_found(&security)
}

#[put("/<_..>", rank = 100)]
pub fn fallback_put(security: SecurityContext<'_>) -> Result<Status, Challenge> {
    not_found(&security)
}

#[patch("/<_..>", rank = 100)]
pub fn fallback_patch(security: SecurityContext<'_>) -> Result<Status, Challenge> {
    not_found(&security)
}

#[delete("/<_..>", rank = 100)]
pub fn fallback_delete(security: SecurityContext<'_>) -> Result<Status, Challenge> {
    not_found(&security)
}
