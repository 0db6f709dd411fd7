// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guard carrying the security decision into the handlers
//!
//! The decision is computed once per request and cached in the request local
//! state, so several guards or handlers can consult it without re-validating
//! the bearer token.
//!
//! ```rust,ignore
//! #[get("/private")]
//! fn private(security: SecurityContext<'_>) -> Result<String, Challenge> {
//!     let identity = security.principal()?;
//!     Ok(format!("Hello (OIDC login), {}", identity.name))
//! }
//! ```

use std::sync::Arc;

use rocket::http::{RawStr, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::{Request, State};

use super::challenge::Challenge;
use crate::config::Config;
use crate::security::chains::{CsrfStatus, RequestParts};
use crate::security::csrf::{self, CSRF_HEADER};
use crate::security::session::Session;
use crate::security::{
    Access, AuthError, AuthenticatedIdentity, AuthorizedClientToken, ChainKind, SecurityChains,
    SecurityDecision,
};

pub struct SecurityContext<'r> {
    decision: &'r SecurityDecision,
    chains: &'r SecurityChains,
}

async fn evaluate(req: &Request<'_>, chains: &SecurityChains, cookie_name: &str) -> SecurityDecision {
    let session_cookie = req.cookies().get_private(cookie_name);
    let raw_path = req.uri().path().as_str();
    // Rocket routes on decoded segments, so the chains must see the same path
    let path = RawStr::new(raw_path).percent_decode_lossy();
    let parts = RequestParts {
        method: req.method(),
        raw_path,
        path: &path,
        query: req.uri().query().map(|q| q.as_str()),
        authorization: req.headers().get("Authorization").collect(),
        session_id: session_cookie.as_ref().map(|c| c.value()),
        csrf_header: req.headers().get_one(CSRF_HEADER),
    };
    chains.evaluate(&parts).await
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SecurityContext<'r> {
    type Error = &'static str;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let chains = match req.guard::<&State<SecurityChains>>().await {
            Outcome::Success(chains) => chains.inner(),
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    "Missing security chains state",
                ))
            }
        };
        let cookie_name = match req.guard::<&State<Arc<Config>>>().await {
            Outcome::Success(config) => config.session.cookie_name.clone(),
            _ => {
                return Outcome::Error((Status::InternalServerError, "Missing config state"))
            }
        };

        let decision = req
            .local_cache_async(async { evaluate(req, chains, &cookie_name).await })
            .await;

        Outcome::Success(SecurityContext { decision, chains })
    }
}

impl<'r> SecurityContext<'r> {
    pub fn chain(&self) -> ChainKind {
        self.decision.chain
    }

    fn challenge(&self, error: &AuthError) -> Challenge {
        Challenge::from_error(
            self.decision.chain,
            error.clone(),
            self.decision.login_location.as_deref(),
        )
    }

    /// The access granted by the chain, or the answer refusing the request.
    pub fn authorize(&self) -> Result<&'r Access, Challenge> {
        self.decision
            .outcome
            .as_ref()
            .map_err(|error| self.challenge(error))
    }

    /// Identity of an authenticated caller; anonymous access is refused.
    pub fn principal(&self) -> Result<&'r AuthenticatedIdentity, Challenge> {
        match self.authorize()?.identity() {
            Some(identity) => Ok(identity),
            None => Err(self.challenge(&AuthError::Unauthenticated)),
        }
    }

    pub fn session(&self) -> Option<&'r Session> {
        match &self.decision.outcome {
            Ok(Access::Session(session)) => Some(session),
            _ => None,
        }
    }

    /// Enforce the CSRF check of an unsafe request.
    ///
    /// `form_token` is the `_csrf` field of a parsed form, if any.
    pub fn require_csrf(&self, form_token: Option<&str>) -> Result<(), Challenge> {
        if let Err(error) = &self.decision.outcome {
            if matches!(error, AuthError::RequestRejected(_) | AuthError::Unauthorized(_)) {
                return Err(self.challenge(error));
            }
        }
        match self.decision.csrf {
            CsrfStatus::NotRequired | CsrfStatus::Verified => Ok(()),
            CsrfStatus::Pending => {
                let expected = self.session().map(|s| s.csrf_token.as_str());
                csrf::verify(expected, form_token).map_err(|error| self.challenge(&error))
            }
        }
    }

    /// Access token of `registration_id`, refreshed when needed.
    ///
    /// Without a usable token the browser is sent through that registration's
    /// login, coming back to `continue_to` afterwards.
    pub async fn authorized_client(
        &self,
        registration_id: &str,
        continue_to: &str,
    ) -> Result<AuthorizedClientToken, Challenge> {
        let session = match self.authorize()? {
            Access::Session(session) => session,
            _ => return Err(self.challenge(&AuthError::Unauthenticated)),
        };
        self.chains
            .web
            .authorized_clients()
            .authorize(session, registration_id)
            .await
            .map_err(|_| {
                let query = serde_urlencoded::to_string(&[("continue", continue_to)])
                    .unwrap_or_default();
                Challenge::Login(format!(
                    "/oauth2/authorization/{}?{}",
                    registration_id, query
                ))
            })
    }
}
