// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Browser login and logout routes
//!
//! - `GET /login` lists the client registrations
//! - `GET /oauth2/authorization/<id>` starts the authorization code flow
//! - `GET /login/oauth2/code/<id>` receives the provider callback and opens the session
//! - `GET /logout` asks for confirmation, `POST /logout` closes the session
//!
//! The `state` of a pending login is bound to the browser that started it
//! through a private cookie, so a callback replayed in another browser fails.

use std::sync::Arc;

use log::{debug, info};
use rocket::form::{Form, FromForm};
use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::response::content::RawHtml;
use rocket::response::Redirect;
use rocket::{get, post, Responder, State};

use super::challenge::Challenge;
use super::guards::SecurityContext;
use super::pages::{login_page_html, logout_page_html};
use super::request_origin::RequestOrigin;
use crate::config::Config;
use crate::security::oidc::safe_continue_target;
use crate::security::session::Session;
use crate::security::{AuthError, SecurityChains};

/// Private cookie binding a pending authorization `state` to the browser
pub const AUTHORIZATION_COOKIE: &str = "OAUTH2_AUTHORIZATION_REQUEST";

/// Where the browser lands after logging out
pub const LOGOUT_SUCCESS_URL: &str = "/public";

#[derive(Responder)]
pub enum LoginResponse {
    Page(RawHtml<String>),
    Redirect(Redirect),
    Refused(Challenge),
    Failed(Status),
}

impl From<Challenge> for LoginResponse {
    fn from(challenge: Challenge) -> Self {
        LoginResponse::Refused(challenge)
    }
}

fn login_failure(error: AuthError) -> LoginResponse {
    LoginResponse::Refused(Challenge::LoginFailure(error))
}

#[derive(Debug, FromForm)]
pub struct LoginParams<'r> {
    #[field(name = "continue")]
    pub continue_to: Option<&'r str>,
    pub error: Option<&'r str>,
    pub logout: Option<&'r str>,
}

#[derive(Debug, FromForm)]
pub struct CallbackParams<'r> {
    pub code: Option<&'r str>,
    pub state: Option<&'r str>,
    pub error: Option<&'r str>,
    pub error_description: Option<&'r str>,
}

#[derive(Debug, FromForm)]
pub struct LogoutForm<'r> {
    #[field(name = "_csrf")]
    pub csrf: Option<&'r str>,
}

fn session_cookie(config: &Config, session: &Session) -> Cookie<'static> {
    Cookie::build((config.session.cookie_name.clone(), session.id.clone()))
        .path("/")
        .http_only(true)
        .secure(config.session.secure_cookie)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: String) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

#[get("/login?<params..>")]
pub fn login_page(
    security: SecurityContext<'_>,
    chains: &State<SecurityChains>,
    params: LoginParams<'_>,
) -> LoginResponse {
    if let Err(challenge) = security.authorize() {
        return challenge.into();
    }
    let continue_to = safe_continue_target(params.continue_to);
    match login_page_html(
        &chains.clients().entries(),
        continue_to.as_deref(),
        params.error.is_some(),
        params.logout.is_some(),
    ) {
        Ok(html) => LoginResponse::Page(RawHtml(html)),
        Err(e) => {
            log::error!("Unable to render login page: {}", e);
            LoginResponse::Failed(Status::InternalServerError)
        }
    }
}

#[get("/oauth2/authorization/<registration_id>?<params..>")]
pub async fn authorization_request(
    registration_id: &str,
    params: LoginParams<'_>,
    security: SecurityContext<'_>,
    origin: RequestOrigin,
    chains: &State<SecurityChains>,
    config: &State<Arc<Config>>,
    cookies: &CookieJar<'_>,
) -> LoginResponse {
    if let Err(challenge) = security.authorize() {
        return challenge.into();
    }
    let client = match chains.clients().get(registration_id) {
        Some(client) => client,
        None => {
            debug!("Unknown client registration {}", registration_id);
            return LoginResponse::Failed(Status::NotFound);
        }
    };

    let store = chains.store();
    let continue_to = safe_continue_target(params.continue_to);
    let (pending, location) = match client
        .authorization_request(&origin.base_url, continue_to, store.pending_ttl())
        .await
    {
        Ok(request) => request,
        Err(e) => return login_failure(e),
    };

    // A browser has at most one login in flight
    if let Some(previous) = cookies.get_private(AUTHORIZATION_COOKIE) {
        if store.remove_pending(previous.value()) {
            debug!("Replacing the pending authorization of this browser");
        }
    }

    // Lax so the cookie survives the top-level redirect back from the provider
    cookies.add_private(
        Cookie::build((AUTHORIZATION_COOKIE, pending.state.clone()))
            .path("/")
            .http_only(true)
            .secure(config.session.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(rocket::time::Duration::seconds(
                store.pending_ttl().num_seconds(),
            ))
            .build(),
    );
    store.save_pending(pending);

    debug!("Redirecting to the authorization endpoint of {}", registration_id);
    LoginResponse::Redirect(Redirect::found(location))
}

#[get("/login/oauth2/code/<registration_id>?<params..>")]
pub async fn authorization_callback(
    registration_id: &str,
    params: CallbackParams<'_>,
    security: SecurityContext<'_>,
    chains: &State<SecurityChains>,
    config: &State<Arc<Config>>,
    cookies: &CookieJar<'_>,
) -> LoginResponse {
    if let Err(challenge) = security.authorize() {
        return challenge.into();
    }

    let bound_state = cookies
        .get_private(AUTHORIZATION_COOKIE)
        .map(|cookie| cookie.value().to_string());
    cookies.remove_private(removal_cookie(AUTHORIZATION_COOKIE.to_string()));

    if let Some(error) = params.error {
        return login_failure(AuthError::AuthenticationFailed(format!(
            "[{}] {}",
            error,
            params.error_description.unwrap_or_default()
        )));
    }

    let state = match params.state {
        Some(state) => state,
        None => {
            return login_failure(AuthError::AuthenticationFailed(
                "Missing state parameter".to_string(),
            ))
        }
    };
    if bound_state.as_deref() != Some(state) {
        return login_failure(AuthError::AuthenticationFailed(
            "State is not bound to this browser".to_string(),
        ));
    }

    let store = chains.store();
    let pending = match store.take_pending(state) {
        Some(pending) if pending.registration_id == registration_id => pending,
        Some(_) => {
            return login_failure(AuthError::AuthenticationFailed(
                "State was issued for another registration".to_string(),
            ))
        }
        None => {
            return login_failure(AuthError::AuthenticationFailed(
                "Authorization request not found or expired".to_string(),
            ))
        }
    };

    let code = match params.code {
        Some(code) if !code.is_empty() => code,
        _ => {
            return login_failure(AuthError::AuthenticationFailed(
                "Missing authorization code".to_string(),
            ))
        }
    };

    let client = match chains.clients().get(registration_id) {
        Some(client) => client,
        None => return LoginResponse::Failed(Status::NotFound),
    };

    let login = match client.authenticate(&pending, code).await {
        Ok(login) => login,
        Err(e) => return login_failure(e),
    };

    // A login always starts a new session
    if let Some(previous) = security.session() {
        store.delete(&previous.id);
    }
    let session = store.create(
        login.identity,
        Some(login.authorized_client),
        Some(login.id_token),
    );
    cookies.add_private(session_cookie(config, &session));
    info!(
        "User {} logged in through {}",
        session.identity.name, registration_id
    );

    let target = pending.continue_to.unwrap_or_else(|| "/".to_string());
    LoginResponse::Redirect(Redirect::found(target))
}

#[get("/logout")]
pub fn logout_page(security: SecurityContext<'_>) -> LoginResponse {
    if let Err(challenge) = security.authorize() {
        return challenge.into();
    }
    let session = match security.session() {
        Some(session) => session,
        None => return LoginResponse::Redirect(Redirect::found(LOGOUT_SUCCESS_URL)),
    };
    match logout_page_html(Some(&session.identity.name), &session.csrf_token) {
        Ok(html) => LoginResponse::Page(RawHtml(html)),
        Err(e) => {
            log::error!("Unable to render logout page: {}", e);
            LoginResponse::Failed(Status::InternalServerError)
        }
    }
}

#[post("/logout", data = "<form>")]
pub fn logout(
    security: SecurityContext<'_>,
    chains: &State<SecurityChains>,
    config: &State<Arc<Config>>,
    cookies: &CookieJar<'_>,
    form: Option<Form<LogoutForm<'_>>>,
) -> LoginResponse {
    let form_token = form.as_ref().and_then(|form| form.csrf);
    if let Err(challenge) = security.require_csrf(form_token) {
        return challenge.into();
    }
    if let Err(challenge) = security.authorize() {
        return challenge.into();
    }

    if let Some(session) = security.session() {
        chains.store().delete(&session.id);
        info!("User {} logged out", session.identity.name);
    }
    cookies.remove_private(removal_cookie(config.session.cookie_name.clone()));

    LoginResponse::Redirect(Redirect::found(LOGOUT_SUCCESS_URL))
}
