// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTML pages of the login machinery

use handlebars::{Handlebars, RenderError};
use rocket::http::Status;
use serde_json::json;

fn render(name: &str, template: &str, data: &serde_json::Value) -> Result<String, RenderError> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_template_string(name, template)?;
    handlebars.render(name, data)
}

/// Page listing the client registrations to log in with
///
/// `registrations` holds `(registration id, display name)` pairs.
pub fn login_page_html(
    registrations: &[(String, String)],
    continue_to: Option<&str>,
    error: bool,
    logout: bool,
) -> Result<String, RenderError> {
    let query = continue_to
        .and_then(|target| serde_urlencoded::to_string(&[("continue", target)]).ok())
        .map(|q| format!("?{}", q))
        .unwrap_or_default();
    let registrations: Vec<_> = registrations
        .iter()
        .map(|(id, name)| {
            json!({
                "href": format!("/oauth2/authorization/{}{}", id, query),
                "name": name,
            })
        })
        .collect();

    render(
        "login",
        include_str!("../../resources/templates/login.hbs"),
        &json!({
            "registrations": registrations,
            "error": error,
            "logout": logout,
        }),
    )
}

/// Logout confirmation form carrying the CSRF token
pub fn logout_page_html(name: Option<&str>, csrf_token: &str) -> Result<String, RenderError> {
    render(
        "logout",
        include_str!("../../resources/templates/logout.hbs"),
        &json!({
            "name": name,
            "csrf_token": csrf_token,
        }),
    )
}

/// Generic login failure page. The cause is logged, never shown.
pub fn failure_page_html(status: Status) -> Result<String, RenderError> {
    let (title, message) = if status == Status::BadGateway {
        (
            "Identity provider unavailable",
            "The identity provider could not be reached. Please try again later.",
        )
    } else {
        (
            "Login failed",
            "Your login could not be completed.",
        )
    };
    render(
        "failure",
        include_str!("../../resources/templates/failure.hbs"),
        &json!({
            "title": title,
            "message": message,
            "retry_href": "/login",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_page_links_every_registration() {
        let html = login_page_html(
            &[
                ("keycloak".to_string(), "Keycloak".to_string()),
                ("other".to_string(), "Other".to_string()),
            ],
            Some("/private"),
            false,
            false,
        )
        .expect("rendered");
        assert!(html.contains("/oauth2/authorization/keycloak?continue=%2Fprivate"));
        assert!(html.contains("/oauth2/authorization/other?continue=%2Fprivate"));
        assert!(!html.contains("Login failed"));
    }

    #[test]
    fn logout_page_embeds_csrf_token() {
        let html = logout_page_html(Some("bob"), "token-123").expect("rendered");
        assert!(html.contains("name=\"_csrf\" value=\"token-123\""));
        assert!(html.contains("bob"));
    }

    #[test]
    fn failure_page_does_not_leak_details() {
        let html = failure_page_html(Status::Unauthorized).expect("rendered");
        assert!(html.contains("Login failed"));
        let html = failure_page_html(Status::BadGateway).expect("rendered");
        assert!(html.contains("Identity provider unavailable"));
    }
}
