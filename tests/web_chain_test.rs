// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Browser login chain: redirects, authorization code flow, CSRF and logout

mod common;

use common::{client_for, query_param, test_config, MockProvider, BASE_URL, CLIENT_ID};
use rocket::http::{ContentType, Header, Status};
use rocket::local::asynchronous::Client;
use rust_oidc_hello::security::SecurityChains;
use serde_json::json;

const TOKEN_LOGIN: &str = "/oauth2/authorization/keycloak?continue=%2Ftoken";

fn location(response: &rocket::local::asynchronous::LocalResponse<'_>) -> String {
    response
        .headers()
        .get_one("Location")
        .expect("Location header")
        .to_string()
}

/// Run the whole login of `subject` and return to the page it was started from.
async fn login(client: &Client, provider: &MockProvider, subject: &str) -> String {
    login_with_tokens(client, provider, subject, 300, Some("provider-refresh-token")).await
}

/// Same as [`login`], with the lifetime and refresh token of the provider access token.
async fn login_with_tokens(
    client: &Client,
    provider: &MockProvider,
    subject: &str,
    expires_in: i64,
    refresh_token: Option<&str>,
) -> String {
    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Found);
    let entry_point = location(&response);

    let response = client.get(entry_point).dispatch().await;
    assert_eq!(response.status(), Status::Found);
    let authorize_url = location(&response);
    let state = query_param(&authorize_url, "state").expect("state");
    let nonce = query_param(&authorize_url, "nonce").expect("nonce");

    let mut tokens = json!({
        "access_token": "provider-access-token",
        "token_type": "Bearer",
        "expires_in": expires_in,
        "id_token": provider.id_token(subject, &nonce),
        "scope": "openid profile email"
    });
    if let Some(refresh_token) = refresh_token {
        tokens["refresh_token"] = json!(refresh_token);
    }
    provider.mount_token_response(200, tokens).await;
    provider
        .mount_userinfo(json!({ "sub": subject, "email": format!("{}@example.com", subject) }))
        .await;

    let callback = format!(
        "/login/oauth2/code/keycloak?code=authorization-code&state={}",
        state
    );
    let response = client.get(callback).dispatch().await;
    assert_eq!(response.status(), Status::Found);
    location(&response)
}

async fn get_token(client: &Client) -> (Status, Option<String>, Option<String>) {
    let response = client.get("/token").dispatch().await;
    let status = response.status();
    let redirect = response.headers().get_one("Location").map(str::to_string);
    (status, redirect, response.into_string().await)
}

#[rocket::async_test]
async fn test_public_needs_no_login() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client.get("/public").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.into_string().await.as_deref(), Some("OK (public)"));
}

#[rocket::async_test]
async fn test_private_redirects_to_login() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Found);
    assert_eq!(
        location(&response),
        "/oauth2/authorization/keycloak?continue=%2Fprivate"
    );
}

#[rocket::async_test]
async fn test_unknown_path_redirects_to_login_not_401() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client.get("/somewhere/else").dispatch().await;
    assert_eq!(response.status(), Status::Found);
}

#[rocket::async_test]
async fn test_bearer_token_is_ignored_outside_api() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/private")
        .header(Header::new(
            "Authorization",
            format!("Bearer {}", provider.access_token("alice")),
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
}

#[rocket::async_test]
async fn test_authorization_request_redirects_to_provider() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/oauth2/authorization/keycloak?continue=%2Fprivate")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    let url = location(&response);
    assert!(url.starts_with(&provider.authorization_endpoint()), "{}", url);
    assert_eq!(query_param(&url, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&url, "client_id").as_deref(), Some(CLIENT_ID));
    assert_eq!(
        query_param(&url, "code_challenge_method").as_deref(),
        Some("S256")
    );
    assert_eq!(
        query_param(&url, "redirect_uri"),
        Some(format!("{}/login/oauth2/code/keycloak", BASE_URL))
    );
    let scope = query_param(&url, "scope").expect("scope");
    assert!(scope.split(' ').any(|s| s == "openid"));
}

#[rocket::async_test]
async fn test_unknown_registration_is_404() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client.get("/oauth2/authorization/github").dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_full_login_flow() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let target = login(&client, &provider, "bob").await;
    assert_eq!(target, "/private");

    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("Hello (OIDC login), bob")
    );

    let response = client.get("/token").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_string().await.as_deref(),
        Some("provider-access-token")
    );
}

#[rocket::async_test]
async fn test_callback_with_forged_state_fails() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/oauth2/authorization/keycloak")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);

    let response = client
        .get("/login/oauth2/code/keycloak?code=abc&state=forged")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Found);
}

#[rocket::async_test]
async fn test_callback_with_provider_error_fails() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/login/oauth2/code/keycloak?error=access_denied&error_description=User+cancelled")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body = response.into_string().await.unwrap_or_default();
    // The failure page stays generic
    assert!(!body.contains("access_denied"));
}

#[rocket::async_test]
async fn test_id_token_with_wrong_nonce_fails() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/oauth2/authorization/keycloak")
        .dispatch()
        .await;
    let state = query_param(&location(&response), "state").expect("state");

    provider
        .mount_token_response(
            200,
            json!({
                "access_token": "provider-access-token",
                "token_type": "Bearer",
                "id_token": provider.id_token("bob", "replayed-nonce")
            }),
        )
        .await;

    let response = client
        .get(format!(
            "/login/oauth2/code/keycloak?code=abc&state={}",
            state
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn test_token_endpoint_outage_is_bad_gateway() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/oauth2/authorization/keycloak")
        .dispatch()
        .await;
    let state = query_param(&location(&response), "state").expect("state");

    provider
        .mount_token_response(503, json!({ "error": "temporarily_unavailable" }))
        .await;

    let response = client
        .get(format!(
            "/login/oauth2/code/keycloak?code=abc&state={}",
            state
        ))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadGateway);
}

#[rocket::async_test]
async fn test_state_is_single_use() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client
        .get("/oauth2/authorization/keycloak")
        .dispatch()
        .await;
    let authorize_url = location(&response);
    let state = query_param(&authorize_url, "state").expect("state");
    let nonce = query_param(&authorize_url, "nonce").expect("nonce");
    provider
        .mount_token_response(
            200,
            json!({
                "access_token": "provider-access-token",
                "id_token": provider.id_token("bob", &nonce)
            }),
        )
        .await;
    provider.mount_userinfo(json!({ "sub": "bob" })).await;

    let callback = format!("/login/oauth2/code/keycloak?code=abc&state={}", state);
    let response = client.get(callback.clone()).dispatch().await;
    assert_eq!(response.status(), Status::Found);
    assert_eq!(location(&response), "/");

    let response = client.get(callback).dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn test_login_page_lists_registrations() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client.get("/login?continue=%2Fprivate").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(ContentType::HTML));
    let body = response.into_string().await.expect("body");
    assert!(body.contains("/oauth2/authorization/keycloak?continue=%2Fprivate"));
    assert!(body.contains("Keycloak"));
}

#[rocket::async_test]
async fn test_logout_requires_csrf_token() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login(&client, &provider, "bob").await;

    let response = client
        .post("/logout")
        .header(ContentType::Form)
        .body("_csrf=wrong")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Still logged in
    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}

#[rocket::async_test]
async fn test_logout_without_session_is_forbidden() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;

    let response = client.post("/logout").dispatch().await;
    assert_eq!(response.status(), Status::Forbidden);
}

#[rocket::async_test]
async fn test_logout_ends_the_session() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login(&client, &provider, "bob").await;

    let response = client.get("/logout").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
    let page = response.into_string().await.expect("body");
    let marker = "name=\"_csrf\" value=\"";
    let start = page.find(marker).expect("csrf field") + marker.len();
    let csrf_token = &page[start..start + page[start..].find('"').expect("end of value")];

    let response = client
        .post("/logout")
        .header(ContentType::Form)
        .body(format!("_csrf={}", csrf_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
    assert_eq!(location(&response), "/public");

    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Found);
}

#[rocket::async_test]
async fn test_csrf_header_is_accepted() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login(&client, &provider, "bob").await;

    let response = client.get("/logout").dispatch().await;
    let page = response.into_string().await.expect("body");
    let marker = "name=\"_csrf\" value=\"";
    let start = page.find(marker).expect("csrf field") + marker.len();
    let csrf_token = page[start..start + page[start..].find('"').expect("end of value")].to_string();

    let response = client
        .post("/logout")
        .header(Header::new("X-CSRF-TOKEN", csrf_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Found);
}

#[rocket::async_test]
async fn test_session_cookie_does_not_open_encoded_api_paths() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login(&client, &provider, "bob").await;

    let response = client.get("/%61pi/private").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    assert_eq!(response.headers().get_one("WWW-Authenticate"), Some("Bearer"));

    let response = client.get("/api/private").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn test_new_login_replaces_the_pending_one() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    let pending_count = || {
        client
            .rocket()
            .state::<SecurityChains>()
            .expect("security chains")
            .store()
            .pending_count()
    };

    let response = client.get("/oauth2/authorization/keycloak").dispatch().await;
    let first_state = query_param(&location(&response), "state").expect("state");
    assert_eq!(pending_count(), 1);

    let response = client.get("/oauth2/authorization/keycloak").dispatch().await;
    assert_eq!(response.status(), Status::Found);
    assert_eq!(pending_count(), 1);

    let response = client
        .get(format!("/login/oauth2/code/keycloak?code=abc&state={}", first_state))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn test_expired_access_token_is_refreshed() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login_with_tokens(&client, &provider, "bob", 30, Some("provider-refresh-token")).await;

    provider
        .mount_refresh_response(
            "provider-refresh-token",
            200,
            json!({
                "access_token": "refreshed-access-token",
                "token_type": "Bearer",
                "expires_in": 300,
                "refresh_token": "rotated-refresh-token"
            }),
            1,
        )
        .await;

    let (status, _, body) = get_token(&client).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body.as_deref(), Some("refreshed-access-token"));

    // Written back to the session: no second refresh
    let (status, _, body) = get_token(&client).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(body.as_deref(), Some("refreshed-access-token"));
}

#[rocket::async_test]
async fn test_expired_access_token_without_refresh_token_needs_login() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login_with_tokens(&client, &provider, "bob", 30, None).await;

    let (status, redirect, _) = get_token(&client).await;
    assert_eq!(status, Status::Found);
    assert_eq!(redirect.as_deref(), Some(TOKEN_LOGIN));
}

#[rocket::async_test]
async fn test_refused_refresh_needs_login() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login_with_tokens(&client, &provider, "bob", 30, Some("provider-refresh-token")).await;

    provider
        .mount_refresh_response(
            "provider-refresh-token",
            400,
            json!({ "error": "invalid_grant", "error_description": "Token is not active" }),
            1,
        )
        .await;

    let (status, redirect, _) = get_token(&client).await;
    assert_eq!(status, Status::Found);
    assert_eq!(redirect.as_deref(), Some(TOKEN_LOGIN));

    // The session itself survives
    let response = client.get("/private").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}

#[rocket::async_test]
async fn test_refresh_without_rotation_keeps_the_refresh_token() {
    let provider = MockProvider::start().await;
    let client = client_for(test_config(&provider)).await;
    login_with_tokens(&client, &provider, "bob", 30, Some("provider-refresh-token")).await;

    // Still inside the refresh window, so each call refreshes again with the kept token
    provider
        .mount_refresh_response(
            "provider-refresh-token",
            200,
            json!({
                "access_token": "refreshed-access-token",
                "token_type": "Bearer",
                "expires_in": 30
            }),
            2,
        )
        .await;

    for _ in 0..2 {
        let (status, _, body) = get_token(&client).await;
        assert_eq!(status, Status::Ok);
        assert_eq!(body.as_deref(), Some("refreshed-access-token"));
    }
}
