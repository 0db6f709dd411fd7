// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CSRF tokens for the browser chain
//!
//! Each session owns one synchronizer token. State changing requests must echo
//! it back in the `_csrf` form field or the `X-CSRF-TOKEN` header.

use rocket::http::Method;

use super::error::AuthError;
use super::random_token;

/// Form field carrying the token
pub const CSRF_FORM_FIELD: &str = "_csrf";
/// Header carrying the token
pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Generate a fresh token for a new session
pub fn generate_token() -> String {
    random_token(32)
}

/// Methods that never change state and skip the check
pub fn is_safe_method(method: Method) -> bool {
    matches!(
        method,
        Method::Get | Method::Head | Method::Options | Method::Trace
    )
}

/// Compare the expected session token with the presented one.
pub fn verify(expected: Option<&str>, presented: Option<&str>) -> Result<(), AuthError> {
    match (expected, presented) {
        (Some(expected), Some(presented)) if constant_time_eq(expected, presented) => Ok(()),
        (None, _) => Err(AuthError::Unauthorized(
            "Could not verify the provided CSRF token because no session was found".to_string(),
        )),
        (Some(_), None) => Err(AuthError::Unauthorized(
            "Missing CSRF token".to_string(),
        )),
        (Some(_), Some(_)) => Err(AuthError::Unauthorized(
            "Invalid CSRF token".to_string(),
        )),
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn only_unsafe_methods_are_checked() {
        assert!(is_safe_method(Method::Get));
        assert!(is_safe_method(Method::Head));
        assert!(!is_safe_method(Method::Post));
        assert!(!is_safe_method(Method::Delete));
        assert!(!is_safe_method(Method::Put));
        assert!(!is_safe_method(Method::Patch));
    }

    #[test]
    fn verify_matches_exact_token() {
        let token = generate_token();
        assert!(verify(Some(&token), Some(&token)).is_ok());
        assert!(verify(Some(&token), Some("other")).is_err());
        assert!(verify(Some(&token), None).is_err());
        assert!(matches!(
            verify(None, Some(&token)),
            Err(AuthError::Unauthorized(_))
        ));
    }
}
