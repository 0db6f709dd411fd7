// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request path firewall
//!
//! Paths that could be interpreted differently by the classifier and by the
//! router are refused before any chain evaluates them. The checks run on the
//! raw, still percent-encoded path.

use super::error::AuthError;

const ENCODED_BLOCKLIST: &[&str] = &["%2e", "%2f", "%5c", "%25", "%00", "%3b"];

/// Reject paths that are not in canonical form.
pub fn check_path(raw_path: &str) -> Result<(), AuthError> {
    if !raw_path.starts_with('/') {
        return Err(reject("path must be absolute"));
    }

    if raw_path.chars().any(|c| c.is_control()) {
        return Err(reject("path contains a control character"));
    }

    if raw_path.contains('\\') {
        return Err(reject("path contains a backslash"));
    }

    if raw_path.contains(';') {
        return Err(reject("path contains a semicolon"));
    }

    let lowered = raw_path.to_ascii_lowercase();
    if let Some(encoded) = ENCODED_BLOCKLIST.iter().find(|e| lowered.contains(*e)) {
        return Err(reject(&format!("path contains encoded sequence {}", encoded)));
    }

    if raw_path.contains("//") {
        return Err(reject("path contains an empty segment"));
    }

    if raw_path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(reject("path is not normalized"));
    }

    Ok(())
}

fn reject(reason: &str) -> AuthError {
    AuthError::RequestRejected(reason.to_string())
}
