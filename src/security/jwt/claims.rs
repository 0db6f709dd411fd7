// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claim set of a validated token

use serde_json::{Map, Value};

use crate::security::error::AuthError;
use crate::security::identity::AuthenticatedIdentity;

/// Prefix of authorities derived from granted scopes
pub const SCOPE_AUTHORITY_PREFIX: &str = "SCOPE_";

/// Claims of a token whose signature and time window have been verified
#[derive(Debug, Clone, PartialEq)]
pub struct Claims(pub Map<String, Value>);

impl Claims {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// String value of a claim. Numbers are accepted as well since some
    /// providers emit numeric subjects.
    pub fn get_string(&self, name: &str) -> Option<String> {
        match self.0.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn subject(&self) -> Option<String> {
        self.get_string("sub")
    }

    pub fn nonce(&self) -> Option<String> {
        self.get_string("nonce")
    }

    /// Granted scopes from `scope` (space separated) or `scp` (string or array)
    pub fn scopes(&self) -> Vec<String> {
        for name in ["scope", "scp"] {
            match self.0.get(name) {
                Some(Value::String(s)) => {
                    return s.split_whitespace().map(str::to_string).collect();
                }
                Some(Value::Array(values)) => {
                    return values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                }
                _ => {}
            }
        }
        Vec::new()
    }

    pub fn authorities(&self) -> Vec<String> {
        self.scopes()
            .into_iter()
            .map(|scope| format!("{}{}", SCOPE_AUTHORITY_PREFIX, scope))
            .collect()
    }

    /// Build the identity handed to the handlers.
    pub fn into_identity(
        self,
        principal_claim: &str,
        token: Option<String>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let name = self.get_string(principal_claim).ok_or_else(|| {
            AuthError::InvalidToken(format!("Missing principal claim {}", principal_claim))
        })?;
        let authorities = self.authorities();
        Ok(AuthenticatedIdentity {
            name,
            token,
            authorities,
            claims: self.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => Claims(map),
            _ => panic!("claims must be an object"),
        }
    }

    #[test]
    fn scopes_from_space_separated_string() {
        let c = claims(json!({"sub": "alice", "scope": "openid profile"}));
        assert_eq!(c.scopes(), vec!["openid", "profile"]);
        assert_eq!(c.authorities(), vec!["SCOPE_openid", "SCOPE_profile"]);
    }

    #[test]
    fn scopes_from_scp_array() {
        let c = claims(json!({"sub": "alice", "scp": ["read", "write"]}));
        assert_eq!(c.scopes(), vec!["read", "write"]);
    }

    #[test]
    fn identity_uses_configured_principal_claim() {
        let c = claims(json!({"sub": "1234", "preferred_username": "alice"}));
        let identity = c
            .clone()
            .into_identity("preferred_username", Some("raw".to_string()))
            .expect("identity");
        assert_eq!(identity.name, "alice");
        assert_eq!(identity.token.as_deref(), Some("raw"));
        assert_eq!(c.subject().as_deref(), Some("1234"));
    }

    #[test]
    fn missing_principal_claim_is_an_invalid_token() {
        let c = claims(json!({"scope": "openid"}));
        assert!(matches!(
            c.into_identity("sub", None),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn numeric_claims_are_stringified() {
        let c = claims(json!({"sub": 42}));
        assert_eq!(c.subject().as_deref(), Some("42"));
    }
}
