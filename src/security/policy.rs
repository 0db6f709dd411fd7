// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Ordered access rules for a security chain
//!
//! A [`SecurityPolicy`] is a list of `(pattern, requirement)` pairs evaluated
//! first-match. A path that no rule matches requires authentication.

use log::trace;

use super::matcher::PathPattern;

/// What a matching request must present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    PermitAll,
    Authenticated,
}

/// A single access rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

/// First-match list of access rules
#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    rules: Vec<Rule>,
}

impl SecurityPolicy {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; earlier rules win.
    pub fn rule(mut self, pattern: &str, requirement: Requirement) -> Self {
        self.rules.push(Rule {
            pattern: PathPattern::parse(pattern),
            requirement,
        });
        self
    }

    pub fn permit_all(self, pattern: &str) -> Self {
        self.rule(pattern, Requirement::PermitAll)
    }

    pub fn authenticated(self, pattern: &str) -> Self {
        self.rule(pattern, Requirement::Authenticated)
    }

    /// Rules for the bearer token chain
    pub fn api() -> Self {
        Self::new()
            .permit_all("/api/public")
            .authenticated("/**")
    }

    /// Rules for the browser chain, including the endpoints the login
    /// machinery must reach before a session exists.
    pub fn web() -> Self {
        Self::new()
            .permit_all("/login")
            .permit_all("/oauth2/authorization/*")
            .permit_all("/login/oauth2/code/*")
            .permit_all("/logout")
            .permit_all("/error")
            .permit_all("/public")
            .authenticated("/**")
    }

    /// Requirement of the first matching rule, `Authenticated` when none match.
    pub fn requirement_for(&self, path: &str) -> Requirement {
        let requirement = self
            .rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.requirement)
            .unwrap_or(Requirement::Authenticated);
        trace!("Policy requirement for {}: {:?}", path, requirement);
        requirement
    }

    pub fn permit(&self, path: &str) -> bool {
        self.requirement_for(path) == Requirement::PermitAll
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_policy_only_permits_public_endpoint() {
        let policy = SecurityPolicy::api();
        assert!(policy.permit("/api/public"));
        assert!(!policy.permit("/api/private"));
        assert!(!policy.permit("/api/public/extra"));
        assert!(!policy.permit("/api/unknown"));
    }

    #[test]
    fn web_policy_permits_public_and_login_machinery() {
        let policy = SecurityPolicy::web();
        assert!(policy.permit("/public"));
        assert!(policy.permit("/login"));
        assert!(policy.permit("/logout"));
        assert!(policy.permit("/oauth2/authorization/keycloak"));
        assert!(policy.permit("/login/oauth2/code/keycloak"));
        assert!(!policy.permit("/private"));
        assert!(!policy.permit("/token"));
        assert!(!policy.permit("/"));
        assert!(!policy.permit("/publicity"));
    }

    #[test]
    fn first_match_wins() {
        let policy = SecurityPolicy::new()
            .authenticated("/docs/**")
            .permit_all("/docs/intro");
        assert!(!policy.permit("/docs/intro"));

        let policy = SecurityPolicy::new()
            .permit_all("/docs/intro")
            .authenticated("/docs/**");
        assert!(policy.permit("/docs/intro"));
    }

    #[test]
    fn empty_policy_requires_authentication() {
        let policy = SecurityPolicy::new();
        assert_eq!(policy.requirement_for("/anything"), Requirement::Authenticated);
        assert!(policy.rules().is_empty());
    }
}
