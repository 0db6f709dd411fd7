// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Ant-style path patterns and the request classifier
//!
//! The classifier decides which of the two security chains owns a request.
//! Everything under `/api/**` belongs to the API chain, every other path to
//! the Web chain. Exactly one chain evaluates a given request.

use std::fmt;

/// Ant-style path pattern
///
/// Supported forms:
///
/// - `/public` exact path
/// - `/api/**` the prefix itself and every path below it
/// - `/oauth2/authorization/*` exactly one non-empty segment below the prefix
/// - `/**` every path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
    SingleSegment(String),
    Any,
}

impl PathPattern {
    /// Parse an ant-style pattern string
    pub fn parse(pattern: &str) -> Self {
        if pattern == "/**" || pattern == "**" {
            PathPattern::Any
        } else if let Some(prefix) = pattern.strip_suffix("/**") {
            PathPattern::Prefix(prefix.to_string())
        } else if let Some(prefix) = pattern.strip_suffix("/*") {
            PathPattern::SingleSegment(prefix.to_string())
        } else {
            PathPattern::Exact(pattern.to_string())
        }
    }

    /// Check whether the pattern matches a request path (no query string)
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Any => true,
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            PathPattern::SingleSegment(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => match rest.strip_prefix('/') {
                    Some(segment) => !segment.is_empty() && !segment.contains('/'),
                    None => false,
                },
                None => false,
            },
        }
    }
}

impl From<&str> for PathPattern {
    fn from(pattern: &str) -> Self {
        PathPattern::parse(pattern)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(path) => write!(f, "{}", path),
            PathPattern::Prefix(prefix) => write!(f, "{}/**", prefix),
            PathPattern::SingleSegment(prefix) => write!(f, "{}/*", prefix),
            PathPattern::Any => write!(f, "/**"),
        }
    }
}

/// The two independent security chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainKind {
    /// Stateless bearer token chain
    Api,
    /// Session based browser chain
    Web,
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Api => write!(f, "api"),
            ChainKind::Web => write!(f, "web"),
        }
    }
}

/// Selects the chain responsible for a request path.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    api: PathPattern,
}

impl RequestClassifier {
    pub fn new(api_pattern: PathPattern) -> Self {
        Self { api: api_pattern }
    }

    pub fn classify(&self, path: &str) -> ChainKind {
        if self.api.matches(path) {
            ChainKind::Api
        } else {
            ChainKind::Web
        }
    }
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::new(PathPattern::parse("/api/**"))
    }
}
