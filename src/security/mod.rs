// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Access control
//!
//! Requests are split between two independent chains by the
//! [`RequestClassifier`](matcher::RequestClassifier):
//!
//! - the **API chain** (`/api/**`) is stateless and authenticates every
//!   request with a JWT bearer token validated against the provider JWKS;
//! - the **Web chain** (everything else) authenticates browsers through an
//!   OpenID Connect login and tracks them with a server-side session.
//!
//! Each chain owns a first-match [`SecurityPolicy`](policy::SecurityPolicy).
//! [`SecurityChains::evaluate`](chains::SecurityChains::evaluate) returns the
//! decision that the web layer turns into a response or an identity.

pub mod chains;
pub mod csrf;
pub mod error;
pub mod firewall;
pub mod identity;
pub mod jwt;
pub mod matcher;
pub mod oidc;
pub mod policy;
pub mod session;

use base64::Engine;
use rand::Rng;

pub use chains::{Access, ApiChain, SecurityChains, SecurityDecision, WebChain};
pub use error::{AuthError, TOKEN_VERIFICATION_UNAVAILABLE};
pub use identity::{AuthenticatedIdentity, AuthorizedClientToken};
pub use matcher::{ChainKind, PathPattern, RequestClassifier};
pub use policy::{Requirement, SecurityPolicy};

/// URL-safe random string built from `len` random bytes
pub(crate) fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill(&mut bytes[..]);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
