// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust OIDC Hello library
//!
//! A web application protected by two security chains:
//!
//! - browsers log in through OpenID Connect (authorization code flow with
//!   PKCE) and keep a server-side session
//! - API clients under `/api/**` present a JWT bearer token validated
//!   against the provider's published keys

pub mod config;
pub mod security;
pub mod web;
