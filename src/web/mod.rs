// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP layer of the application
//!
//! This module exposes the [`security`](crate::security) chains through Rocket:
//!
//! - **Guards**: [`SecurityContext`] runs each request through its chain once
//! - **Challenges**: [`Challenge`] turns a refusal into the answer its chain expects
//! - **Login**: the authorization code flow, login page and logout
//! - **Handlers**: the public and private echo endpoints
//! - **Fairing**: security headers on every response
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rust_oidc_hello::config::Config;
//! use rust_oidc_hello::web::build_rocket;
//!
//! async fn start_server() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::default());
//!     let figment = rocket::Config::figment()
//!         .merge(("port", config.server.port))
//!         .merge(("secret_key", config.server.secret_key.clone()));
//!     build_rocket(figment, config)?.launch().await?;
//!     Ok(())
//! }
//! ```

pub mod challenge;
pub mod fairing;
pub mod guards;
pub mod handlers;
pub mod login;
pub mod pages;
pub mod request_origin;
pub mod server;

pub use challenge::Challenge;
pub use fairing::SecurityHeaders;
pub use guards::SecurityContext;
pub use request_origin::RequestOrigin;
pub use server::{build_rocket, rocket_log_level, server_figment};
