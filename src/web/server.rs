// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server builder and configuration

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::{debug, info, LevelFilter};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use super::fairing::SecurityHeaders;
use super::{handlers, login};
use crate::config::Config;
use crate::security::session::spawn_cleanup_task;
use crate::security::SecurityChains;

/// Rocket log level matching the application log filter
pub fn rocket_log_level(filter: LevelFilter) -> LogLevel {
    match filter {
        LevelFilter::Off => LogLevel::Off,
        LevelFilter::Error | LevelFilter::Warn => LogLevel::Critical,
        LevelFilter::Info => LogLevel::Normal,
        LevelFilter::Debug | LevelFilter::Trace => LogLevel::Debug,
    }
}

/// Rocket figment built from the server section of the configuration
///
/// TLS is enabled when both `cert` and `key` are set; they are Base64
/// encoded PEM files.
pub fn server_figment(config: &Config, log_level: LogLevel) -> anyhow::Result<Figment> {
    let server = &config.server;
    let mut figment = rocket::Config::figment()
        .merge(("ident", server.name.clone()))
        .merge(("limits", Limits::new().limit("form", 64.kibibytes())))
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
        .merge(("log_level", log_level))
        .merge(("secret_key", server.secret_key.clone()));

    if let (Some(cert), Some(key)) = (&server.cert, &server.key) {
        debug!("SSL certificates found in configuration, enabling TLS");
        let cert_data = BASE64_STANDARD
            .decode(cert)
            .context("Invalid base64 in server.cert")?;
        let key_data = BASE64_STANDARD
            .decode(key)
            .context("Invalid base64 in server.key")?;
        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));
        info!("TLS enabled for web server");
    }

    Ok(figment)
}

/// Build a configured Rocket server instance
///
/// ### Parameters
///
/// * `figment` - The Rocket configuration, see [`server_figment`]
/// * `config` - The application configuration, managed as `Arc<Config>`
///
/// ### Errors
///
/// Fails when the security chains cannot be wired from `config`, e.g. when
/// a JWS algorithm is unknown. The identity provider is not contacted here.
pub fn build_rocket(figment: Figment, config: Arc<Config>) -> anyhow::Result<Rocket<Build>> {
    let chains = SecurityChains::from_config(&config)?;
    let store = chains.store().clone();
    let cleanup_interval = Duration::from_secs(config.session.cleanup_interval_secs);

    info!("{} OAuth2 client registration(s) loaded", chains.clients().len());

    let rocket = rocket::custom(figment)
        .attach(SecurityHeaders)
        .attach(AdHoc::on_liftoff("Session cleanup", move |_| {
            Box::pin(async move {
                debug!("Starting session cleanup every {:?}", cleanup_interval);
                spawn_cleanup_task(store, cleanup_interval);
            })
        }))
        .mount(
            "/",
            routes![
                handlers::public,
                handlers::private,
                handlers::token,
                handlers::api_public,
                handlers::api_private,
                handlers::fallback_get,
                handlers::fallback_post,
                handlers::fallback_put,
                handlers::fallback_patch,
                handlers::fallback_delete,
                login::login_page,
                login::authorization_request,
                login::authorization_callback,
                login::logout_page,
                login::logout,
            ],
        )
        .manage(chains)
        .manage(config);

    Ok(rocket)
}
