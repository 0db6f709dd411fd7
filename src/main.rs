// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the OIDC hello server
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use log::info;

use rust_oidc_hello::config::{self, Config};
use rust_oidc_hello::web::{build_rocket, rocket_log_level, server_figment};

/// Web application secured by OpenID Connect login and JWT bearer tokens
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Web server port (default: 8080)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Web server address (default: 127.0.0.1)
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// OpenID provider issuer, applied to every client registration and to
    /// bearer token validation
    #[arg(long)]
    issuer_uri: Option<String>,

    /// OAuth2 client id, applied to every client registration
    #[arg(long)]
    client_id: Option<String>,

    /// OAuth2 client secret, applied to every client registration
    #[arg(long)]
    client_secret: Option<String>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port,
        args.address.clone(),
        args.issuer_uri.clone(),
        args.client_id.clone(),
        args.client_secret.clone(),
    );

    info!(
        "Starting web server on {}:{}",
        config.server.address, config.server.port
    );

    let figment = server_figment(&config, rocket_log_level(log_level))?;
    let rocket = build_rocket(figment, Arc::new(config))?;
    rocket.launch().await?;

    info!("Server stopped");
    Ok(())
}
