// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-oidc-hello project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management
//!
//! The configuration is backed by a YAML file and validated against an
//! embedded JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `server`: network binding, TLS and cookie encryption key
//! - `oauth2`: client registrations for browser login and bearer token validation
//! - `session`: browser session lifetime and cookie settings
//!
//! ## Usage
//!
//! ```no_run
//! use rust_oidc_hello::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                                              // Port
//!     Some("0.0.0.0".to_string()),                             // Address
//!     Some("https://sso.example.com/realms/demo".to_string()), // Issuer
//!     None,                                                    // Client id
//!     None,                                                    // Client secret
//! );
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod oauth2;
pub mod server;
pub mod session;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use oauth2::{
    ClientConfig, ClientRegistration, JwtResourceServerConfig, OAuth2Config, ProviderConfig,
    ResourceServerConfig,
};
pub use server::ServerConfig;
pub use session::SessionConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Root configuration structure.
///
/// Every section falls back to its defaults when omitted, so an empty file
/// is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub oauth2: OAuth2Config,

    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with the default configuration. A file that
    /// fails validation leaves a `*.sample.yaml` next to it and returns an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // An empty document is valid and means "all defaults"
        let json_value = match serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })? {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            value => value,
        };

        let schema: serde_json::Value = serde_json::from_str(utils::CONFIG_SCHEMA)
            .context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to build JSON schema validator")?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_json::from_value(json_value) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that are present override the file.
    ///
    /// # Parameters
    ///
    /// * `port` - TCP port of the web server
    /// * `address` - Network address the web server binds to
    /// * `issuer_uri` - Issuer for every client registration and for bearer token validation
    /// * `client_id` - Client id of every client registration
    /// * `client_secret` - Client secret of every client registration
    pub fn apply_args(
        &mut self,
        port: Option<u16>,
        address: Option<String>,
        issuer_uri: Option<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) {
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }

        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }

        if let Some(issuer) = issuer_uri {
            debug!("Overriding issuer from command line: {}", issuer);
            for registration in self.oauth2.client.registration.values_mut() {
                registration.provider.issuer_uri = Some(issuer.clone());
            }
            self.oauth2.resourceserver.jwt.issuer_uri = Some(issuer);
        }

        if let Some(client_id) = client_id {
            debug!("Overriding client id from command line: {}", client_id);
            for registration in self.oauth2.client.registration.values_mut() {
                registration.client_id = client_id.clone();
            }
        }

        if let Some(secret) = client_secret {
            debug!("Overriding client secret from command line");
            for registration in self.oauth2.client.registration.values_mut() {
                registration.client_secret = Some(secret.clone());
            }
        }
    }
}
