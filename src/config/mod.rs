// ABOUTME: Environment-based configuration for connectors and process-wide secrets
// ABOUTME: OAuth client credentials, endpoint overrides, and startup validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! # Configuration
//!
//! Environment-only configuration, loaded once at startup. Per-connector
//! variables follow `MOSAIC_<KEY>_<FIELD>` (e.g. `MOSAIC_NOTION_CLIENT_ID`).
//! Endpoint URLs have hardcoded defaults and accept overrides, which keeps
//! staging deployments and HTTP-mock tests off the real provider hosts.
//! Missing *required* configuration for a registered connector is a fatal
//! [`ConnectorError::Configuration`] at startup, never a request-time error.

use std::env;
use url::Url;

use crate::errors::{ConnectorError, ConnectorResult};

/// OAuth client credentials for a personal connector
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    /// Provider-issued client id
    pub client_id: String,
    /// Provider-issued client secret
    pub client_secret: String,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
}

impl OAuthClientConfig {
    /// Load client credentials for a connector key from the environment.
    ///
    /// Reads `MOSAIC_<KEY>_CLIENT_ID`, `MOSAIC_<KEY>_CLIENT_SECRET` and
    /// `MOSAIC_<KEY>_REDIRECT_URI`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when any of the three is
    /// unset.
    pub fn from_env(connector_key: &str) -> ConnectorResult<Self> {
        Ok(Self {
            client_id: require_env(connector_key, "CLIENT_ID")?,
            client_secret: require_env(connector_key, "CLIENT_SECRET")?,
            redirect_uri: require_env(connector_key, "REDIRECT_URI")?,
        })
    }
}

/// OAuth and API endpoint set for a personal connector
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Provider authorization page
    pub auth_url: String,
    /// Token exchange/refresh endpoint
    pub token_url: String,
    /// Base URL for resource API calls
    pub api_base_url: String,
}

impl EndpointConfig {
    /// Resolve endpoints for a connector: hardcoded defaults with
    /// `MOSAIC_<KEY>_AUTH_URL` / `_TOKEN_URL` / `_API_BASE_URL` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when a resolved URL does not
    /// parse; catching this at startup beats a malformed request later.
    pub fn from_env(
        connector_key: &str,
        default_auth_url: &str,
        default_token_url: &str,
        default_api_base_url: &str,
    ) -> ConnectorResult<Self> {
        let config = Self {
            auth_url: env_override(connector_key, "AUTH_URL", default_auth_url),
            token_url: env_override(connector_key, "TOKEN_URL", default_token_url),
            api_base_url: env_override(connector_key, "API_BASE_URL", default_api_base_url),
        };
        for (field, value) in [
            ("auth_url", &config.auth_url),
            ("token_url", &config.token_url),
            ("api_base_url", &config.api_base_url),
        ] {
            validate_url(connector_key, field, value)?;
        }
        Ok(config)
    }
}

/// Resolve the API base URL for a shared connector:
/// `MOSAIC_<KEY>_API_BASE_URL` with a hardcoded default.
///
/// # Errors
///
/// Returns [`ConnectorError::Configuration`] when the resolved URL does not
/// parse.
pub fn shared_api_base_url(connector_key: &str, default: &str) -> ConnectorResult<String> {
    let value = env_override(connector_key, "API_BASE_URL", default);
    validate_url(connector_key, "api_base_url", &value)?;
    Ok(value)
}

/// Read a required `MOSAIC_<KEY>_<FIELD>` variable
fn require_env(connector_key: &str, field: &str) -> ConnectorResult<String> {
    let name = var_name(connector_key, field);
    env::var(&name).map_err(|_| ConnectorError::config(format!("{name} is not set")))
}

/// Read an optional `MOSAIC_<KEY>_<FIELD>` variable with a default
fn env_override(connector_key: &str, field: &str, default: &str) -> String {
    env::var(var_name(connector_key, field)).unwrap_or_else(|_| default.to_owned())
}

fn var_name(connector_key: &str, field: &str) -> String {
    format!("MOSAIC_{connector_key}_{field}")
}

fn validate_url(connector_key: &str, field: &str, value: &str) -> ConnectorResult<()> {
    Url::parse(value).map_err(|e| {
        ConnectorError::config(format!("{connector_key} {field} is not a valid URL: {e}"))
    })?;
    Ok(())
}
