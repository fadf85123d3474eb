// ABOUTME: Logging configuration and structured logging setup
// ABOUTME: Configures log levels and output formats via tracing-subscriber
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Structured logging setup.
//!
//! Connector operations log through `tracing` with connector keys and scope
//! ids as fields; decrypted credential material is never logged. Host
//! applications that already install a subscriber can skip [`init`]
//! entirely.

use std::env;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format for production logging
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact format for space-constrained environments
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level filter when `RUST_LOG` is unset (e.g. `"info"`)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}

impl LoggingConfig {
    /// Build configuration from `MOSAIC_LOG_LEVEL` / `MOSAIC_LOG_FORMAT`
    #[must_use]
    pub fn from_env() -> Self {
        let level = env::var("MOSAIC_LOG_LEVEL").unwrap_or_else(|_| "info".into());
        let format = match env::var("MOSAIC_LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };
        Self { level, format }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured default level. Calling
/// this twice (or after the host installed its own subscriber) returns an
/// error rather than panicking.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init()?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_format_from_env() {
        std::env::set_var("MOSAIC_LOG_FORMAT", "json");
        assert_eq!(LoggingConfig::from_env().format, LogFormat::Json);

        std::env::set_var("MOSAIC_LOG_FORMAT", "compact");
        assert_eq!(LoggingConfig::from_env().format, LogFormat::Compact);

        std::env::remove_var("MOSAIC_LOG_FORMAT");
        assert_eq!(LoggingConfig::from_env().format, LogFormat::Pretty);
    }
}
