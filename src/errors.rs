// ABOUTME: Unified error taxonomy for the connector registry and credential lifecycle
// ABOUTME: Defines ConnectorError variants, HTTP status mapping, and the ConnectorResult alias
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! # Connector Error Handling
//!
//! Every fallible operation in this crate returns [`ConnectorResult`]. The
//! taxonomy separates caller misuse (unknown key, duplicate registration),
//! security-relevant failures (crypto, state-machine violations) and provider
//! failures (exchange, refresh, resource queries). Crypto and state-machine
//! errors are never retried; provider transport errors may be retried inside
//! an adapter's bounded retry loop before surfacing here.

use thiserror::Error;

use crate::crypto::CryptoError;

/// Result type alias for convenience
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Unified error type for registry, connection and gateway operations
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Required configuration is missing or invalid. Fatal at startup; the
    /// process must not serve traffic in this state.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A connector was registered twice under the same key
    #[error("connector already registered: {0}")]
    DuplicateConnector(String),

    /// No connector is registered under the requested key
    #[error("connector not found: {0}")]
    ConnectorNotFound(String),

    /// Authenticated encryption of credential material failed
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Envelope authentication or format validation failed. Always fails
    /// closed; plaintext is never returned on a failed tag check.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Provider rejected the authorization-code exchange
    #[error("token exchange failed for {connector}: {message}")]
    TokenExchange {
        /// Connector key the exchange was attempted against
        connector: String,
        /// Provider-reported failure detail (never contains token material)
        message: String,
    },

    /// Provider rejected the refresh grant; the stored connection has been
    /// invalidated and the user must re-authorize.
    #[error("token refresh failed for {connector}: {message}")]
    TokenRefresh {
        /// Connector key the refresh was attempted against
        connector: String,
        /// Provider-reported failure detail
        message: String,
    },

    /// Operation requires an authorized connection and none exists
    #[error("no authorized connection for {connector}")]
    NotAuthorized {
        /// Connector key the caller attempted to use
        connector: String,
    },

    /// A shared credential failed the provider validation ping and was not
    /// persisted.
    #[error("credential validation failed for {connector}: {message}")]
    CredentialValidation {
        /// Connector key the credential was supplied for
        connector: String,
        /// Provider-reported rejection detail
        message: String,
    },

    /// The OAuth state parameter was unknown, expired, or already consumed
    #[error("invalid or expired authorization state")]
    InvalidState,

    /// A provider resource call failed after any adapter-level retries.
    /// Distinct from an empty result: zero resources is a successful query.
    #[error("resource query failed for {connector}: {message}")]
    ResourceQuery {
        /// Connector key the query was routed to
        connector: String,
        /// Provider HTTP status, when one was received
        status: Option<u16>,
        /// Transport or provider failure detail
        message: String,
    },

    /// Connection store operation failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl ConnectorError {
    /// Get the HTTP status code equivalent for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::DuplicateConnector(_) => 409,
            Self::ConnectorNotFound(_) => 404,
            Self::NotAuthorized { .. } => 401,
            Self::InvalidState | Self::CredentialValidation { .. } => 400,
            Self::TokenExchange { .. } | Self::TokenRefresh { .. } | Self::ResourceQuery { .. } => {
                502
            }
            Self::Configuration(_)
            | Self::Encryption(_)
            | Self::Decryption(_)
            | Self::Storage(_) => 500,
        }
    }

    /// Whether re-authorization by the user is the expected remediation
    #[must_use]
    pub const fn requires_reconnect(&self) -> bool {
        matches!(self, Self::TokenRefresh { .. } | Self::NotAuthorized { .. })
    }

    /// Build a [`Self::ResourceQuery`] from a provider response status
    pub fn resource_query(
        connector: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::ResourceQuery {
            connector: connector.into(),
            status,
            message: message.into(),
        }
    }

    /// Build a [`Self::Configuration`] error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

impl From<CryptoError> for ConnectorError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Encryption(msg) => Self::Encryption(msg),
            CryptoError::Decryption(msg) => Self::Decryption(msg),
            CryptoError::InvalidKey(msg) => Self::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(
            ConnectorError::ConnectorNotFound("NOTION".into()).http_status(),
            404
        );
        assert_eq!(
            ConnectorError::DuplicateConnector("STRIPE".into()).http_status(),
            409
        );
        assert_eq!(
            ConnectorError::NotAuthorized {
                connector: "LINEAR".into()
            }
            .http_status(),
            401
        );
        assert_eq!(
            ConnectorError::resource_query("NOTION", Some(503), "upstream down").http_status(),
            502
        );
        assert_eq!(ConnectorError::Decryption("bad tag".into()).http_status(), 500);
    }

    #[test]
    fn test_reconnect_classification() {
        assert!(ConnectorError::TokenRefresh {
            connector: "LINEAR".into(),
            message: "revoked".into()
        }
        .requires_reconnect());
        assert!(!ConnectorError::InvalidState.requires_reconnect());
    }

    #[test]
    fn test_crypto_error_conversion() {
        let err: ConnectorError = CryptoError::Decryption("tag mismatch".into()).into();
        assert!(matches!(err, ConnectorError::Decryption(_)));
    }
}
