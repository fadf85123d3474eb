// ABOUTME: Core data models for connections, tokens, and provider-agnostic resources
// ABOUTME: TokenResponse, PersonalConnection, SharedConnection, Resource, ResourceQuery, ResourcePage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Shared domain models.
//!
//! Connection records carry only the encrypted envelope; [`TokenResponse`] is
//! the decrypted form and exists in memory for the duration of a single
//! request only - it is never persisted or logged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::timeouts;

/// Result of an OAuth code exchange or refresh grant.
///
/// Never persisted in clear form; stored only inside an encrypted envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer access token
    pub access_token: String,
    /// Refresh token, when the provider issues one
    pub refresh_token: Option<String>,
    /// Absolute expiry of the access token; `None` for non-expiring tokens
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes, provider-formatted
    pub scope: Option<String>,
}

/// One user's authorization with one personal connector.
///
/// Composite identity `(user_id, connector_key)`; at most one row per pair,
/// last write wins on re-authorization. Absence from storage is the revoked
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalConnection {
    /// Owning user
    pub user_id: Uuid,
    /// Registry key of the connector
    pub connector_key: String,
    /// Encrypted [`TokenResponse`] envelope
    pub encrypted_token: String,
    /// Mirror of the token expiry, kept in clear for refresh scheduling
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes, kept in clear for display
    pub scope: Option<String>,
    /// When the connection was first established
    pub created_at: DateTime<Utc>,
    /// When the token was last replaced
    pub updated_at: DateTime<Utc>,
}

impl PersonalConnection {
    /// Create a connection from a freshly exchanged, already-encrypted token
    #[must_use]
    pub fn new(
        user_id: Uuid,
        connector_key: String,
        encrypted_token: String,
        expires_at: Option<DateTime<Utc>>,
        scope: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            connector_key,
            encrypted_token,
            expires_at,
            scope,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the access token expiry has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| Utc::now() > expires_at)
    }

    /// Whether the token is expired or inside the refresh safety margin
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.expires_at.is_some_and(|expires_at| {
            Utc::now() + Duration::seconds(timeouts::TOKEN_REFRESH_MARGIN_SECS) >= expires_at
        })
    }

    /// Replace the stored token after a successful refresh
    pub fn replace_token(
        &mut self,
        encrypted_token: String,
        expires_at: Option<DateTime<Utc>>,
        scope: Option<String>,
    ) {
        self.encrypted_token = encrypted_token;
        self.expires_at = expires_at;
        self.scope = scope;
        self.updated_at = Utc::now();
    }
}

/// One project's credential for a shared connector.
///
/// Composite identity `(project_id, connector_key)`. Rotation overwrites the
/// row; there is no refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConnection {
    /// Owning project (a deployed Mosaic application)
    pub project_id: Uuid,
    /// Registry key of the connector
    pub connector_key: String,
    /// Encrypted service-credential envelope
    pub encrypted_credential: String,
    /// When the credential was first configured
    pub created_at: DateTime<Utc>,
    /// When the credential was last rotated
    pub updated_at: DateTime<Utc>,
}

impl SharedConnection {
    /// Create a connection from a validated, already-encrypted credential
    #[must_use]
    pub fn new(project_id: Uuid, connector_key: String, encrypted_credential: String) -> Self {
        let now = Utc::now();
        Self {
            project_id,
            connector_key,
            encrypted_credential,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Provider-agnostic representation of an external resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Provider-native identifier
    pub id: String,
    /// Human-readable title
    pub title: String,
    /// Provider-specific kind discriminator (e.g. "page", "issue", "customer")
    pub kind: String,
    /// Canonical URL, when the provider exposes one
    pub url: Option<String>,
    /// Additional provider fields preserved for callers
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Provider-agnostic query over a connector's resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceQuery {
    /// Free-text search term
    pub search: Option<String>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
    /// Requested page size; clamped to [`crate::constants::limits::MAX_PAGE_SIZE`]
    pub limit: Option<usize>,
    /// Provider-specific filters
    #[serde(default)]
    pub filters: serde_json::Map<String, serde_json::Value>,
}

impl ResourceQuery {
    /// Build a search query
    #[must_use]
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Effective page size after applying defaults and the upper bound
    #[must_use]
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(crate::constants::limits::DEFAULT_PAGE_SIZE)
            .min(crate::constants::limits::MAX_PAGE_SIZE)
    }

    /// Copy of this query positioned at the given cursor
    #[must_use]
    pub fn with_cursor(&self, cursor: Option<String>) -> Self {
        Self {
            cursor,
            ..self.clone()
        }
    }
}

/// One page of normalized resources
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcePage {
    /// Resources in this page; empty means the provider returned zero items
    pub resources: Vec<Resource>,
    /// Opaque cursor for the next page; `None` when exhausted
    pub next_cursor: Option<String>,
}

impl ResourcePage {
    /// Page with no items and no continuation
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Authorization round-trip handle returned by
/// [`crate::manager::ConnectionManager::initiate_authorization`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Provider authorization URL the user must visit
    pub authorization_url: String,
    /// CSRF state token; must round-trip through the provider callback
    pub state: String,
    /// Connector this authorization belongs to
    pub connector_key: String,
    /// Minutes until the pending authorization expires
    pub expires_in_minutes: i64,
}
