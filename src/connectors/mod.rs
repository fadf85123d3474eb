// ABOUTME: Connector capability contracts and the adapter catalog
// ABOUTME: PersonalConnector and SharedConnector traits plus per-provider adapter modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! # Connector Contracts
//!
//! Two disjoint capability interfaces, deliberately without a common base
//! trait: a [`PersonalConnector`] is authorized per user through an OAuth
//! round-trip, a [`SharedConnector`] is configured once per project with a
//! service credential. The registry keeps the two variants in separate maps
//! and callers pick the variant statically, so neither contract carries
//! methods that are meaningless for the other.
//!
//! Adapters translate between a provider's native API shape and the
//! provider-agnostic [`Resource`](crate::models::Resource) model. Each adapter
//! compiles behind its own feature flag.

pub mod http;
pub mod registry;

#[cfg(feature = "connector-linear")]
pub mod linear;
#[cfg(feature = "connector-notion")]
pub mod notion;
#[cfg(feature = "connector-resend")]
pub mod resend;
#[cfg(feature = "connector-stripe")]
pub mod stripe;
#[cfg(feature = "connector-synthetic")]
pub mod synthetic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ConnectorResult;
use crate::models::{ResourcePage, ResourceQuery, TokenResponse};

/// Presentation and identity metadata carried by every connector definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorMetadata {
    /// Unique registry key, SCREAMING_SNAKE (e.g. `"NOTION"`)
    pub key: String,
    /// Human-readable name for catalogs and consent screens
    pub display_name: String,
    /// Short description of what the integration provides
    pub description: String,
}

impl ConnectorMetadata {
    /// Build metadata for a connector definition
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            description: description.into(),
        }
    }
}

/// User-authorized connector driven by an OAuth-style flow.
///
/// Implementations are immutable after construction and shared across
/// concurrent requests behind an `Arc`.
#[async_trait]
pub trait PersonalConnector: Send + Sync {
    /// Connector identity and presentation metadata
    fn metadata(&self) -> &ConnectorMetadata;

    /// Build the provider authorization URL for the given redirect target and
    /// CSRF state token. Pure URL construction; no network call.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint cannot produce a URL.
    fn build_authorization_url(&self, redirect_uri: &str, state: &str) -> ConnectorResult<String>;

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::TokenExchange`](crate::errors::ConnectorError::TokenExchange)
    /// when the provider rejects the code.
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> ConnectorResult<TokenResponse>;

    /// Obtain a fresh access token from a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::TokenRefresh`](crate::errors::ConnectorError::TokenRefresh)
    /// when the provider rejects the grant; the caller invalidates the stored
    /// connection on that outcome.
    async fn refresh_token(&self, refresh_token: &str) -> ConnectorResult<TokenResponse>;

    /// Revoke an access token upstream. Best-effort: callers log failures and
    /// proceed with local deletion.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider revocation endpoint rejects the call.
    async fn revoke(&self, access_token: &str) -> ConnectorResult<()>;

    /// List resources without a search term
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ResourceQuery`](crate::errors::ConnectorError::ResourceQuery)
    /// on transport or provider failure; an empty page is not an error.
    async fn list_resources(
        &self,
        access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage>;

    /// Query resources, honoring the search term and filters
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::list_resources`].
    async fn query_resources(
        &self,
        access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage>;
}

/// Service-credential connector used on behalf of all of a project's users
#[async_trait]
pub trait SharedConnector: Send + Sync {
    /// Connector identity and presentation metadata
    fn metadata(&self) -> &ConnectorMetadata;

    /// Check a raw credential against the provider with a cheap call before
    /// it is ever persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::CredentialValidation`](crate::errors::ConnectorError::CredentialValidation)
    /// when the provider rejects the credential.
    async fn validate_credential(&self, credential: &str) -> ConnectorResult<()>;

    /// Query resources with the project's service credential
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ResourceQuery`](crate::errors::ConnectorError::ResourceQuery)
    /// on transport or provider failure; an empty page is not an error.
    async fn query_resources(
        &self,
        credential: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage>;
}
