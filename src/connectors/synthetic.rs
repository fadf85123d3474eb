// ABOUTME: Synthetic connectors producing deterministic data for development and tests
// ABOUTME: Programmable failure injection and call counters for lifecycle assertions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! Synthetic connectors.
//!
//! In-process implementations of both capability contracts with no network
//! dependency: deterministic resources, scripted failures (exchange, refresh,
//! validation, query) and atomic call counters so tests can assert *how* the
//! lifecycle drove the connector (e.g. exactly one refresh before a query).

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};

use super::{ConnectorMetadata, PersonalConnector, SharedConnector};
use crate::constants::connector_keys;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{Resource, ResourcePage, ResourceQuery, TokenResponse};

/// Deterministic resource fixtures shared by both synthetic variants
fn synthetic_resources(count: usize, kind: &str) -> Vec<Resource> {
    (0..count)
        .map(|i| Resource {
            id: format!("syn-{i}"),
            title: format!("Synthetic {kind} {i}"),
            kind: kind.to_owned(),
            url: Some(format!("https://synthetic.example/{kind}/{i}")),
            metadata: serde_json::Map::new(),
        })
        .collect()
}

/// Page through fixtures using a numeric-offset cursor
fn paginate(resources: &[Resource], query: &ResourceQuery) -> ResourcePage {
    let offset: usize = query
        .cursor
        .as_deref()
        .and_then(|c| c.parse().ok())
        .unwrap_or(0);
    let limit = query.effective_limit();

    let matching: Vec<Resource> = resources
        .iter()
        .filter(|r| {
            query
                .search
                .as_deref()
                .is_none_or(|term| r.title.to_lowercase().contains(&term.to_lowercase()))
        })
        .cloned()
        .collect();

    let page: Vec<Resource> = matching.iter().skip(offset).take(limit).cloned().collect();
    let consumed = offset + page.len();
    let next_cursor = (consumed < matching.len()).then(|| consumed.to_string());

    ResourcePage {
        resources: page,
        next_cursor,
    }
}

/// Programmable personal connector for tests and development
pub struct SyntheticPersonalConnector {
    metadata: ConnectorMetadata,
    resources: Vec<Resource>,
    token_ttl_secs: i64,
    fail_exchange: AtomicBool,
    fail_refresh: AtomicBool,
    /// 0 means "do not fail queries"
    query_failure_status: AtomicU16,
    exchange_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    revoke_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl SyntheticPersonalConnector {
    /// Connector with the default key and 12 fixture resources
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(connector_keys::SYNTHETIC_PERSONAL)
    }

    /// Connector registered under a custom key
    #[must_use]
    pub fn with_key(key: &str) -> Self {
        Self {
            metadata: ConnectorMetadata::new(
                key,
                "Synthetic Workspace",
                "Deterministic workspace data for development and tests",
            ),
            resources: synthetic_resources(12, "document"),
            token_ttl_secs: 3600,
            fail_exchange: AtomicBool::new(false),
            fail_refresh: AtomicBool::new(false),
            query_failure_status: AtomicU16::new(0),
            exchange_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the fixture resources
    #[must_use]
    pub fn with_resources(mut self, count: usize) -> Self {
        self.resources = synthetic_resources(count, "document");
        self
    }

    /// Tokens issued by exchange/refresh expire this many seconds from issue.
    /// Negative values issue already-expired tokens.
    #[must_use]
    pub const fn with_token_ttl(mut self, secs: i64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    /// Make subsequent code exchanges fail
    pub fn fail_exchange(&self, fail: bool) {
        self.fail_exchange.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent refresh grants fail
    pub fn fail_refresh(&self, fail: bool) {
        self.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent queries fail with the given provider status
    pub fn fail_queries_with_status(&self, status: u16) {
        self.query_failure_status.store(status, Ordering::SeqCst);
    }

    /// Number of code exchanges performed
    pub fn exchange_calls(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    /// Number of refresh grants performed
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Number of upstream revocations performed
    pub fn revoke_calls(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    /// Number of resource queries performed (page fetches)
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn issue_token(&self, access_token: String, generation: usize) -> TokenResponse {
        TokenResponse {
            access_token,
            refresh_token: Some(format!("synthetic-refresh-{generation}")),
            expires_at: Some(Utc::now() + Duration::seconds(self.token_ttl_secs)),
            scope: Some("resources:read".into()),
        }
    }

    fn run_query(&self, query: &ResourceQuery) -> ConnectorResult<ResourcePage> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let status = self.query_failure_status.load(Ordering::SeqCst);
        if status != 0 {
            return Err(ConnectorError::resource_query(
                &self.metadata.key,
                Some(status),
                "synthetic provider failure",
            ));
        }
        Ok(paginate(&self.resources, query))
    }
}

impl Default for SyntheticPersonalConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersonalConnector for SyntheticPersonalConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    fn build_authorization_url(&self, redirect_uri: &str, state: &str) -> ConnectorResult<String> {
        Ok(format!(
            "https://synthetic.example/oauth/authorize?client_id=synthetic&redirect_uri={}&response_type=code&state={}",
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        ))
    }

    async fn exchange_code(
        &self,
        code: &str,
        _redirect_uri: &str,
    ) -> ConnectorResult<TokenResponse> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(ConnectorError::TokenExchange {
                connector: self.metadata.key.clone(),
                message: "synthetic exchange rejection".into(),
            });
        }
        Ok(self.issue_token(format!("synthetic-access-{code}"), 1))
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConnectorResult<TokenResponse> {
        let generation = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 2;
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(ConnectorError::TokenRefresh {
                connector: self.metadata.key.clone(),
                message: "synthetic refresh rejection".into(),
            });
        }
        if !refresh_token.starts_with("synthetic-refresh-") {
            return Err(ConnectorError::TokenRefresh {
                connector: self.metadata.key.clone(),
                message: "unknown refresh token".into(),
            });
        }
        Ok(self.issue_token(format!("synthetic-access-refreshed-{generation}"), generation))
    }

    async fn revoke(&self, _access_token: &str) -> ConnectorResult<()> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_resources(
        &self,
        _access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        let unsearched = ResourceQuery {
            search: None,
            ..query.clone()
        };
        self.run_query(&unsearched)
    }

    async fn query_resources(
        &self,
        _access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        self.run_query(query)
    }
}

/// Programmable shared connector for tests and development
pub struct SyntheticSharedConnector {
    metadata: ConnectorMetadata,
    resources: Vec<Resource>,
    accepted_credential: String,
    /// 0 means "do not fail queries"
    query_failure_status: AtomicU16,
    validate_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl SyntheticSharedConnector {
    /// Connector with the default key, accepting `"synthetic-service-key"`
    #[must_use]
    pub fn new() -> Self {
        Self::with_key(connector_keys::SYNTHETIC_SHARED)
    }

    /// Connector registered under a custom key
    #[must_use]
    pub fn with_key(key: &str) -> Self {
        Self {
            metadata: ConnectorMetadata::new(
                key,
                "Synthetic Platform",
                "Deterministic platform data for development and tests",
            ),
            resources: synthetic_resources(6, "record"),
            accepted_credential: "synthetic-service-key".into(),
            query_failure_status: AtomicU16::new(0),
            validate_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    /// The credential [`Self::validate_credential`] accepts
    #[must_use]
    pub fn accepted_credential(&self) -> &str {
        &self.accepted_credential
    }

    /// Make subsequent queries fail with the given provider status
    pub fn fail_queries_with_status(&self, status: u16) {
        self.query_failure_status.store(status, Ordering::SeqCst);
    }

    /// Number of validation pings performed
    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    /// Number of resource queries performed (page fetches)
    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticSharedConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SharedConnector for SyntheticSharedConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    async fn validate_credential(&self, credential: &str) -> ConnectorResult<()> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        if credential == self.accepted_credential {
            Ok(())
        } else {
            Err(ConnectorError::CredentialValidation {
                connector: self.metadata.key.clone(),
                message: "credential rejected by synthetic provider".into(),
            })
        }
    }

    async fn query_resources(
        &self,
        credential: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        let status = self.query_failure_status.load(Ordering::SeqCst);
        if status != 0 {
            return Err(ConnectorError::resource_query(
                &self.metadata.key,
                Some(status),
                "synthetic provider failure",
            ));
        }
        if credential != self.accepted_credential {
            return Err(ConnectorError::resource_query(
                &self.metadata.key,
                Some(401),
                "invalid service credential",
            ));
        }
        Ok(paginate(&self.resources, query))
    }
}
