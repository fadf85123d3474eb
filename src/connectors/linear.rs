// ABOUTME: Linear personal connector - OAuth exchange/refresh and issue search over GraphQL
// ABOUTME: Translates Linear issues into the shared Resource model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::http::{error_body, provider_client, send_with_retry, RetryConfig};
use super::{ConnectorMetadata, PersonalConnector};
use crate::config::{EndpointConfig, OAuthClientConfig};
use crate::constants::{connector_keys, endpoints};
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{Resource, ResourcePage, ResourceQuery, TokenResponse};

/// GraphQL document for cursor-paginated issue listing with an optional
/// title filter
const ISSUES_QUERY: &str = r"
query Issues($first: Int!, $after: String, $filter: IssueFilter) {
  issues(first: $first, after: $after, filter: $filter) {
    nodes { id identifier title url }
    pageInfo { hasNextPage endCursor }
  }
}";

/// Linear issue tracker connector
pub struct LinearConnector {
    metadata: ConnectorMetadata,
    oauth: OAuthClientConfig,
    endpoints: EndpointConfig,
    client: Client,
    retry: RetryConfig,
}

/// Linear token endpoint response
#[derive(Debug, Deserialize)]
struct LinearTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssuesEnvelope {
    data: Option<IssuesData>,
    errors: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    issues: IssueConnection,
}

#[derive(Debug, Deserialize)]
struct IssueConnection {
    nodes: Vec<IssueNode>,
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
struct IssueNode {
    id: String,
    identifier: String,
    title: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
    #[serde(rename = "endCursor")]
    end_cursor: Option<String>,
}

impl LinearConnector {
    /// Build the connector from `MOSAIC_LINEAR_*` environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when client credentials are
    /// missing - a startup-time failure.
    pub fn from_env() -> ConnectorResult<Self> {
        let oauth = OAuthClientConfig::from_env(connector_keys::LINEAR)?;
        let endpoints = EndpointConfig::from_env(
            connector_keys::LINEAR,
            endpoints::LINEAR_AUTH_URL,
            endpoints::LINEAR_TOKEN_URL,
            endpoints::LINEAR_API_BASE_URL,
        )?;
        Self::new(oauth, endpoints)
    }

    /// Build the connector with explicit configuration (tests, staging)
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(oauth: OAuthClientConfig, endpoints: EndpointConfig) -> ConnectorResult<Self> {
        Ok(Self {
            metadata: ConnectorMetadata::new(
                connector_keys::LINEAR,
                "Linear",
                "Search and read issues from Linear workspaces",
            ),
            oauth,
            endpoints,
            client: provider_client()?,
            retry: RetryConfig::default(),
        })
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, (Option<u16>, String)> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .form(params)
            .send()
            .await
            .map_err(|e| (e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err((Some(status.as_u16()), body));
        }

        let raw: LinearTokenResponse = response
            .json()
            .await
            .map_err(|e| (None, format!("malformed token response: {e}")))?;

        Ok(TokenResponse {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token,
            expires_at: raw.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            scope: raw.scope,
        })
    }
}

#[async_trait]
impl PersonalConnector for LinearConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    fn build_authorization_url(&self, redirect_uri: &str, state: &str) -> ConnectorResult<String> {
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=read&state={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.oauth.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        ))
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> ConnectorResult<TokenResponse> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ];
        self.token_request(&params)
            .await
            .map_err(|(status, message)| ConnectorError::TokenExchange {
                connector: connector_keys::LINEAR.to_owned(),
                message: status.map_or_else(
                    || message.clone(),
                    |code| format!("status {code}: {message}"),
                ),
            })
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConnectorResult<TokenResponse> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.oauth.client_id.as_str()),
            ("client_secret", self.oauth.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&params)
            .await
            .map_err(|(status, message)| ConnectorError::TokenRefresh {
                connector: connector_keys::LINEAR.to_owned(),
                message: status.map_or_else(
                    || message.clone(),
                    |code| format!("status {code}: {message}"),
                ),
            })
    }

    async fn revoke(&self, access_token: &str) -> ConnectorResult<()> {
        let response = self
            .client
            .post(format!("{}/oauth/revoke", self.endpoints.api_base_url))
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await
            .map_err(|e| {
                ConnectorError::resource_query(connector_keys::LINEAR, None, e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ConnectorError::resource_query(
                connector_keys::LINEAR,
                Some(status.as_u16()),
                "revocation rejected",
            ))
        }
    }

    async fn list_resources(
        &self,
        access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        let unsearched = ResourceQuery {
            search: None,
            ..query.clone()
        };
        self.query_resources(access_token, &unsearched).await
    }

    async fn query_resources(
        &self,
        access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        let filter = query
            .search
            .as_deref()
            .map(|term| json!({ "title": { "containsIgnoreCase": term } }));

        let body = json!({
            "query": ISSUES_QUERY,
            "variables": {
                "first": query.effective_limit(),
                "after": query.cursor,
                "filter": filter,
            }
        });

        let request = self
            .client
            .post(format!("{}/graphql", self.endpoints.api_base_url))
            .header("Authorization", format!("Bearer {access_token}"))
            .json(&body);

        let response = send_with_retry(request, connector_keys::LINEAR, &self.retry).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ConnectorError::resource_query(
                connector_keys::LINEAR,
                Some(status.as_u16()),
                body,
            ));
        }

        let envelope: IssuesEnvelope = response.json().await.map_err(|e| {
            ConnectorError::resource_query(
                connector_keys::LINEAR,
                None,
                format!("malformed GraphQL response: {e}"),
            )
        })?;

        if let Some(errors) = envelope.errors.filter(|e| !e.is_empty()) {
            return Err(ConnectorError::resource_query(
                connector_keys::LINEAR,
                Some(status.as_u16()),
                format!("GraphQL errors: {}", serde_json::Value::from(errors)),
            ));
        }

        let data = envelope.data.ok_or_else(|| {
            ConnectorError::resource_query(connector_keys::LINEAR, None, "empty GraphQL response")
        })?;

        let resources = data
            .issues
            .nodes
            .into_iter()
            .map(|node| {
                let mut metadata = serde_json::Map::new();
                metadata.insert("identifier".to_owned(), json!(node.identifier));
                Resource {
                    id: node.id,
                    title: node.title,
                    kind: "issue".to_owned(),
                    url: node.url,
                    metadata,
                }
            })
            .collect();

        Ok(ResourcePage {
            resources,
            next_cursor: data
                .issues
                .page_info
                .has_next_page
                .then_some(data.issues.page_info.end_cursor)
                .flatten(),
        })
    }
}
