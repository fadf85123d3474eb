// ABOUTME: Notion personal connector - OAuth exchange and workspace search
// ABOUTME: Translates Notion pages and databases into the shared Resource model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::http::{error_body, provider_client, send_with_retry, RetryConfig};
use super::{ConnectorMetadata, PersonalConnector};
use crate::config::{EndpointConfig, OAuthClientConfig};
use crate::constants::{connector_keys, endpoints};
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{Resource, ResourcePage, ResourceQuery, TokenResponse};

/// Notion workspace connector.
///
/// Notion's token exchange authenticates with HTTP Basic
/// (`client_id:client_secret`) and issues workspace-scoped bot tokens.
/// Tokens from pre-2024 integrations do not expire and carry no refresh
/// token; both response shapes are handled.
pub struct NotionConnector {
    metadata: ConnectorMetadata,
    oauth: OAuthClientConfig,
    endpoints: EndpointConfig,
    client: Client,
    retry: RetryConfig,
}

/// Notion token endpoint response
#[derive(Debug, Deserialize)]
struct NotionTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    workspace_name: Option<String>,
}

/// Notion `/search` response envelope
#[derive(Debug, Deserialize)]
struct NotionSearchResponse {
    results: Vec<serde_json::Value>,
    next_cursor: Option<String>,
    has_more: bool,
}

impl NotionConnector {
    /// Build the connector from `MOSAIC_NOTION_*` environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when client credentials are
    /// missing - a startup-time failure.
    pub fn from_env() -> ConnectorResult<Self> {
        let oauth = OAuthClientConfig::from_env(connector_keys::NOTION)?;
        let endpoints = EndpointConfig::from_env(
            connector_keys::NOTION,
            endpoints::NOTION_AUTH_URL,
            endpoints::NOTION_TOKEN_URL,
            endpoints::NOTION_API_BASE_URL,
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
                connector_keys::NOTION,
                "Notion",
                "Search and read pages and databases from a Notion workspace",
            ),
            oauth,
            endpoints,
            client: provider_client()?,
            retry: RetryConfig::default(),
        })
    }

    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.oauth.client_id, self.oauth.client_secret);
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    async fn token_request(
        &self,
        body: serde_json::Value,
    ) -> Result<NotionTokenResponse, (Option<u16>, String)> {
        let response = self
            .client
            .post(&self.endpoints.token_url)
            .header("Authorization", self.basic_auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|e| (e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err((Some(status.as_u16()), body));
        }

        response
            .json::<NotionTokenResponse>()
            .await
            .map_err(|e| (None, format!("malformed token response: {e}")))
    }

    fn into_token_response(raw: NotionTokenResponse) -> TokenResponse {
        if let Some(workspace) = &raw.workspace_name {
            debug!(workspace, "Notion token issued");
        }
        TokenResponse {
            access_token: raw.access_token,
            refresh_token: raw.refresh_token,
            expires_at: raw.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            scope: None,
        }
    }

    async fn search(
        &self,
        access_token: &str,
        query: &ResourceQuery,
        search_term: Option<&str>,
    ) -> ConnectorResult<ResourcePage> {
        let mut body = json!({
            "page_size": query.effective_limit(),
        });
        if let Some(term) = search_term {
            body["query"] = json!(term);
        }
        if let Some(cursor) = &query.cursor {
            body["start_cursor"] = json!(cursor);
        }

        let request = self
            .client
            .post(format!("{}/search", self.endpoints.api_base_url))
            .header("Authorization", format!("Bearer {access_token}"))
            .header("Notion-Version", endpoints::NOTION_API_VERSION)
            .json(&body);

        let response = send_with_retry(request, connector_keys::NOTION, &self.retry).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ConnectorError::resource_query(
                connector_keys::NOTION,
                Some(status.as_u16()),
                body,
            ));
        }

        let parsed: NotionSearchResponse = response.json().await.map_err(|e| {
            ConnectorError::resource_query(
                connector_keys::NOTION,
                None,
                format!("malformed search response: {e}"),
            )
        })?;

        let resources = parsed.results.iter().map(normalize_result).collect();
        Ok(ResourcePage {
            resources,
            next_cursor: parsed.has_more.then_some(parsed.next_cursor).flatten(),
        })
    }
}

/// Map one Notion search result (page or database) onto [`Resource`]
fn normalize_result(value: &serde_json::Value) -> Resource {
    let object = value
        .get("object")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("page");
    let id = value
        .get("id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned();
    let url = value
        .get("url")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    let mut metadata = serde_json::Map::new();
    if let Some(edited) = value.get("last_edited_time") {
        metadata.insert("last_edited_time".to_owned(), edited.clone());
    }
    if let Some(archived) = value.get("archived") {
        metadata.insert("archived".to_owned(), archived.clone());
    }

    Resource {
        id,
        title: extract_title(value),
        kind: object.to_owned(),
        url,
        metadata,
    }
}

/// Pull a plain-text title out of a page's properties or a database's
/// top-level `title` array. Untitled objects stay readable in catalogs.
fn extract_title(value: &serde_json::Value) -> String {
    let title_array = value
        .get("title")
        .and_then(serde_json::Value::as_array)
        .or_else(|| {
            value
                .get("properties")
                .and_then(serde_json::Value::as_object)?
                .values()
                .find_map(|prop| prop.get("title").and_then(serde_json::Value::as_array))
        });

    let title: String = title_array
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(serde_json::Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if title.is_empty() {
        "Untitled".to_owned()
    } else {
        title
    }
}

#[async_trait]
impl PersonalConnector for NotionConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    fn build_authorization_url(&self, redirect_uri: &str, state: &str) -> ConnectorResult<String> {
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&owner=user&state={}",
            self.endpoints.auth_url,
            urlencoding::encode(&self.oauth.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state)
        ))
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> ConnectorResult<TokenResponse> {
        let body = json!({
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": redirect_uri,
        });
        self.token_request(body)
            .await
            .map(Self::into_token_response)
            .map_err(|(status, message)| ConnectorError::TokenExchange {
                connector: connector_keys::NOTION.to_owned(),
                message: status.map_or_else(
                    || message.clone(),
                    |code| format!("status {code}: {message}"),
                ),
            })
    }

    async fn refresh_token(&self, refresh_token: &str) -> ConnectorResult<TokenResponse> {
        let body = json!({
            "grant_type": "refresh_token",
            "refresh_token": refresh_token,
        });
        self.token_request(body)
            .await
            .map(Self::into_token_response)
            .map_err(|(status, message)| ConnectorError::TokenRefresh {
                connector: connector_keys::NOTION.to_owned(),
                message: status.map_or_else(
                    || message.clone(),
                    |code| format!("status {code}: {message}"),
                ),
            })
    }

    async fn revoke(&self, _access_token: &str) -> ConnectorResult<()> {
        // Notion exposes no public revocation endpoint; deleting the stored
        // connection is the whole operation.
        debug!("Notion revocation is local-only");
        Ok(())
    }

    async fn list_resources(
        &self,
        access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        self.search(access_token, query, None).await
    }

    async fn query_resources(
        &self,
        access_token: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        self.search(access_token, query, query.search.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_from_database_shape() {
        let value = json!({
            "object": "database",
            "id": "db-1",
            "title": [
                { "plain_text": "Road" },
                { "plain_text": "map" }
            ]
        });
        assert_eq!(extract_title(&value), "Roadmap");
    }

    #[test]
    fn test_extract_title_from_page_properties() {
        let value = json!({
            "object": "page",
            "id": "page-1",
            "properties": {
                "Name": {
                    "title": [ { "plain_text": "Launch plan" } ]
                }
            }
        });
        assert_eq!(extract_title(&value), "Launch plan");
    }

    #[test]
    fn test_untitled_fallback() {
        let value = json!({ "object": "page", "id": "page-2", "properties": {} });
        assert_eq!(extract_title(&value), "Untitled");
    }

    #[test]
    fn test_normalize_carries_url_and_kind() {
        let value = json!({
            "object": "page",
            "id": "page-3",
            "url": "https://notion.so/page-3",
            "archived": false,
            "properties": {}
        });
        let resource = normalize_result(&value);
        assert_eq!(resource.kind, "page");
        assert_eq!(resource.url.as_deref(), Some("https://notion.so/page-3"));
        assert_eq!(resource.metadata.get("archived"), Some(&json!(false)));
    }
}
