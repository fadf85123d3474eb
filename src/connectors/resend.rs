// ABOUTME: Resend shared connector - service-credential validation and domain listing
// ABOUTME: Translates Resend sending domains into the shared Resource model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::http::{error_body, provider_client, send_with_retry, RetryConfig};
use super::{ConnectorMetadata, SharedConnector};
use crate::config::shared_api_base_url;
use crate::constants::{connector_keys, endpoints};
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{Resource, ResourcePage, ResourceQuery};

/// Resend email platform connector.
///
/// `GET /domains` doubles as the validation ping; the domain catalog is small
/// and unpaginated upstream, so pages never carry a continuation cursor.
pub struct ResendConnector {
    metadata: ConnectorMetadata,
    api_base_url: String,
    client: Client,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct DomainList {
    data: Vec<Domain>,
}

#[derive(Debug, Deserialize)]
struct Domain {
    id: String,
    name: String,
    status: Option<String>,
    region: Option<String>,
}

impl ResendConnector {
    /// Build the connector from `MOSAIC_RESEND_*` environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when the API base URL
    /// override is malformed.
    pub fn from_env() -> ConnectorResult<Self> {
        let api_base_url =
            shared_api_base_url(connector_keys::RESEND, endpoints::RESEND_API_BASE_URL)?;
        Self::new(api_base_url)
    }

    /// Build the connector against an explicit API base URL (tests, staging)
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(api_base_url: String) -> ConnectorResult<Self> {
        Ok(Self {
            metadata: ConnectorMetadata::new(
                connector_keys::RESEND,
                "Resend",
                "Transactional email domains for generated applications",
            ),
            api_base_url,
            client: provider_client()?,
            retry: RetryConfig::default(),
        })
    }

    async fn fetch_domains(&self, credential: &str) -> ConnectorResult<DomainList> {
        let request = self
            .client
            .get(format!("{}/domains", self.api_base_url))
            .header("Authorization", format!("Bearer {credential}"));

        let response = send_with_retry(request, connector_keys::RESEND, &self.retry).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ConnectorError::resource_query(
                connector_keys::RESEND,
                Some(status.as_u16()),
                body,
            ));
        }

        response.json().await.map_err(|e| {
            ConnectorError::resource_query(
                connector_keys::RESEND,
                None,
                format!("malformed domain list: {e}"),
            )
        })
    }
}

#[async_trait]
impl SharedConnector for ResendConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    async fn validate_credential(&self, credential: &str) -> ConnectorResult<()> {
        let response = self
            .client
            .get(format!("{}/domains", self.api_base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .send()
            .await
            .map_err(|e| ConnectorError::CredentialValidation {
                connector: connector_keys::RESEND.to_owned(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = error_body(response).await;
            Err(ConnectorError::CredentialValidation {
                connector: connector_keys::RESEND.to_owned(),
                message: format!("status {status}: {body}"),
            })
        }
    }

    async fn query_resources(
        &self,
        credential: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        let list = self.fetch_domains(credential).await?;

        let resources = list
            .data
            .into_iter()
            .filter(|domain| {
                query
                    .search
                    .as_deref()
                    .is_none_or(|term| domain.name.to_lowercase().contains(&term.to_lowercase()))
            })
            .map(|domain| {
                let mut metadata = serde_json::Map::new();
                if let Some(status) = &domain.status {
                    metadata.insert("status".to_owned(), json!(status));
                }
                if let Some(region) = &domain.region {
                    metadata.insert("region".to_owned(), json!(region));
                }
                Resource {
                    url: Some(format!("https://resend.com/domains/{}", domain.id)),
                    id: domain.id,
                    title: domain.name,
                    kind: "domain".to_owned(),
                    metadata,
                }
            })
            .collect();

        Ok(ResourcePage {
            resources,
            next_cursor: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_list_parsing() {
        let raw = json!({
            "data": [
                { "id": "d-1", "name": "mail.example.com", "status": "verified", "region": "us-east-1" }
            ]
        });
        let list: DomainList = serde_json::from_value(raw).expect("parse");
        assert_eq!(list.data[0].name, "mail.example.com");
    }
}
