// ABOUTME: Stripe shared connector - service-credential validation and customer listing
// ABOUTME: Translates Stripe customers into the shared Resource model
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

/// Stripe platform connector.
///
/// Configured once per project with a restricted API key used on behalf of
/// all of the deployed app's users. `GET /v1/account` serves as the
/// validation ping before a key is ever persisted.
pub struct StripeConnector {
    metadata: ConnectorMetadata,
    api_base_url: String,
    client: Client,
    retry: RetryConfig,
}

/// Stripe list envelope for `/v1/customers`
#[derive(Debug, Deserialize)]
struct CustomerList {
    data: Vec<Customer>,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct Customer {
    id: String,
    name: Option<String>,
    email: Option<String>,
    created: Option<i64>,
}

impl StripeConnector {
    /// Build the connector from `MOSAIC_STRIPE_*` environment configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Configuration`] when the API base URL
    /// override is malformed.
    pub fn from_env() -> ConnectorResult<Self> {
        let api_base_url =
            shared_api_base_url(connector_keys::STRIPE, endpoints::STRIPE_API_BASE_URL)?;
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
                connector_keys::STRIPE,
                "Stripe",
                "Payments data for generated applications via a project API key",
            ),
            api_base_url,
            client: provider_client()?,
            retry: RetryConfig::default(),
        })
    }

    fn normalize(customer: Customer) -> Resource {
        let mut metadata = serde_json::Map::new();
        if let Some(email) = &customer.email {
            metadata.insert("email".to_owned(), json!(email));
        }
        if let Some(created) = customer.created {
            metadata.insert("created".to_owned(), json!(created));
        }

        let title = customer
            .name
            .or(customer.email)
            .unwrap_or_else(|| customer.id.clone());

        Resource {
            url: Some(format!(
                "https://dashboard.stripe.com/customers/{}",
                customer.id
            )),
            id: customer.id,
            title,
            kind: "customer".to_owned(),
            metadata,
        }
    }
}

#[async_trait]
impl SharedConnector for StripeConnector {
    fn metadata(&self) -> &ConnectorMetadata {
        &self.metadata
    }

    async fn validate_credential(&self, credential: &str) -> ConnectorResult<()> {
        let response = self
            .client
            .get(format!("{}/v1/account", self.api_base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .send()
            .await
            .map_err(|e| ConnectorError::CredentialValidation {
                connector: connector_keys::STRIPE.to_owned(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = error_body(response).await;
            Err(ConnectorError::CredentialValidation {
                connector: connector_keys::STRIPE.to_owned(),
                message: format!("status {status}: {body}"),
            })
        }
    }

    async fn query_resources(
        &self,
        credential: &str,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        let mut params: Vec<(String, String)> =
            vec![("limit".to_owned(), query.effective_limit().to_string())];
        if let Some(cursor) = &query.cursor {
            params.push(("starting_after".to_owned(), cursor.clone()));
        }
        if let Some(email) = query.filters.get("email").and_then(serde_json::Value::as_str) {
            params.push(("email".to_owned(), email.to_owned()));
        }

        let request = self
            .client
            .get(format!("{}/v1/customers", self.api_base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .query(&params);

        let response = send_with_retry(request, connector_keys::STRIPE, &self.retry).await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ConnectorError::resource_query(
                connector_keys::STRIPE,
                Some(status.as_u16()),
                body,
            ));
        }

        let list: CustomerList = response.json().await.map_err(|e| {
            ConnectorError::resource_query(
                connector_keys::STRIPE,
                None,
                format!("malformed customer list: {e}"),
            )
        })?;

        // Stripe's list API has no server-side text search; apply the term
        // to name/email after normalization.
        let mut resources: Vec<Resource> = list.data.into_iter().map(Self::normalize).collect();
        if let Some(term) = query.search.as_deref() {
            let term = term.to_lowercase();
            resources.retain(|r| {
                r.title.to_lowercase().contains(&term)
                    || r.metadata
                        .get("email")
                        .and_then(serde_json::Value::as_str)
                        .is_some_and(|email| email.to_lowercase().contains(&term))
            });
        }

        let next_cursor = (list.has_more)
            .then(|| resources.last().map(|r| r.id.clone()))
            .flatten();

        Ok(ResourcePage {
            resources,
            next_cursor,
        })
    }
}
