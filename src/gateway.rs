// ABOUTME: Provider-agnostic resource query gateway over the connector registry
// ABOUTME: Scope dispatch, credential resolution, and lazy page-stitched streaming
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mosaic Labs

//! # Resource Gateway
//!
//! Uniform call surface for listing and searching external resources without
//! knowing provider specifics. A query resolves the connector from the
//! registry, resolves and decrypts the matching connection (refreshing an
//! expiring personal token exactly once as a side effect), delegates to the
//! connector's native query method, and normalizes the result.
//!
//! [`ResourceGateway::resource_stream`] exposes the paginated result as a
//! lazy, forward-only, non-restartable stream: page N+1 is fetched only once
//! page N's items have been consumed. Provider failures surface as
//! [`ConnectorError::ResourceQuery`](crate::errors::ConnectorError::ResourceQuery);
//! an empty stream always means the provider returned zero resources, never
//! that a call failed.

use async_stream::try_stream;
use futures_util::stream::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ConnectorResult;
use crate::manager::ConnectionManager;
use crate::models::{Resource, ResourcePage, ResourceQuery};

/// Whose credentials a query runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A user's personal connection
    User(Uuid),
    /// A project's shared credential
    Project(Uuid),
}

/// Boxed resource stream returned by [`ResourceGateway::resource_stream`]
pub type ResourceStream = Pin<Box<dyn Stream<Item = ConnectorResult<Resource>> + Send>>;

/// Provider-agnostic query gateway
pub struct ResourceGateway {
    manager: Arc<ConnectionManager>,
}

impl ResourceGateway {
    /// Create a gateway over a connection manager
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Fetch a single page of resources.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorNotFound` for an unknown key, `NotAuthorized` when
    /// no connection exists for the scope, `TokenRefresh` when an expired
    /// personal token could not be refreshed, and `ResourceQuery` when the
    /// provider call fails.
    pub async fn query_page(
        &self,
        connector_key: &str,
        scope: Scope,
        query: &ResourceQuery,
    ) -> ConnectorResult<ResourcePage> {
        match scope {
            Scope::User(user_id) => {
                let connector = self.manager.registry().get_personal(connector_key)?;
                let token = self.manager.ensure_valid_token(user_id, connector_key).await?;
                // Without a search term this is a plain listing; connectors
                // may route the two through different provider calls.
                if query.search.is_none() {
                    connector.list_resources(&token.access_token, query).await
                } else {
                    connector.query_resources(&token.access_token, query).await
                }
            }
            Scope::Project(project_id) => {
                let connector = self.manager.registry().get_shared(connector_key)?;
                let credential = self
                    .manager
                    .shared_credential(project_id, connector_key)
                    .await?;
                connector.query_resources(&credential, query).await
            }
        }
    }

    /// Stream resources across pages, lazily.
    ///
    /// Credentials are resolved once when the first item is polled; each
    /// subsequent page is fetched only after the previous page has been
    /// fully yielded. The stream is forward-only and cannot be restarted -
    /// callers create a new stream to re-read.
    #[must_use]
    pub fn resource_stream(
        &self,
        connector_key: &str,
        scope: Scope,
        query: ResourceQuery,
    ) -> ResourceStream {
        let manager = Arc::clone(&self.manager);
        let connector_key = connector_key.to_owned();

        Box::pin(try_stream! {
            // Resolve the connector and one live credential up front; a
            // personal token refresh therefore happens at most once per
            // stream, not once per page.
            enum Resolved {
                Personal(Arc<dyn crate::connectors::PersonalConnector>, String),
                Shared(Arc<dyn crate::connectors::SharedConnector>, String),
            }

            let resolved = match scope {
                Scope::User(user_id) => {
                    let connector = manager.registry().get_personal(&connector_key)?;
                    let token = manager.ensure_valid_token(user_id, &connector_key).await?;
                    Resolved::Personal(connector, token.access_token)
                }
                Scope::Project(project_id) => {
                    let connector = manager.registry().get_shared(&connector_key)?;
                    let credential = manager.shared_credential(project_id, &connector_key).await?;
                    Resolved::Shared(connector, credential)
                }
            };

            let mut cursor = query.cursor.clone();
            loop {
                let page_query = query.with_cursor(cursor.clone());
                let page = match &resolved {
                    Resolved::Personal(connector, access_token) if page_query.search.is_none() => {
                        connector.list_resources(access_token, &page_query).await?
                    }
                    Resolved::Personal(connector, access_token) => {
                        connector.query_resources(access_token, &page_query).await?
                    }
                    Resolved::Shared(connector, credential) => {
                        connector.query_resources(credential, &page_query).await?
                    }
                };

                debug!(
                    connector = %connector_key,
                    count = page.resources.len(),
                    has_more = page.next_cursor.is_some(),
                    "fetched resource page"
                );

                for resource in page.resources {
                    yield resource;
                }

                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
        })
    }
}

impl std::fmt::Debug for ResourceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGateway").finish_non_exhaustive()
    }
}
