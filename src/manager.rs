// ABOUTME: Connection lifecycle orchestration for personal and shared connectors
// ABOUTME: OAuth state handling, code exchange, refresh-on-demand, revocation, shared credentials
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Connection Manager
//!
//! Orchestrates the complete credential lifecycle over the registry, the
//! encryption service, and the connection store.
//!
//! Personal connections move through
//! `Unauthorized → Authorizing → Authorized ⇄ Refreshing`, with revocation
//! modeled as row deletion - absence from storage *is* the unauthorized
//! state. Nothing is ever persisted on a failed exchange, and a failed
//! refresh deletes the row before the error propagates, so callers can only
//! ever observe a whole valid connection or none at all.
//!
//! Decrypted token material exists only inside the scope of a single call
//! and is returned to the caller for immediate use; it is never stored,
//! logged, or serialized by this module.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::connectors::registry::ConnectorRegistry;
use crate::constants::timeouts;
use crate::crypto::EncryptionService;
use crate::errors::{ConnectorError, ConnectorResult};
use crate::models::{AuthorizationRequest, PersonalConnection, SharedConnection, TokenResponse};
use crate::storage::ConnectionStore;

/// Pending OAuth round-trip, kept until the provider redirects back
#[derive(Debug, Clone)]
struct PendingAuthorization {
    user_id: Uuid,
    connector_key: String,
    redirect_uri: String,
    created_at: chrono::DateTime<chrono::Utc>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Central connection lifecycle manager
pub struct ConnectionManager {
    registry: Arc<ConnectorRegistry>,
    store: Arc<dyn ConnectionStore>,
    crypto: Arc<EncryptionService>,
    pending: RwLock<HashMap<String, PendingAuthorization>>,
}

impl ConnectionManager {
    /// Create a manager over an initialized registry, store, and encryption
    /// service
    #[must_use]
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        store: Arc<dyn ConnectionStore>,
        crypto: Arc<EncryptionService>,
    ) -> Self {
        Self {
            registry,
            store,
            crypto,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Registry this manager resolves connectors from
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    // ── Personal lifecycle ──────────────────────────────────────────────

    /// Begin the OAuth round-trip: `Unauthorized → Authorizing`.
    ///
    /// Issues a CSRF state token bound to `(user, connector)` and returns the
    /// provider authorization URL. The pending state expires after ten
    /// minutes.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::ConnectorNotFound`] for an unknown key.
    pub async fn initiate_authorization(
        &self,
        user_id: Uuid,
        connector_key: &str,
        redirect_uri: &str,
    ) -> ConnectorResult<AuthorizationRequest> {
        let connector = self.registry.get_personal(connector_key)?;

        let state = format!("{user_id}:{}", Uuid::new_v4());
        let authorization_url = connector.build_authorization_url(redirect_uri, &state)?;

        let now = Utc::now();
        let pending = PendingAuthorization {
            user_id,
            connector_key: connector_key.to_owned(),
            redirect_uri: redirect_uri.to_owned(),
            created_at: now,
            expires_at: now + Duration::minutes(timeouts::AUTH_STATE_TTL_MINUTES),
        };

        let mut storage = self.pending.write().await;
        storage.insert(state.clone(), pending);
        // Drop expired round-trips while we hold the lock anyway
        storage.retain(|_, data| data.expires_at > now);
        drop(storage);

        Ok(AuthorizationRequest {
            authorization_url,
            state,
            connector_key: connector_key.to_owned(),
            expires_in_minutes: timeouts::AUTH_STATE_TTL_MINUTES,
        })
    }

    /// Complete the round-trip: `Authorizing → Authorized`.
    ///
    /// Validates and consumes the state token, exchanges the code, encrypts
    /// the token payload, and atomically upserts the connection row
    /// (last-write-wins on re-authorization). On any failure nothing is
    /// persisted and the state machine is back at `Unauthorized`.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidState`] for an unknown, expired, or
    /// replayed state and [`ConnectorError::TokenExchange`] when the provider
    /// rejects the code.
    pub async fn complete_authorization(
        &self,
        code: &str,
        state: &str,
    ) -> ConnectorResult<PersonalConnection> {
        let pending = self.consume_state(state).await?;
        let connector = self.registry.get_personal(&pending.connector_key)?;

        let token = connector.exchange_code(code, &pending.redirect_uri).await?;

        let encrypted_token = self.crypto.encrypt_credentials(&token)?;
        let connection = PersonalConnection::new(
            pending.user_id,
            pending.connector_key.clone(),
            encrypted_token,
            token.expires_at,
            token.scope.clone(),
        );
        self.store.put_personal(&connection).await?;

        info!(
            user_id = %pending.user_id,
            connector = %pending.connector_key,
            "authorization completed"
        );
        Ok(connection)
    }

    /// Return a live decrypted token for `(user, connector)`:
    /// `Authorized ⇄ Refreshing`.
    ///
    /// When the stored token is expired or inside the refresh margin, the
    /// connector's refresh grant runs exactly once. Success re-encrypts and
    /// atomically replaces the row; failure deletes the row (refresh tokens
    /// that fail are commonly revoked upstream) and surfaces
    /// [`ConnectorError::TokenRefresh`] so the caller can prompt for
    /// re-authorization.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotAuthorized`] when no connection exists.
    pub async fn ensure_valid_token(
        &self,
        user_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<TokenResponse> {
        let Some(connection) = self.store.get_personal(user_id, connector_key).await? else {
            return Err(ConnectorError::NotAuthorized {
                connector: connector_key.to_owned(),
            });
        };

        let token: TokenResponse = self.crypto.decrypt_credentials(&connection.encrypted_token)?;
        if !connection.needs_refresh() {
            return Ok(token);
        }

        info!(user_id = %user_id, connector = %connector_key, "refreshing expiring token");
        self.refresh_connection(connection, token).await
    }

    /// Run one refresh grant and replace or delete the stored row
    async fn refresh_connection(
        &self,
        mut connection: PersonalConnection,
        token: TokenResponse,
    ) -> ConnectorResult<TokenResponse> {
        let connector = self.registry.get_personal(&connection.connector_key)?;

        let Some(refresh_token) = token.refresh_token.clone() else {
            // Expired with no refresh grant available: the connection is dead
            self.store
                .delete_personal(connection.user_id, &connection.connector_key)
                .await?;
            return Err(ConnectorError::TokenRefresh {
                connector: connection.connector_key,
                message: "token expired and no refresh token is available".into(),
            });
        };

        match connector.refresh_token(&refresh_token).await {
            Ok(fresh) => {
                // Providers may omit the refresh token or scopes on refresh;
                // carry the previous values forward.
                let merged = TokenResponse {
                    access_token: fresh.access_token,
                    refresh_token: fresh.refresh_token.or(Some(refresh_token)),
                    expires_at: fresh.expires_at,
                    scope: fresh.scope.or(token.scope),
                };
                let encrypted = self.crypto.encrypt_credentials(&merged)?;
                connection.replace_token(encrypted, merged.expires_at, merged.scope.clone());
                self.store.put_personal(&connection).await?;
                Ok(merged)
            }
            Err(e) => {
                warn!(
                    user_id = %connection.user_id,
                    connector = %connection.connector_key,
                    "refresh failed, invalidating connection: {e}"
                );
                self.store
                    .delete_personal(connection.user_id, &connection.connector_key)
                    .await?;
                Err(ConnectorError::TokenRefresh {
                    connector: connection.connector_key,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Revoke a connection: `Authorized → Revoked`.
    ///
    /// Upstream revocation is best-effort - a provider failure is logged and
    /// local deletion proceeds, since the row's absence is what makes the
    /// connection revoked.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotAuthorized`] when no connection exists.
    pub async fn disconnect(&self, user_id: Uuid, connector_key: &str) -> ConnectorResult<()> {
        let connector = self.registry.get_personal(connector_key)?;

        let Some(connection) = self.store.get_personal(user_id, connector_key).await? else {
            return Err(ConnectorError::NotAuthorized {
                connector: connector_key.to_owned(),
            });
        };

        match self
            .crypto
            .decrypt_credentials::<TokenResponse>(&connection.encrypted_token)
        {
            Ok(token) => {
                if let Err(e) = connector.revoke(&token.access_token).await {
                    warn!(connector = %connector_key, "upstream revocation failed: {e}");
                }
            }
            Err(e) => {
                warn!(connector = %connector_key, "skipping upstream revocation: {e}");
            }
        }

        self.store.delete_personal(user_id, connector_key).await?;
        info!(user_id = %user_id, connector = %connector_key, "connection revoked");
        Ok(())
    }

    /// Connected/not-connected map over the personal catalog for one user
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::Storage`] on backend failure.
    pub async fn connection_status(&self, user_id: Uuid) -> ConnectorResult<HashMap<String, bool>> {
        let mut statuses = HashMap::new();
        for metadata in self.registry.list_personal() {
            let connected = self.store.personal_exists(user_id, &metadata.key).await?;
            statuses.insert(metadata.key, connected);
        }
        Ok(statuses)
    }

    // ── Shared lifecycle ────────────────────────────────────────────────

    /// Configure (or rotate) a project's shared credential:
    /// `Unconfigured → Configured`.
    ///
    /// The raw credential is validated against the provider before anything
    /// is encrypted or persisted; a syntactically fine but rejected
    /// credential never reaches storage.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::CredentialValidation`] when the provider
    /// rejects the credential.
    pub async fn configure_shared(
        &self,
        project_id: Uuid,
        connector_key: &str,
        credential: &str,
    ) -> ConnectorResult<SharedConnection> {
        let connector = self.registry.get_shared(connector_key)?;

        connector.validate_credential(credential).await?;

        let encrypted_credential = self.crypto.encrypt(credential)?;
        let connection =
            SharedConnection::new(project_id, connector_key.to_owned(), encrypted_credential);
        self.store.put_shared(&connection).await?;

        info!(project_id = %project_id, connector = %connector_key, "shared credential configured");
        Ok(connection)
    }

    /// Decrypt a project's shared credential for immediate use
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotAuthorized`] when the connector is not
    /// configured for the project.
    pub async fn shared_credential(
        &self,
        project_id: Uuid,
        connector_key: &str,
    ) -> ConnectorResult<String> {
        let Some(connection) = self.store.get_shared(project_id, connector_key).await? else {
            return Err(ConnectorError::NotAuthorized {
                connector: connector_key.to_owned(),
            });
        };
        Ok(self.crypto.decrypt(&connection.encrypted_credential)?)
    }

    /// Remove a project's shared credential
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::NotAuthorized`] when no credential exists.
    pub async fn remove_shared(&self, project_id: Uuid, connector_key: &str) -> ConnectorResult<()> {
        if self.store.delete_shared(project_id, connector_key).await? {
            info!(project_id = %project_id, connector = %connector_key, "shared credential removed");
            Ok(())
        } else {
            Err(ConnectorError::NotAuthorized {
                connector: connector_key.to_owned(),
            })
        }
    }

    // ── State handling ──────────────────────────────────────────────────

    /// Validate and consume a state token; each token is single-use
    async fn consume_state(&self, state: &str) -> ConnectorResult<PendingAuthorization> {
        let mut storage = self.pending.write().await;
        let pending = storage.remove(state).ok_or(ConnectorError::InvalidState)?;
        drop(storage);

        let now = Utc::now();
        if pending.expires_at < now {
            return Err(ConnectorError::InvalidState);
        }
        // Validate state age using created_at as well; expires_at alone can
        // drift if the wall clock was adjusted between issue and callback
        if now - pending.created_at > Duration::minutes(timeouts::AUTH_STATE_TTL_MINUTES + 5) {
            warn!("authorization state older than its window, rejecting");
            return Err(ConnectorError::InvalidState);
        }

        Ok(pending)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
