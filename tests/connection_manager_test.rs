// ABOUTME: Integration tests for the personal and shared connection lifecycle
// ABOUTME: Exercises authorization, exchange, refresh-on-demand, revocation, and shared credentials

use std::sync::Arc;
use uuid::Uuid;

use mosaic_connectors::connectors::registry::ConnectorRegistry;
use mosaic_connectors::connectors::synthetic::{
    SyntheticPersonalConnector, SyntheticSharedConnector,
};
use mosaic_connectors::crypto::{EncryptionService, MasterKey};
use mosaic_connectors::errors::ConnectorError;
use mosaic_connectors::manager::ConnectionManager;
use mosaic_connectors::models::TokenResponse;
use mosaic_connectors::storage::{ConnectionStore, MemoryConnectionStore};

struct Harness {
    manager: ConnectionManager,
    personal: Arc<SyntheticPersonalConnector>,
    shared: Arc<SyntheticSharedConnector>,
    store: Arc<MemoryConnectionStore>,
    crypto: Arc<EncryptionService>,
}

fn harness() -> Harness {
    let personal = Arc::new(SyntheticPersonalConnector::new());
    let shared = Arc::new(SyntheticSharedConnector::new());

    let mut registry = ConnectorRegistry::new();
    let personal_dyn: Arc<dyn mosaic_connectors::connectors::PersonalConnector> =
        personal.clone();
    let shared_dyn: Arc<dyn mosaic_connectors::connectors::SharedConnector> = shared.clone();
    registry.register_personal(personal_dyn).expect("register personal");
    registry.register_shared(shared_dyn).expect("register shared");

    let store = Arc::new(MemoryConnectionStore::new());
    let crypto = Arc::new(EncryptionService::new(MasterKey::from_bytes([7u8; 32])));

    let store_dyn: Arc<dyn ConnectionStore> = store.clone();
    let manager = ConnectionManager::new(Arc::new(registry), store_dyn, Arc::clone(&crypto));

    Harness {
        manager,
        personal,
        shared,
        store,
        crypto,
    }
}

async fn authorize(h: &Harness, user_id: Uuid) {
    let auth = h
        .manager
        .initiate_authorization(user_id, "SYNTHETIC_PERSONAL", "https://app.example/callback")
        .await
        .expect("initiate");
    h.manager
        .complete_authorization("valid-code", &auth.state)
        .await
        .expect("complete");
}

#[tokio::test]
async fn test_full_authorization_flow() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let auth = h
        .manager
        .initiate_authorization(user_id, "SYNTHETIC_PERSONAL", "https://app.example/callback")
        .await
        .expect("initiate");

    // The URL carries the CSRF state and the redirect target, urlencoded
    assert!(auth
        .authorization_url
        .contains(&urlencoding::encode(&auth.state).into_owned()));
    assert!(auth
        .authorization_url
        .contains(&urlencoding::encode("https://app.example/callback").into_owned()));
    assert!(auth.state.starts_with(&user_id.to_string()));

    let connection = h
        .manager
        .complete_authorization("code-123", &auth.state)
        .await
        .expect("complete");

    assert_eq!(connection.user_id, user_id);
    assert_eq!(connection.connector_key, "SYNTHETIC_PERSONAL");
    assert_eq!(h.personal.exchange_calls(), 1);

    // The persisted envelope decrypts back to the exchanged token
    let stored = h
        .store
        .get_personal(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("get")
        .expect("row");
    let token: TokenResponse = h
        .crypto
        .decrypt_credentials(&stored.encrypted_token)
        .expect("decrypt");
    assert_eq!(token.access_token, "synthetic-access-code-123");
    assert!(token.refresh_token.is_some());
    assert_eq!(stored.expires_at, token.expires_at);

    let status = h.manager.connection_status(user_id).await.expect("status");
    assert_eq!(status.get("SYNTHETIC_PERSONAL"), Some(&true));
}

#[tokio::test]
async fn test_unknown_state_is_rejected() {
    let h = harness();
    let result = h.manager.complete_authorization("code", "bogus-state").await;
    assert!(matches!(result, Err(ConnectorError::InvalidState)));
}

#[tokio::test]
async fn test_state_is_single_use() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let auth = h
        .manager
        .initiate_authorization(user_id, "SYNTHETIC_PERSONAL", "https://app.example/callback")
        .await
        .expect("initiate");

    h.manager
        .complete_authorization("code-1", &auth.state)
        .await
        .expect("first completion");

    let replay = h.manager.complete_authorization("code-2", &auth.state).await;
    assert!(matches!(replay, Err(ConnectorError::InvalidState)));
}

#[tokio::test]
async fn test_failed_exchange_persists_nothing() {
    let h = harness();
    let user_id = Uuid::new_v4();

    let auth = h
        .manager
        .initiate_authorization(user_id, "SYNTHETIC_PERSONAL", "https://app.example/callback")
        .await
        .expect("initiate");

    h.personal.fail_exchange(true);
    let result = h.manager.complete_authorization("code", &auth.state).await;
    assert!(matches!(result, Err(ConnectorError::TokenExchange { .. })));

    // Back to Unauthorized: no partial connection was written
    assert!(!h
        .store
        .personal_exists(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("exists"));
}

#[tokio::test]
async fn test_reauthorization_is_last_write_wins() {
    let h = harness();
    let user_id = Uuid::new_v4();

    authorize(&h, user_id).await;
    let first = h
        .store
        .get_personal(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("get")
        .expect("row");

    let auth = h
        .manager
        .initiate_authorization(user_id, "SYNTHETIC_PERSONAL", "https://app.example/callback")
        .await
        .expect("initiate again");
    h.manager
        .complete_authorization("second-code", &auth.state)
        .await
        .expect("re-authorize");

    let second = h
        .store
        .get_personal(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("get")
        .expect("row");
    assert_ne!(first.encrypted_token, second.encrypted_token);

    let token: TokenResponse = h
        .crypto
        .decrypt_credentials(&second.encrypted_token)
        .expect("decrypt");
    assert_eq!(token.access_token, "synthetic-access-second-code");
}

#[tokio::test]
async fn test_fresh_token_is_returned_without_refresh() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    let token = h
        .manager
        .ensure_valid_token(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("token");
    assert_eq!(token.access_token, "synthetic-access-valid-code");
    assert_eq!(h.personal.refresh_calls(), 0);
}

#[tokio::test]
async fn test_expired_token_refreshes_exactly_once() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    // Age the stored row past its expiry
    let mut row = h
        .store
        .get_personal(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("get")
        .expect("row");
    row.expires_at = Some(chrono::Utc::now() - chrono::Duration::minutes(1));
    h.store.put_personal(&row).await.expect("age row");

    let token = h
        .manager
        .ensure_valid_token(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("refreshed token");

    assert_eq!(h.personal.refresh_calls(), 1);
    assert!(token.access_token.starts_with("synthetic-access-refreshed-"));

    // The stored envelope and expiry were replaced atomically
    let refreshed = h
        .store
        .get_personal(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("get")
        .expect("row");
    assert_ne!(refreshed.encrypted_token, row.encrypted_token);
    assert!(refreshed.expires_at.expect("expiry") > chrono::Utc::now());

    // A second call finds the fresh token and does not refresh again
    let again = h
        .manager
        .ensure_valid_token(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("cached token");
    assert_eq!(again.access_token, token.access_token);
    assert_eq!(h.personal.refresh_calls(), 1);
}

#[tokio::test]
async fn test_refresh_failure_invalidates_connection() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    let mut row = h
        .store
        .get_personal(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("get")
        .expect("row");
    row.expires_at = Some(chrono::Utc::now() - chrono::Duration::minutes(1));
    h.store.put_personal(&row).await.expect("age row");

    h.personal.fail_refresh(true);
    let result = h.manager.ensure_valid_token(user_id, "SYNTHETIC_PERSONAL").await;
    assert!(matches!(result, Err(ConnectorError::TokenRefresh { .. })));
    assert_eq!(h.personal.refresh_calls(), 1);

    // The connection reverted to Unauthorized, not to a stale token
    assert!(!h
        .store
        .personal_exists(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("exists"));
    let followup = h.manager.ensure_valid_token(user_id, "SYNTHETIC_PERSONAL").await;
    assert!(matches!(followup, Err(ConnectorError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_disconnect_revokes_upstream_and_deletes() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    h.manager
        .disconnect(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("disconnect");

    assert_eq!(h.personal.revoke_calls(), 1);
    assert!(!h
        .store
        .personal_exists(user_id, "SYNTHETIC_PERSONAL")
        .await
        .expect("exists"));

    let again = h.manager.disconnect(user_id, "SYNTHETIC_PERSONAL").await;
    assert!(matches!(again, Err(ConnectorError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_rejected_shared_credential_is_never_persisted() {
    let h = harness();
    let project_id = Uuid::new_v4();

    let result = h
        .manager
        .configure_shared(project_id, "SYNTHETIC_SHARED", "wrong-key")
        .await;
    assert!(matches!(
        result,
        Err(ConnectorError::CredentialValidation { .. })
    ));
    assert_eq!(h.shared.validate_calls(), 1);

    let lookup = h.manager.shared_credential(project_id, "SYNTHETIC_SHARED").await;
    assert!(matches!(lookup, Err(ConnectorError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_shared_credential_roundtrip_and_rotation() {
    let h = harness();
    let project_id = Uuid::new_v4();
    let credential = h.shared.accepted_credential().to_owned();

    let first = h
        .manager
        .configure_shared(project_id, "SYNTHETIC_SHARED", &credential)
        .await
        .expect("configure");
    // Only the envelope is stored, never the raw credential
    assert_ne!(first.encrypted_credential, credential);

    let decrypted = h
        .manager
        .shared_credential(project_id, "SYNTHETIC_SHARED")
        .await
        .expect("decrypt");
    assert_eq!(decrypted, credential);

    // Rotation overwrites the row with a fresh envelope
    let second = h
        .manager
        .configure_shared(project_id, "SYNTHETIC_SHARED", &credential)
        .await
        .expect("rotate");
    assert_ne!(second.encrypted_credential, first.encrypted_credential);

    h.manager
        .remove_shared(project_id, "SYNTHETIC_SHARED")
        .await
        .expect("remove");
    let gone = h.manager.shared_credential(project_id, "SYNTHETIC_SHARED").await;
    assert!(matches!(gone, Err(ConnectorError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_unknown_connector_key_surfaces_not_found() {
    let h = harness();
    let result = h
        .manager
        .initiate_authorization(Uuid::new_v4(), "NOPE", "https://app.example/callback")
        .await;
    assert!(matches!(result, Err(ConnectorError::ConnectorNotFound(_))));
}
