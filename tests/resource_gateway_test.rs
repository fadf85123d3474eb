// ABOUTME: Integration tests for the provider-agnostic resource query gateway
// ABOUTME: Covers scope dispatch, lazy page streaming, refresh-on-demand, and error propagation

use futures_util::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

use mosaic_connectors::connectors::registry::ConnectorRegistry;
use mosaic_connectors::connectors::synthetic::{
    SyntheticPersonalConnector, SyntheticSharedConnector,
};
use mosaic_connectors::connectors::{PersonalConnector, SharedConnector};
use mosaic_connectors::crypto::{EncryptionService, MasterKey};
use mosaic_connectors::errors::ConnectorError;
use mosaic_connectors::gateway::{ResourceGateway, Scope};
use mosaic_connectors::manager::ConnectionManager;
use mosaic_connectors::models::ResourceQuery;
use mosaic_connectors::storage::{ConnectionStore, MemoryConnectionStore};

struct Harness {
    gateway: ResourceGateway,
    manager: Arc<ConnectionManager>,
    personal: Arc<SyntheticPersonalConnector>,
    shared: Arc<SyntheticSharedConnector>,
    store: Arc<MemoryConnectionStore>,
}

fn harness() -> Harness {
    let personal = Arc::new(SyntheticPersonalConnector::new().with_resources(12));
    let shared = Arc::new(SyntheticSharedConnector::new());

    let mut registry = ConnectorRegistry::new();
    let personal_dyn: Arc<dyn PersonalConnector> = personal.clone();
    let shared_dyn: Arc<dyn SharedConnector> = shared.clone();
    registry.register_personal(personal_dyn).expect("register personal");
    registry.register_shared(shared_dyn).expect("register shared");

    let store = Arc::new(MemoryConnectionStore::new());
    let store_dyn: Arc<dyn ConnectionStore> = store.clone();
    let crypto = Arc::new(EncryptionService::new(MasterKey::from_bytes([3u8; 32])));

    let manager = Arc::new(ConnectionManager::new(Arc::new(registry), store_dyn, crypto));
    let gateway = ResourceGateway::new(Arc::clone(&manager));

    Harness {
        gateway,
        manager,
        personal,
        shared,
        store,
    }
}

async fn authorize(h: &Harness, user_id: Uuid) {
    let auth = h
        .manager
        .initiate_authorization(user_id, "SYNTHETIC_PERSONAL", "https://app.example/callback")
        .await
        .expect("initiate");
    h.manager
        .complete_authorization("code", &auth.state)
        .await
        .expect("complete");
}

#[tokio::test]
async fn test_personal_query_page() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    let query = ResourceQuery {
        limit: Some(5),
        ..ResourceQuery::default()
    };
    let page = h
        .gateway
        .query_page("SYNTHETIC_PERSONAL", Scope::User(user_id), &query)
        .await
        .expect("page");

    assert_eq!(page.resources.len(), 5);
    assert_eq!(page.next_cursor.as_deref(), Some("5"));
    assert_eq!(page.resources[0].kind, "document");
}

#[tokio::test]
async fn test_stream_walks_all_pages() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    let query = ResourceQuery {
        limit: Some(5),
        ..ResourceQuery::default()
    };
    let items: Vec<_> = h
        .gateway
        .resource_stream("SYNTHETIC_PERSONAL", Scope::User(user_id), query)
        .collect()
        .await;

    assert_eq!(items.len(), 12);
    assert!(items.iter().all(Result::is_ok));
    // 12 resources at page size 5: three provider calls
    assert_eq!(h.personal.query_calls(), 3);
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    let query = ResourceQuery {
        limit: Some(5),
        ..ResourceQuery::default()
    };
    let taken: Vec<_> = h
        .gateway
        .resource_stream("SYNTHETIC_PERSONAL", Scope::User(user_id), query)
        .take(3)
        .collect()
        .await;

    assert_eq!(taken.len(), 3);
    // Only the first page was fetched; pages two and three never happened
    assert_eq!(h.personal.query_calls(), 1);
}

#[tokio::test]
async fn test_zero_results_is_not_an_error() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    let page = h
        .gateway
        .query_page(
            "SYNTHETIC_PERSONAL",
            Scope::User(user_id),
            &ResourceQuery::search("no-such-resource-anywhere"),
        )
        .await
        .expect("empty page is a success");

    assert!(page.resources.is_empty());
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn test_provider_failure_is_a_typed_error() {
    let h = harness();
    let user_id = Uuid::new_v4();
    authorize(&h, user_id).await;

    h.personal.fail_queries_with_status(503);
    let result = h
        .gateway
        .query_page(
            "SYNTHETIC_PERSONAL",
            Scope::User(user_id),
            &ResourceQuery::default(),
        )
        .await;

    match result {
        Err(ConnectorError::ResourceQuery { status, .. }) => assert_eq!(status, Some(503)),
        other => panic!("expected ResourceQuery error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_query_without_connection_is_not_authorized() {
    let h = harness();
    let result = h
        .gateway
        .query_page(
            "SYNTHETIC_PERSONAL",
            Scope::User(Uuid::new_v4()),
            &ResourceQuery::default(),
        )
        .await;
    assert!(matches!(result, Err(ConnectorError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_expired_token_refreshes_once_before_query() {
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

    let page = h
        .gateway
        .query_page(
            "SYNTHETIC_PERSONAL",
            Scope::User(user_id),
            &ResourceQuery::default(),
        )
        .await
        .expect("query after refresh");

    assert!(!page.resources.is_empty());
    assert_eq!(h.personal.refresh_calls(), 1);
    assert_eq!(h.personal.query_calls(), 1);
}

#[tokio::test]
async fn test_refresh_failure_propagates_instead_of_stale_query() {
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
    let result = h
        .gateway
        .query_page(
            "SYNTHETIC_PERSONAL",
            Scope::User(user_id),
            &ResourceQuery::default(),
        )
        .await;

    assert!(matches!(result, Err(ConnectorError::TokenRefresh { .. })));
    // The query itself never ran with the stale token
    assert_eq!(h.personal.query_calls(), 0);
}

#[tokio::test]
async fn test_shared_scope_queries_with_project_credential() {
    let h = harness();
    let project_id = Uuid::new_v4();
    let credential = h.shared.accepted_credential().to_owned();

    h.manager
        .configure_shared(project_id, "SYNTHETIC_SHARED", &credential)
        .await
        .expect("configure");

    let page = h
        .gateway
        .query_page(
            "SYNTHETIC_SHARED",
            Scope::Project(project_id),
            &ResourceQuery::default(),
        )
        .await
        .expect("page");
    assert_eq!(page.resources.len(), 6);

    // A different, unconfigured project has no credential
    let other = h
        .gateway
        .query_page(
            "SYNTHETIC_SHARED",
            Scope::Project(Uuid::new_v4()),
            &ResourceQuery::default(),
        )
        .await;
    assert!(matches!(other, Err(ConnectorError::NotAuthorized { .. })));
}

#[tokio::test]
async fn test_shared_stream_pages_lazily() {
    let h = harness();
    let project_id = Uuid::new_v4();
    let credential = h.shared.accepted_credential().to_owned();

    h.manager
        .configure_shared(project_id, "SYNTHETIC_SHARED", &credential)
        .await
        .expect("configure");

    let query = ResourceQuery {
        limit: Some(4),
        ..ResourceQuery::default()
    };
    let items: Vec<_> = h
        .gateway
        .resource_stream("SYNTHETIC_SHARED", Scope::Project(project_id), query)
        .collect()
        .await;

    assert_eq!(items.len(), 6);
    assert_eq!(h.shared.query_calls(), 2);
}

#[tokio::test]
async fn test_unknown_connector_key() {
    let h = harness();
    let result = h
        .gateway
        .query_page("NOPE", Scope::User(Uuid::new_v4()), &ResourceQuery::default())
        .await;
    assert!(matches!(result, Err(ConnectorError::ConnectorNotFound(_))));
}
