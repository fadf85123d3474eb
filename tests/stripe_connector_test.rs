// ABOUTME: HTTP-level tests for the Stripe adapter against a mock provider
// ABOUTME: Credential validation ping, customer listing, cursors, and search filtering

use mockito::Matcher;
use serde_json::json;

use mosaic_connectors::connectors::stripe::StripeConnector;
use mosaic_connectors::connectors::SharedConnector;
use mosaic_connectors::errors::ConnectorError;
use mosaic_connectors::models::ResourceQuery;

fn connector(server: &mockito::ServerGuard) -> StripeConnector {
    StripeConnector::new(server.url()).expect("build connector")
}

#[tokio::test]
async fn test_validate_credential_pings_account() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/account")
        .match_header("authorization", "Bearer rk_test_valid")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"acct_123","object":"account"}"#)
        .create_async()
        .await;

    let connector = connector(&server);
    connector
        .validate_credential("rk_test_valid")
        .await
        .expect("valid credential");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rejected_credential_is_a_validation_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/account")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid API Key provided"}}"#)
        .create_async()
        .await;

    let connector = connector(&server);
    let result = connector.validate_credential("rk_test_revoked").await;

    match result {
        Err(ConnectorError::CredentialValidation { connector, message }) => {
            assert_eq!(connector, "STRIPE");
            assert!(message.contains("401"));
        }
        other => panic!("expected CredentialValidation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_customer_listing_normalizes_and_paginates() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/customers")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("limit".into(), "2".into()),
            Matcher::UrlEncoded("starting_after".into(), "cus_0".into()),
        ]))
        .match_header("authorization", "Bearer rk_test_valid")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "list",
                "data": [
                    { "id": "cus_1", "name": "Ada Lovelace", "email": "ada@example.com", "created": 1700000000 },
                    { "id": "cus_2", "name": null, "email": "grace@example.com", "created": 1700000100 }
                ],
                "has_more": true
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector(&server);
    let query = ResourceQuery {
        limit: Some(2),
        cursor: Some("cus_0".into()),
        ..ResourceQuery::default()
    };
    let page = connector
        .query_resources("rk_test_valid", &query)
        .await
        .expect("list");

    assert_eq!(page.resources.len(), 2);
    assert_eq!(page.resources[0].title, "Ada Lovelace");
    assert_eq!(page.resources[1].title, "grace@example.com");
    assert_eq!(page.resources[0].kind, "customer");
    assert!(page.resources[0]
        .url
        .as_deref()
        .is_some_and(|url| url.contains("cus_1")));
    // Stripe cursors continue from the last item of the page
    assert_eq!(page.next_cursor.as_deref(), Some("cus_2"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_search_term_filters_customers() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/customers")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "object": "list",
                "data": [
                    { "id": "cus_1", "name": "Ada Lovelace", "email": "ada@example.com" },
                    { "id": "cus_2", "name": "Grace Hopper", "email": "grace@example.com" }
                ],
                "has_more": false
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector(&server);
    let page = connector
        .query_resources("rk_test_valid", &ResourceQuery::search("ada"))
        .await
        .expect("search");

    assert_eq!(page.resources.len(), 1);
    assert_eq!(page.resources[0].id, "cus_1");
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn test_provider_failure_carries_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/customers")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body(r#"{"error":{"message":"An unknown error occurred"}}"#)
        .expect(3)
        .create_async()
        .await;

    let connector = connector(&server);
    let result = connector
        .query_resources("rk_test_valid", &ResourceQuery::default())
        .await;

    match result {
        Err(ConnectorError::ResourceQuery { status, .. }) => assert_eq!(status, Some(500)),
        other => panic!("expected ResourceQuery error, got {other:?}"),
    }
}
