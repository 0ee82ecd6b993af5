//! Integration tests driving whole syncs against a mock Partner API.
//!
//! Each test starts a wiremock server, points `api_url` at it and checks
//! the Singer messages written by the tap.

use serde_json::{json, Value};
use tap_shopify_partner::singer::{Catalog, MessageWriter, TapState};
use tap_shopify_partner::streams::SyncError;
use tap_shopify_partner::{GraphqlError, Tap, TapConfig, TapError};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GRAPHQL_PATH: &str = "/1234/api/2024-04/graphql.json";

fn config(server: &MockServer, extra: Value) -> TapConfig {
    let mut settings = json!({
        "api_key": "prtapi_test",
        "partner_id": 1234,
        "api_url": server.uri(),
    });
    if let (Some(target), Value::Object(extra)) = (settings.as_object_mut(), extra) {
        target.extend(extra);
    }
    TapConfig::from_json(&settings).unwrap()
}

fn cost(available: u32) -> Value {
    json!({
        "cost": {
            "requestedQueryCost": 4,
            "actualQueryCost": 4,
            "throttleStatus": {
                "maximumAvailable": 1000.0,
                "currentlyAvailable": available,
                "restoreRate": 50.0
            }
        }
    })
}

fn transactions_page(nodes: &[(&str, &str)], has_next: bool) -> Value {
    let edges: Vec<Value> = nodes
        .iter()
        .map(|(id, created_at)| {
            json!({"cursor": format!("cursor-{id}"), "node": {"id": id, "createdAt": created_at}})
        })
        .collect();
    json!({
        "data": {"transactions": {"edges": edges, "pageInfo": {"hasNextPage": has_next}}},
        "extensions": cost(996),
    })
}

fn only_stream(catalog: &mut Catalog, name: &str) {
    for entry in &mut catalog.streams {
        let selected = entry.stream == name;
        entry.set_selected(selected);
    }
}

async fn run_sync(
    tap: &Tap,
    catalog: &Catalog,
    state: &mut TapState,
) -> (Result<u64, TapError>, Vec<Value>) {
    let mut writer = MessageWriter::new(Vec::new());
    let result = tap.sync(catalog, state, &mut writer).await;
    let messages = String::from_utf8(writer.into_inner())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (result, messages)
}

fn of_type<'a>(messages: &'a [Value], kind: &str) -> Vec<&'a Value> {
    messages.iter().filter(|m| m["type"] == kind).collect()
}

// ============================================================================
// transactions
// ============================================================================

#[tokio::test]
async fn test_transactions_paginate_and_bookmark() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(body_partial_json(json!({"variables": {"after": "cursor-b", "first": 249}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(
            &[("c", "2024-01-02T00:00:00Z")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(GRAPHQL_PATH))
        .and(header("X-Shopify-Access-Token", "prtapi_test"))
        .and(body_partial_json(json!({"variables": {"first": 1}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(
            &[("a", "2024-01-01T00:00:00Z"), ("b", "2024-01-03T00:00:00Z")],
            true,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    let catalog = tap.discover();
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &catalog, &mut state).await;
    assert_eq!(result.unwrap(), 3);

    assert_eq!(messages[0]["type"], "SCHEMA");
    assert_eq!(messages[0]["stream"], "transactions");
    assert_eq!(messages[0]["key_properties"], json!(["id"]));
    assert_eq!(messages[0]["bookmark_properties"], json!(["createdAt"]));

    let ids: Vec<&str> = of_type(&messages, "RECORD")
        .iter()
        .map(|m| m["record"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);

    let states = of_type(&messages, "STATE");
    assert_eq!(states.len(), 1);
    assert_eq!(
        states[0]["value"]["bookmarks"]["transactions"],
        json!({"replication_key": "createdAt", "replication_key_value": "2024-01-03T00:00:00Z"})
    );
    assert_eq!(messages.last().unwrap()["type"], "STATE");
}

#[tokio::test]
async fn test_start_date_becomes_filter_variable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {"first": 1, "createdAtMin": "2024-02-01T00:00:00"}
        })))
        .and(body_string_contains("createdAtMin: $createdAtMin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(&[], false)))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({"start_date": "2024-02-01T00:00:00Z"}))).unwrap();
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &tap.discover(), &mut state).await;
    assert_eq!(result.unwrap(), 0);
    assert!(of_type(&messages, "RECORD").is_empty());
    assert!(state.bookmarks.is_empty());
}

#[tokio::test]
async fn test_state_bookmark_overrides_start_date() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {"createdAtMin": "2024-05-05T10:00:00"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(
            &[("z", "2024-05-06T00:00:00Z")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({"start_date": "2024-01-01T00:00:00Z"}))).unwrap();
    let mut state: TapState = serde_json::from_value(json!({
        "bookmarks": {
            "transactions": {
                "replication_key": "createdAt",
                "replication_key_value": "2024-05-05T10:00:00Z"
            }
        }
    }))
    .unwrap();

    let (result, _) = run_sync(&tap, &tap.discover(), &mut state).await;
    assert_eq!(result.unwrap(), 1);
    assert_eq!(
        state.bookmark("transactions", "createdAt"),
        Some(&json!("2024-05-06T00:00:00Z"))
    );
}

#[tokio::test]
async fn test_repeated_cursor_is_a_pagination_loop() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(
            &[("same", "2024-01-01T00:00:00Z")],
            true,
        )))
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    let mut state = TapState::default();

    let (result, _) = run_sync(&tap, &tap.discover(), &mut state).await;
    match result {
        Err(TapError::Sync {
            stream,
            source: SyncError::PaginationLoop { token, .. },
        }) => {
            assert_eq!(stream, "transactions");
            assert_eq!(token, "cursor-same");
        }
        other => panic!("Expected pagination loop, got {other:?}"),
    }
}

// ============================================================================
// Throttling and errors
// ============================================================================

#[tokio::test]
async fn test_throttled_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}],
            "extensions": {
                "cost": {
                    "requestedQueryCost": 4,
                    "throttleStatus": {
                        "maximumAvailable": 1000.0,
                        "currentlyAvailable": 4,
                        "restoreRate": 50.0
                    }
                }
            }
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    // The throttled response must not resize the retried page.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"first": 1}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(
            &[("a", "2024-01-01T00:00:00Z")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &tap.discover(), &mut state).await;
    assert_eq!(result.unwrap(), 1);
    assert_eq!(of_type(&messages, "RECORD").len(), 1);
}

#[tokio::test]
async fn test_throttling_gives_up_after_five_retries() {
    let server = MockServer::start().await;

    // Enough points are reported available that every retry waits zero seconds.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"first": 1}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Throttled", "extensions": {"code": "THROTTLED"}}],
            "extensions": cost(1000),
        })))
        .expect(6)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &tap.discover(), &mut state).await;
    match result {
        Err(TapError::Sync {
            stream,
            source: SyncError::Throttled { retries, .. },
        }) => {
            assert_eq!(stream, "transactions");
            assert_eq!(retries, 5);
        }
        other => panic!("Expected throttling to give up, got {other:?}"),
    }
    assert!(of_type(&messages, "RECORD").is_empty());
    assert!(of_type(&messages, "STATE").is_empty());
    assert!(state.bookmark("transactions", "createdAt").is_none());
}

#[tokio::test]
async fn test_low_bucket_waits_before_next_page() {
    let server = MockServer::start().await;

    // 10 / 4 = 2.5 affordable pages: wait floor(990 / 495) - 1 = 1 s,
    // then ask for (1000 - 495) / 4 - 1 = 125 records.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"first": 125, "after": "cursor-a"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(
            &[("b", "2024-01-02T00:00:00Z")],
            false,
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"first": 1}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"transactions": {
                "edges": [{"cursor": "cursor-a", "node": {"id": "a", "createdAt": "2024-01-01T00:00:00Z"}}],
                "pageInfo": {"hasNextPage": true}
            }},
            "extensions": {"cost": {
                "requestedQueryCost": 4,
                "actualQueryCost": 4,
                "throttleStatus": {
                    "maximumAvailable": 1000.0,
                    "currentlyAvailable": 10,
                    "restoreRate": 495.0
                }
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    let mut state = TapState::default();

    let started = std::time::Instant::now();
    let (result, _) = run_sync(&tap, &tap.discover(), &mut state).await;
    assert_eq!(result.unwrap(), 2);
    assert!(started.elapsed() >= std::time::Duration::from_secs(1));
}

#[tokio::test]
async fn test_graphql_errors_fail_the_stream() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"message": "Access denied", "extensions": {"code": "ACCESS_DENIED"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &tap.discover(), &mut state).await;
    match result {
        Err(TapError::Sync {
            source: SyncError::Graphql(GraphqlError::Query { errors, .. }),
            ..
        }) => assert_eq!(errors[0].code.as_deref(), Some("ACCESS_DENIED")),
        other => panic!("Expected GraphQL query error, got {other:?}"),
    }
    // SCHEMA was written before the failure, STATE was not
    assert_eq!(of_type(&messages, "SCHEMA").len(), 1);
    assert!(of_type(&messages, "STATE").is_empty());
}

#[tokio::test]
async fn test_server_errors_are_retried_up_to_request_tries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"errors": "boom"})))
        .expect(2)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({"request_tries": 2}))).unwrap();
    let mut state = TapState::default();

    let (result, _) = run_sync(&tap, &tap.discover(), &mut state).await;
    assert!(matches!(
        result,
        Err(TapError::Sync {
            source: SyncError::Graphql(GraphqlError::Http(_)),
            ..
        })
    ));
}

// ============================================================================
// events and app
// ============================================================================

#[tokio::test]
async fn test_events_flatten_shop_and_send_app_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({"variables": {"id": "gid://partners/App/99", "first": 1}})))
        .and(body_string_contains("app(id: $id)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"app": {"events": {
                "edges": [{
                    "cursor": "e1",
                    "node": {
                        "type": "RELATIONSHIP_INSTALLED",
                        "occurredAt": "2024-03-03T03:03:03Z",
                        "shop": {"id": "gid://partners/Shop/7", "name": "Acme", "myshopifyDomain": "acme.myshopify.com"}
                    }
                }],
                "pageInfo": {"hasNextPage": false}
            }}},
            "extensions": cost(990)
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({"app_id": "99"}))).unwrap();
    let mut catalog = tap.discover();
    only_stream(&mut catalog, "events");
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &catalog, &mut state).await;
    assert_eq!(result.unwrap(), 1);

    let records = of_type(&messages, "RECORD");
    assert_eq!(
        records[0]["record"],
        json!({
            "type": "RELATIONSHIP_INSTALLED",
            "occurredAt": "2024-03-03T03:03:03Z",
            "shop_id": "gid://partners/Shop/7",
            "shop_name": "Acme",
            "shop_myshopifyDomain": "acme.myshopify.com"
        })
    );
    assert_eq!(
        state.bookmark("events", "occurredAt"),
        Some(&json!("2024-03-03T03:03:03Z"))
    );
}

#[tokio::test]
async fn test_deselected_properties_are_not_queried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("app(id: $id) { id apiKey }"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"app": {"id": "gid://partners/App/5", "apiKey": "abc"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({"app_id": "5"}))).unwrap();
    let mut catalog = tap.discover();
    only_stream(&mut catalog, "app");
    catalog
        .get_mut("app")
        .unwrap()
        .set_property_selected("name", false);
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &catalog, &mut state).await;
    assert_eq!(result.unwrap(), 1);

    let schema = &of_type(&messages, "SCHEMA")[0]["schema"]["properties"];
    assert!(schema.get("name").is_none());
    assert!(schema.get("apiKey").is_some());
    // full-table streams leave no bookmark
    assert!(state.bookmarks.is_empty());
    assert_eq!(of_type(&messages, "STATE").len(), 1);
}

#[tokio::test]
async fn test_app_streams_are_skipped_without_app_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(transactions_page(&[], false)))
        .expect(1)
        .mount(&server)
        .await;

    let tap = Tap::new(config(&server, json!({}))).unwrap();
    // a catalog that still lists events is ignored for that stream
    let catalog: Catalog = serde_json::from_value(json!({
        "streams": [
            {"tap_stream_id": "transactions", "stream": "transactions", "schema": {"properties": {"id": {}}}},
            {"tap_stream_id": "events", "stream": "events", "schema": {"properties": {"type": {}}}}
        ]
    }))
    .unwrap();
    let mut state = TapState::default();

    let (result, messages) = run_sync(&tap, &catalog, &mut state).await;
    assert_eq!(result.unwrap(), 0);
    let streams: Vec<&str> = of_type(&messages, "SCHEMA")
        .iter()
        .map(|m| m["stream"].as_str().unwrap())
        .collect();
    assert_eq!(streams, ["transactions"]);
}
