//! Integration tests for the async client using wiremock to simulate the server.

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use ucotron::{
    AugmentOptions, Client, ClientConfig, EntityOptions, Error, ListEntitiesOptions,
    ListMemoriesOptions, Metadata, RetryConfig, SearchOptions, UpdateMemoryOptions,
    NAMESPACE_HEADER,
};
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_with_retry(server: &MockServer, retry: RetryConfig) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .retry(retry)
        .build()
        .unwrap()
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::new(max_retries, 1, 10)
}

/// Responds with `failure` for the first `failures` requests, then `success`.
fn fail_then_succeed(
    failures: usize,
    failure: ResponseTemplate,
    success: ResponseTemplate,
) -> (
    impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static,
    Arc<AtomicUsize>,
) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    let responder = move |_req: &Request| {
        if counter.fetch_add(1, Ordering::SeqCst) < failures {
            failure.clone()
        } else {
            success.clone()
        }
    };
    (responder, count)
}

#[tokio::test]
async fn test_health_decodes_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .and(header(NAMESPACE_HEADER, "default"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "version": "0.9.1",
            "instance_id": "node-a",
            "models": {"embedder_loaded": true, "embedding_model": "minilm"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.version, "0.9.1");
    assert_eq!(health.instance_role, "");
    assert!(health.models.embedder_loaded);
    assert!(!health.models.ner_loaded);
}

#[tokio::test]
async fn test_namespace_precedence() {
    let mock_server = MockServer::start().await;

    for namespace in ["default", "client-ns", "call-ns"] {
        Mock::given(method("GET"))
            .and(path("/api/v1/entities/1"))
            .and(header(NAMESPACE_HEADER, namespace))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let plain = Client::new(mock_server.uri()).unwrap();
    plain.get_entity(1, None).await.unwrap();

    let with_default = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_namespace("client-ns")
        .build()
        .unwrap();
    with_default.get_entity(1, None).await.unwrap();
    with_default
        .get_entity(1, Some(&EntityOptions::namespace("call-ns")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_empty_namespace_falls_back() {
    let mock_server = MockServer::start().await;

    for namespace in ["team", "default"] {
        Mock::given(method("GET"))
            .and(path("/api/v1/entities/1"))
            .and(header(NAMESPACE_HEADER, namespace))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let team = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_namespace("team")
        .build()
        .unwrap();
    team.get_entity(1, Some(&EntityOptions::namespace("")))
        .await
        .unwrap();

    let blank = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_namespace("")
        .build()
        .unwrap();
    blank.get_entity(1, None).await.unwrap();
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/memories/404"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(r#"{"code":"NOT_FOUND","message":"memory 404 not found"}"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    // A large base delay would make any backoff sleep obvious.
    let client = client_with_retry(&mock_server, RetryConfig::new(3, 10_000, 10_000));
    let started = Instant::now();
    let result = client.get_memory(404, None).await;

    match result {
        Err(Error::Server {
            status,
            message,
            code,
        }) => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(code, "NOT_FOUND");
            assert!(message.contains("memory 404 not found"));
        }
        _ => panic!("Expected Server error, got {:?}", result),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/metrics"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = client_with_retry(&mock_server, fast_retry(3));
    let result = client.metrics().await;

    match result {
        Err(Error::RetriesExhausted {
            attempts,
            last_error,
        }) => {
            assert_eq!(attempts, 4);
            match *last_error {
                Error::Server {
                    status, message, ..
                } => {
                    assert_eq!(status.as_u16(), 503);
                    assert_eq!(message, "overloaded");
                }
                other => panic!("Expected Server error, got {:?}", other),
            }
        }
        _ => panic!("Expected RetriesExhausted, got {:?}", result),
    }
}

#[tokio::test]
async fn test_retry_on_5xx_then_success() {
    let mock_server = MockServer::start().await;

    let (responder, count) = fail_then_succeed(
        2,
        ResponseTemplate::new(500).set_body_string("Server error"),
        ResponseTemplate::new(200).set_body_json(json!({"memories_created": 2})),
    );

    Mock::given(method("POST"))
        .and(path("/api/v1/learn"))
        .respond_with(responder)
        .mount(&mock_server)
        .await;

    let client = client_with_retry(&mock_server, fast_retry(3));
    let learned = client.learn("Juan likes tea.", None).await.unwrap();

    assert_eq!(learned.memories_created, 2);
    assert_eq!(learned.entities_found, 0);
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_backoff_delays_are_applied() {
    let mock_server = MockServer::start().await;

    let (responder, _count) = fail_then_succeed(
        2,
        ResponseTemplate::new(502),
        ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})),
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(responder)
        .mount(&mock_server)
        .await;

    // 50ms then 100ms of backoff before the third attempt.
    let client = client_with_retry(&mock_server, RetryConfig::new(3, 50, 1000));
    let started = Instant::now();
    client.health().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(150));
}

#[tokio::test]
async fn test_timeout_then_success() {
    let mock_server = MockServer::start().await;

    let (responder, count) = fail_then_succeed(
        1,
        ResponseTemplate::new(200)
            .set_body_json(json!({"status": "late"}))
            .set_delay(Duration::from_secs(2)),
        ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})),
    );

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(responder)
        .mount(&mock_server)
        .await;

    let client = Client::with_config(
        mock_server.uri(),
        ClientConfig {
            timeout_secs: 0.2,
            retry: fast_retry(2),
            ..Default::default()
        },
    )
    .unwrap();

    let health = client.health().await.unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connection_refused_exhausts_retries() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = Client::builder()
        .base_url(format!("http://127.0.0.1:{}", port))
        .unwrap()
        .retry(fast_retry(2))
        .build()
        .unwrap();

    let err = client.health().await.unwrap_err();

    assert_eq!(err.attempts(), Some(3));
    match err.last_error() {
        Some(Error::Connection { message, source }) => {
            assert!(message.contains("GET /api/v1/health"));
            assert!(source.is_some());
        }
        other => panic!("Expected Connection error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_retries_makes_one_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/memories/8"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_retry(&mock_server, RetryConfig::new(0, 10_000, 10_000));
    let started = Instant::now();
    let err = client.delete_memory(8, None).await.unwrap_err();

    assert_eq!(err.attempts(), Some(1));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_decode_failure_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with_retry(&mock_server, fast_retry(3));
    let result = client.health().await;

    match result {
        Err(Error::Decode {
            status,
            raw_response,
            ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
        }
        _ => panic!("Expected Decode error, got {:?}", result),
    }
}

#[tokio::test]
async fn test_search_sends_only_present_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/memories/search"))
        .and(header(NAMESPACE_HEADER, "research"))
        .and(body_json(json!({
            "query": "tea",
            "limit": 0,
            "time_range": [1700000000, 1800000000]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 3, "content": "Juan likes tea", "node_type": "Entity", "score": 0.82},
                {"id": 4, "content": "Tea is a drink", "node_type": "Event", "score": 0.4,
                 "vector_sim": 0.7, "graph_centrality": 0.1, "recency": 0.2}
            ],
            "total": 2,
            "query": "tea"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let opts = SearchOptions {
        limit: Some(0),
        time_range: Some((1_700_000_000, 1_800_000_000)),
        namespace: Some("research".to_string()),
        ..Default::default()
    };
    let found = client.search("tea", Some(&opts)).await.unwrap();

    assert_eq!(found.total, 2);
    assert_eq!(found.results[0].vector_sim, 0.0);
    assert_eq!(found.results[1].vector_sim, 0.7);
}

#[tokio::test]
async fn test_augment_and_add_memory() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/augment"))
        .and(body_json(json!({"context": "Who is Juan?", "limit": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memories": [{"id": 1, "content": "Juan is an engineer", "node_type": "Entity", "score": 0.9}],
            "entities": [{"id": 2, "content": "Juan", "node_type": "Entity", "timestamp": 10}],
            "context_text": "Juan is an engineer."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!("chat"));

    Mock::given(method("POST"))
        .and(path("/api/v1/memories"))
        .and(body_json(json!({"text": "Juan is an engineer", "metadata": {"source": "chat"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "chunk_node_ids": [1],
            "entity_node_ids": [2, 3],
            "edges_created": 1,
            "metrics": {"chunks_processed": 1, "total_us": 5120}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();

    let context = client
        .augment(
            "Who is Juan?",
            Some(&AugmentOptions {
                limit: Some(3),
                namespace: None,
            }),
        )
        .await
        .unwrap();
    assert_eq!(context.context_text, "Juan is an engineer.");
    assert_eq!(context.entities[0].neighbors, None);

    let created = client
        .add_memory(
            "Juan is an engineer",
            Some(&ucotron::AddMemoryOptions {
                metadata: Some(metadata),
                namespace: None,
            }),
        )
        .await
        .unwrap();
    assert_eq!(created.entity_node_ids, vec![2, 3]);
    assert_eq!(created.metrics.total_us, 5120);
    assert_eq!(created.metrics.entities_extracted, 0);
}

#[tokio::test]
async fn test_list_memories_query_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/memories"))
        .and(query_param("node_type", "Event"))
        .and(query_param("limit", "2"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "content": "a", "node_type": "Event", "timestamp": 100},
            {"id": 2, "content": "b", "node_type": "Event", "timestamp": 200, "metadata": {"k": 1}}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let opts = ListMemoriesOptions {
        node_type: Some("Event".to_string()),
        limit: Some(2),
        ..Default::default()
    };
    let memories = client.list_memories(Some(&opts)).await.unwrap();

    assert_eq!(memories.len(), 2);
    assert!(memories[0].metadata.is_empty());
    assert_eq!(memories[1].metadata["k"], json!(1));
}

#[tokio::test]
async fn test_list_entities_keeps_neighbors_distinct() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/entities"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "content": "Juan"},
            {"id": 2, "content": "Madrid", "neighbors": []},
            {"id": 3, "content": "Acme", "neighbors": [
                {"node_id": 1, "content": "Juan", "edge_type": "employs", "weight": 0.5}
            ]}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let opts = ListEntitiesOptions {
        offset: Some(10),
        ..Default::default()
    };
    let entities = client.list_entities(Some(&opts)).await.unwrap();

    assert_eq!(entities[0].neighbors, None);
    assert_eq!(entities[1].neighbors, Some(vec![]));
    let neighbors = entities[2].neighbors.as_ref().unwrap();
    assert_eq!(neighbors[0].edge_type, "employs");
}

#[tokio::test]
async fn test_update_and_delete_memory() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/memories/12"))
        .and(header(NAMESPACE_HEADER, "notes"))
        .and(body_json(json!({"content": "updated"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12, "content": "updated", "node_type": "Event", "timestamp": 5
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/memories/12"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new(mock_server.uri()).unwrap();
    let opts = UpdateMemoryOptions {
        content: Some("updated".to_string()),
        namespace: Some("notes".to_string()),
        ..Default::default()
    };
    let updated = client.update_memory(12, Some(&opts)).await.unwrap();
    assert_eq!(updated.content, "updated");

    client.delete_memory(12, None).await.unwrap();
}

#[tokio::test]
async fn test_api_key_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/metrics"))
        .and(header("authorization", "Bearer my-secret-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_requests": 9})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .api_key("my-secret-key")
        .build()
        .unwrap();

    let metrics = client.metrics().await.unwrap();
    assert_eq!(metrics.total_requests, 9);
    assert_eq!(metrics.uptime_secs, 0);
}

#[tokio::test]
async fn test_calls_after_close_reopen_transport() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::new(format!("{}/", mock_server.uri())).unwrap();

    {
        let session = client.session().unwrap();
        session.health().await.unwrap();
        session.health().await.unwrap();
    }
    assert!(!client.is_open());

    client.health().await.unwrap();
    assert!(client.is_open());
    client.close();
}
