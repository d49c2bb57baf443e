// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use pdf_rag::config::SearchIndexConfig;
use pdf_rag::ingest::Chunk;
use pdf_rag::search::{AzureSearchClient, SearchClient, SearchError};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::mock_server::{closed_port, spawn};

fn client(endpoint: String) -> AzureSearchClient {
    let config = SearchIndexConfig {
        endpoint,
        api_key: "search-key".to_string(),
        index_name: "pdfs".to_string(),
        ..Default::default()
    };
    AzureSearchClient::new(config, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_search_returns_contents_in_rank_order() {
    let captured: Arc<Mutex<Option<(HeaderMap, Value)>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();

    let router = Router::new().route(
        "/indexes/pdfs/docs/search",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = Some((headers, body));
                Json(json!({
                    "value": [
                        {"content": "First chunk", "metadata": "{\"filename\":\"a.pdf\"}"},
                        {"content": "Second chunk"}
                    ]
                }))
            }
        }),
    );
    let base = spawn(router).await;

    let chunks = client(base).search(&[0.1, 0.2, 0.3]).await.unwrap();
    assert_eq!(chunks, vec!["First chunk", "Second chunk"]);

    let (headers, body) = captured.lock().unwrap().take().unwrap();
    assert_eq!(headers["api-key"], "search-key");
    assert_eq!(body["search"], "*");
    assert_eq!(body["select"], "content,metadata");
    assert_eq!(body["vectors"][0]["fields"], "embedding");
    assert_eq!(body["vectors"][0]["k"], 5);
    assert_eq!(body["vectors"][0]["value"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_search_empty_result_is_not_an_error() {
    let router = Router::new().route(
        "/indexes/pdfs/docs/search",
        post(|| async { Json(json!({"value": []})) }),
    );
    let base = spawn(router).await;

    let chunks = client(base).search(&[1.0]).await.unwrap();
    assert!(chunks.is_empty());
}

#[tokio::test]
async fn test_search_non_success_status_is_request_failure() {
    let router = Router::new().route(
        "/indexes/pdfs/docs/search",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error") }),
    );
    let base = spawn(router).await;

    let err = client(base).search(&[0.1]).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "Azure Search query failed with status code 500");
    match err {
        SearchError::SearchRequestFailed { body, .. } => {
            assert_eq!(body, "Internal Server Error")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_search_malformed_body_is_unavailable() {
    let router = Router::new().route(
        "/indexes/pdfs/docs/search",
        post(|| async { "not json" }),
    );
    let base = spawn(router).await;

    let err = client(base).search(&[0.1]).await.unwrap_err();
    assert_eq!(err, SearchError::SearchUnavailable);
}

#[tokio::test]
async fn test_search_transport_failure_is_unavailable() {
    let err = client(closed_port().await).search(&[0.1]).await.unwrap_err();
    assert_eq!(err, SearchError::SearchUnavailable);
    assert_eq!(err.to_string(), "Failed to query Azure Search.");
}

#[tokio::test]
async fn test_upload_counts_accepted_documents() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();

    let router = Router::new().route(
        "/indexes/pdfs/docs/index",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                let keys: Vec<String> = body["value"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|doc| doc["id"].as_str().unwrap().to_string())
                    .collect();
                *sink.lock().unwrap() = Some(body);
                (
                    StatusCode::MULTI_STATUS,
                    Json(json!({
                        "value": [
                            {"key": keys[0], "status": true, "statusCode": 200},
                            {"key": keys[1], "status": false, "statusCode": 422,
                             "errorMessage": "vector dimension mismatch"}
                        ]
                    })),
                )
            }
        }),
    );
    let base = spawn(router).await;

    let chunks = vec![
        Chunk::new("Alpha".to_string(), vec![0.1, 0.2], Some("a.pdf".to_string()), 0),
        Chunk::new("Beta".to_string(), vec![0.3], Some("a.pdf".to_string()), 1),
    ];
    let accepted = client(base).upload(&chunks).await.unwrap();
    assert_eq!(accepted, 1);

    let body = captured.lock().unwrap().take().unwrap();
    let first = &body["value"][0];
    assert_eq!(first["@search.action"], "mergeOrUpload");
    assert_eq!(first["id"], chunks[0].id.as_str());
    assert_eq!(first["content"], "Alpha");
    let metadata: Value = serde_json::from_str(first["metadata"].as_str().unwrap()).unwrap();
    assert_eq!(metadata["filename"], "a.pdf");
    assert_eq!(metadata["chunk"], 0);
}

#[tokio::test]
async fn test_upload_rejected_batch_is_request_failure() {
    let router = Router::new().route(
        "/indexes/pdfs/docs/index",
        post(|| async { (StatusCode::FORBIDDEN, "bad key") }),
    );
    let base = spawn(router).await;

    let chunks = vec![Chunk::new("Alpha".to_string(), vec![0.1], None, 0)];
    let err = client(base).upload(&chunks).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn test_upload_splits_into_bounded_batches() {
    let sizes: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = sizes.clone();

    let router = Router::new().route(
        "/indexes/pdfs/docs/index",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                let docs = body["value"].as_array().unwrap().clone();
                sink.lock().unwrap().push(docs.len());
                // Reject the first document of every batch
                let results: Vec<Value> = docs
                    .iter()
                    .enumerate()
                    .map(|(i, doc)| json!({"key": doc["id"], "status": (i != 0), "statusCode": 200}))
                    .collect();
                (StatusCode::MULTI_STATUS, Json(json!({ "value": results })))
            }
        }),
    );
    let base = spawn(router).await;

    let config = SearchIndexConfig {
        endpoint: base,
        api_key: "search-key".to_string(),
        index_name: "pdfs".to_string(),
        upload_batch_size: 2,
        ..Default::default()
    };
    let client = AzureSearchClient::new(config, Duration::from_secs(5)).unwrap();

    let chunks: Vec<Chunk> = (0..5)
        .map(|i| Chunk::new(format!("chunk {}", i), vec![0.1], Some("big.pdf".to_string()), i))
        .collect();
    let accepted = client.upload(&chunks).await.unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![2, 2, 1]);
    assert_eq!(accepted, 2);
}

#[tokio::test]
async fn test_upload_of_nothing_sends_no_request() {
    let client = client(closed_port().await);
    assert_eq!(client.upload(&[]).await.unwrap(), 0);
}
