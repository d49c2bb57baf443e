// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use pdf_rag::config::OpenAiConfig;
use pdf_rag::embeddings::{AzureOpenAiEmbeddings, EmbeddingError, EmbeddingProvider};
use pdf_rag::generation::{AnswerGenerator, AzureChatGenerator, GenerationError};
use pdf_rag::ingest::{Document, PercentileSplitter, SemanticSplitter};
use pdf_rag::rag::{AnswerOutcome, RagPipeline, NO_RELEVANT_INFORMATION};
use pdf_rag::RagConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::mock_server::spawn;

const EMBEDDINGS_PATH: &str = "/openai/deployments/ada/embeddings";
const CHAT_PATH: &str = "/openai/deployments/gpt/chat/completions";

fn openai_config(endpoint: &str) -> OpenAiConfig {
    OpenAiConfig {
        api_key: "openai-key".to_string(),
        endpoint: endpoint.to_string(),
        chat_deployment: "gpt".to_string(),
        embedding_deployment: "ada".to_string(),
        api_version: "2024-02-01".to_string(),
        ..Default::default()
    }
}

/// Embedding endpoint answering `[input length, 1.0]`, out of order
async fn embeddings(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if headers["api-key"] != "openai-key" {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let mut data: Vec<Value> = body["input"]
        .as_array()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.as_str().unwrap().len() as f32;
            json!({"embedding": [len, 1.0], "index": i})
        })
        .collect();
    data.reverse();
    (StatusCode::OK, Json(json!({"data": data})))
}

#[tokio::test]
async fn test_embed_batch_preserves_input_order() {
    let base = spawn(Router::new().route(EMBEDDINGS_PATH, post(embeddings))).await;
    let provider = AzureOpenAiEmbeddings::new(&openai_config(&base), Duration::from_secs(5)).unwrap();

    let texts = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];
    let vectors = provider.embed_batch(&texts).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0], vec![2.0, 1.0]]);

    let single = provider.embed("abcd").await.unwrap();
    assert_eq!(single, vec![4.0, 1.0]);
}

/// Embeddings router that records the input count of every request
fn counting_router(sizes: Arc<Mutex<Vec<usize>>>) -> Router {
    Router::new().route(
        EMBEDDINGS_PATH,
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sizes = sizes.clone();
            async move {
                sizes
                    .lock()
                    .unwrap()
                    .push(body["input"].as_array().unwrap().len());
                embeddings(headers, Json(body)).await
            }
        }),
    )
}

#[tokio::test]
async fn test_embed_batch_respects_batch_size() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let base = spawn(counting_router(sizes.clone())).await;
    let mut config = openai_config(&base);
    config.embedding_batch_size = 4;
    let provider = AzureOpenAiEmbeddings::new(&config, Duration::from_secs(5)).unwrap();

    let texts: Vec<String> = (1..=10).map(|n| "x".repeat(n)).collect();
    let vectors = provider.embed_batch(&texts).await.unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![4, 4, 2]);
    let lengths: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
    assert_eq!(lengths, (1..=10).map(|n| n as f32).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_long_document_split_stays_within_batch_size() {
    let sizes = Arc::new(Mutex::new(Vec::new()));
    let base = spawn(counting_router(sizes.clone())).await;
    let mut config = openai_config(&base);
    config.embedding_batch_size = 16;
    let provider = AzureOpenAiEmbeddings::new(&config, Duration::from_secs(5)).unwrap();
    let splitter = PercentileSplitter::new(Arc::new(provider));

    let text: String = (0..300)
        .map(|i| format!("Sentence number {} talks about {}. ", i, "x".repeat(i % 7)))
        .collect();
    let segments = splitter
        .split(&Document::new(text, "long.pdf"))
        .await
        .unwrap();
    assert!(!segments.is_empty());

    let sizes = sizes.lock().unwrap();
    assert_eq!(sizes.iter().sum::<usize>(), 300);
    assert!(sizes.iter().all(|&n| n <= 16));
}

#[tokio::test]
async fn test_embed_status_error() {
    let router = Router::new().route(
        EMBEDDINGS_PATH,
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = spawn(router).await;
    let provider = AzureOpenAiEmbeddings::new(&openai_config(&base), Duration::from_secs(5)).unwrap();

    let err = provider.embed("hello").await.unwrap_err();
    assert_eq!(
        err,
        EmbeddingError::Status {
            status: 429,
            body: "slow down".to_string()
        }
    );
}

#[tokio::test]
async fn test_chat_sends_context_and_returns_content() {
    let captured: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
    let sink = captured.clone();
    let router = Router::new().route(
        CHAT_PATH,
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                *sink.lock().unwrap() = Some(body);
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
                }))
            }
        }),
    );
    let base = spawn(router).await;
    let generator = AzureChatGenerator::new(&openai_config(&base), Duration::from_secs(5)).unwrap();

    let answer = generator
        .generate(
            "What is the capital?",
            &["France facts".to_string(), "Paris is the capital".to_string()],
        )
        .await
        .unwrap();
    assert_eq!(answer, "Paris.");

    let body = captured.lock().unwrap().take().unwrap();
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(
        body["messages"][1]["content"],
        "Context: Chunk: France facts\n\nChunk: Paris is the capital"
    );
    assert_eq!(body["messages"][2]["role"], "user");
    assert_eq!(body["messages"][2]["content"], "What is the capital?");
}

#[tokio::test]
async fn test_chat_failure_is_generation_failed() {
    let router = Router::new().route(
        CHAT_PATH,
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = spawn(router).await;
    let generator = AzureChatGenerator::new(&openai_config(&base), Duration::from_secs(5)).unwrap();

    let err = generator.generate("q", &["c".to_string()]).await.unwrap_err();
    assert_eq!(err, GenerationError::GenerationFailed);
}

fn rag_config(base: &str) -> RagConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("AZURE_OPENAI_API_KEY", "openai-key".to_string()),
        ("AZURE_OPENAI_ENDPOINT", base.to_string()),
        ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt".to_string()),
        ("AZURE_OPENAI_MODEL_VERSION", "2024-02-01".to_string()),
        ("AZURE_OPENAI_EMBEDDING_NAME", "ada".to_string()),
        ("SEARCH_ENDPOINT", base.to_string()),
        ("SEARCH_ADMIN_KEY", "search-key".to_string()),
        ("SEARCH_INDEX_NAME", "pdfs".to_string()),
        ("SEARCH_TOP_K", "2".to_string()),
    ]);
    RagConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
}

#[tokio::test]
async fn test_pipeline_from_config_answers_over_http() {
    let router = Router::new()
        .route(EMBEDDINGS_PATH, post(embeddings))
        .route(
            "/indexes/pdfs/docs/search",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["vectors"][0]["k"], 2);
                Json(json!({"value": [{"content": "The warranty lasts two years."}]}))
            }),
        )
        .route(
            CHAT_PATH,
            post(|| async {
                Json(json!({"choices": [{"message": {"content": "Two years."}}]}))
            }),
        );
    let base = spawn(router).await;

    let pipeline = RagPipeline::from_config(&rag_config(&base)).unwrap();
    let answer = pipeline.answer("How long is the warranty?").await.unwrap();

    assert_eq!(answer.text, "Two years.");
    assert_eq!(answer.source_chunks, vec!["The warranty lasts two years."]);
    assert_eq!(answer.outcome, AnswerOutcome::Generated);
}

#[tokio::test]
async fn test_pipeline_from_config_without_hits() {
    let router = Router::new()
        .route(EMBEDDINGS_PATH, post(embeddings))
        .route(
            "/indexes/pdfs/docs/search",
            post(|| async { Json(json!({"value": []})) }),
        );
    let base = spawn(router).await;

    let pipeline = RagPipeline::from_config(&rag_config(&base)).unwrap();
    let answer = pipeline.answer("Anything?").await.unwrap();

    assert_eq!(answer.text, NO_RELEVANT_INFORMATION);
    assert_eq!(answer.outcome, AnswerOutcome::NoRelevantInformation);
}
