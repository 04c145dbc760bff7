use std::sync::Arc;

use llmwire_core::Embeddings;
use llmwire_models::{FakeBackend, ProviderResponse};
use llmwire_ollama::{OllamaEmbeddings, OllamaEmbeddingsConfig};
use serde_json::json;

#[test]
fn config_defaults_match_nomic_embed_text() {
    let config = OllamaEmbeddingsConfig::new("nomic-embed-text");
    assert_eq!(config.base_url, "http://localhost:11434");
    assert_eq!(config.dimensions, 768);
    assert_eq!(config.max_token_size, 8192);
}

#[tokio::test]
async fn embeds_batch_in_one_request() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "model": "nomic-embed-text",
            "embeddings": [[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]]
        }),
    });

    let config = OllamaEmbeddingsConfig::new("nomic-embed-text").with_dimensions(2);
    let embeddings = OllamaEmbeddings::new(config, backend.clone());
    let rows = embeddings.embed_documents(&["a", "b", "c"]).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == 2));
    assert!((rows[2][1] - 0.6).abs() < 1e-6);

    let sent = backend.requests().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "http://localhost:11434/api/embed");
    assert_eq!(sent[0].body["input"], json!(["a", "b", "c"]));
    assert_eq!(sent[0].body["model"], "nomic-embed-text");
}

#[tokio::test]
async fn row_count_mismatch_is_rejected() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({"embeddings": [[0.1, 0.2]]}),
    });
    let config = OllamaEmbeddingsConfig::new("nomic-embed-text").with_dimensions(2);
    let embeddings = OllamaEmbeddings::new(config, backend);
    let err = embeddings.embed_documents(&["a", "b"]).await.unwrap_err();
    assert!(err.to_string().contains("expected 2 embeddings, got 1"));
}

#[tokio::test]
async fn api_error_is_reported() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 500,
        body: json!({"error": "runner crashed"}),
    });
    let embeddings =
        OllamaEmbeddings::new(OllamaEmbeddingsConfig::new("nomic-embed-text"), backend);
    let err = embeddings.embed_query("x").await.unwrap_err();
    assert!(err.to_string().contains("runner crashed"));
}
