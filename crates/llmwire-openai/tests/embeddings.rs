use std::sync::Arc;

use llmwire_core::Embeddings;
use llmwire_models::{FakeBackend, ProviderResponse};
use llmwire_openai::{OpenAiEmbeddings, OpenAiEmbeddingsConfig};
use serde_json::json;

fn small_config() -> OpenAiEmbeddingsConfig {
    OpenAiEmbeddingsConfig::new("test-key").with_dimensions(2)
}

#[test]
fn config_defaults_match_text_embedding_3_small() {
    let config = OpenAiEmbeddingsConfig::new("k");
    assert_eq!(config.model, "text-embedding-3-small");
    assert_eq!(config.dimensions, 1536);
    assert_eq!(config.max_token_size, 8192);
}

#[test]
fn build_request_sends_batch_as_float() {
    let embeddings = OpenAiEmbeddings::new(small_config(), Arc::new(FakeBackend::new()));
    let req = embeddings.build_request(&["a", "b"]);
    assert_eq!(req.url, "https://api.openai.com/v1/embeddings");
    assert_eq!(req.header("Authorization"), Some("Bearer test-key"));
    assert_eq!(
        req.body,
        json!({
            "model": "text-embedding-3-small",
            "input": ["a", "b"],
            "encoding_format": "float"
        })
    );
}

#[tokio::test]
async fn embed_documents_returns_one_row_per_text_in_order() {
    let backend = Arc::new(FakeBackend::new());
    // Rows deliberately out of order; `index` decides placement.
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "data": [
                {"embedding": [0.3, 0.3], "index": 2},
                {"embedding": [0.1, 0.1], "index": 0},
                {"embedding": [0.2, 0.2], "index": 1}
            ]
        }),
    });

    let embeddings = OpenAiEmbeddings::new(small_config(), backend);
    let rows = embeddings.embed_documents(&["a", "b", "c"]).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == embeddings.dimensions()));
    assert!((rows[0][0] - 0.1).abs() < 1e-6);
    assert!((rows[1][0] - 0.2).abs() < 1e-6);
    assert!((rows[2][0] - 0.3).abs() < 1e-6);
}

#[tokio::test]
async fn embed_query_returns_single_vector() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({"data": [{"embedding": [0.5, 0.25], "index": 0}]}),
    });
    let embeddings = OpenAiEmbeddings::new(small_config(), backend);
    let v = embeddings.embed_query("hello").await.unwrap();
    assert_eq!(v, vec![0.5, 0.25]);
}

#[tokio::test]
async fn empty_input_makes_no_call() {
    let backend = Arc::new(FakeBackend::new());
    let embeddings = OpenAiEmbeddings::new(small_config(), backend.clone());
    let rows = embeddings.embed_documents(&[]).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(backend.call_count().await, 0);
}

#[tokio::test]
async fn wrong_width_is_rejected() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({"data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]}),
    });
    let embeddings = OpenAiEmbeddings::new(small_config(), backend);
    let err = embeddings.embed_documents(&["a"]).await.unwrap_err();
    assert!(err.to_string().contains("expected 2"));
}

#[tokio::test]
async fn missing_data_is_embedding_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({"object": "list"}),
    });
    let embeddings = OpenAiEmbeddings::new(small_config(), backend);
    let err = embeddings.embed_documents(&["a"]).await.unwrap_err();
    assert!(err.to_string().contains("missing 'data'"));
}

#[tokio::test]
async fn rate_limit_is_transient() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 429,
        body: json!({"error": {"message": "rate limited"}}),
    });
    let embeddings = OpenAiEmbeddings::new(small_config(), backend);
    let err = embeddings.embed_query("hello").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn duplicated_index_is_rejected() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "data": [
                {"embedding": [0.1, 0.1], "index": 0},
                {"embedding": [0.2, 0.2], "index": 0},
                {"embedding": [0.3, 0.3], "index": 1}
            ]
        }),
    });
    let embeddings = OpenAiEmbeddings::new(small_config(), backend);
    let err = embeddings.embed_documents(&["a", "b", "c"]).await.unwrap_err();
    assert!(matches!(err, llmwire_core::LlmError::Embedding(_)));
    assert!(err.to_string().contains("do not cover 0..3"));
}
