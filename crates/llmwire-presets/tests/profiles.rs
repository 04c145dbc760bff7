use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llmwire_cache::{CompletionInput, InMemoryKvStorage};
use llmwire_core::{Embeddings, LlmError};
use llmwire_models::{FakeBackend, ProviderResponse};
use llmwire_presets::{
    azure_openai_profile, ollama_profile, openai_profile, ClientRegistry, Profile, Provider,
    ProviderSettings,
};
use serde_json::json;

fn registry(backend: Arc<FakeBackend>) -> ClientRegistry {
    ClientRegistry::new(
        ProviderSettings::default()
            .with_openai("sk-test")
            .with_azure("az-key", "https://res.openai.azure.com"),
        backend,
    )
}

#[test]
fn openai_preset_values() {
    let profile = openai_profile(&registry(Arc::new(FakeBackend::new()))).unwrap();
    assert_eq!(profile.provider, Provider::OpenAi);
    assert_eq!(profile.embedding.dimensions(), 1536);
    assert_eq!(profile.embedding.max_token_size(), 8192);
    assert_eq!(profile.embedding_batch_num, 32);
    assert_eq!(profile.embedding_func_max_async, 16);
    assert_eq!(profile.query_better_than_threshold, 0.2);
    assert_eq!(profile.best.model(), "gpt-4o-mini");
    assert_eq!(profile.cheap.model(), "gpt-4o-mini");
    assert_eq!((profile.best_max_token_size, profile.best_max_async), (32768, 16));
    assert_eq!((profile.cheap_max_token_size, profile.cheap_max_async), (32768, 16));
}

#[test]
fn azure_preset_values() {
    let profile = azure_openai_profile(&registry(Arc::new(FakeBackend::new()))).unwrap();
    assert_eq!(profile.embedding.dimensions(), 1536);
    assert_eq!(profile.best.model(), "gpt-4o");
    assert_eq!(profile.cheap.model(), "gpt-4o-mini");
    assert_eq!(profile.best_max_async, 16);
}

#[test]
fn ollama_preset_values() {
    let profile = ollama_profile(&registry(Arc::new(FakeBackend::new()))).unwrap();
    assert_eq!(profile.embedding.dimensions(), 768);
    assert_eq!(profile.embedding_batch_num, 1);
    assert_eq!(profile.embedding_func_max_async, 1);
    assert_eq!(profile.best.model(), "gemma2:latest");
    assert_eq!(profile.cheap.model(), "olmo2");
    assert_eq!((profile.best_max_async, profile.cheap_max_async), (1, 1));
    assert_eq!(profile.best_max_token_size, 32768);
}

#[test]
fn unconfigured_provider_has_no_profile() {
    let registry = ClientRegistry::new(ProviderSettings::default(), Arc::new(FakeBackend::new()));
    assert!(matches!(
        Profile::for_provider(Provider::OpenAi, &registry),
        Err(LlmError::Config(_))
    ));
    assert!(Profile::for_provider(Provider::Ollama, &registry).is_ok());
}

#[tokio::test]
async fn best_and_cheap_send_their_own_model() {
    let backend = Arc::new(FakeBackend::new());
    for text in ["deep", "quick"] {
        backend.push_response(ProviderResponse {
            status: 200,
            body: json!({"message": {"role": "assistant", "content": text}}),
        });
    }
    let profile = ollama_profile(&registry(backend.clone())).unwrap();
    let cache = InMemoryKvStorage::new();

    let deep = profile
        .best
        .complete("explain", CompletionInput::new(), Some(&cache))
        .await
        .unwrap();
    let quick = profile
        .cheap
        .complete("explain", CompletionInput::new(), Some(&cache))
        .await
        .unwrap();
    assert_eq!((deep.as_str(), quick.as_str()), ("deep", "quick"));

    // Same prompt, different model: two separate cache entries.
    assert_eq!(cache.len().await, 2);
    let models: Vec<String> = backend
        .requests()
        .await
        .into_iter()
        .map(|r| r.body["model"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(models, vec!["gemma2:latest", "olmo2"]);
}

/// Embeds each text as `[len]` and tracks how many calls overlap.
#[derive(Default)]
struct CountingEmbeddings {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl Embeddings for CountingEmbeddings {
    fn dimensions(&self) -> usize {
        1
    }

    fn max_token_size(&self) -> usize {
        8192
    }

    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
    }
}

#[tokio::test]
async fn embed_batched_preserves_order_and_bounds_concurrency() {
    let counter = Arc::new(CountingEmbeddings::default());
    let base = ollama_profile(&registry(Arc::new(FakeBackend::new()))).unwrap();
    let profile = Profile {
        embedding: counter.clone(),
        embedding_batch_num: 2,
        embedding_func_max_async: 2,
        ..base
    };

    let texts = ["a", "bb", "ccc", "dddd", "eeeee", "ffffff", "g"];
    let rows = profile.embed_batched(&texts).await.unwrap();

    let lengths: Vec<f32> = rows.into_iter().map(|r| r[0]).collect();
    assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0]);
    assert_eq!(counter.calls.load(Ordering::SeqCst), 4);
    assert_eq!(counter.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn embed_batched_empty_input_makes_no_calls() {
    let counter = Arc::new(CountingEmbeddings::default());
    let base = ollama_profile(&registry(Arc::new(FakeBackend::new()))).unwrap();
    let profile = Profile {
        embedding: counter.clone(),
        ..base
    };
    assert!(profile.embed_batched(&[]).await.unwrap().is_empty());
    assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rate_limited_profile_caps_embedding_calls() {
    let counter = Arc::new(CountingEmbeddings::default());
    let base = openai_profile(&registry(Arc::new(FakeBackend::new()))).unwrap();
    let profile = Profile {
        embedding: counter.clone(),
        embedding_func_max_async: 1,
        ..base
    }
    .rate_limited();

    let texts = ["a", "b", "c"];
    let calls = texts.iter().map(|t| profile.embedding.embed_query(t));
    let results = futures::future::join_all(calls).await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(counter.peak.load(Ordering::SeqCst), 1);
    assert_eq!(profile.best.model(), "gpt-4o-mini");
}
