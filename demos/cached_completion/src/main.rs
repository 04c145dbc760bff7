use llmwire::cache::{CompletionInput, JsonKvStorage};
use llmwire::core::LlmError;
use llmwire::presets::{ClientRegistry, Profile, Provider};

#[tokio::main]
async fn main() -> Result<(), LlmError> {
    tracing_subscriber::fmt::init();

    // --- Setup: registry from environment, first configured provider ---
    let registry = ClientRegistry::from_env();
    let provider = [Provider::OpenAi, Provider::AzureOpenAi]
        .into_iter()
        .find(|p| registry.is_configured(*p))
        .unwrap_or(Provider::Ollama);
    let profile = Profile::for_provider(provider, &registry)?;
    println!("Using {provider} (cheap model: {})", profile.cheap.model());

    let store = JsonKvStorage::open("./llmwire_cache", "llm_response_cache").await?;
    println!("Cache file: {}", store.path().display());

    let input = || CompletionInput::new().with_system_prompt("Answer in one short sentence.");

    // --- First call: cache miss unless a previous run stored it ---
    println!("\n=== First call ===");
    let first = profile
        .cheap
        .complete("What is the capital of France?", input(), Some(&store))
        .await?;
    println!("Response: {first}");

    // --- Second call: served from the cache file ---
    println!("\n=== Second call (same prompt) ===");
    let second = profile
        .cheap
        .complete("What is the capital of France?", input(), Some(&store))
        .await?;
    println!("Response: {second}");
    println!("Same response: {}", first == second);
    let entries = store.len().await;
    tracing::info!(entries, path = %store.path().display(), "cache file updated");

    Ok(())
}
