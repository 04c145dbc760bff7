mod chat_model;
mod embeddings;

pub use chat_model::{OllamaChatModel, OllamaConfig, DEFAULT_OLLAMA_HOST};
pub use embeddings::{OllamaEmbeddings, OllamaEmbeddingsConfig};
