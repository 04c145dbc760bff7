use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use llmwire_core::{CacheEntry, KvStorage, LlmError};
use tokio::sync::RwLock;

/// Process-local completion store. Finalizing is a no-op apart from being
/// counted.
#[derive(Default)]
pub struct InMemoryKvStorage {
    store: RwLock<HashMap<String, CacheEntry>>,
    flushes: AtomicUsize,
}

impl InMemoryKvStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.store.read().await.keys().cloned().collect()
    }

    /// Number of times `index_done_callback` has run.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }
}

#[async_trait]
impl KvStorage for InMemoryKvStorage {
    async fn get_by_id(&self, id: &str) -> Result<Option<CacheEntry>, LlmError> {
        Ok(self.store.read().await.get(id).cloned())
    }

    async fn upsert(&self, entries: HashMap<String, CacheEntry>) -> Result<(), LlmError> {
        self.store.write().await.extend(entries);
        Ok(())
    }

    async fn index_done_callback(&self) -> Result<(), LlmError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
