use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use llmwire_core::{CacheEntry, KvStorage, LlmError};
use tokio::sync::{Mutex, RwLock};

/// Completion store persisted as one JSON object in
/// `<working_dir>/kv_store_<namespace>.json`.
///
/// Entries are held in memory and the whole file is rewritten on
/// `index_done_callback`, so an upsert is durable only after the next
/// successful finalize.
pub struct JsonKvStorage {
    path: PathBuf,
    data: RwLock<HashMap<String, CacheEntry>>,
    // One flush at a time; all of them share the temp file.
    flush: Mutex<()>,
}

impl JsonKvStorage {
    /// Open the store, loading any existing file.
    pub async fn open(working_dir: impl AsRef<Path>, namespace: &str) -> Result<Self, LlmError> {
        let path = working_dir
            .as_ref()
            .join(format!("kv_store_{namespace}.json"));

        let data: HashMap<String, CacheEntry> = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                LlmError::Cache(format!("corrupt kv store {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(LlmError::Cache(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        tracing::info!(
            namespace,
            entries = data.len(),
            path = %path.display(),
            "loaded kv store"
        );

        Ok(Self {
            path,
            data: RwLock::new(data),
            flush: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.data.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl KvStorage for JsonKvStorage {
    async fn get_by_id(&self, id: &str) -> Result<Option<CacheEntry>, LlmError> {
        Ok(self.data.read().await.get(id).cloned())
    }

    async fn upsert(&self, entries: HashMap<String, CacheEntry>) -> Result<(), LlmError> {
        self.data.write().await.extend(entries);
        Ok(())
    }

    async fn index_done_callback(&self) -> Result<(), LlmError> {
        let _flush = self.flush.lock().await;

        // Sorted keys.
        let text = {
            let data = self.data.read().await;
            let sorted: BTreeMap<&String, &CacheEntry> = data.iter().collect();
            serde_json::to_string_pretty(&sorted)
                .map_err(|e| LlmError::Cache(format!("failed to encode kv store: {e}")))?
        };

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| LlmError::Cache(format!("failed to create {}: {e}", dir.display())))?;
        }

        // Write-then-rename.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| LlmError::Cache(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            LlmError::Cache(format!("failed to replace {}: {e}", self.path.display()))
        })?;

        tracing::info!(path = %self.path.display(), "flushed kv store");
        Ok(())
    }
}
