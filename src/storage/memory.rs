// src/storage/memory.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Mutex};

use super::ObjectStore;

/// In-memory bucket, for tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    fn objects(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.objects
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects()?
            .get(key)
            .cloned()
            .ok_or_else(|| anyhow!("object not found: {}", self.uri(key)))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.objects()?.insert(key.to_string(), data);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects()?
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects()?.remove(key);
        Ok(())
    }

    fn uri(&self, key: &str) -> String {
        format!("mem://{}/{}", self.bucket, key)
    }
}
