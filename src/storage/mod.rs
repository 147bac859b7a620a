// src/storage/mod.rs
#[cfg(feature = "gcs")]
pub mod gcs;
pub mod local;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{StoreBackend, StoreConfig};

pub use local::LocalStore;
pub use memory::InMemoryStore;

/// Keyed blob storage for one bucket. Keys are `/`-separated, without the bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full object body.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Create or replace the object at `key`.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Every key starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Remove `key`; removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Human-readable location of `key`, for logs and run reports.
    fn uri(&self, key: &str) -> String;
}

/// Open the backend selected in `config`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    match config.backend {
        StoreBackend::Local => Ok(Arc::new(LocalStore::new(&config.root, &config.bucket)?)),
        #[cfg(feature = "gcs")]
        StoreBackend::Gcs => Ok(Arc::new(gcs::GcsStore::connect(&config.bucket).await?)),
        #[cfg(not(feature = "gcs"))]
        StoreBackend::Gcs => anyhow::bail!("this build has no GCS support; rebuild with --features gcs"),
    }
}
