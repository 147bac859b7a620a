// src/storage/local.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use glob::{glob, Pattern};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tokio::fs;
use tracing::debug;

use super::ObjectStore;

/// Bucket mirrored on the local filesystem at `<root>/<bucket>/<key>`.
pub struct LocalStore {
    bucket_dir: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Result<Self> {
        let bucket_dir = root.as_ref().join(bucket);
        std::fs::create_dir_all(&bucket_dir)
            .with_context(|| format!("creating bucket directory {}", bucket_dir.display()))?;
        Ok(Self { bucket_dir })
    }

    /// Filesystem path of `key`. Keys with `.` or `..` segments are rejected so
    /// every object stays inside the bucket directory.
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let mut path = self.bucket_dir.clone();
        for seg in key.split('/').filter(|s| !s.is_empty()) {
            if seg == "." || seg == ".." {
                bail!("invalid object key {:?}: relative path segment {:?}", key, seg);
            }
            path.push(seg);
        }
        Ok(path)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.bucket_dir).ok()?;
        let parts: Vec<&str> = rel.iter().filter_map(|s| s.to_str()).collect();
        Some(parts.join("/"))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        // write to a temp file, then rename into place
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &data)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))?;

        debug!(path = %path.display(), bytes = data.len(), "stored object");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // only the directory part of the prefix can be walked
        let dir_part = prefix.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        let dir = self.path_for(dir_part)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
        let mut keys = Vec::new();
        for entry in glob(&pattern).context("building listing pattern")? {
            let path = entry.context("walking bucket directory")?;
            if !path.is_file() || path.extension().is_some_and(|e| e == "tmp") {
                continue;
            }
            if let Some(key) = self.key_for(&path) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("deleting {}", path.display())),
        }
    }

    fn uri(&self, key: &str) -> String {
        format!(
            "file://{}/{}",
            self.bucket_dir.display(),
            key.trim_start_matches('/')
        )
    }
}
