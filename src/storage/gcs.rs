// src/storage/gcs.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use google_cloud_storage::{
    client::{Client, ClientConfig},
    http::{
        error::ErrorResponse,
        objects::{
            delete::DeleteObjectRequest,
            download::Range,
            get::GetObjectRequest,
            list::ListObjectsRequest,
            upload::{Media, UploadObjectRequest, UploadType},
        },
        Error as HttpError,
    },
};
use tracing::{debug, info};

use super::ObjectStore;

/// Google Cloud Storage bucket, authenticated through Application Default Credentials.
pub struct GcsStore {
    client: Client,
    bucket: String,
}

impl GcsStore {
    pub async fn connect(bucket: &str) -> Result<Self> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .context("authenticating to GCS")?;
        info!(bucket, "connected to GCS");
        Ok(Self {
            client: Client::new(config),
            bucket: bucket.to_string(),
        })
    }
}

fn is_not_found(err: &HttpError) -> bool {
    matches!(err, HttpError::Response(ErrorResponse { code: 404, .. }))
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            ..Default::default()
        };
        self.client
            .download_object(&request, &Range::default())
            .await
            .with_context(|| format!("downloading {}", self.uri(key)))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let bytes = data.len();
        let upload_type = UploadType::Simple(Media::new(key.to_string()));
        let request = UploadObjectRequest {
            bucket: self.bucket.clone(),
            ..Default::default()
        };
        self.client
            .upload_object(&request, data, &upload_type)
            .await
            .with_context(|| format!("uploading {}", self.uri(key)))?;
        debug!(object = key, bytes, "uploaded to GCS");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut page_token = None;
        loop {
            let request = ListObjectsRequest {
                bucket: self.bucket.clone(),
                prefix: Some(prefix.to_string()),
                page_token: page_token.take(),
                ..Default::default()
            };
            let response = self
                .client
                .list_objects(&request)
                .await
                .with_context(|| format!("listing gs://{}/{}", self.bucket, prefix))?;
            keys.extend(response.items.unwrap_or_default().into_iter().map(|o| o.name));
            match response.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let request = DeleteObjectRequest {
            bucket: self.bucket.clone(),
            object: key.to_string(),
            ..Default::default()
        };
        match self.client.delete_object(&request).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => {
                debug!(object = key, "delete of missing object ignored");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("deleting {}", self.uri(key))),
        }
    }

    fn uri(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(code: u16) -> HttpError {
        let body = serde_json::json!({ "code": code, "errors": [], "message": "status" });
        HttpError::Response(serde_json::from_value(body).expect("error response decodes"))
    }

    #[test]
    fn only_404_counts_as_missing() {
        assert!(is_not_found(&response(404)));
        assert!(!is_not_found(&response(403)));
        assert!(!is_not_found(&response(500)));
    }
}
