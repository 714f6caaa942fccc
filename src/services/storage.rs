// SPDX-License-Identifier: MIT

//! Object storage for slope and comment images (GCS JSON API).
//!
//! Uploads return a public media URL that is embedded in the owning
//! record. Deletes are best-effort: callers on the backup path log and
//! continue when removal of a stale object fails.

use crate::error::AppError;
use serde::Deserialize;

const STORAGE_HOST: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// GCS client. Mock mode (no HTTP client) is used by offline tests.
#[derive(Clone)]
pub struct ObjectStorage {
    client: Option<reqwest::Client>,
    bucket: String,
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
}

impl ObjectStorage {
    pub fn new(bucket: &str) -> Self {
        Self {
            client: Some(reqwest::Client::new()),
            bucket: bucket.to_string(),
        }
    }

    /// Create a mock client for testing (offline mode).
    pub fn new_mock() -> Self {
        Self {
            client: None,
            bucket: "test-bucket".to_string(),
        }
    }

    fn get_client(&self) -> Result<&reqwest::Client, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Storage("Object store not connected (offline mode)".to_string())
        })
    }

    /// Fetch a service-account token from the metadata server.
    /// Available on Cloud Run and GCE; local development can point the
    /// bucket at the storage emulator instead.
    async fn fetch_access_token(&self) -> Result<String, AppError> {
        let token: MetadataToken = self
            .get_client()?
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Metadata server unreachable: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Storage(format!("Metadata token request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Malformed metadata token: {}", e)))?;
        Ok(token.access_token)
    }

    /// Upload bytes and return the public media URL.
    pub async fn put(
        &self,
        object_key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let token = self.fetch_access_token().await?;

        let upload_url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            STORAGE_HOST,
            self.bucket,
            urlencoding::encode(object_key)
        );

        self.get_client()?
            .post(&upload_url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Storage(format!("Upload rejected: {}", e)))?;

        Ok(format!("{}/{}/{}", STORAGE_HOST, self.bucket, object_key))
    }

    /// Delete the object behind a previously returned URL.
    pub async fn delete(&self, url: &str) -> Result<(), AppError> {
        let object_key = self
            .object_key_from_url(url)
            .ok_or_else(|| AppError::Storage(format!("URL is not in this bucket: {}", url)))?;

        let token = self.fetch_access_token().await?;

        let delete_url = format!(
            "{}/storage/v1/b/{}/o/{}",
            STORAGE_HOST,
            self.bucket,
            urlencoding::encode(&object_key)
        );

        self.get_client()?
            .delete(&delete_url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Delete failed: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Storage(format!("Delete rejected: {}", e)))?;

        Ok(())
    }

    /// Recover the object key from a media URL in this bucket.
    fn object_key_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", STORAGE_HOST, self.bucket);
        url.strip_prefix(&prefix).map(str::to_string)
    }
}

/// Object key for a slope image slot: one timestamped, uuid-tagged file
/// per upload so overwrites never collide.
pub fn slope_object_key(history_number: &str, slot: &str, extension: &str) -> String {
    format!(
        "slopes/{}/{}/{}_{}.{}",
        history_number,
        slot,
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4(),
        extension
    )
}

/// Object key for a comment image.
pub fn comment_object_key(history_number: &str, extension: &str) -> String {
    format!(
        "comments/{}/{}_{}.{}",
        history_number,
        chrono::Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4(),
        extension
    )
}
