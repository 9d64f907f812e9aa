//! GCS-backed `FileStore` (spec §4.6), mirroring [`crate::s3::S3FileStore`]'s
//! contract against the GCS JSON API's object ACLs (`publicRead`) instead of
//! S3's canned ACL header.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use gcp_auth::TokenProvider;
use reqwest::Client;
use tracing::{debug, info};

use kubeup_resource::{hashes, HashAlgorithm, Resource, ResourceError, ResourcePutter};

use crate::error::FileStoreError;

const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

static NEXT_IDENTITY: AtomicUsize = AtomicUsize::new(1_000_000);

pub struct GcsFileStore {
    client: Client,
    token_provider: Arc<dyn TokenProvider>,
    bucket: String,
    prefix: String,
    identity: usize,
    rt: tokio::runtime::Handle,
    seen: Mutex<HashMap<String, (String, String)>>,
}

impl GcsFileStore {
    pub async fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        rt: tokio::runtime::Handle,
    ) -> Result<Self, FileStoreError> {
        let token_provider = gcp_auth::provider()
            .await
            .map_err(|e| FileStoreError::UnexpectedResponse {
                url: "adc".into(),
                message: e.to_string(),
            })?;
        Ok(GcsFileStore {
            client: Client::new(),
            token_provider,
            bucket: bucket.into(),
            prefix: prefix.into(),
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            rt,
            seen: Mutex::new(HashMap::new()),
        })
    }

    async fn bearer_token(&self) -> Result<String, FileStoreError> {
        let token = self
            .token_provider
            .token(&[STORAGE_SCOPE])
            .await
            .map_err(|e| FileStoreError::UnexpectedResponse {
                url: "adc".into(),
                message: e.to_string(),
            })?;
        Ok(token.as_str().to_string())
    }

    fn public_url(&self, object_key: &str) -> String {
        format!(
            "https://storage.googleapis.com/{}/{}",
            self.bucket, object_key
        )
    }

    async fn existing_md5(&self, object_key: &str) -> Result<Option<String>, FileStoreError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "https://storage.googleapis.com/storage/v1/b/{}/o/{}",
            self.bucket,
            urlencoding_path(object_key)
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| FileStoreError::Request { url: url.clone(), source })?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Ok(None);
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|source| FileStoreError::Request { url, source })?;
        Ok(body["md5Hash"].as_str().map(str::to_string))
    }

    async fn upload(&self, object_key: &str, body: Vec<u8>) -> Result<(), FileStoreError> {
        let token = self.bearer_token().await?;
        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}&predefinedAcl=publicRead",
            self.bucket,
            urlencoding_path(object_key)
        );
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|source| FileStoreError::Request { url: url.clone(), source })?;
        if !resp.status().is_success() {
            return Err(FileStoreError::UnexpectedResponse {
                url,
                message: format!("object insert failed with status {}", resp.status()),
            });
        }
        Ok(())
    }

    async fn put_async(
        &self,
        key: &str,
        resource: &dyn Resource,
        hash_algorithm: HashAlgorithm,
    ) -> Result<(String, String), FileStoreError> {
        let digests = hashes(resource, &[HashAlgorithm::Md5, hash_algorithm])?;
        let md5 = digests
            .iter()
            .find(|(a, _)| *a == HashAlgorithm::Md5)
            .map(|(_, h)| h.clone())
            .expect("md5 was requested");
        let user_hash = digests
            .iter()
            .find(|(a, _)| *a == hash_algorithm)
            .map(|(_, h)| h.clone())
            .expect("requested algorithm was requested");

        let object_key = format!("{}{}-{}", self.prefix, key, user_hash);

        if let Some(cached) = self.seen.lock().expect("seen map mutex poisoned").get(&object_key) {
            return Ok(cached.clone());
        }

        // GCS reports base64 md5, not hex; compare against a base64 re-encode
        // of our hex digest rather than pulling in a second md5 computation.
        let expected_b64 = hex_to_base64(&md5);
        let existing = self.existing_md5(&object_key).await?;
        if existing.as_deref() == Some(expected_b64.as_str()) {
            debug!(key = %object_key, "object already present with matching md5, skipping upload");
        } else {
            info!(key = %object_key, "uploading object");
            let mut body = Vec::new();
            kubeup_resource::copy_resource(&mut body, resource)?;
            self.upload(&object_key, body).await?;
        }

        let url = self.public_url(&object_key);
        self.seen
            .lock()
            .expect("seen map mutex poisoned")
            .insert(object_key, (url.clone(), user_hash.clone()));
        Ok((url, user_hash))
    }
}

fn hex_to_base64(hex_str: &str) -> String {
    use base64::Engine;
    let bytes = hex::decode(hex_str).unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn urlencoding_path(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            other => format!("%{:02X}", other as u32),
        })
        .collect()
}

impl ResourcePutter for GcsFileStore {
    fn identity(&self) -> usize {
        self.identity
    }

    fn put(
        &self,
        key: &str,
        resource: &dyn Resource,
        hash_algorithm: HashAlgorithm,
    ) -> Result<(String, String), ResourceError> {
        self.rt
            .block_on(self.put_async(key, resource, hash_algorithm))
            .map_err(|e| ResourceError::Compute(e.to_string()))
    }
}
