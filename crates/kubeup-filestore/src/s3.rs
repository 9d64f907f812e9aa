//! S3-backed `FileStore` (spec §4.6), grounded on `aws_s3_file_store.go` /
//! `aws_s3_helpers.go`: content-addressed key, MD5-compare upload skip,
//! world-readable ACL after upload. Signing reuses `kubeup_cloud`'s SigV4
//! helpers directly against the S3 REST API rather than the query APIs the
//! rest of `kubeup-cloud` talks to.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use reqwest::Client;
use tracing::{debug, info};

use kubeup_cloud::{sigv4_headers, url_host, AwsCredentials};
use kubeup_resource::{hashes, HashAlgorithm, Resource, ResourceError, ResourcePutter};

use crate::error::FileStoreError;

static NEXT_IDENTITY: AtomicUsize = AtomicUsize::new(1);

/// Object-storage layout: `prefix + key + "-" + userHash` under `bucket`
/// (spec §4.6, §6 "Object storage layout": `devel/<cluster-id>/`).
pub struct S3FileStore {
    client: Client,
    creds: AwsCredentials,
    region: String,
    bucket: String,
    prefix: String,
    identity: usize,
    rt: tokio::runtime::Handle,
    seen: Mutex<HashMap<String, (String, String)>>,
    endpoint_override: Option<String>,
}

impl S3FileStore {
    pub fn new(
        creds: AwsCredentials,
        region: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        rt: tokio::runtime::Handle,
    ) -> Self {
        S3FileStore {
            client: Client::new(),
            creds,
            region: region.into(),
            bucket: bucket.into(),
            prefix: prefix.into(),
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            rt,
            seen: Mutex::new(HashMap::new()),
            endpoint_override: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint_override(
        creds: AwsCredentials,
        region: impl Into<String>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        rt: tokio::runtime::Handle,
        base_url: &str,
    ) -> Self {
        let mut store = S3FileStore::new(creds, region, bucket, prefix, rt);
        store.endpoint_override = Some(base_url.to_string());
        store
    }

    fn endpoint(&self) -> String {
        match &self.endpoint_override {
            Some(o) => o.clone(),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }

    fn object_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.endpoint(), object_key)
    }

    async fn head_md5(&self, object_key: &str) -> Result<Option<String>, FileStoreError> {
        let url = self.object_url(object_key);
        let host = url_host(&url);
        let headers = sigv4_headers(
            "HEAD",
            &format!("/{}", object_key),
            "",
            "",
            b"",
            &self.creds,
            &self.region,
            "s3",
            host,
        );
        let mut req = self.client.head(&url).header("Host", host);
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.send().await.map_err(|source| FileStoreError::Request {
            url: url.clone(),
            source,
        })?;
        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Ok(None);
        }
        let etag = resp
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string());
        Ok(etag)
    }

    async fn put_object(&self, object_key: &str, body: Vec<u8>) -> Result<(), FileStoreError> {
        let url = self.object_url(object_key);
        let host = url_host(&url);
        let headers = sigv4_headers(
            "PUT",
            &format!("/{}", object_key),
            "",
            "application/octet-stream",
            &body,
            &self.creds,
            &self.region,
            "s3",
            host,
        );
        let mut req = self
            .client
            .put(&url)
            .header("Host", host)
            .header("Content-Type", "application/octet-stream");
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.body(body).send().await.map_err(|source| FileStoreError::Request {
            url: url.clone(),
            source,
        })?;
        if !resp.status().is_success() {
            return Err(FileStoreError::UnexpectedResponse {
                url,
                message: format!("PutObject failed with status {}", resp.status()),
            });
        }
        Ok(())
    }

    async fn put_public_acl(&self, object_key: &str) -> Result<(), FileStoreError> {
        let url = format!("{}?acl", self.object_url(object_key));
        let host = url_host(&self.object_url(object_key));
        let body = b"";
        let headers = sigv4_headers(
            "PUT",
            &format!("/{}", object_key),
            "acl=",
            "",
            body,
            &self.creds,
            &self.region,
            "s3",
            host,
        );
        let mut req = self
            .client
            .put(&url)
            .header("Host", host)
            .header("x-amz-acl", "public-read");
        for (k, v) in &headers {
            req = req.header(k.as_str(), v.as_str());
        }
        let resp = req.send().await.map_err(|source| FileStoreError::Request {
            url: url.clone(),
            source,
        })?;
        if !resp.status().is_success() {
            return Err(FileStoreError::UnexpectedResponse {
                url,
                message: format!("PutObjectAcl failed with status {}", resp.status()),
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

        let existing_md5 = self.head_md5(&object_key).await?;
        if existing_md5.as_deref() == Some(md5.as_str()) {
            debug!(key = %object_key, "object already present with matching md5, skipping upload");
        } else {
            info!(key = %object_key, "uploading object");
            let mut body = Vec::new();
            kubeup_resource::copy_resource(&mut body, resource)?;
            self.put_object(&object_key, body).await?;
            self.put_public_acl(&object_key).await?;
        }

        let url = self.object_url(&object_key);
        self.seen
            .lock()
            .expect("seen map mutex poisoned")
            .insert(object_key, (url.clone(), user_hash.clone()));
        Ok((url, user_hash))
    }
}

impl ResourcePutter for S3FileStore {
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
