//! Content-addressed blob upload to cloud object storage (spec §4.6).
//!
//! Two concrete [`kubeup_resource::ResourcePutter`] implementations, one per
//! provider object store; `kubeup-target`'s `DryRunTarget` supplies its own
//! in-memory recorder rather than using either of these.

mod error;
mod gcs;
mod s3;

pub use error::FileStoreError;
pub use gcs::GcsFileStore;
pub use s3::S3FileStore;

#[cfg(test)]
mod tests {
    use super::*;
    use kubeup_cloud::AwsCredentials;
    use kubeup_resource::{HashAlgorithm, ResourcePutter, StringResource};
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_creds() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        }
    }

    #[tokio::test]
    async fn put_skips_upload_when_md5_matches() {
        let server = MockServer::start().await;
        let resource = StringResource::new("release artifact bytes");
        let md5 = kubeup_resource::hash_resource(&resource, HashAlgorithm::Md5).unwrap();

        Mock::given(method("HEAD"))
            .and(path_regex(".*"))
            .respond_with(ResponseTemplate::new(200).insert_header("etag", format!("\"{md5}\"")))
            .mount(&server)
            .await;
        // Any PUT would indicate the skip logic failed; fail the test if hit.
        Mock::given(method("PUT"))
            .and(path_regex(".*"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // `put` blocks the calling thread on the async HTTP calls via its own
        // runtime handle, so it must run off the test's own async task
        // (calling it inline would trip tokio's "cannot block within a
        // runtime" panic).
        let rt = tokio::runtime::Handle::current();
        let (url, hash) = tokio::task::spawn_blocking(move || {
            let store = super::s3::S3FileStore::with_endpoint_override(
                test_creds(),
                "us-east-1",
                "bucket",
                "devel/tstc/",
                rt,
                &server.uri(),
            );
            store.put("bootstrap", &resource, HashAlgorithm::Sha256).unwrap()
        })
        .await
        .unwrap();
        assert!(url.ends_with(&format!("bootstrap-{hash}")));
    }

    #[tokio::test]
    async fn put_uploads_then_sets_public_acl_on_md5_mismatch() {
        let server = MockServer::start().await;
        let resource = StringResource::new("release artifact bytes");

        Mock::given(method("HEAD"))
            .and(path_regex(".*"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(".*"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let rt = tokio::runtime::Handle::current();
        let (hash1, hash2) = tokio::task::spawn_blocking(move || {
            let store = super::s3::S3FileStore::with_endpoint_override(
                test_creds(),
                "us-east-1",
                "bucket",
                "devel/tstc/",
                rt,
                &server.uri(),
            );
            let (_, hash1) = store.put("bootstrap", &resource, HashAlgorithm::Sha256).unwrap();
            // Second call hits the in-process seen-cache, not the mock server.
            let (_, hash2) = store.put("bootstrap", &resource, HashAlgorithm::Sha256).unwrap();
            (hash1, hash2)
        })
        .await
        .unwrap();
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn same_content_same_key_yields_identical_digest_across_calls() {
        let resource = StringResource::new("identical content");
        let h1 = kubeup_resource::hash_resource(&resource, HashAlgorithm::Sha256).unwrap();
        let h2 = kubeup_resource::hash_resource(&resource, HashAlgorithm::Sha256).unwrap();
        assert_eq!(h1, h2, "content-addressed key must be stable across calls (invariant 7)");
    }
}
