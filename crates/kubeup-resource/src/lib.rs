mod downloadable;
mod error;
mod hash;
mod resource;

pub use downloadable::{Downloadable, ResourcePutter};
pub use error::ResourceError;
pub use hash::HashAlgorithm;
pub use resource::{
    as_base64, as_bytes, as_string, copy_resource, equals, hash as hash_resource, hashes,
    BytesResource, FileResource, FuncResource, Resource, StringResource,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_across_opens() {
        let r = StringResource::new("hello world");
        let h1 = hash_resource(&r, HashAlgorithm::Sha256).unwrap();
        let h2 = hash_resource(&r, HashAlgorithm::Sha256).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(
            h1,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde"
        );
    }

    #[test]
    fn hashes_matches_individual_hash_calls() {
        let r = BytesResource::new(b"some content".to_vec());
        let multi = hashes(&r, &[HashAlgorithm::Md5, HashAlgorithm::Sha256]).unwrap();
        let md5 = hash_resource(&r, HashAlgorithm::Md5).unwrap();
        let sha256 = hash_resource(&r, HashAlgorithm::Sha256).unwrap();
        assert_eq!(multi, vec![(HashAlgorithm::Md5, md5), (HashAlgorithm::Sha256, sha256)]);
    }

    #[test]
    fn equals_true_iff_bytes_equal() {
        let a = BytesResource::new(b"abcdef".to_vec());
        let b = BytesResource::new(b"abcdef".to_vec());
        let c = BytesResource::new(b"abcxyz".to_vec());
        assert!(equals(&a, &b).unwrap());
        assert!(!equals(&a, &c).unwrap());
    }

    #[test]
    fn equals_detects_length_mismatch() {
        let a = BytesResource::new(b"short".to_vec());
        let b = BytesResource::new(b"a much longer resource body".to_vec());
        assert!(!equals(&a, &b).unwrap());
    }

    #[test]
    fn equals_handles_buffers_larger_than_compare_window() {
        let big_a = vec![7u8; 20_000];
        let mut big_b = big_a.clone();
        big_b[19_999] = 8;
        let a = BytesResource::new(big_a);
        let b = BytesResource::new(big_b);
        assert!(!equals(&a, &b).unwrap());
    }

    #[test]
    fn file_resource_reopens_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, b"release artifact bytes").unwrap();
        let r = FileResource::new(&path);
        assert_eq!(as_bytes(&r).unwrap(), as_bytes(&r).unwrap());
    }

    #[test]
    fn func_resource_is_recomputed_per_open() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let r = FuncResource::new(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            Ok(b"generated".to_vec())
        });
        let _ = as_bytes(&r).unwrap();
        let _ = as_bytes(&r).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn as_base64_roundtrips() {
        let r = StringResource::new("cert-pem-bytes");
        let b64 = as_base64(&r).unwrap();
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD.decode(b64).unwrap();
        assert_eq!(decoded, b"cert-pem-bytes");
    }
}
