mod error;
mod store;
mod subject_key;
mod types;

pub use error::PkiError;
pub use store::CertificateStore;
pub use subject_key::subject_key;
pub use types::{CertTemplate, Certificate, ExtKeyUsage, KeyUsage, PrivateKey, Subject};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_private_key_then_find_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertificateStore::open(dir.path()).unwrap();
        let subject = Subject::cn("kubelet");
        let created = store.create_private_key(&subject).unwrap();
        let found = store.find_private_key(&subject).unwrap().expect("key exists");
        assert_eq!(created.pem, found.pem);
    }

    #[test]
    fn issue_then_find_cert_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertificateStore::open(dir.path()).unwrap();
        let subject = Subject::cn("kubernetes-master").with("o", "system:masters");
        let key = store.create_private_key(&subject).unwrap();
        let template = CertTemplate::server(subject.clone()).with_dns_san("kubernetes");
        let issued = store.issue(&key, &template).unwrap();
        let found = store.find_cert(&subject).unwrap().expect("cert exists");
        assert_eq!(issued.pem, found.pem);
        assert!(!found.is_ca);
    }

    #[test]
    fn reopening_store_reuses_existing_ca() {
        let dir = tempfile::tempdir().unwrap();
        let ca_pem_1 = CertificateStore::open(dir.path()).unwrap().ca_cert().pem.clone();
        let ca_pem_2 = CertificateStore::open(dir.path()).unwrap().ca_cert().pem.clone();
        assert_eq!(ca_pem_1, ca_pem_2);
    }

    #[test]
    fn find_cert_for_unknown_subject_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CertificateStore::open(dir.path()).unwrap();
        assert!(store.find_cert(&Subject::cn("nobody")).unwrap().is_none());
    }
}
