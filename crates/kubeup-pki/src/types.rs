use std::time::{Duration, SystemTime};

use crate::error::PkiError;

/// An X.500 distinguished name as an ordered list of RDN pairs, matching the
/// order the original renders them in (`cn`, `o`, `ou`, ...). Order matters
/// for the subject→filename translation (spec §4.7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub rdns: Vec<(String, String)>,
}

impl Subject {
    pub fn new() -> Self {
        Subject::default()
    }

    pub fn with(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.rdns.push((attr.into(), value.into()));
        self
    }

    pub fn cn(cn: impl Into<String>) -> Self {
        Subject::new().with("cn", cn)
    }

    pub fn common_name(&self) -> Option<&str> {
        self.rdns
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("cn"))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    DigitalSignature,
    KeyEncipherment,
    CertSign,
    CrlSign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtKeyUsage {
    ServerAuth,
    ClientAuth,
}

/// Template for [`crate::CertificateStore::issue`] (spec §4.7).
///
/// Fields left `None` are filled with these defaults at issuance time:
/// `NotBefore = now - 48h`, `NotAfter = now + 10y`, random 128-bit serial,
/// `digitalSignature | keyEncipherment`, `ExtKeyUsage = serverAuth`.
#[derive(Debug, Clone)]
pub struct CertTemplate {
    pub subject: Subject,
    pub is_ca: bool,
    pub san_dns_names: Vec<String>,
    pub san_ip_addresses: Vec<std::net::IpAddr>,
    pub not_before: Option<SystemTime>,
    pub not_after: Option<SystemTime>,
    pub key_usage: Option<Vec<KeyUsage>>,
    pub ext_key_usage: Option<Vec<ExtKeyUsage>>,
}

impl CertTemplate {
    pub fn server(subject: Subject) -> Self {
        CertTemplate {
            subject,
            is_ca: false,
            san_dns_names: Vec::new(),
            san_ip_addresses: Vec::new(),
            not_before: None,
            not_after: None,
            key_usage: None,
            ext_key_usage: Some(vec![ExtKeyUsage::ServerAuth]),
        }
    }

    pub fn client(subject: Subject) -> Self {
        CertTemplate {
            subject,
            is_ca: false,
            san_dns_names: Vec::new(),
            san_ip_addresses: Vec::new(),
            not_before: None,
            not_after: None,
            key_usage: None,
            ext_key_usage: Some(vec![ExtKeyUsage::ClientAuth]),
        }
    }

    pub fn with_dns_san(mut self, name: impl Into<String>) -> Self {
        self.san_dns_names.push(name.into());
        self
    }

    pub fn with_ip_san(mut self, ip: std::net::IpAddr) -> Self {
        self.san_ip_addresses.push(ip);
        self
    }

    pub(crate) fn resolved_not_before(&self) -> SystemTime {
        self.not_before
            .unwrap_or_else(|| SystemTime::now() - Duration::from_secs(48 * 3600))
    }

    pub(crate) fn resolved_not_after(&self) -> SystemTime {
        self.not_after
            .unwrap_or_else(|| SystemTime::now() + Duration::from_secs(10 * 365 * 24 * 3600))
    }

    pub(crate) fn resolved_key_usage(&self) -> Vec<KeyUsage> {
        self.key_usage
            .clone()
            .unwrap_or_else(|| vec![KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment])
    }

    pub(crate) fn resolved_ext_key_usage(&self) -> Vec<ExtKeyUsage> {
        self.ext_key_usage
            .clone()
            .unwrap_or_else(|| vec![ExtKeyUsage::ServerAuth])
    }
}

/// A signed X.509 certificate persisted by the store.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub subject: Subject,
    pub is_ca: bool,
    pub der: Vec<u8>,
    pub pem: String,
}

impl Certificate {
    pub fn pem(&self) -> &str {
        &self.pem
    }
}

/// An RSA private key (2048-bit, per spec §4.7) persisted by the store.
#[derive(Clone)]
pub struct PrivateKey {
    pub pkcs8_der: Vec<u8>,
    pub pem: String,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

impl PrivateKey {
    pub fn pem(&self) -> &str {
        &self.pem
    }
}

pub(crate) fn io_mkdir(path: &std::path::Path, mode: u32) -> Result<(), PkiError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|source| PkiError::Mkdir {
            path: path.display().to_string(),
            source,
        })?;
    }
    set_mode(path, mode)
}

#[cfg(unix)]
pub(crate) fn set_mode(path: &std::path::Path, mode: u32) -> Result<(), PkiError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|source| {
        PkiError::Write {
            path: path.display().to_string(),
            source,
        }
    })
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &std::path::Path, _mode: u32) -> Result<(), PkiError> {
    Ok(())
}
