use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, KeyPair, KeyUsagePurpose, SanType, SerialNumber,
};
use rsa::pkcs8::EncodePrivateKey;
use tracing::{debug, info};

use crate::error::PkiError;
use crate::subject_key::subject_key;
use crate::types::{CertTemplate, Certificate, ExtKeyUsage, KeyUsage, PrivateKey, Subject};

const CA_SUBJECT_CN: &str = "kubernetes";
const RSA_KEY_BITS: usize = 2048;

/// Filesystem-backed PKI (spec §4.7).
///
/// Directory layout under `basedir`:
/// - `ca.crt`, `private/ca.key` — the cluster certificate authority.
/// - `issued/<subject>.crt` — certificates issued by this store.
/// - `private/<subject>.key` — private keys created by this store.
///
/// Concurrent runs are not supported; this is a single-process tool (spec
/// §4.7 "Files are written in a single write").
pub struct CertificateStore {
    basedir: PathBuf,
    ca_cert: Certificate,
    ca_key: PrivateKey,
}

impl CertificateStore {
    /// Opens (or initialises) the store at `basedir`. Ensures `basedir`,
    /// `basedir/private`, `basedir/issued` exist with owner-only
    /// permissions, loading an existing CA or generating a fresh 2048-bit
    /// RSA CA (`CN=kubernetes`, `certSign | crlSign`, `isCA=true`).
    pub fn open(basedir: impl Into<PathBuf>) -> Result<Self, PkiError> {
        let basedir = basedir.into();
        crate::types::io_mkdir(&basedir, 0o700)?;
        crate::types::io_mkdir(&basedir.join("private"), 0o700)?;
        crate::types::io_mkdir(&basedir.join("issued"), 0o700)?;

        let ca_cert_path = basedir.join("ca.crt");
        let ca_key_path = basedir.join("private").join("ca.key");

        if ca_cert_path.exists() && ca_key_path.exists() {
            debug!(path = %ca_cert_path.display(), "loading existing CA");
            let ca_cert = load_certificate(&ca_cert_path, Subject::cn(CA_SUBJECT_CN), true)?;
            let ca_key = load_private_key(&ca_key_path)?;
            return Ok(CertificateStore {
                basedir,
                ca_cert,
                ca_key,
            });
        }

        info!("generating new cluster CA");
        let ca_key = generate_rsa_key()?;
        let key_pair = rcgen_key_pair(&ca_key)?;

        let mut params = CertificateParams::new(Vec::new())
            .map_err(|e| PkiError::Sign(e.to_string()))?;
        params.distinguished_name = distinguished_name(&Subject::cn(CA_SUBJECT_CN));
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.not_before = rcgen::date_time_ymd(1975, 1, 1);
        params.not_after = far_future();
        params.serial_number = Some(SerialNumber::from_slice(&random_serial()));

        let rc_cert = params
            .self_signed(&key_pair)
            .map_err(|e| PkiError::Sign(e.to_string()))?;

        let ca_cert = Certificate {
            subject: Subject::cn(CA_SUBJECT_CN),
            is_ca: true,
            der: rc_cert.der().to_vec(),
            pem: rc_cert.pem(),
        };

        write_file(&ca_cert_path, ca_cert.pem.as_bytes(), 0o644)?;
        write_file(&ca_key_path, ca_key.pem.as_bytes(), 0o600)?;

        Ok(CertificateStore {
            basedir,
            ca_cert,
            ca_key,
        })
    }

    pub fn ca_cert(&self) -> &Certificate {
        &self.ca_cert
    }

    /// Issues a certificate from `template`, signed by the store's CA.
    /// Fills `NotBefore`/`NotAfter`/serial/key-usage/ext-key-usage defaults
    /// per spec §4.7 when the template leaves them unset. Persists the
    /// result at `issued/<subject>.crt`.
    pub fn issue(&self, private_key: &PrivateKey, template: &CertTemplate) -> Result<Certificate, PkiError> {
        let key_pair = rcgen_key_pair(private_key)?;
        let ca_key_pair = rcgen_key_pair(&self.ca_key)?;

        let mut sans = Vec::new();
        for name in &template.san_dns_names {
            sans.push(name.clone());
        }

        let mut params = CertificateParams::new(sans).map_err(|e| PkiError::Sign(e.to_string()))?;
        params.distinguished_name = distinguished_name(&template.subject);
        params.not_before = system_time_to_rcgen(template.resolved_not_before());
        params.not_after = system_time_to_rcgen(template.resolved_not_after());
        params.serial_number = Some(SerialNumber::from_slice(&random_serial()));
        params.key_usages = template.resolved_key_usage().iter().map(map_key_usage).collect();
        params.extended_key_usages = template
            .resolved_ext_key_usage()
            .iter()
            .map(map_ext_key_usage)
            .collect();
        params.is_ca = if template.is_ca {
            IsCa::Ca(BasicConstraints::Unconstrained)
        } else {
            IsCa::NoCa
        };
        for ip in &template.san_ip_addresses {
            params.subject_alt_names.push(SanType::IpAddress(*ip));
        }

        let ca_params = self.ca_rcgen_params();
        let ca_rc_cert = ca_params
            .self_signed(&ca_key_pair)
            .map_err(|e| PkiError::Sign(e.to_string()))?;

        let rc_cert = params
            .signed_by(&key_pair, &ca_rc_cert, &ca_key_pair)
            .map_err(|e| PkiError::Sign(e.to_string()))?;

        let cert = Certificate {
            subject: template.subject.clone(),
            is_ca: template.is_ca,
            der: rc_cert.der().to_vec(),
            pem: rc_cert.pem(),
        };

        let path = self.issued_path(&template.subject);
        write_file(&path, cert.pem.as_bytes(), 0o644)?;
        Ok(cert)
    }

    pub fn find_cert(&self, subject: &Subject) -> Result<Option<Certificate>, PkiError> {
        let path = self.issued_path(subject);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(load_certificate(&path, subject.clone(), false)?))
    }

    pub fn find_private_key(&self, subject: &Subject) -> Result<Option<PrivateKey>, PkiError> {
        let path = self.private_key_path(subject);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(load_private_key(&path)?))
    }

    /// Generates and persists a fresh 2048-bit RSA private key for `subject`
    /// at `private/<subject>.key`.
    pub fn create_private_key(&self, subject: &Subject) -> Result<PrivateKey, PkiError> {
        let key = generate_rsa_key()?;
        let path = self.private_key_path(subject);
        write_file(&path, key.pem.as_bytes(), 0o600)?;
        Ok(key)
    }

    fn issued_path(&self, subject: &Subject) -> PathBuf {
        self.basedir.join("issued").join(format!("{}.crt", subject_key(subject)))
    }

    fn private_key_path(&self, subject: &Subject) -> PathBuf {
        self.basedir.join("private").join(format!("{}.key", subject_key(subject)))
    }

    fn ca_rcgen_params(&self) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::new()).expect("empty SAN list is always valid");
        params.distinguished_name = distinguished_name(&self.ca_cert.subject);
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        params.not_before = rcgen::date_time_ymd(1975, 1, 1);
        params.not_after = far_future();
        params
    }
}

fn distinguished_name(subject: &Subject) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    for (attr, value) in &subject.rdns {
        match attr.to_lowercase().as_str() {
            "cn" => dn.push(DnType::CommonName, value.clone()),
            "o" => dn.push(DnType::OrganizationName, value.clone()),
            "ou" => dn.push(DnType::OrganizationalUnitName, value.clone()),
            "c" => dn.push(DnType::CountryName, value.clone()),
            "l" => dn.push(DnType::LocalityName, value.clone()),
            "st" => dn.push(DnType::StateOrProvinceName, value.clone()),
            "serialnumber" => dn.push(DnType::CustomDnType(vec![2, 5, 4, 5]), value.clone()),
            _ => dn.push(DnType::CustomDnType(vec![2, 5, 4, 255]), value.clone()),
        };
    }
    dn
}

fn map_key_usage(u: &KeyUsage) -> KeyUsagePurpose {
    match u {
        KeyUsage::DigitalSignature => KeyUsagePurpose::DigitalSignature,
        KeyUsage::KeyEncipherment => KeyUsagePurpose::KeyEncipherment,
        KeyUsage::CertSign => KeyUsagePurpose::KeyCertSign,
        KeyUsage::CrlSign => KeyUsagePurpose::CrlSign,
    }
}

fn map_ext_key_usage(u: &ExtKeyUsage) -> ExtendedKeyUsagePurpose {
    match u {
        ExtKeyUsage::ServerAuth => ExtendedKeyUsagePurpose::ServerAuth,
        ExtKeyUsage::ClientAuth => ExtendedKeyUsagePurpose::ClientAuth,
    }
}

fn far_future() -> time::OffsetDateTime {
    rcgen::date_time_ymd(2099, 1, 1)
}

fn system_time_to_rcgen(t: SystemTime) -> time::OffsetDateTime {
    let secs = t
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    time::OffsetDateTime::from_unix_timestamp(secs).unwrap_or(time::OffsetDateTime::UNIX_EPOCH)
}

fn random_serial() -> [u8; 16] {
    use rand::RngCore;
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    // Top bit clear keeps the serial positive when read as a signed bigint,
    // matching common CA practice (and rcgen's own internal expectation).
    bytes[0] &= 0x7f;
    bytes
}

fn generate_rsa_key() -> Result<PrivateKey, PkiError> {
    let mut rng = rand::rngs::OsRng;
    let key = rsa::RsaPrivateKey::new(&mut rng, RSA_KEY_BITS).map_err(|e| PkiError::KeyGen(e.to_string()))?;
    let pkcs8_der = key
        .to_pkcs8_der()
        .map_err(|e| PkiError::KeyGen(e.to_string()))?
        .as_bytes()
        .to_vec();
    let pem = pem::encode(&pem::Pem::new("PRIVATE KEY", pkcs8_der.clone()));
    Ok(PrivateKey { pkcs8_der, pem })
}

fn rcgen_key_pair(key: &PrivateKey) -> Result<KeyPair, PkiError> {
    KeyPair::try_from(key.pkcs8_der.as_slice()).map_err(|e| PkiError::ParseKey(e.to_string()))
}

fn load_private_key(path: &Path) -> Result<PrivateKey, PkiError> {
    let pem_text = std::fs::read_to_string(path).map_err(|source| PkiError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parsed = pem::parse(&pem_text).map_err(|e| PkiError::ParseKey(e.to_string()))?;
    Ok(PrivateKey {
        pkcs8_der: parsed.contents().to_vec(),
        pem: pem_text,
    })
}

fn load_certificate(path: &Path, subject: Subject, is_ca: bool) -> Result<Certificate, PkiError> {
    let pem_text = std::fs::read_to_string(path).map_err(|source| PkiError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parsed = pem::parse(&pem_text).map_err(|e| PkiError::ParseCert(e.to_string()))?;
    Ok(Certificate {
        subject,
        is_ca,
        der: parsed.contents().to_vec(),
        pem: pem_text,
    })
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<(), PkiError> {
    std::fs::write(path, contents).map_err(|source| PkiError::Write {
        path: path.display().to_string(),
        source,
    })?;
    crate::types::set_mode(path, mode)
}
