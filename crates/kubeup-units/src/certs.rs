//! The cluster's local certificate authority, expressed as a Unit (spec §3
//! CertBuilder, §4.9 "inject a CertBuilder unit... late-bound to the master
//! address"). Unlike every other Unit in this crate it owns no cloud state:
//! its `Actual` is always absent and it always renders, the same way
//! [`crate::iam::IamRolePolicyUnit`] always renders a `put_role_policy` —
//! `kubeup_pki::CertificateStore` is itself idempotent (re-opening the same
//! subject returns the existing cert instead of minting a new one), so
//! "always render" just means "always ensure".
//!
//! The issued PEM bundle is shared with the composer through `bundle`
//! rather than stashed on `ClusterConfig`: Units only ever see an immutable
//! [`crate::runctx::RunCtx`], so a `Arc<Mutex<Option<CertBundle>>>` cell
//! handed to both this Unit and the `FuncResource` closures backing
//! `InstanceUnit`/`LaunchConfigurationUnit::user_data` carries the cert
//! bundle across that boundary.

use std::net::IpAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use kubeup_pki::{CertTemplate, CertificateStore, Subject};

use crate::error::UnitsError;
use crate::lifecycle::UnitLifecycle;
use crate::meta::UnitMeta;
use crate::runctx::RunCtx;

/// Every PEM the bootstrap environment embeds (spec §4.11): the CA
/// certificate plus a server cert/key pair for the apiserver and a
/// client cert/key pair for each of the three client identities the
/// original bootstrap scripts provision (kubelet, kube-proxy, kubecfg).
#[derive(Debug, Clone)]
pub struct CertBundle {
    pub ca_cert_pem: String,
    pub master_cert_pem: String,
    pub master_key_pem: String,
    pub kubelet_cert_pem: String,
    pub kubelet_key_pem: String,
    pub kube_proxy_cert_pem: String,
    pub kube_proxy_key_pem: String,
    pub kubecfg_cert_pem: String,
    pub kubecfg_key_pem: String,
}

#[derive(Debug)]
pub struct CertBuilderUnit {
    meta: UnitMeta,
    pki: Arc<CertificateStore>,
    pub dns_domain: String,
    pub service_ip: String,
    pub master_internal_ip: String,
    pub master_elastic_ip_key: Option<String>,
    pub master_public_ip: Option<String>,
    pub extra_sans: Vec<String>,
    pub bundle: Arc<Mutex<Option<CertBundle>>>,
}

impl CertBuilderUnit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        pki: Arc<CertificateStore>,
        dns_domain: String,
        service_ip: String,
        master_internal_ip: String,
        master_elastic_ip_key: Option<String>,
        extra_sans: Vec<String>,
        bundle: Arc<Mutex<Option<CertBundle>>>,
    ) -> Self {
        CertBuilderUnit {
            meta: UnitMeta::new(key),
            pki,
            dns_domain,
            service_ip,
            master_internal_ip,
            master_elastic_ip_key,
            master_public_ip: None,
            extra_sans,
            bundle,
        }
    }

    fn master_template(&self) -> CertTemplate {
        let mut template = CertTemplate::server(Subject::cn("kubernetes-master").with("o", "system:masters"))
            .with_dns_san("kubernetes")
            .with_dns_san("kubernetes.default")
            .with_dns_san("kubernetes.default.svc")
            .with_dns_san(format!("kubernetes.default.svc.{}", self.dns_domain));

        for candidate in self.san_candidates() {
            template = match IpAddr::from_str(&candidate) {
                Ok(ip) => template.with_ip_san(ip),
                Err(_) => template.with_dns_san(candidate),
            };
        }
        template
    }

    fn san_candidates(&self) -> Vec<String> {
        let mut sans = vec![self.master_internal_ip.clone(), self.service_ip.clone()];
        if let Some(ip) = &self.master_public_ip {
            sans.push(ip.clone());
        }
        sans.extend(self.extra_sans.iter().cloned());
        sans
    }

    /// Reuses a subject's key/cert from the store if already issued,
    /// otherwise creates the key and issues a fresh cert against `template`.
    fn get_or_issue(&self, subject: &Subject, template: &CertTemplate) -> Result<(String, String), UnitsError> {
        let key = match self.pki.find_private_key(subject)? {
            Some(k) => k,
            None => self.pki.create_private_key(subject)?,
        };
        let cert = match self.pki.find_cert(subject)? {
            Some(c) => c,
            None => self.pki.issue(&key, template)?,
        };
        Ok((cert.pem().to_string(), key.pem().to_string()))
    }

    fn issue_bundle(&self) -> Result<CertBundle, UnitsError> {
        let master_subject = Subject::cn("kubernetes-master").with("o", "system:masters");
        let (master_cert_pem, master_key_pem) = self.get_or_issue(&master_subject, &self.master_template())?;

        let kubelet_subject = Subject::cn("kubelet").with("o", "system:nodes");
        let (kubelet_cert_pem, kubelet_key_pem) =
            self.get_or_issue(&kubelet_subject, &CertTemplate::client(kubelet_subject.clone()))?;

        let kube_proxy_subject = Subject::cn("kube-proxy");
        let (kube_proxy_cert_pem, kube_proxy_key_pem) =
            self.get_or_issue(&kube_proxy_subject, &CertTemplate::client(kube_proxy_subject.clone()))?;

        let kubecfg_subject = Subject::cn("kubecfg").with("o", "system:masters");
        let (kubecfg_cert_pem, kubecfg_key_pem) =
            self.get_or_issue(&kubecfg_subject, &CertTemplate::client(kubecfg_subject.clone()))?;

        Ok(CertBundle {
            ca_cert_pem: self.pki.ca_cert().pem().to_string(),
            master_cert_pem,
            master_key_pem,
            kubelet_cert_pem,
            kubelet_key_pem,
            kube_proxy_cert_pem,
            kube_proxy_key_pem,
            kubecfg_cert_pem,
            kubecfg_key_pem,
        })
    }
}

impl UnitLifecycle for CertBuilderUnit {
    type Actual = ();
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "CertBuilder"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        self.master_elastic_ip_key.iter().cloned().collect()
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.master_public_ip = self
            .master_elastic_ip_key
            .as_ref()
            .and_then(|k| resolved.get(k))
            .and_then(|r| r.secondary.clone());
    }

    fn find(&self, _ctx: &RunCtx) -> Result<Option<()>, UnitsError> {
        Ok(None)
    }

    fn adopt_observed(&mut self, _actual: &()) {}

    fn diff(&self, _actual: Option<&()>) -> (bool, ()) {
        (true, ())
    }

    fn check_changes(&self, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, _ctx: &RunCtx, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        let issued = self.issue_bundle()?;
        *self.bundle.lock().expect("cert bundle mutex poisoned") = Some(issued);
        Ok(())
    }

    /// Script mode still needs the real PEM bytes baked into the generated
    /// script's `resources/` directory, so issuance happens here too rather
    /// than being deferred to whoever runs the emitted script.
    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        let issued = self.issue_bundle()?;
        sink.materialize_resource("ca.crt", &kubeup_resource::StringResource::new(issued.ca_cert_pem.clone()))?;
        sink.materialize_resource("master.crt", &kubeup_resource::StringResource::new(issued.master_cert_pem.clone()))?;
        sink.materialize_resource("master.key", &kubeup_resource::StringResource::new(issued.master_key_pem.clone()))?;
        *self.bundle.lock().expect("cert bundle mutex poisoned") = Some(issued);
        Ok(())
    }

    /// Dry runs must not touch the filesystem-backed PKI store, so the
    /// bundle stays unpopulated and downstream user-data resources fall
    /// back to a placeholder (spec §4.5 DryRunTarget "no observable side
    /// effects").
    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&()>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issuing_twice_reuses_the_same_master_cert() {
        let dir = tempfile::tempdir().unwrap();
        let pki = Arc::new(CertificateStore::open(dir.path()).unwrap());
        let bundle = Arc::new(Mutex::new(None));
        let unit = CertBuilderUnit::new(
            "certs",
            pki,
            "cluster.local".into(),
            "10.0.0.1".into(),
            "10.0.0.9".into(),
            None,
            Vec::new(),
            bundle,
        );

        let first = unit.issue_bundle().unwrap().master_cert_pem;
        let second = unit.issue_bundle().unwrap().master_cert_pem;
        assert_eq!(first, second);
    }

    #[test]
    fn extra_sans_split_between_dns_and_ip() {
        let dir = tempfile::tempdir().unwrap();
        let pki = Arc::new(CertificateStore::open(dir.path()).unwrap());
        let unit = CertBuilderUnit::new(
            "certs",
            pki,
            "cluster.local".into(),
            "10.0.0.1".into(),
            "10.0.0.9".into(),
            None,
            vec!["extra.example.com".into(), "203.0.113.5".into()],
            Arc::new(Mutex::new(None)),
        );
        let template = unit.master_template();
        assert!(template.san_dns_names.contains(&"extra.example.com".to_string()));
        assert!(template.san_ip_addresses.contains(&IpAddr::from_str("203.0.113.5").unwrap()));
    }
}
