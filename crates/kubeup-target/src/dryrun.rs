//! Reports what a run *would* do without touching the cloud (spec §4.5
//! DryRunTarget, grounded on `pkg/fi/dryrun_target.go`'s `PrintReport`).

use std::collections::HashMap;
use std::sync::Mutex;

use kubeup_resource::{HashAlgorithm, Resource, ResourcePutter};
use kubeup_units::{DryRunSink, FieldDiff, UnitsError};

struct RecordedChange {
    unit_type: String,
    path: String,
    is_create: bool,
    fields: Vec<FieldDiff>,
}

/// A `ResourcePutter` that never uploads: it records the key+hash and
/// returns a `dryrun://` placeholder URL, the same contract
/// `dryrun_target.go`'s `PutResource` has.
struct DryRunFileStore {
    uploads: Mutex<HashMap<String, String>>,
}

impl ResourcePutter for DryRunFileStore {
    fn identity(&self) -> usize {
        self as *const Self as usize
    }

    fn put(
        &self,
        key: &str,
        resource: &dyn Resource,
        hash_algorithm: HashAlgorithm,
    ) -> Result<(String, String), kubeup_resource::ResourceError> {
        let hash = kubeup_resource::hash_resource(resource, hash_algorithm)?;
        self.uploads
            .lock()
            .expect("dry-run upload map mutex poisoned")
            .insert(format!("{key}:{hash}"), hash.clone());
        Ok((format!("dryrun://{key}"), hash))
    }
}

pub struct DryRunTarget {
    store: DryRunFileStore,
    changes: Vec<RecordedChange>,
}

impl Default for DryRunTarget {
    fn default() -> Self {
        DryRunTarget {
            store: DryRunFileStore { uploads: Mutex::new(HashMap::new()) },
            changes: Vec::new(),
        }
    }
}

impl DryRunTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the three-section report exactly as `PrintReport` does:
    /// planned uploads, then newly created Units, then Units with field
    /// changes against an existing actual.
    pub fn report(&self) -> String {
        let mut out = String::new();

        let uploads = self.store.uploads.lock().expect("dry-run upload map mutex poisoned");
        if !uploads.is_empty() {
            out.push_str("Upload resources:\n");
            for (key_and_hash, hash) in uploads.iter() {
                let key = key_and_hash.rsplit_once(':').map(|(k, _)| k).unwrap_or(key_and_hash);
                out.push_str(&format!("  {key}\t{hash}\n"));
            }
        }
        drop(uploads);

        if !self.changes.is_empty() {
            out.push_str("Created resources:\n");
            for change in self.changes.iter().filter(|c| c.is_create) {
                out.push_str(&format!("  {}\t{}\n", change.unit_type, change.path));
            }

            out.push_str("Changed resources:\n");
            for change in self.changes.iter().filter(|c| !c.is_create) {
                if change.fields.is_empty() {
                    continue;
                }
                out.push_str(&format!("  {}\t{}\n", change.unit_type, change.path));
                for field in &change.fields {
                    let actual = field.actual.as_deref().unwrap_or("<nil>");
                    out.push_str(&format!("    {} {} -> {}\n", field.field, actual, field.expected));
                }
                out.push('\n');
            }
        }

        out
    }
}

impl DryRunSink for DryRunTarget {
    fn record_change(&mut self, unit_type: &str, path: &str, is_create: bool, fields: Vec<FieldDiff>) {
        self.changes.push(RecordedChange {
            unit_type: unit_type.to_string(),
            path: path.to_string(),
            is_create,
            fields,
        });
    }

    fn put_resource(
        &mut self,
        key: &str,
        resource: &dyn Resource,
        hash_algorithm: HashAlgorithm,
    ) -> Result<(String, String), UnitsError> {
        Ok(self.store.put(key, resource, hash_algorithm)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubeup_resource::StringResource;

    #[test]
    fn created_resources_listed_separately_from_changed() {
        let mut target = DryRunTarget::new();
        target.record_change("Vpc", "vpc", true, Vec::new());
        target.record_change(
            "Subnet",
            "vpc/subnet",
            false,
            vec![FieldDiff { field: "cidr".into(), actual: Some("10.0.0.0/24".into()), expected: "10.0.1.0/24".into() }],
        );
        let report = target.report();
        assert!(report.contains("Created resources:\n  Vpc\tvpc\n"));
        assert!(report.contains("Changed resources:\n  Subnet\tvpc/subnet\n"));
        assert!(report.contains("cidr 10.0.0.0/24 -> 10.0.1.0/24"));
    }

    #[test]
    fn unchanged_units_are_not_reported() {
        let mut target = DryRunTarget::new();
        target.record_change("Subnet", "vpc/subnet", false, Vec::new());
        let report = target.report();
        assert!(!report.contains("vpc/subnet"));
    }

    #[test]
    fn put_resource_records_upload_without_a_real_store() {
        let mut target = DryRunTarget::new();
        let (url, _hash) = target.put_resource("bootstrap", &StringResource::new("data"), HashAlgorithm::Sha256).unwrap();
        assert_eq!(url, "dryrun://bootstrap");
        assert!(target.report().starts_with("Upload resources:\n  bootstrap\t"));
    }
}
