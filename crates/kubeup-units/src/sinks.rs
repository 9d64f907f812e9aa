//! The two narrow traits a Unit's non-live render methods write into.
//! Concrete implementations (`ScriptTarget`, `DryRunTarget`) live in
//! `kubeup-target`, which depends on this crate — not the other way
//! around, so a Unit type never needs to know about Targets (spec §4.4).

use kubeup_resource::Resource;

/// What [`crate::Unit::render_script`] writes into (spec §4.5 ScriptTarget):
/// one shell command per call, with a per-unit-type variable namespace so
/// later commands can reference earlier outputs by name.
pub trait ScriptSink {
    /// Allocates (or returns the existing) `TYPE_N` shell variable name for
    /// this unit's type, per spec §4.5 "`TYPE_N` where `N` is a per-type
    /// counter".
    fn variable_for(&mut self, unit_type: &str, path: &str) -> String;

    /// Appends one command line to the script.
    fn emit(&mut self, command: String);

    /// Materialises a local file resource under `resources/` and returns
    /// the path the emitted command should reference (spec §4.5 "Local
    /// file resources are materialised under a `resources/` directory").
    fn materialize_resource(&mut self, name: &str, resource: &dyn Resource) -> Result<String, crate::error::UnitsError>;
}

/// One renderable field-level change, as `DryRunTarget`'s report needs it
/// (spec §4.5 "field-by-field diff of primitive or HasID-sensitive
/// values").
#[derive(Debug, Clone)]
pub struct FieldDiff {
    pub field: String,
    pub actual: Option<String>,
    pub expected: String,
}

/// What [`crate::Unit::render_dryrun`] writes into (spec §4.5 DryRunTarget):
/// one record per render call, to be grouped into "upload resources" /
/// "created resources" / "changed resources" at report time.
pub trait DryRunSink {
    fn record_change(&mut self, unit_type: &str, path: &str, is_create: bool, fields: Vec<FieldDiff>);

    /// Resolves a `Downloadable` through the sink's own (non-uploading)
    /// `FileStore` so uploads are recorded, not issued (spec §4.5).
    fn put_resource(
        &mut self,
        key: &str,
        resource: &dyn Resource,
        hash_algorithm: kubeup_resource::HashAlgorithm,
    ) -> Result<(String, String), crate::error::UnitsError>;
}
