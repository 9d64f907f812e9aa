//! The run protocol every concrete Unit type shares (spec §4.3): find the
//! live resource, diff it against what's declared, reject illegal changes
//! to immutable fields, then render through whichever mode the caller
//! selected. Concrete Unit types implement the type-specific hooks; `run`
//! itself is written once.

use std::collections::HashMap;

use crate::error::UnitsError;
use crate::meta::UnitMeta;
use crate::sinks::{DryRunSink, ScriptSink};

/// Which of the three Target kinds (spec §4.4) a render call is bound for.
pub enum RenderMode<'a> {
    Live,
    Script(&'a mut dyn ScriptSink),
    DryRun(&'a mut dyn DryRunSink),
}

/// What a Unit exposes about itself once run, for Units that reference it
/// by key to pick up (spec §3: a Unit's fields may be "a reference to
/// another Unit", resolved by identity rather than by value). `id` is the
/// provider-assigned identifier (VPC id, subnet id, instance id, ...);
/// `secondary` carries the one extra value a handful of Unit kinds need
/// (an ElasticIP's public IP, an SshKey's `key_name`, an IamRole/
/// InstanceProfile's name).
#[derive(Debug, Clone, Default)]
pub struct ResolvedId {
    pub id: Option<String>,
    pub secondary: Option<String>,
}

pub trait UnitLifecycle {
    type Actual: Clone;
    type Changes: Default;

    fn unit_type(&self) -> &'static str;
    fn meta(&self) -> &UnitMeta;
    fn meta_mut(&mut self) -> &mut UnitMeta;

    /// Keys of other Units this one's desired state reads from (spec §3
    /// pre-order-precedes-referrer invariant).
    fn depends_on(&self) -> Vec<String> {
        Vec::new()
    }

    /// What this Unit has resolved about itself by the time it next runs
    /// (before the first run, whatever was set by the composer).
    fn resolved_id(&self) -> ResolvedId {
        ResolvedId::default()
    }

    /// Copies the ids/names this Unit's fields reference by key out of
    /// `resolved` (keyed by the referent's [`UnitMeta::key`]) onto itself.
    /// Called by `kubeup-graph` immediately before `run`, once every
    /// dependency named in `depends_on` has already run (spec §3 ordering
    /// invariant guarantees they precede this Unit in the resolved map).
    fn resolve_refs(&mut self, _resolved: &HashMap<String, ResolvedId>) {}

    fn find(&self, ctx: &crate::runctx::RunCtx) -> Result<Option<Self::Actual>, UnitsError>;

    /// Copies server-assigned identifiers (ids, ARNs, self-links) the Unit
    /// didn't declare back onto itself, so later Units that reference this
    /// one by key can read them (spec §4.3 "adopt observed identity").
    fn adopt_observed(&mut self, actual: &Self::Actual);

    fn diff(&self, actual: Option<&Self::Actual>) -> (bool, Self::Changes);

    fn check_changes(
        &self,
        actual: Option<&Self::Actual>,
        changes: &Self::Changes,
    ) -> Result<(), UnitsError>;

    fn render_live(
        &mut self,
        ctx: &crate::runctx::RunCtx,
        actual: Option<&Self::Actual>,
        changes: &Self::Changes,
    ) -> Result<(), UnitsError>;

    fn render_script(
        &self,
        sink: &mut dyn ScriptSink,
        actual: Option<&Self::Actual>,
        changes: &Self::Changes,
    ) -> Result<(), UnitsError>;

    fn render_dryrun(
        &self,
        sink: &mut dyn DryRunSink,
        actual: Option<&Self::Actual>,
        changes: &Self::Changes,
    );

    fn run(&mut self, ctx: &crate::runctx::RunCtx, mode: &mut RenderMode) -> Result<bool, UnitsError> {
        let actual = self.find(ctx)?;
        if let Some(a) = &actual {
            self.adopt_observed(a);
        }
        let (changed, changes) = self.diff(actual.as_ref());
        if !changed {
            return Ok(false);
        }
        self.check_changes(actual.as_ref(), &changes)?;
        match mode {
            RenderMode::Live => self.render_live(ctx, actual.as_ref(), &changes)?,
            RenderMode::Script(sink) => self.render_script(*sink, actual.as_ref(), &changes)?,
            RenderMode::DryRun(sink) => self.render_dryrun(*sink, actual.as_ref(), &changes),
        }
        Ok(true)
    }
}
