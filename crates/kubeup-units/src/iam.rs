//! IAM Units: the role masters/nodes assume, the policy document attached
//! to it, and the instance profile instances launch with (spec §3
//! IAMRole, IAMInstanceProfile).

use kubeup_cloud::{IamRoleInfo, InstanceProfileInfo};

use crate::changes::changed;
use crate::error::UnitsError;
use crate::lifecycle::UnitLifecycle;
use crate::meta::UnitMeta;
use crate::runctx::RunCtx;
use crate::sinks::FieldDiff;

#[derive(Debug)]
pub struct IamRoleUnit {
    meta: UnitMeta,
    pub name: String,
    pub assume_role_policy_document: String,
}

impl IamRoleUnit {
    pub fn new(key: impl Into<String>, name: String, assume_role_policy_document: String) -> Self {
        IamRoleUnit {
            meta: UnitMeta::new(key),
            name,
            assume_role_policy_document,
        }
    }
}

#[derive(Debug, Default)]
pub struct IamRoleChanges {
    pub assume_role_policy_document: Option<String>,
}

impl UnitLifecycle for IamRoleUnit {
    type Actual = IamRoleInfo;
    type Changes = IamRoleChanges;

    fn unit_type(&self) -> &'static str {
        "IamRole"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: None,
            secondary: Some(self.name.clone()),
        }
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<IamRoleInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_iam_role(&self.name))?)
    }

    fn adopt_observed(&mut self, _actual: &IamRoleInfo) {}

    fn diff(&self, actual: Option<&IamRoleInfo>) -> (bool, IamRoleChanges) {
        let changes = IamRoleChanges {
            assume_role_policy_document: changed(
                actual.map(|a| &a.assume_role_policy_document),
                &self.assume_role_policy_document,
            ),
        };
        (actual.is_none() || changes.assume_role_policy_document.is_some(), changes)
    }

    fn check_changes(&self, _actual: Option<&IamRoleInfo>, _changes: &IamRoleChanges) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&IamRoleInfo>, _changes: &IamRoleChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            ctx.block_on(ctx.cloud.create_iam_role(&self.name, &self.assume_role_policy_document))?;
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&IamRoleInfo>, _changes: &IamRoleChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let path = sink.materialize_resource(
                &format!("{}-assume-role-policy.json", self.name),
                &kubeup_resource::StringResource::new(self.assume_role_policy_document.clone()),
            )?;
            sink.emit(format!(
                "aws iam create-role --role-name {} --assume-role-policy-document file://{}",
                self.name, path
            ));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&IamRoleInfo>, changes: &IamRoleChanges) {
        let mut fields = Vec::new();
        if let Some(doc) = &changes.assume_role_policy_document {
            fields.push(FieldDiff {
                field: "assume_role_policy_document".to_string(),
                actual: actual.map(|a| a.assume_role_policy_document.clone()),
                expected: doc.clone(),
            });
        }
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), fields);
    }
}

/// `put_role_policy` is idempotent (it replaces the named policy wholesale)
/// so this Unit has no meaningful `Actual` to diff against and always
/// renders, matching `pkg/fi`'s treatment of `IAMRolePolicy`.
#[derive(Debug)]
pub struct IamRolePolicyUnit {
    meta: UnitMeta,
    pub role_key: String,
    pub role_name: String,
    pub policy_name: String,
    pub policy_document: String,
}

impl IamRolePolicyUnit {
    pub fn new(key: impl Into<String>, role_key: String, role_name: String, policy_name: String, policy_document: String) -> Self {
        IamRolePolicyUnit {
            meta: UnitMeta::new(key),
            role_key,
            role_name,
            policy_name,
            policy_document,
        }
    }
}

impl UnitLifecycle for IamRolePolicyUnit {
    type Actual = ();
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "IamRolePolicy"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.role_key.clone()]
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

    fn render_live(&mut self, ctx: &RunCtx, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        ctx.block_on(ctx.cloud.put_role_policy(&self.role_name, &self.policy_name, &self.policy_document))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        let path = sink.materialize_resource(
            &format!("{}-policy.json", self.policy_name),
            &kubeup_resource::StringResource::new(self.policy_document.clone()),
        )?;
        sink.emit(format!(
            "aws iam put-role-policy --role-name {} --policy-name {} --policy-document file://{}",
            self.role_name, self.policy_name, path
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&()>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}

#[derive(Debug)]
pub struct InstanceProfileUnit {
    meta: UnitMeta,
    pub name: String,
    pub role_key: String,
    pub role_name: String,
}

impl InstanceProfileUnit {
    pub fn new(key: impl Into<String>, name: String, role_key: String, role_name: String) -> Self {
        InstanceProfileUnit {
            meta: UnitMeta::new(key),
            name,
            role_key,
            role_name,
        }
    }
}

impl UnitLifecycle for InstanceProfileUnit {
    type Actual = InstanceProfileInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "InstanceProfile"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.role_key.clone()]
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: None,
            secondary: Some(self.name.clone()),
        }
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<InstanceProfileInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_instance_profile(&self.name))?)
    }

    fn adopt_observed(&mut self, _actual: &InstanceProfileInfo) {}

    fn diff(&self, actual: Option<&InstanceProfileInfo>) -> (bool, ()) {
        let has_role = actual.is_some_and(|a| a.roles.iter().any(|r| r == &self.role_name));
        (actual.is_none() || !has_role, ())
    }

    fn check_changes(&self, _actual: Option<&InstanceProfileInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&InstanceProfileInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            ctx.block_on(ctx.cloud.create_instance_profile(&self.name))?;
        }
        let has_role = actual.is_some_and(|a| a.roles.iter().any(|r| r == &self.role_name));
        if !has_role {
            ctx.block_on(ctx.cloud.add_role_to_instance_profile(&self.name, &self.role_name))?;
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&InstanceProfileInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            sink.emit(format!("aws iam create-instance-profile --instance-profile-name {}", self.name));
        }
        sink.emit(format!(
            "aws iam add-role-to-instance-profile --instance-profile-name {} --role-name {}",
            self.name, self.role_name
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&InstanceProfileInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}
