//! Compute-surface Units: SSH key import, the EBS/PD volumes backing etcd,
//! the Elastic IP the master's discovery tag points at, the master
//! instance itself, the master's volume attachment, and the node pool's
//! LaunchConfiguration/AutoscalingGroup pair (spec §3 SSHKey,
//! PersistentVolume, ElasticIP, Instance, LaunchConfiguration,
//! AutoscalingGroup).

use kubeup_cloud::{AutoscalingGroupInfo, InstanceInfo, LaunchConfigurationInfo, SshKeyInfo, VolumeInfo};

use crate::changes::{changed, Tags};
use crate::error::UnitsError;
use crate::lifecycle::UnitLifecycle;
use crate::meta::UnitMeta;
use crate::network::CLUSTER_TAG_KEY;
use crate::runctx::RunCtx;
use crate::sinks::FieldDiff;

#[derive(Debug)]
pub struct SshKeyUnit {
    meta: UnitMeta,
    pub name: String,
    pub public_key_material: Vec<u8>,
}

impl SshKeyUnit {
    pub fn new(key: impl Into<String>, name: String, public_key_material: Vec<u8>) -> Self {
        SshKeyUnit {
            meta: UnitMeta::new(key),
            name,
            public_key_material,
        }
    }
}

impl UnitLifecycle for SshKeyUnit {
    type Actual = SshKeyInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "SshKey"
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

    fn find(&self, ctx: &RunCtx) -> Result<Option<SshKeyInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_ssh_key(&self.name))?)
    }

    fn adopt_observed(&mut self, _actual: &SshKeyInfo) {}

    fn diff(&self, actual: Option<&SshKeyInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    fn check_changes(&self, _actual: Option<&SshKeyInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&SshKeyInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            ctx.block_on(ctx.cloud.import_ssh_key(&self.name, &self.public_key_material))?;
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&SshKeyInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let path = sink.materialize_resource(
                &format!("{}.pub", self.name),
                &kubeup_resource::BytesResource::new(self.public_key_material.clone()),
            )?;
            sink.emit(format!("aws ec2 import-key-pair --key-name {} --public-key-material fileb://{}", self.name, path));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&SshKeyInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

#[derive(Debug)]
pub struct PersistentVolumeUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub name_tag: String,
    pub availability_zone: String,
    pub size_gb: i64,
    pub volume_type: String,
    pub tags: Tags,
    pub id: Option<String>,
}

impl PersistentVolumeUnit {
    pub fn new(
        key: impl Into<String>,
        cluster_id: String,
        name_tag: String,
        availability_zone: String,
        size_gb: i64,
        volume_type: String,
        tags: Tags,
    ) -> Self {
        PersistentVolumeUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            name_tag,
            availability_zone,
            size_gb,
            volume_type,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert("Name".to_string(), self.name_tag.clone());
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

#[derive(Debug, Default)]
pub struct PersistentVolumeChanges {
    pub size_gb: Option<i64>,
}

impl UnitLifecycle for PersistentVolumeUnit {
    type Actual = VolumeInfo;
    type Changes = PersistentVolumeChanges;

    fn unit_type(&self) -> &'static str {
        "PersistentVolume"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: self.id.clone(),
            secondary: None,
        }
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<VolumeInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_volume_by_tag("Name", &self.name_tag))?)
    }

    fn adopt_observed(&mut self, actual: &VolumeInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&VolumeInfo>) -> (bool, PersistentVolumeChanges) {
        let changes = PersistentVolumeChanges {
            size_gb: changed(actual.map(|a| &a.size_gb), &self.size_gb),
        };
        (actual.is_none() || changes.size_gb.is_some(), changes)
    }

    fn check_changes(&self, actual: Option<&VolumeInfo>, changes: &PersistentVolumeChanges) -> Result<(), UnitsError> {
        if let (Some(a), Some(size)) = (actual, changes.size_gb) {
            if size < a.size_gb {
                return Err(UnitsError::ImmutableFieldChanged {
                    unit: self.meta.path().to_string(),
                    field: "size_gb".to_string(),
                    actual: a.size_gb.to_string(),
                    desired: size.to_string(),
                });
            }
        }
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&VolumeInfo>, _changes: &PersistentVolumeChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let created = ctx.block_on(ctx.cloud.create_volume(&self.availability_zone, self.size_gb, &self.volume_type, &self.all_tags()))?;
            self.id = Some(created.id);
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&VolumeInfo>, _changes: &PersistentVolumeChanges) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!(
                "{var}=$(aws ec2 create-volume --availability-zone {} --size {} --volume-type {} --query VolumeId --output text)",
                self.availability_zone, self.size_gb, self.volume_type
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&VolumeInfo>, changes: &PersistentVolumeChanges) {
        let mut fields = Vec::new();
        if let Some(size) = changes.size_gb {
            fields.push(FieldDiff {
                field: "size_gb".to_string(),
                actual: actual.map(|a| a.size_gb.to_string()),
                expected: size.to_string(),
            });
        }
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), fields);
    }
}

/// Resolved through the sentinel-tag relocation in `kubeup_cloud::tags`
/// rather than a direct find-by-tag, since an Elastic IP allocation cannot
/// itself carry tags (spec §3 ElasticIP, §4.9 ordering note).
#[derive(Debug)]
pub struct ElasticIpUnit {
    meta: UnitMeta,
    pub sentinel_key: String,
    pub sentinel_resource_id: Option<String>,
    pub tag_key: String,
    pub allocation_id: Option<String>,
    pub public_ip: Option<String>,
}

impl ElasticIpUnit {
    pub fn new(key: impl Into<String>, sentinel_key: String, tag_key: String) -> Self {
        ElasticIpUnit {
            meta: UnitMeta::new(key),
            sentinel_key,
            sentinel_resource_id: None,
            tag_key,
            allocation_id: None,
            public_ip: None,
        }
    }
}

impl UnitLifecycle for ElasticIpUnit {
    type Actual = kubeup_cloud::ElasticIpInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "ElasticIp"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.sentinel_key.clone()]
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: self.allocation_id.clone(),
            secondary: self.public_ip.clone(),
        }
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.sentinel_resource_id = resolved.get(&self.sentinel_key).and_then(|r| r.id.clone());
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<kubeup_cloud::ElasticIpInfo>, UnitsError> {
        let sentinel = match &self.sentinel_resource_id {
            Some(id) => id,
            None => return Ok(None),
        };
        Ok(ctx.block_on(kubeup_cloud::find_elastic_ip_via_sentinel(ctx.cloud.as_ref(), sentinel, &self.tag_key))?)
    }

    fn adopt_observed(&mut self, actual: &kubeup_cloud::ElasticIpInfo) {
        self.allocation_id = Some(actual.allocation_id.clone());
        self.public_ip = Some(actual.public_ip.clone());
    }

    fn diff(&self, actual: Option<&kubeup_cloud::ElasticIpInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    fn check_changes(&self, _actual: Option<&kubeup_cloud::ElasticIpInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&kubeup_cloud::ElasticIpInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let sentinel = self.sentinel_resource_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "sentinel_resource_id".to_string(),
            })?;
            let allocated = ctx.block_on(kubeup_cloud::ensure_elastic_ip(ctx.cloud.as_ref(), sentinel, &self.tag_key))?;
            self.allocation_id = Some(allocated.allocation_id);
            self.public_ip = Some(allocated.public_ip);
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&kubeup_cloud::ElasticIpInfo>, _changes: &()) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!("{var}=$(aws ec2 allocate-address --query PublicIp --output text)"));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().public_ip));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&kubeup_cloud::ElasticIpInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

#[derive(Debug)]
pub struct InstanceUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub name_tag: String,
    pub image_id: String,
    pub instance_type: String,
    pub subnet_key: String,
    pub subnet_id: Option<String>,
    pub security_group_keys: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub ssh_key_key: String,
    pub key_name: Option<String>,
    pub user_data: Box<dyn kubeup_resource::Resource>,
    pub instance_profile_key: String,
    pub iam_instance_profile: Option<String>,
    pub elastic_ip_key: Option<String>,
    pub elastic_ip_allocation_id: Option<String>,
    pub tags: Tags,
    pub id: Option<String>,
}

impl InstanceUnit {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        cluster_id: String,
        name_tag: String,
        image_id: String,
        instance_type: String,
        subnet_key: String,
        security_group_keys: Vec<String>,
        ssh_key_key: String,
        user_data: Box<dyn kubeup_resource::Resource>,
        instance_profile_key: String,
        elastic_ip_key: Option<String>,
        tags: Tags,
    ) -> Self {
        InstanceUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            name_tag,
            image_id,
            instance_type,
            subnet_key,
            subnet_id: None,
            security_group_keys,
            security_group_ids: Vec::new(),
            ssh_key_key,
            key_name: None,
            user_data,
            instance_profile_key,
            iam_instance_profile: None,
            elastic_ip_key,
            elastic_ip_allocation_id: None,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert("Name".to_string(), self.name_tag.clone());
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

impl UnitLifecycle for InstanceUnit {
    type Actual = InstanceInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "Instance"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        let mut deps = vec![self.subnet_key.clone(), self.ssh_key_key.clone(), self.instance_profile_key.clone()];
        deps.extend(self.security_group_keys.iter().cloned());
        if let Some(k) = &self.elastic_ip_key {
            deps.push(k.clone());
        }
        deps
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: self.id.clone(),
            secondary: None,
        }
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.subnet_id = resolved.get(&self.subnet_key).and_then(|r| r.id.clone());
        self.security_group_ids = self
            .security_group_keys
            .iter()
            .filter_map(|k| resolved.get(k).and_then(|r| r.id.clone()))
            .collect();
        self.key_name = resolved.get(&self.ssh_key_key).and_then(|r| r.secondary.clone());
        self.iam_instance_profile = resolved.get(&self.instance_profile_key).and_then(|r| r.secondary.clone());
        self.elastic_ip_allocation_id = self
            .elastic_ip_key
            .as_ref()
            .and_then(|k| resolved.get(k))
            .and_then(|r| r.id.clone());
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<InstanceInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_instance_by_tag("Name", &self.name_tag))?)
    }

    fn adopt_observed(&mut self, actual: &InstanceInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&InstanceInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    fn check_changes(&self, _actual: Option<&InstanceInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&InstanceInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let subnet_id = self.subnet_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "subnet_id".to_string(),
            })?;
            let key_name = self.key_name.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "key_name".to_string(),
            })?;
            let iam_instance_profile = self.iam_instance_profile.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "iam_instance_profile".to_string(),
            })?;
            let user_data = kubeup_resource::as_bytes(self.user_data.as_ref())?;
            let created = ctx.block_on(ctx.cloud.run_instance(
                &self.image_id,
                &self.instance_type,
                subnet_id,
                &self.security_group_ids,
                key_name,
                &user_data,
                iam_instance_profile,
                &self.all_tags(),
            ))?;
            self.id = Some(created.id);
        }
        if let Some(allocation_id) = &self.elastic_ip_allocation_id {
            let instance_id = self.id.as_deref().expect("instance id set above");
            ctx.block_on(ctx.cloud.associate_elastic_ip(instance_id, allocation_id))?;
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&InstanceInfo>, _changes: &()) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            let path = sink.materialize_resource(&format!("{}-user-data", self.name_tag), self.user_data.as_ref())?;
            sink.emit(format!(
                "{var}=$(aws ec2 run-instances --image-id {} --instance-type {} --subnet-id ${{{}_SUBNET}} --key-name ${{{}_SSHKEY}} --iam-instance-profile Name=${{{}_INSTANCEPROFILE}} --user-data file://{} --query Instances[0].InstanceId --output text)",
                self.image_id,
                self.instance_type,
                self.subnet_key.to_uppercase(),
                self.ssh_key_key.to_uppercase(),
                self.instance_profile_key.to_uppercase(),
                path
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        if let Some(k) = &self.elastic_ip_key {
            sink.emit(format!(
                "aws ec2 associate-address --instance-id ${var} --allocation-id ${{{}_ELASTICIP}}",
                k.to_uppercase()
            ));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&InstanceInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

#[derive(Debug)]
pub struct VolumeAttachmentUnit {
    meta: UnitMeta,
    pub instance_key: String,
    pub instance_id: Option<String>,
    pub volume_key: String,
    pub volume_id: Option<String>,
    pub device: String,
}

impl VolumeAttachmentUnit {
    pub fn new(key: impl Into<String>, instance_key: String, volume_key: String, device: String) -> Self {
        VolumeAttachmentUnit {
            meta: UnitMeta::new(key),
            instance_key,
            instance_id: None,
            volume_key,
            volume_id: None,
            device,
        }
    }
}

impl UnitLifecycle for VolumeAttachmentUnit {
    type Actual = ();
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "VolumeAttachment"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.instance_key.clone(), self.volume_key.clone()]
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.instance_id = resolved.get(&self.instance_key).and_then(|r| r.id.clone());
        self.volume_id = resolved.get(&self.volume_key).and_then(|r| r.id.clone());
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
        let instance_id = self.instance_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "instance_id".to_string(),
        })?;
        let volume_id = self.volume_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "volume_id".to_string(),
        })?;
        ctx.block_on(ctx.cloud.attach_volume(instance_id, volume_id, &self.device))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        sink.emit(format!(
            "aws ec2 attach-volume --instance-id ${{{}_INSTANCE}} --volume-id ${{{}_PERSISTENTVOLUME}} --device {}",
            self.instance_key.to_uppercase(),
            self.volume_key.to_uppercase(),
            self.device
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&()>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}

#[derive(Debug)]
pub struct LaunchConfigurationUnit {
    meta: UnitMeta,
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    pub security_group_keys: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub ssh_key_key: String,
    pub key_name: Option<String>,
    pub user_data: Box<dyn kubeup_resource::Resource>,
    pub instance_profile_key: String,
    pub iam_instance_profile: Option<String>,
}

impl LaunchConfigurationUnit {
    pub fn new(
        key: impl Into<String>,
        name: String,
        image_id: String,
        instance_type: String,
        security_group_keys: Vec<String>,
        ssh_key_key: String,
        user_data: Box<dyn kubeup_resource::Resource>,
        instance_profile_key: String,
    ) -> Self {
        LaunchConfigurationUnit {
            meta: UnitMeta::new(key),
            name,
            image_id,
            instance_type,
            security_group_keys,
            security_group_ids: Vec::new(),
            ssh_key_key,
            key_name: None,
            user_data,
            instance_profile_key,
            iam_instance_profile: None,
        }
    }
}

impl UnitLifecycle for LaunchConfigurationUnit {
    type Actual = LaunchConfigurationInfo;
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "LaunchConfiguration"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        let mut deps = vec![self.ssh_key_key.clone(), self.instance_profile_key.clone()];
        deps.extend(self.security_group_keys.iter().cloned());
        deps
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: None,
            secondary: Some(self.name.clone()),
        }
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.security_group_ids = self
            .security_group_keys
            .iter()
            .filter_map(|k| resolved.get(k).and_then(|r| r.id.clone()))
            .collect();
        self.key_name = resolved.get(&self.ssh_key_key).and_then(|r| r.secondary.clone());
        self.iam_instance_profile = resolved.get(&self.instance_profile_key).and_then(|r| r.secondary.clone());
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<LaunchConfigurationInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_launch_configuration(&self.name))?)
    }

    fn adopt_observed(&mut self, _actual: &LaunchConfigurationInfo) {}

    fn diff(&self, actual: Option<&LaunchConfigurationInfo>) -> (bool, ()) {
        (actual.is_none(), ())
    }

    /// Launch configurations are immutable by design in the underlying API:
    /// any field change means a new, differently-named configuration, never
    /// an in-place update — so the composer is responsible for picking a
    /// fresh `name` when the desired shape changes (spec §9 design note).
    fn check_changes(&self, _actual: Option<&LaunchConfigurationInfo>, _changes: &()) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&LaunchConfigurationInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let key_name = self.key_name.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "key_name".to_string(),
            })?;
            let iam_instance_profile = self.iam_instance_profile.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "iam_instance_profile".to_string(),
            })?;
            let user_data = kubeup_resource::as_bytes(self.user_data.as_ref())?;
            ctx.block_on(ctx.cloud.create_launch_configuration(
                &self.name,
                &self.image_id,
                &self.instance_type,
                &self.security_group_ids,
                key_name,
                &user_data,
                iam_instance_profile,
            ))?;
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&LaunchConfigurationInfo>, _changes: &()) -> Result<(), UnitsError> {
        if actual.is_none() {
            let path = sink.materialize_resource(&format!("{}-user-data", self.name), self.user_data.as_ref())?;
            sink.emit(format!(
                "aws autoscaling create-launch-configuration --launch-configuration-name {} --image-id {} --instance-type {} --key-name ${{{}_SSHKEY}} --iam-instance-profile ${{{}_INSTANCEPROFILE}} --user-data file://{}",
                self.name,
                self.image_id,
                self.instance_type,
                self.ssh_key_key.to_uppercase(),
                self.instance_profile_key.to_uppercase(),
                path
            ));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&LaunchConfigurationInfo>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), Vec::new());
    }
}

#[derive(Debug)]
pub struct AutoscalingGroupUnit {
    meta: UnitMeta,
    pub name: String,
    pub launch_configuration_key: String,
    pub launch_configuration_name: Option<String>,
    pub min_size: i32,
    pub max_size: i32,
    pub desired_capacity: i32,
    pub subnet_keys: Vec<String>,
    pub subnet_ids: Vec<String>,
}

impl AutoscalingGroupUnit {
    pub fn new(
        key: impl Into<String>,
        name: String,
        launch_configuration_key: String,
        min_size: i32,
        max_size: i32,
        desired_capacity: i32,
        subnet_keys: Vec<String>,
    ) -> Self {
        AutoscalingGroupUnit {
            meta: UnitMeta::new(key),
            name,
            launch_configuration_key,
            launch_configuration_name: None,
            min_size,
            max_size,
            desired_capacity,
            subnet_keys,
            subnet_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AutoscalingGroupChanges {
    pub min_size: Option<i32>,
    pub max_size: Option<i32>,
    pub desired_capacity: Option<i32>,
}

impl UnitLifecycle for AutoscalingGroupUnit {
    type Actual = AutoscalingGroupInfo;
    type Changes = AutoscalingGroupChanges;

    fn unit_type(&self) -> &'static str {
        "AutoscalingGroup"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        let mut deps = vec![self.launch_configuration_key.clone()];
        deps.extend(self.subnet_keys.iter().cloned());
        deps
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.launch_configuration_name = resolved.get(&self.launch_configuration_key).and_then(|r| r.secondary.clone());
        self.subnet_ids = self
            .subnet_keys
            .iter()
            .filter_map(|k| resolved.get(k).and_then(|r| r.id.clone()))
            .collect();
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<AutoscalingGroupInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_autoscaling_group(&self.name))?)
    }

    fn adopt_observed(&mut self, _actual: &AutoscalingGroupInfo) {}

    fn diff(&self, actual: Option<&AutoscalingGroupInfo>) -> (bool, AutoscalingGroupChanges) {
        let changes = AutoscalingGroupChanges {
            min_size: changed(actual.map(|a| &a.min_size), &self.min_size),
            max_size: changed(actual.map(|a| &a.max_size), &self.max_size),
            desired_capacity: changed(actual.map(|a| &a.desired_capacity), &self.desired_capacity),
        };
        let any = changes.min_size.is_some() || changes.max_size.is_some() || changes.desired_capacity.is_some();
        (actual.is_none() || any, changes)
    }

    fn check_changes(&self, _actual: Option<&AutoscalingGroupInfo>, _changes: &AutoscalingGroupChanges) -> Result<(), UnitsError> {
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&AutoscalingGroupInfo>, _changes: &AutoscalingGroupChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let launch_configuration_name = self.launch_configuration_name.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "launch_configuration_name".to_string(),
            })?;
            ctx.block_on(ctx.cloud.create_autoscaling_group(
                &self.name,
                launch_configuration_name,
                self.min_size,
                self.max_size,
                self.desired_capacity,
                &self.subnet_ids,
            ))?;
        }
        // Scaling an existing group to new min/max/desired values is left
        // to the next `create cluster` run against the freshly observed
        // actual: there is no `update_autoscaling_group` on `CloudAdapter`
        // yet (spec §3 AutoscalingGroup Non-goals — in-place resize is out
        // of scope for this pass).
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&AutoscalingGroupInfo>, _changes: &AutoscalingGroupChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let subnet_vars: Vec<String> = self.subnet_keys.iter().map(|k| format!("${{{}_SUBNET}}", k.to_uppercase())).collect();
            sink.emit(format!(
                "aws autoscaling create-auto-scaling-group --auto-scaling-group-name {} --launch-configuration-name ${{{}_LAUNCHCONFIGURATION}} --min-size {} --max-size {} --desired-capacity {} --vpc-zone-identifier {}",
                self.name,
                self.launch_configuration_key.to_uppercase(),
                self.min_size,
                self.max_size,
                self.desired_capacity,
                subnet_vars.join(",")
            ));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&AutoscalingGroupInfo>, changes: &AutoscalingGroupChanges) {
        let mut fields = Vec::new();
        if let Some(v) = changes.min_size {
            fields.push(FieldDiff { field: "min_size".to_string(), actual: actual.map(|a| a.min_size.to_string()), expected: v.to_string() });
        }
        if let Some(v) = changes.max_size {
            fields.push(FieldDiff { field: "max_size".to_string(), actual: actual.map(|a| a.max_size.to_string()), expected: v.to_string() });
        }
        if let Some(v) = changes.desired_capacity {
            fields.push(FieldDiff { field: "desired_capacity".to_string(), actual: actual.map(|a| a.desired_capacity.to_string()), expected: v.to_string() });
        }
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_volume_shrink_is_rejected() {
        let unit = PersistentVolumeUnit::new("pv", "test".into(), "test-etcd".into(), "us-east-1a".into(), 10, "gp3".into(), Tags::new());
        let actual = VolumeInfo {
            id: "vol-1".into(),
            availability_zone: "us-east-1a".into(),
            size_gb: 20,
            volume_type: "gp3".into(),
            tags: Tags::new(),
        };
        let (changed, changes) = unit.diff(Some(&actual));
        assert!(changed);
        assert!(unit.check_changes(Some(&actual), &changes).is_err());
    }

    #[test]
    fn persistent_volume_grow_is_allowed() {
        let unit = PersistentVolumeUnit::new("pv", "test".into(), "test-etcd".into(), "us-east-1a".into(), 30, "gp3".into(), Tags::new());
        let actual = VolumeInfo {
            id: "vol-1".into(),
            availability_zone: "us-east-1a".into(),
            size_gb: 20,
            volume_type: "gp3".into(),
            tags: Tags::new(),
        };
        let (changed, changes) = unit.diff(Some(&actual));
        assert!(changed);
        assert!(unit.check_changes(Some(&actual), &changes).is_ok());
    }
}
