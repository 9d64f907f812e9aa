//! VPC-level networking Units, grounded on `kubeup_cloud`'s `Vpc`/`Subnet`
//! shaped `CloudAdapter` surface (spec §3 VPC, DHCPOptions, Subnet).

use kubeup_cloud::{DhcpOptionsInfo, SubnetInfo, VpcInfo};

use crate::changes::{changed, changed_opt, changed_ref, Tags};
use crate::error::UnitsError;
use crate::lifecycle::{RenderMode, UnitLifecycle};
use crate::meta::UnitMeta;
use crate::runctx::RunCtx;
use crate::sinks::FieldDiff;

pub const CLUSTER_TAG_KEY: &str = "KubernetesCluster";
pub const NAME_TAG_KEY: &str = "Name";

#[derive(Debug)]
pub struct VpcUnit {
    meta: UnitMeta,
    pub name_tag: String,
    pub cluster_id: String,
    pub cidr: String,
    pub tags: Tags,
    pub id: Option<String>,
}

impl VpcUnit {
    pub fn new(key: impl Into<String>, name_tag: String, cluster_id: String, cidr: String, tags: Tags) -> Self {
        VpcUnit {
            meta: UnitMeta::new(key),
            name_tag,
            cluster_id,
            cidr,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert(NAME_TAG_KEY.to_string(), self.name_tag.clone());
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

#[derive(Debug, Default)]
pub struct VpcChanges {
    pub cidr: Option<String>,
    pub tags: Option<Tags>,
}

impl UnitLifecycle for VpcUnit {
    type Actual = VpcInfo;
    type Changes = VpcChanges;

    fn unit_type(&self) -> &'static str {
        "Vpc"
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

    fn find(&self, ctx: &RunCtx) -> Result<Option<VpcInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_vpc_by_tag(CLUSTER_TAG_KEY, &self.cluster_id))?)
    }

    fn adopt_observed(&mut self, actual: &VpcInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&VpcInfo>) -> (bool, VpcChanges) {
        let changes = VpcChanges {
            cidr: changed(actual.map(|a| &a.cidr), &self.cidr),
            tags: crate::changes::changed_map(actual.map(|a| &a.tags), &self.all_tags()),
        };
        let changed = actual.is_none() || changes.cidr.is_some() || changes.tags.is_some();
        (changed, changes)
    }

    fn check_changes(&self, actual: Option<&VpcInfo>, changes: &VpcChanges) -> Result<(), UnitsError> {
        if actual.is_some() {
            if let Some(cidr) = &changes.cidr {
                return Err(UnitsError::ImmutableFieldChanged {
                    unit: self.meta.path().to_string(),
                    field: "cidr".to_string(),
                    actual: actual.unwrap().cidr.clone(),
                    desired: cidr.clone(),
                });
            }
        }
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&VpcInfo>, changes: &VpcChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let created = ctx.block_on(ctx.cloud.create_vpc(&self.cidr, &self.all_tags()))?;
            self.id = Some(created.id);
            return Ok(());
        }
        if let Some(tags) = &changes.tags {
            ctx.block_on(ctx.cloud.create_tags(self.id.as_deref().unwrap(), tags))?;
        }
        Ok(())
    }

    fn render_script(
        &self,
        sink: &mut dyn crate::sinks::ScriptSink,
        actual: Option<&VpcInfo>,
        _changes: &VpcChanges,
    ) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!(
                "{var}=$(aws ec2 create-vpc --cidr-block {} --query Vpc.VpcId --output text)",
                self.cidr
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&VpcInfo>, changes: &VpcChanges) {
        let mut fields = Vec::new();
        if let Some(cidr) = &changes.cidr {
            fields.push(FieldDiff {
                field: "cidr".to_string(),
                actual: actual.map(|a| a.cidr.clone()),
                expected: cidr.clone(),
            });
        }
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), fields);
    }
}

#[derive(Debug)]
pub struct DhcpOptionsUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub domain_name: String,
    pub domain_name_servers: Vec<String>,
    pub tags: Tags,
    pub id: Option<String>,
}

impl DhcpOptionsUnit {
    pub fn new(key: impl Into<String>, cluster_id: String, domain_name: String, domain_name_servers: Vec<String>, tags: Tags) -> Self {
        DhcpOptionsUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            domain_name,
            domain_name_servers,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

#[derive(Debug, Default)]
pub struct DhcpOptionsChanges {
    pub domain_name: Option<String>,
}

impl UnitLifecycle for DhcpOptionsUnit {
    type Actual = DhcpOptionsInfo;
    type Changes = DhcpOptionsChanges;

    fn unit_type(&self) -> &'static str {
        "DhcpOptions"
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

    fn find(&self, ctx: &RunCtx) -> Result<Option<DhcpOptionsInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_dhcp_options_by_tag(CLUSTER_TAG_KEY, &self.cluster_id))?)
    }

    fn adopt_observed(&mut self, actual: &DhcpOptionsInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&DhcpOptionsInfo>) -> (bool, DhcpOptionsChanges) {
        let changes = DhcpOptionsChanges {
            domain_name: changed(actual.map(|a| &a.domain_name), &self.domain_name),
        };
        (actual.is_none() || changes.domain_name.is_some(), changes)
    }

    fn check_changes(&self, actual: Option<&DhcpOptionsInfo>, changes: &DhcpOptionsChanges) -> Result<(), UnitsError> {
        if let (Some(a), Some(d)) = (actual, &changes.domain_name) {
            return Err(UnitsError::ImmutableFieldChanged {
                unit: self.meta.path().to_string(),
                field: "domain_name".to_string(),
                actual: a.domain_name.clone(),
                desired: d.clone(),
            });
        }
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&DhcpOptionsInfo>, _changes: &DhcpOptionsChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let created = ctx.block_on(ctx.cloud.create_dhcp_options(&self.domain_name, &self.domain_name_servers, &self.all_tags()))?;
            self.id = Some(created.id);
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&DhcpOptionsInfo>, _changes: &DhcpOptionsChanges) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!(
                "{var}=$(aws ec2 create-dhcp-options --dhcp-configurations Key=domain-name,Values={} --query DhcpOptions.DhcpOptionsId --output text)",
                self.domain_name
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&DhcpOptionsInfo>, changes: &DhcpOptionsChanges) {
        let mut fields = Vec::new();
        if let Some(d) = &changes.domain_name {
            fields.push(FieldDiff {
                field: "domain_name".to_string(),
                actual: actual.map(|a| a.domain_name.clone()),
                expected: d.clone(),
            });
        }
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), fields);
    }
}

/// No live-findable state of its own (the association is implied by the
/// VPC's `dhcp_options_id`, which `kubeup_cloud::VpcInfo` doesn't surface) —
/// so `find` always returns `None` and the unit always (re-)associates,
/// matching `pkg/fi`'s pattern for side-effect-only Units with no `Actual`.
#[derive(Debug)]
pub struct VpcDhcpOptionsAssocUnit {
    meta: UnitMeta,
    pub vpc_key: String,
    pub vpc_id: Option<String>,
    pub dhcp_options_key: String,
    pub dhcp_options_id: Option<String>,
}

impl VpcDhcpOptionsAssocUnit {
    pub fn new(key: impl Into<String>, vpc_key: String, dhcp_options_key: String) -> Self {
        VpcDhcpOptionsAssocUnit {
            meta: UnitMeta::new(key),
            vpc_key,
            vpc_id: None,
            dhcp_options_key,
            dhcp_options_id: None,
        }
    }
}

impl UnitLifecycle for VpcDhcpOptionsAssocUnit {
    type Actual = ();
    type Changes = ();

    fn unit_type(&self) -> &'static str {
        "VpcDhcpOptionsAssoc"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.vpc_key.clone(), self.dhcp_options_key.clone()]
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.vpc_id = resolved.get(&self.vpc_key).and_then(|r| r.id.clone());
        self.dhcp_options_id = resolved.get(&self.dhcp_options_key).and_then(|r| r.id.clone());
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
        let vpc_id = self.vpc_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "vpc_id".to_string(),
        })?;
        let dhcp_options_id = self.dhcp_options_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
            unit: self.meta.path().to_string(),
            field: "dhcp_options_id".to_string(),
        })?;
        ctx.block_on(ctx.cloud.associate_dhcp_options(vpc_id, dhcp_options_id))?;
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, _actual: Option<&()>, _changes: &()) -> Result<(), UnitsError> {
        sink.emit(format!(
            "aws ec2 associate-dhcp-options --vpc-id ${{{}_VPC}} --dhcp-options-id ${{{}_DHCPOPTIONS}}",
            self.vpc_key.to_uppercase(),
            self.dhcp_options_key.to_uppercase()
        ));
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, _actual: Option<&()>, _changes: &()) {
        sink.record_change(self.unit_type(), self.meta.path(), true, Vec::new());
    }
}

#[derive(Debug)]
pub struct SubnetUnit {
    meta: UnitMeta,
    pub cluster_id: String,
    pub name_tag: String,
    pub vpc_key: String,
    pub vpc_id: Option<String>,
    pub cidr: String,
    pub availability_zone: String,
    pub tags: Tags,
    pub id: Option<String>,
}

impl SubnetUnit {
    pub fn new(
        key: impl Into<String>,
        cluster_id: String,
        name_tag: String,
        vpc_key: String,
        cidr: String,
        availability_zone: String,
        tags: Tags,
    ) -> Self {
        SubnetUnit {
            meta: UnitMeta::new(key),
            cluster_id,
            name_tag,
            vpc_key,
            vpc_id: None,
            cidr,
            availability_zone,
            tags,
            id: None,
        }
    }

    fn all_tags(&self) -> Tags {
        let mut t = self.tags.clone();
        t.insert(NAME_TAG_KEY.to_string(), self.name_tag.clone());
        t.insert(CLUSTER_TAG_KEY.to_string(), self.cluster_id.clone());
        t
    }
}

#[derive(Debug, Default)]
pub struct SubnetChanges {
    pub cidr: Option<String>,
    pub vpc_id: Option<String>,
    pub tags: Option<Tags>,
}

impl UnitLifecycle for SubnetUnit {
    type Actual = SubnetInfo;
    type Changes = SubnetChanges;

    fn unit_type(&self) -> &'static str {
        "Subnet"
    }

    fn meta(&self) -> &UnitMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut UnitMeta {
        &mut self.meta
    }

    fn depends_on(&self) -> Vec<String> {
        vec![self.vpc_key.clone()]
    }

    fn resolved_id(&self) -> crate::lifecycle::ResolvedId {
        crate::lifecycle::ResolvedId {
            id: self.id.clone(),
            secondary: None,
        }
    }

    fn resolve_refs(&mut self, resolved: &std::collections::HashMap<String, crate::lifecycle::ResolvedId>) {
        self.vpc_id = resolved.get(&self.vpc_key).and_then(|r| r.id.clone());
    }

    fn find(&self, ctx: &RunCtx) -> Result<Option<SubnetInfo>, UnitsError> {
        Ok(ctx.block_on(ctx.cloud.find_subnet_by_tag(NAME_TAG_KEY, &self.name_tag))?)
    }

    fn adopt_observed(&mut self, actual: &SubnetInfo) {
        self.id = Some(actual.id.clone());
    }

    fn diff(&self, actual: Option<&SubnetInfo>) -> (bool, SubnetChanges) {
        let changes = SubnetChanges {
            cidr: changed(actual.map(|a| &a.cidr), &self.cidr),
            vpc_id: changed_ref(actual.map(|a| a.vpc_id.as_str()), &self.vpc_id),
            tags: crate::changes::changed_map(actual.map(|a| &a.tags), &self.all_tags()),
        };
        let changed = actual.is_none() || changes.cidr.is_some() || changes.vpc_id.is_some() || changes.tags.is_some();
        (changed, changes)
    }

    fn check_changes(&self, actual: Option<&SubnetInfo>, changes: &SubnetChanges) -> Result<(), UnitsError> {
        if let Some(a) = actual {
            if let Some(cidr) = &changes.cidr {
                return Err(UnitsError::ImmutableFieldChanged {
                    unit: self.meta.path().to_string(),
                    field: "cidr".to_string(),
                    actual: a.cidr.clone(),
                    desired: cidr.clone(),
                });
            }
            if let Some(vpc_id) = &changes.vpc_id {
                return Err(UnitsError::ImmutableFieldChanged {
                    unit: self.meta.path().to_string(),
                    field: "vpc_id".to_string(),
                    actual: a.vpc_id.clone(),
                    desired: vpc_id.clone(),
                });
            }
        }
        Ok(())
    }

    fn render_live(&mut self, ctx: &RunCtx, actual: Option<&SubnetInfo>, changes: &SubnetChanges) -> Result<(), UnitsError> {
        if actual.is_none() {
            let vpc_id = self.vpc_id.as_deref().ok_or_else(|| UnitsError::MissingRequiredField {
                unit: self.meta.path().to_string(),
                field: "vpc_id".to_string(),
            })?;
            let created = ctx.block_on(ctx.cloud.create_subnet(vpc_id, &self.cidr, &self.availability_zone, &self.all_tags()))?;
            self.id = Some(created.id);
            return Ok(());
        }
        if let Some(tags) = &changes.tags {
            ctx.block_on(ctx.cloud.create_tags(self.id.as_deref().unwrap(), tags))?;
        }
        Ok(())
    }

    fn render_script(&self, sink: &mut dyn crate::sinks::ScriptSink, actual: Option<&SubnetInfo>, _changes: &SubnetChanges) -> Result<(), UnitsError> {
        let var = sink.variable_for(self.unit_type(), self.meta.path());
        if actual.is_none() {
            sink.emit(format!(
                "{var}=$(aws ec2 create-subnet --vpc-id ${{{}_VPC}} --cidr-block {} --availability-zone {} --query Subnet.SubnetId --output text)",
                self.vpc_key.to_uppercase(),
                self.cidr,
                self.availability_zone
            ));
        } else {
            sink.emit(format!("{var}={}", actual.unwrap().id));
        }
        Ok(())
    }

    fn render_dryrun(&self, sink: &mut dyn crate::sinks::DryRunSink, actual: Option<&SubnetInfo>, changes: &SubnetChanges) {
        let mut fields = Vec::new();
        if let Some(cidr) = &changes.cidr {
            fields.push(FieldDiff {
                field: "cidr".to_string(),
                actual: actual.map(|a| a.cidr.clone()),
                expected: cidr.clone(),
            });
        }
        sink.record_change(self.unit_type(), self.meta.path(), actual.is_none(), fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vpc_changing_cidr_on_an_existing_vpc_is_rejected() {
        let unit = VpcUnit::new("vpc", "test".into(), "test.k8s.local".into(), "10.1.0.0/16".into(), Tags::new());
        let actual = VpcInfo {
            id: "vpc-1".into(),
            cidr: "10.0.0.0/16".into(),
            tags: Tags::new(),
        };
        let (changed, changes) = unit.diff(Some(&actual));
        assert!(changed);
        assert!(unit.check_changes(Some(&actual), &changes).is_err());
    }

    #[test]
    fn vpc_tags_only_change_does_not_touch_cidr() {
        let unit = VpcUnit::new("vpc", "test".into(), "test.k8s.local".into(), "10.0.0.0/16".into(), Tags::new());
        let mut actual_tags = Tags::new();
        actual_tags.insert(NAME_TAG_KEY.to_string(), "test".to_string());
        actual_tags.insert(CLUSTER_TAG_KEY.to_string(), "test.k8s.local".to_string());
        let actual = VpcInfo {
            id: "vpc-1".into(),
            cidr: "10.0.0.0/16".into(),
            tags: actual_tags,
        };
        let (changed, changes) = unit.diff(Some(&actual));
        assert!(!changed);
        assert!(unit.check_changes(Some(&actual), &changes).is_ok());
    }
}
